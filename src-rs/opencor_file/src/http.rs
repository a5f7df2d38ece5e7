//! Retrieval of remote files

use std::time::Duration;

/// An error produced while downloading a remote file.
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    /// The HTTP client could not be set up
    #[error("the HTTP client could not be created: {0}")]
    Client(String),
    /// The request could not be completed (invalid URL, network failure,
    /// timeout, too many redirects)
    #[error("the request to `{url}` failed: {message}")]
    Request {
        /// The requested URL
        url: String,
        /// A description of the failure
        message: String,
    },
    /// The server answered with a non-success status
    #[error("`{url}` returned HTTP status {status}")]
    Status {
        /// The requested URL
        url: String,
        /// The HTTP status code
        status: u16,
    },
}

/// Downloads the bytes of a remote file.
///
/// Redirects are followed by the implementation.
pub trait HttpClient: Send + Sync {
    /// Returns the body of the given URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server does not answer
    /// with a success status.
    fn get(&self, url: &str) -> Result<Vec<u8>, HttpError>;
}

/// An [`HttpClient`] backed by a blocking `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: reqwest::blocking::Client,
}

impl ReqwestClient {
    /// The timeout used when none is configured
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    const MAX_REDIRECTS: usize = 10;

    /// Creates a client that gives up on a request after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying client (TLS backend included)
    /// cannot be initialised.
    pub fn new(timeout: Duration) -> Result<Self, HttpError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(Self::MAX_REDIRECTS))
            .user_agent(concat!("opencor/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|error| HttpError::Client(error.to_string()))?;

        Ok(Self { client })
    }
}

impl HttpClient for ReqwestClient {
    fn get(&self, url: &str) -> Result<Vec<u8>, HttpError> {
        let request_error = |error: reqwest::Error| HttpError::Request {
            url: url.to_string(),
            message: error.to_string(),
        };

        tracing::debug!(url, "downloading file");

        let response = self.client.get(url).send().map_err(request_error)?;
        let status = response.status();

        if !status.is_success() {
            return Err(HttpError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().map_err(request_error)?;

        Ok(body.to_vec())
    }
}
