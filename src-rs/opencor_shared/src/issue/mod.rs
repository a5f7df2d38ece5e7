//! Diagnostics for the OpenCOR engine
//!
//! Expected, data-driven problems (a missing file, a bad solver property, a
//! model that cannot be solved) are never returned as Rust errors. Instead,
//! the object that detected the problem records an [`Issue`] in its
//! [`Logger`], and callers inspect it through the [`HasIssues`] trait.

mod traits;

use std::fmt;

pub use traits::HasIssues;

/// The severity of an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IssueKind {
    /// Blocks progress to the next stage (resolution, instantiation, or a run)
    Error,
    /// Degraded but the engine proceeds
    Warning,
    /// Informational
    Message,
}

impl IssueKind {
    /// Returns the lowercase label used when printing the issue
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Message => "message",
        }
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A single diagnostic record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Issue {
    kind: IssueKind,
    description: String,
}

impl Issue {
    /// Creates a new issue
    #[must_use]
    pub fn new(kind: IssueKind, description: impl Into<String>) -> Self {
        Self {
            kind,
            description: description.into(),
        }
    }

    /// Creates a new error
    #[must_use]
    pub fn error(description: impl Into<String>) -> Self {
        Self::new(IssueKind::Error, description)
    }

    /// Creates a new warning
    #[must_use]
    pub fn warning(description: impl Into<String>) -> Self {
        Self::new(IssueKind::Warning, description)
    }

    /// Creates a new message
    #[must_use]
    pub fn message(description: impl Into<String>) -> Self {
        Self::new(IssueKind::Message, description)
    }

    /// Returns the severity of the issue
    #[must_use]
    pub const fn kind(&self) -> IssueKind {
        self.kind
    }

    /// Returns the human-readable description of the issue
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns whether the issue is an error
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.kind == IssueKind::Error
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.description)
    }
}

/// An ordered accumulation of issues.
///
/// Every diagnosing object embeds a `Logger` and exposes it through
/// [`HasIssues`]. Issues keep their insertion order; the typed accessors
/// (`error`, `warning`, `message`) index into the issues of that kind only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Logger {
    issues: Vec<Issue>,
}

impl Logger {
    /// Creates an empty logger
    #[must_use]
    pub const fn new() -> Self {
        Self { issues: Vec::new() }
    }

    /// Records an issue
    pub fn add_issue(&mut self, issue: Issue) {
        tracing::debug!(kind = %issue.kind(), description = issue.description(), "issue recorded");

        self.issues.push(issue);
    }

    /// Records every issue of the given iterator, keeping their order
    pub fn add_issues(&mut self, issues: impl IntoIterator<Item = Issue>) {
        for issue in issues {
            self.add_issue(issue);
        }
    }

    /// Records an error
    pub fn add_error(&mut self, description: impl Into<String>) {
        self.add_issue(Issue::error(description));
    }

    /// Records a warning
    pub fn add_warning(&mut self, description: impl Into<String>) {
        self.add_issue(Issue::warning(description));
    }

    /// Records a message
    pub fn add_message(&mut self, description: impl Into<String>) {
        self.add_issue(Issue::message(description));
    }

    /// Removes every recorded issue
    pub fn remove_all_issues(&mut self) {
        self.issues.clear();
    }

    /// Returns all the issues, in the order they were recorded
    #[must_use]
    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    /// Returns the number of recorded issues
    #[must_use]
    pub fn issue_count(&self) -> usize {
        self.issues.len()
    }

    fn of_kind(&self, kind: IssueKind) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(move |issue| issue.kind == kind)
    }

    /// Returns the errors, in the order they were recorded
    #[must_use]
    pub fn errors(&self) -> Vec<&Issue> {
        self.of_kind(IssueKind::Error).collect()
    }

    /// Returns the warnings, in the order they were recorded
    #[must_use]
    pub fn warnings(&self) -> Vec<&Issue> {
        self.of_kind(IssueKind::Warning).collect()
    }

    /// Returns the messages, in the order they were recorded
    #[must_use]
    pub fn messages(&self) -> Vec<&Issue> {
        self.of_kind(IssueKind::Message).collect()
    }

    /// Returns the error at the given index, if any
    #[must_use]
    pub fn error(&self, index: usize) -> Option<&Issue> {
        self.of_kind(IssueKind::Error).nth(index)
    }

    /// Returns the warning at the given index, if any
    #[must_use]
    pub fn warning(&self, index: usize) -> Option<&Issue> {
        self.of_kind(IssueKind::Warning).nth(index)
    }

    /// Returns the message at the given index, if any
    #[must_use]
    pub fn message(&self, index: usize) -> Option<&Issue> {
        self.of_kind(IssueKind::Message).nth(index)
    }
}

impl HasIssues for Logger {
    fn logger(&self) -> &Logger {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_logger_has_no_issues() {
        let logger = Logger::new();

        assert!(!logger.has_issues());
        assert!(!logger.has_errors());
        assert_eq!(logger.issue_count(), 0);
        assert_eq!(logger.error(0), None);
    }

    #[test]
    fn issues_keep_insertion_order() {
        let mut logger = Logger::new();

        logger.add_warning("first");
        logger.add_error("second");
        logger.add_message("third");
        logger.add_error("fourth");

        let descriptions: Vec<_> = logger.issues().iter().map(Issue::description).collect();
        assert_eq!(descriptions, ["first", "second", "third", "fourth"]);

        assert_eq!(logger.errors().len(), 2);
        assert_eq!(logger.error(1).map(Issue::description), Some("fourth"));
        assert_eq!(logger.warning(0).map(Issue::description), Some("first"));
        assert_eq!(logger.message(0).map(Issue::description), Some("third"));
        assert_eq!(logger.message(1), None);
    }

    #[test]
    fn remove_all_issues_clears_everything() {
        let mut logger = Logger::new();

        logger.add_error("oops");
        logger.remove_all_issues();

        assert!(!logger.has_issues());
    }

    #[test]
    fn issue_display_includes_kind() {
        let issue = Issue::warning("The parameter 'KISAO:1234567' is not recognised.");

        assert_eq!(
            issue.to_string(),
            "warning: The parameter 'KISAO:1234567' is not recognised."
        );
    }
}
