//! Errors produced while reading XML

use std::fmt;

use nom::error::{ErrorKind, ParseError};

use crate::util::InputSpan;

/// An error that occurred while parsing an XML document.
///
/// Contains the reason for the error and the location where it occurred.
/// Line and column are 1-indexed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlError {
    /// The offset in the source where the error occurred
    pub offset: usize,
    /// The line where the error occurred
    pub line: usize,
    /// The column where the error occurred
    pub column: usize,
    /// The reason for the error
    pub reason: XmlErrorReason,
}

/// The different reasons an XML document can be rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlErrorReason {
    /// Expected an element
    ExpectedElement,
    /// Expected an element or attribute name
    ExpectedName,
    /// Expected `=` and a quoted attribute value
    ExpectedAttributeValue,
    /// Expected `>` or `/>` at the end of a start tag
    UnterminatedStartTag,
    /// A closing tag did not match the open element
    MismatchedClosingTag {
        /// The name of the element that was open
        expected: String,
        /// The name found in the closing tag
        found: String,
    },
    /// The document ended before the open element was closed
    UnclosedElement(String),
    /// A comment, CDATA section or processing instruction was not terminated
    UnterminatedConstruct(&'static str),
    /// An entity reference could not be decoded
    InvalidEntity(String),
    /// An attribute was given twice on the same element
    DuplicateAttribute(String),
    /// Content was found after the root element
    TrailingContent,
    /// The bytes of the document are not valid UTF-8
    InvalidUtf8,
    /// A low-level nom parsing error
    NomError(ErrorKind),
}

impl XmlError {
    pub(crate) fn new(input: InputSpan<'_>, reason: XmlErrorReason) -> Self {
        Self {
            offset: input.location_offset(),
            line: usize::try_from(input.location_line()).unwrap_or(usize::MAX),
            column: input.get_utf8_column(),
            reason,
        }
    }

    pub(crate) const fn invalid_utf8(offset: usize) -> Self {
        Self {
            offset,
            line: 0,
            column: 0,
            reason: XmlErrorReason::InvalidUtf8,
        }
    }

    /// Returns whether the error is a low-level nom error, i.e. not one of
    /// the descriptive reasons
    #[must_use]
    pub const fn is_nom_error(&self) -> bool {
        matches!(self.reason, XmlErrorReason::NomError(_))
    }
}

impl ParseError<InputSpan<'_>> for XmlError {
    fn from_error_kind(input: InputSpan<'_>, kind: ErrorKind) -> Self {
        Self::new(input, XmlErrorReason::NomError(kind))
    }

    fn append(_input: InputSpan<'_>, _kind: ErrorKind, other: Self) -> Self {
        other
    }

    fn or(self, other: Self) -> Self {
        // keep the error that made the most progress
        if other.offset >= self.offset { other } else { self }
    }
}

impl fmt::Display for XmlErrorReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExpectedElement => write!(f, "expected an element"),
            Self::ExpectedName => write!(f, "expected a name"),
            Self::ExpectedAttributeValue => write!(f, "expected `=` and a quoted value"),
            Self::UnterminatedStartTag => write!(f, "expected `>` or `/>`"),
            Self::MismatchedClosingTag { expected, found } => {
                write!(f, "expected `</{expected}>` but found `</{found}>`")
            }
            Self::UnclosedElement(name) => write!(f, "element `{name}` is never closed"),
            Self::UnterminatedConstruct(construct) => write!(f, "unterminated {construct}"),
            Self::InvalidEntity(entity) => write!(f, "invalid entity `&{entity};`"),
            Self::DuplicateAttribute(name) => write!(f, "duplicate attribute `{name}`"),
            Self::TrailingContent => write!(f, "unexpected content after the root element"),
            Self::InvalidUtf8 => write!(f, "invalid UTF-8"),
            Self::NomError(kind) => write!(f, "unexpected input ({})", kind.description()),
        }
    }
}

impl fmt::Display for XmlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.line == 0 {
            write!(f, "{} (at byte {})", self.reason, self.offset)
        } else {
            write!(f, "{} (line {}, column {})", self.reason, self.line, self.column)
        }
    }
}

impl std::error::Error for XmlError {}
