use nom::IResult;
use nom_locate::LocatedSpan;

use crate::error::XmlError;

/// A span of text in the input document.
///
/// The span tracks its offset, line and column so that errors can point at
/// the offending character.
pub type InputSpan<'a> = LocatedSpan<&'a str>;

/// A result type for parser operations.
pub type Result<'a, O> = IResult<InputSpan<'a>, O, XmlError>;

/// Returns whether the character can start an XML name.
pub const fn is_name_start_char(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == ':' || !c.is_ascii()
}

/// Returns whether the character can appear inside an XML name.
pub const fn is_name_char(c: char) -> bool {
    is_name_start_char(c) || c.is_ascii_digit() || c == '-' || c == '.'
}

/// Splits a qualified name into its prefix (if any) and local part.
pub fn split_qualified_name(name: &str) -> (Option<&str>, &str) {
    match name.split_once(':') {
        Some((prefix, local)) => (Some(prefix), local),
        None => (None, name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_prefixed_name() {
        assert_eq!(split_qualified_name("cellml:units"), (Some("cellml"), "units"));
    }

    #[test]
    fn split_plain_name() {
        assert_eq!(split_qualified_name("model"), (None, "model"));
    }

    #[test]
    fn name_characters() {
        assert!(is_name_start_char('m'));
        assert!(is_name_start_char('_'));
        assert!(!is_name_start_char('1'));
        assert!(is_name_char('1'));
        assert!(is_name_char('-'));
        assert!(!is_name_char(' '));
    }
}
