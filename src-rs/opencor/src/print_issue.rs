//! Issue formatting and display
//!
//!     error: The simulation was cancelled.
//!      --> /home/user/models/decay.sedml
//!

use anstream::eprintln;
use opencor_shared::issue::{Issue, IssueKind};
use owo_colors::{OwoColorize, Style};

use crate::stylesheet;

/// Prints every issue reported for `source`
pub fn print_all(source: &str, issues: &[Issue]) {
    for issue in issues {
        eprintln!("{}", issue_to_string(source, issue));
    }
}

/// Prints a failure that is not attached to any file
pub fn print_failure(message: &str) {
    eprintln!("{}", get_message_line("error", stylesheet::ERROR_COLOR, message));
}

fn issue_to_string(source: &str, issue: &Issue) -> String {
    let (kind, color) = kind_style(issue.kind());
    let message_line = get_message_line(kind, color, issue.description());
    let location_line = get_location_line(source);

    [message_line, location_line, String::new()].join("\n")
}

/// Engine messages are shown as notes
const fn kind_style(kind: IssueKind) -> (&'static str, Style) {
    match kind {
        IssueKind::Error => ("error", stylesheet::ERROR_COLOR),
        IssueKind::Warning => ("warning", stylesheet::WARNING_COLOR),
        IssueKind::Message => ("note", stylesheet::NOTE_COLOR),
    }
}

/// Formats a message line with a colored prefix
fn get_message_line(kind: &str, kind_color: Style, message: &str) -> String {
    // <kind>: <message>
    let kind_str = kind_color.style(kind);
    let message_line = format!("{kind_str}: {message}");

    message_line.bold().to_string()
}

fn get_location_line(source: &str) -> String {
    //  --> <source>
    let arrow = stylesheet::SOURCE_ANNOTATION.style("-->");

    format!(" {arrow} {source}")
}
