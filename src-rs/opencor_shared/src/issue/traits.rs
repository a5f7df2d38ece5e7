use crate::issue::{Issue, Logger};

/// Trait for types that accumulate issues.
///
/// Implementors only provide [`HasIssues::logger`]; every query is derived
/// from it. Files, documents, solvers and instances all implement this trait
/// so that callers (and the CLI printer) can read diagnostics uniformly.
pub trait HasIssues {
    /// Returns the logger holding the issues of this object.
    fn logger(&self) -> &Logger;

    /// Returns whether any issue has been recorded.
    fn has_issues(&self) -> bool {
        self.logger().issue_count() != 0
    }

    /// Returns the number of recorded issues.
    fn issue_count(&self) -> usize {
        self.logger().issue_count()
    }

    /// Returns a copy of every recorded issue.
    fn issues(&self) -> Vec<Issue> {
        self.logger().issues().to_vec()
    }

    /// Returns whether any error has been recorded.
    fn has_errors(&self) -> bool {
        self.logger().error(0).is_some()
    }

    /// Returns whether any warning has been recorded.
    fn has_warnings(&self) -> bool {
        self.logger().warning(0).is_some()
    }

    /// Returns whether any message has been recorded.
    fn has_messages(&self) -> bool {
        self.logger().message(0).is_some()
    }
}
