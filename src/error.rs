use std::error::Error as _;
use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Any failure at the data-access boundary.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("database error while trying to {operation}")]
    Query {
        operation: &'static str,
        #[source]
        source: sqlx::Error,
    },
    #[error("could not {operation} within {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },
}

impl PersistenceError {
    pub fn operation(&self) -> &'static str {
        match self {
            Self::Query { operation, .. } | Self::Timeout { operation, .. } => operation,
        }
    }

    /// Every message in the cause chain, outermost first, joined with `": "`.
    pub fn chain(&self) -> String {
        let mut out = self.to_string();
        let mut cause = self.source();
        while let Some(err) = cause {
            out.push_str(": ");
            out.push_str(&err.to_string());
            cause = err.source();
        }
        out
    }
}

/// What the error popup shows: a fixed header plus the failure detail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorReport {
    pub header: String,
    pub detail: String,
}

impl ErrorReport {
    pub const LOAD_FAILED: &'static str = "Failed to load the project list.";
    pub const SAVE_FAILED: &'static str = "Failed to save the project.";
    pub const DELETE_FAILED: &'static str = "Failed to delete the project.";

    pub fn new(header: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            detail: detail.into(),
        }
    }

    /// The detail is the error's own message, followed on a new line by its
    /// immediate cause when there is one.
    pub fn from_persistence(header: &str, err: &PersistenceError) -> Self {
        let detail = match err.source() {
            Some(cause) => format!("{}\n{}", err, cause),
            None => err.to_string(),
        };
        Self::new(header, detail)
    }
}

impl fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\n{}", self.header, self.detail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_detail_includes_cause() {
        let err = PersistenceError::Query {
            operation: "list projects",
            source: sqlx::Error::PoolTimedOut,
        };
        let report = ErrorReport::from_persistence(ErrorReport::LOAD_FAILED, &err);

        assert_eq!(report.header, "Failed to load the project list.");
        let mut lines = report.detail.lines();
        assert_eq!(lines.next(), Some("database error while trying to list projects"));
        assert_eq!(lines.next(), Some(sqlx::Error::PoolTimedOut.to_string().as_str()));
    }

    #[test]
    fn report_detail_without_cause_is_single_line() {
        let err = PersistenceError::Timeout {
            operation: "count projects",
            after: Duration::from_secs(3),
        };
        let report = ErrorReport::from_persistence(ErrorReport::LOAD_FAILED, &err);

        assert_eq!(report.detail, "could not count projects within 3s");
        assert_eq!(err.operation(), "count projects");
    }

    #[test]
    fn chain_walks_every_source() {
        let err = PersistenceError::Query {
            operation: "delete project",
            source: sqlx::Error::PoolClosed,
        };

        assert_eq!(
            err.chain(),
            format!(
                "database error while trying to delete project: {}",
                sqlx::Error::PoolClosed
            )
        );
    }
}
