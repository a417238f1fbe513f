//! Error types for Cobbler operations.
//!
//! Errors are categorized so callers can tell a refused name apart from a
//! failed command or a post-condition that did not hold. Each variant keeps
//! the rendered command and captured output needed to diagnose the failure.

use crate::naming::Offense;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Categories of Cobbler errors for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Name would be rewritten by Cobbler
    Validation,
    /// A query could not be executed (not the same as "object absent")
    Query,
    /// A mutating command returned non-zero
    Action,
    /// State after a mutation did not match the expected post-condition
    Verify,
    /// Object or report field missing
    NotFound,
    /// Downloaded or installed artifact does not match its checksum
    Integrity,
    /// Network errors while fetching artifacts
    Network,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    /// Get a user-friendly description of this error category.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Validation => "Invalid object name",
            Self::Query => "Could not query Cobbler",
            Self::Action => "Cobbler command failed",
            Self::Verify => "Post-condition check failed",
            Self::NotFound => "Not found",
            Self::Integrity => "Checksum mismatch",
            Self::Network => "Download failed",
            Self::Other => "Unexpected error",
        }
    }

    /// Get actionable advice for resolving this error category.
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Validation => "Rename the object so it contains none of the contentious strings",
            Self::Query => "Check that cobbler is installed, cobblerd is running, and the timeout is large enough",
            Self::Action => "Inspect the captured output and cobbler's logs",
            Self::Verify => "Re-run; if it persists, inspect the object with `cobbler <type> report`",
            Self::NotFound => "Verify the object name and that the distro was imported",
            Self::Integrity => "Check the configured checksum or the source artifact",
            Self::Network => "Check connectivity to the artifact source and try again",
            Self::Other => "Check the error details for more information",
        }
    }
}

/// Expected post-condition of a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expectation {
    /// Object must be reported after the command
    Present,
    /// Object must no longer be reported after the command
    Absent,
}

impl fmt::Display for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Present => write!(f, "present"),
            Self::Absent => write!(f, "absent"),
        }
    }
}

/// Errors that can occur while driving Cobbler.
#[derive(Debug, Error)]
pub enum Error {
    /// Name contains strings Cobbler would rewrite on import
    #[error(
        "invalid cobbler name {name:?}: it would be changed by Cobbler (contentious strings: {})",
        join_offenses(.offenses)
    )]
    InvalidName {
        /// Name that was refused
        name: String,
        /// Every offending substring, in detection order
        offenses: Vec<Offense>,
    },

    /// A query process could not be run or did not finish
    #[error("query failed: {command}: {message}")]
    QueryFailed {
        /// Rendered query command
        command: String,
        /// Reason the query could not complete
        message: String,
    },

    /// A mutating command returned a non-zero exit status
    #[error("command failed ({}): {command}{}", describe_exit(.exit_code), describe_output(.stderr, .stdout))]
    ActionFailed {
        /// Rendered command
        command: String,
        /// Exit code, `None` when killed by a signal
        exit_code: Option<i32>,
        /// Captured standard output
        stdout: String,
        /// Captured standard error
        stderr: String,
    },

    /// Post-condition did not hold after a mutation
    #[error("verification failed: {object} expected to be {expected}")]
    VerifyFailed {
        /// Object that was checked
        object: String,
        /// Expected state
        expected: Expectation,
    },

    /// Object is not known to Cobbler
    #[error("{object} not found")]
    ObjectNotFound {
        /// Object that was looked up
        object: String,
    },

    /// Report exists but lacks the requested labeled field
    #[error("field {field:?} not found in report for {object}")]
    FieldNotFound {
        /// Object whose report was parsed
        object: String,
        /// Label that was looked up
        field: String,
    },

    /// Breed with no known kickstart convention
    #[error("unsupported breed ({0})")]
    UnsupportedBreed(String),

    /// Artifact content does not match the configured checksum
    #[error("checksum mismatch for {}: expected {expected}, got {actual}", .path.display())]
    ChecksumMismatch {
        /// File that was hashed
        path: PathBuf,
        /// Configured SHA-256
        expected: String,
        /// Computed SHA-256
        actual: String,
    },

    /// External command did not exit within the configured timeout
    #[error("timed out after {seconds}s: {command}")]
    Timeout {
        /// Rendered command
        command: String,
        /// Timeout that elapsed
        seconds: u64,
    },

    /// External command could not be started
    #[error("failed to execute {command}: {source}")]
    Spawn {
        /// Rendered command
        command: String,
        /// Underlying IO error
        source: std::io::Error,
    },

    /// Artifact download failed
    #[error("download failed: {url}: {message}")]
    Download {
        /// Source URL
        url: String,
        /// Transport or HTTP error
        message: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Get the error category for reporting.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::InvalidName { .. } => ErrorCategory::Validation,
            Error::QueryFailed { .. } => ErrorCategory::Query,
            Error::ActionFailed { .. } | Error::Timeout { .. } | Error::Spawn { .. } => {
                ErrorCategory::Action
            }
            Error::VerifyFailed { .. } => ErrorCategory::Verify,
            Error::ObjectNotFound { .. } | Error::FieldNotFound { .. } => ErrorCategory::NotFound,
            Error::ChecksumMismatch { .. } => ErrorCategory::Integrity,
            Error::Download { .. } => ErrorCategory::Network,
            Error::UnsupportedBreed(_) | Error::Io(_) => ErrorCategory::Other,
        }
    }
}

fn join_offenses(offenses: &[Offense]) -> String {
    offenses
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn describe_exit(exit_code: &Option<i32>) -> String {
    match exit_code {
        Some(code) => format!("exit {code}"),
        None => "killed by signal".to_string(),
    }
}

fn describe_output(stderr: &str, stdout: &str) -> String {
    let detail = if stderr.trim().is_empty() {
        stdout.trim()
    } else {
        stderr.trim()
    };
    if detail.is_empty() {
        String::new()
    } else {
        format!("\n{detail}")
    }
}

/// Result type for Cobbler operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_name_lists_every_offense() {
        let err = Error::InvalidName {
            name: "ks_mirror-x86".to_string(),
            offenses: vec![
                Offense::BareWord("ks_mirror-".to_string()),
                Offense::ArchToken("-x86".to_string()),
            ],
        };
        let msg = err.to_string();
        assert!(msg.contains("contentious strings: ks_mirror-, -x86"));
        assert_eq!(err.category(), ErrorCategory::Validation);
    }

    #[test]
    fn test_action_failed_prefers_stderr() {
        let err = Error::ActionFailed {
            command: "cobbler sync".to_string(),
            exit_code: Some(1),
            stdout: "partial".to_string(),
            stderr: "cobblerd does not appear to be running".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.starts_with("command failed (exit 1): cobbler sync"));
        assert!(msg.contains("cobblerd does not appear to be running"));
        assert!(!msg.contains("partial"));
    }

    #[test]
    fn test_action_failed_signal() {
        let err = Error::ActionFailed {
            command: "cobbler sync".to_string(),
            exit_code: None,
            stdout: String::new(),
            stderr: String::new(),
        };
        assert_eq!(err.to_string(), "command failed (killed by signal): cobbler sync");
    }

    #[test]
    fn test_field_not_found_is_distinct_from_object_not_found() {
        let field = Error::FieldNotFound {
            object: "centos7-x86_64".to_string(),
            field: "Breed".to_string(),
        };
        let object = Error::ObjectNotFound {
            object: "centos7-x86_64".to_string(),
        };
        assert_eq!(field.category(), ErrorCategory::NotFound);
        assert_ne!(field.to_string(), object.to_string());
    }

    #[test]
    fn test_verify_failed_message() {
        let err = Error::VerifyFailed {
            object: "profile web".to_string(),
            expected: Expectation::Absent,
        };
        assert_eq!(
            err.to_string(),
            "verification failed: profile web expected to be absent"
        );
        assert_eq!(err.category(), ErrorCategory::Verify);
    }
}
