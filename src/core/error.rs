//! Error handling for the DR controller
//!
//! Every fallible operation in the library returns a [`DrError`]. The variants
//! are designed to be matched by callers (for example an HTTP layer translating
//! [`DrError::InProgress`] into `409 Conflict`) and carry enough context to be
//! shown to an operator without additional wrapping.
//!
//! The CLI converts errors into an [`ErrorContext`] via [`user_friendly_error`],
//! which adds colored details and an actionable suggestion.

use colored::Colorize;
use std::fmt;
use std::path::Path;
use thiserror::Error;

use crate::document::ParseError;
use crate::storage::RemapError;

/// The error type shared by all controller operations.
#[derive(Error, Debug, Clone)]
pub enum DrError {
    /// Site name rejected by the name rules
    #[error("invalid site name '{name}': {reason}")]
    InvalidName {
        /// Rejected name
        name: String,
        /// Why it was rejected
        reason: String,
    },

    /// Generation request failed field validation
    ///
    /// All problems are collected before failing, so an operator sees every
    /// missing field at once.
    #[error("invalid request: {}", .problems.join(", "))]
    Validation {
        /// One entry per offending field, e.g. `site_primary_url is empty`
        problems: Vec<String>,
    },

    /// A site with this name already has a generated configuration
    #[error("site '{name}' already exists")]
    AlreadyExists {
        /// Site name
        name: String,
    },

    /// The named site has no generated configuration
    #[error("site '{name}' not found")]
    NotFound {
        /// Site name
        name: String,
    },

    /// Another operation holds the process or site lock
    #[error("operation already in progress for '{target}'")]
    InProgress {
        /// Site name, or `*` for the process-wide lock
        target: String,
    },

    /// The template directory is missing or incomplete
    #[error("template not found: {path}")]
    TemplateMissing {
        /// Expected template location
        path: String,
    },

    /// Downloading the CA certificate of a site failed
    #[error("failed to fetch CA certificate from {url}: {reason}")]
    CaFetch {
        /// CA endpoint
        url: String,
        /// Transport error or HTTP status
        reason: String,
    },

    /// The site API rejected the credentials or could not be reached
    #[error("site {url} is not reachable: {reason}")]
    Connectivity {
        /// Site API URL
        url: String,
        /// Transport error or HTTP status
        reason: String,
    },

    /// The playbook runner binary is not installed
    #[error("playbook runner '{binary}' not found")]
    BinaryNotFound {
        /// Configured binary name or path
        binary: String,
    },

    /// The playbook exited with a failure status
    #[error("playbook {playbook} (tag {tag}) failed with {}", .exit_code.map_or_else(|| "signal".to_string(), |c| format!("exit code {c}")))]
    PlaybookFailed {
        /// Playbook file name
        playbook: String,
        /// Tag the playbook was started with
        tag: String,
        /// Exit code when the process exited normally
        exit_code: Option<i32>,
        /// Captured stdout and stderr
        output: String,
    },

    /// The playbook ran longer than the configured timeout and was killed
    #[error("playbook {playbook} (tag {tag}) timed out after {seconds}s")]
    PlaybookTimeout {
        /// Playbook file name
        playbook: String,
        /// Tag the playbook was started with
        tag: String,
        /// Timeout that elapsed
        seconds: u64,
        /// Output captured before the process was killed
        output: String,
    },

    /// The generate playbook succeeded but did not write its mapping file
    #[error("playbook output {path} was not produced")]
    MissingOutput {
        /// Expected raw mapping file
        path: String,
    },

    /// The generated mapping document could not be parsed
    #[error("failed to parse {path}: {source}")]
    Parse {
        /// Parsed file
        path: String,
        /// Parser diagnostic
        #[source]
        source: ParseError,
    },

    /// Storage remapping produced no usable entries
    #[error(transparent)]
    Remap(#[from] RemapError),

    /// A step after the generate playbook failed
    ///
    /// Wraps the underlying error so the playbook transcript is not lost.
    #[error("{source}")]
    GenerateFailed {
        /// Transcript of the generate playbook
        output: String,
        /// The failing step
        #[source]
        source: Box<DrError>,
    },

    /// Configuration file or environment is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Description of the problem
        message: String,
    },

    /// Filesystem operation failed
    #[error("file system error during {operation} on {path}: {reason}")]
    FileSystem {
        /// What was being done, e.g. `copy template`
        operation: String,
        /// Path involved
        path: String,
        /// Underlying I/O error text
        reason: String,
    },

    /// A background task panicked or was cancelled
    #[error("{operation} task failed: {reason}")]
    TaskFailed {
        /// Operation name
        operation: String,
        /// Join error text
        reason: String,
    },
}

impl DrError {
    /// Build a [`DrError::FileSystem`] from an I/O error.
    pub fn fs(operation: impl Into<String>, path: impl AsRef<Path>, err: &std::io::Error) -> Self {
        Self::FileSystem {
            operation: operation.into(),
            path: path.as_ref().display().to_string(),
            reason: err.to_string(),
        }
    }

    /// Playbook transcript attached to this error, if any.
    #[must_use]
    pub fn output(&self) -> Option<&str> {
        match self {
            Self::PlaybookFailed {
                output,
                ..
            }
            | Self::PlaybookTimeout {
                output,
                ..
            }
            | Self::GenerateFailed {
                output,
                ..
            } => Some(output),
            _ => None,
        }
    }

    /// True when the caller should retry later rather than fix its input.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::InProgress {
                ..
            } | Self::AlreadyExists {
                ..
            }
        )
    }
}

/// An error with optional details and a suggestion for the operator.
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: DrError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    #[must_use]
    pub const fn new(error: DrError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error to stderr with terminal colors.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error into an [`ErrorContext`] suitable for CLI display.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(dr_error) = error.downcast_ref::<DrError>() {
        return create_error_context(dr_error.clone());
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        let ctx = ErrorContext::new(DrError::FileSystem {
            operation: "file access".to_string(),
            path: "unknown".to_string(),
            reason: io_error.to_string(),
        });
        return match io_error.kind() {
            std::io::ErrorKind::PermissionDenied => ctx
                .with_suggestion("Check ownership of the store directory or run as the service user"),
            std::io::ErrorKind::NotFound => {
                ctx.with_suggestion("Check that the file or directory exists and the path is correct")
            }
            _ => ctx,
        };
    }

    if let Some(toml_error) = error.downcast_ref::<toml::de::Error>() {
        return ErrorContext::new(DrError::Config {
            message: toml_error.to_string(),
        })
        .with_suggestion("Check the configuration file for TOML syntax errors");
    }

    let message = format!("{error:#}");
    ErrorContext::new(DrError::Config {
        message,
    })
}

fn create_error_context(error: DrError) -> ErrorContext {
    match &error {
        DrError::InvalidName {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Use only letters, digits, '_' and '-'; 'template' is reserved"),
        DrError::AlreadyExists {
            name,
        } => {
            let suggestion = format!("Run 'dr-controller delete {name}' before generating again");
            ErrorContext::new(error).with_suggestion(suggestion)
        }
        DrError::NotFound {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Run 'dr-controller list' to see generated sites"),
        DrError::InProgress {
            ..
        } => ErrorContext::new(error)
            .with_details("Only one generate, failover, failback, cleanup or delete runs at a time")
            .with_suggestion("Wait for the running operation to finish and retry"),
        DrError::TemplateMissing {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Install the playbook templates under '<store_dir>/template'"),
        DrError::BinaryNotFound {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Install ansible-playbook or set 'binary' in the configuration"),
        DrError::CaFetch {
            ..
        }
        | DrError::Connectivity {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Check the engine URL, credentials and network access from this host"),
        DrError::PlaybookFailed {
            output,
            ..
        }
        | DrError::PlaybookTimeout {
            output,
            ..
        }
        | DrError::GenerateFailed {
            output,
            ..
        } => {
            let details = tail(output, 20);
            ErrorContext::new(error)
                .with_details(details)
                .with_suggestion("See the operation log in the site directory for the full transcript")
        }
        DrError::Remap(_) => ErrorContext::new(error)
            .with_suggestion("Check that storage_domains describes the storages reported by the primary site"),
        _ => ErrorContext::new(error),
    }
}

fn tail(output: &str, lines: usize) -> String {
    let all: Vec<&str> = output.lines().collect();
    let start = all.len().saturating_sub(lines);
    all[start..].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = DrError::NotFound {
            name: "site1".to_string(),
        };
        assert_eq!(error.to_string(), "site 'site1' not found");

        let error = DrError::Validation {
            problems: vec![
                "site_primary_url is empty".to_string(),
                "site_secondary_password is empty".to_string(),
            ],
        };
        assert_eq!(
            error.to_string(),
            "invalid request: site_primary_url is empty, site_secondary_password is empty"
        );

        let error = DrError::PlaybookFailed {
            playbook: "dr_failover.yml".to_string(),
            tag: "fail_over".to_string(),
            exit_code: Some(2),
            output: String::new(),
        };
        assert_eq!(error.to_string(), "playbook dr_failover.yml (tag fail_over) failed with exit code 2");
    }

    #[test]
    fn test_output_survives_wrapping() {
        let error = DrError::GenerateFailed {
            output: "PLAY RECAP".to_string(),
            source: Box::new(DrError::MissingOutput {
                path: "x".to_string(),
            }),
        };
        assert_eq!(error.output(), Some("PLAY RECAP"));
        assert_eq!(error.to_string(), "playbook output x was not produced");
    }

    #[test]
    fn test_conflicts() {
        assert!(
            DrError::InProgress {
                target: "*".to_string()
            }
            .is_conflict()
        );
        assert!(
            !DrError::NotFound {
                name: "a".to_string()
            }
            .is_conflict()
        );
    }

    #[test]
    fn test_user_friendly_error_in_progress() {
        let ctx = user_friendly_error(anyhow::Error::from(DrError::InProgress {
            target: "site1".to_string(),
        }));
        assert!(ctx.suggestion.is_some());
        assert!(ctx.details.is_some());
        assert!(ctx.to_string().contains("operation already in progress for 'site1'"));
    }

    #[test]
    fn test_user_friendly_error_playbook_tail() {
        let output = (0..50).map(|i| format!("line {i}")).collect::<Vec<_>>().join("\n");
        let ctx = user_friendly_error(anyhow::Error::from(DrError::PlaybookTimeout {
            playbook: "dr_failover.yml".to_string(),
            tag: "fail_over".to_string(),
            seconds: 600,
            output,
        }));
        let details = ctx.details.unwrap();
        assert!(details.starts_with("line 30"));
        assert!(details.ends_with("line 49"));
    }

    #[test]
    fn test_user_friendly_error_io() {
        use std::io::{Error, ErrorKind};

        let ctx = user_friendly_error(anyhow::Error::from(Error::new(
            ErrorKind::PermissionDenied,
            "access denied",
        )));
        assert!(matches!(ctx.error, DrError::FileSystem { .. }));
        assert!(ctx.suggestion.is_some());
    }
}
