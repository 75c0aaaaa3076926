//! Shared error types for the analyzers.
//!
//! Every failure an analyzer can hit falls into one of a handful of classes,
//! and each class maps to a process exit code:
//!
//! | Class | Exit code |
//! |-------|-----------|
//! | argument / path / config errors | 2 |
//! | subprocess failures | the child's code, or 1 |
//! | everything else | 1 |
//!
//! Threshold violations are *not* errors; analyzers report them through
//! their [`Outcome`](crate::pipeline::Outcome).

use std::path::PathBuf;
use thiserror::Error;

/// Exit code for a successful run.
pub const EXIT_OK: i32 = 0;
/// Exit code for threshold violations and failing tests.
pub const EXIT_FAILURE: i32 = 1;
/// Exit code for invalid arguments or unresolvable paths.
pub const EXIT_USAGE: i32 = 2;

/// Main error type for analyzer operations
#[derive(Debug, Error)]
pub enum AnalyzerError {
    /// The test/source pair could not be inferred or does not exist
    #[error("Path resolution failed for {input}: {message}")]
    PathResolution { input: String, message: String },

    /// A flag or flag combination is invalid
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Configuration file errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// An external tool exited unsuccessfully
    #[error("`{command}` failed with {}", describe_code(*.code))]
    Subprocess {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    /// An external tool exceeded its time budget and was killed
    #[error("`{command}` timed out after {seconds}s")]
    Timeout { command: String, seconds: u64 },

    /// Malformed tool output that could not be recovered locally
    #[error("Parse error in {source_name}: {message}")]
    Parse {
        source_name: String,
        message: String,
    },

    /// File system related errors
    #[error("File system error at {}: {source}", path.display())]
    FileSystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// IO errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

fn describe_code(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "no exit code (terminated by signal)".to_string(),
    }
}

impl AnalyzerError {
    /// Create a path resolution error
    pub fn path_resolution(input: impl Into<String>, message: impl Into<String>) -> Self {
        Self::PathResolution {
            input: input.into(),
            message: message.into(),
        }
    }

    /// Create a parse error
    pub fn parse(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Wrap an I/O error with the path it happened on
    pub fn file_system(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileSystem {
            path: path.into(),
            source,
        }
    }

    /// Process exit code this error should produce
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::PathResolution { .. } | Self::InvalidArgument(_) | Self::Config(_) => EXIT_USAGE,
            Self::Subprocess { code, .. } => match code {
                Some(code) if *code != EXIT_OK => *code,
                _ => EXIT_FAILURE,
            },
            _ => EXIT_FAILURE,
        }
    }

    /// Whether a usage hint should accompany the message
    pub fn is_usage_error(&self) -> bool {
        self.exit_code() == EXIT_USAGE
    }
}

/// Result type alias using our error type
pub type Result<T> = std::result::Result<T, AnalyzerError>;

/// Find the exit code for an error that travelled through `anyhow`.
pub fn exit_code_for(error: &anyhow::Error) -> i32 {
    error
        .chain()
        .find_map(|cause| cause.downcast_ref::<AnalyzerError>())
        .map(AnalyzerError::exit_code)
        .unwrap_or(EXIT_FAILURE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_errors_exit_with_two() {
        assert_eq!(
            AnalyzerError::path_resolution("test/nope", "missing").exit_code(),
            EXIT_USAGE
        );
        assert_eq!(
            AnalyzerError::InvalidArgument("--runs 0".into()).exit_code(),
            EXIT_USAGE
        );
        assert_eq!(AnalyzerError::Config("bad".into()).exit_code(), EXIT_USAGE);
    }

    #[test]
    fn test_subprocess_exit_code_is_propagated() {
        let err = AnalyzerError::Subprocess {
            command: "dart test".into(),
            code: Some(65),
            stderr: String::new(),
        };
        assert_eq!(err.exit_code(), 65);

        let killed = AnalyzerError::Subprocess {
            command: "dart test".into(),
            code: None,
            stderr: String::new(),
        };
        assert_eq!(killed.exit_code(), EXIT_FAILURE);
        assert!(killed.to_string().contains("terminated by signal"));
    }

    #[test]
    fn test_exit_code_survives_anyhow_context() {
        let err = anyhow::Error::new(AnalyzerError::path_resolution("lib/x", "no counterpart"))
            .context("Failed to analyze coverage");
        assert_eq!(exit_code_for(&err), EXIT_USAGE);

        let plain = anyhow::anyhow!("something else");
        assert_eq!(exit_code_for(&plain), EXIT_FAILURE);
    }
}
