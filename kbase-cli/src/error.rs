//! Error handling for the kbase CLI
//!
//! Errors carry the exit code the process should end with, and keep their
//! source so the full chain can be printed.

use crate::exit_codes::{EXIT_SUCCESS, EXIT_TOOL_ERROR, EXIT_USAGE_ERROR};
use std::error::Error;
use std::fmt;

/// CLI-specific result type that preserves error information
pub type CliResult<T> = Result<T, CliError>;

/// CLI error type that includes both error information and suggested exit code
#[derive(Debug)]
pub struct CliError {
    pub message: String,
    pub exit_code: i32,
    pub source: Option<Box<dyn Error + Send + Sync>>,
}

impl CliError {
    /// Create a new CLI error with a message and exit code
    pub fn new(message: impl Into<String>, exit_code: i32) -> Self {
        Self {
            message: message.into(),
            exit_code,
            source: None,
        }
    }

    /// Create a CLI error from another error with a specific exit code
    pub fn from_error<E: Error + Send + Sync + 'static>(error: E, exit_code: i32) -> Self {
        Self {
            message: error.to_string(),
            exit_code,
            source: Some(Box::new(error)),
        }
    }

    /// A tool ran and failed
    pub fn tool(message: impl Into<String>) -> Self {
        Self::new(message, EXIT_TOOL_ERROR)
    }

    /// Bad invocation or configuration
    pub fn usage(message: impl Into<String>) -> Self {
        Self::new(message, EXIT_USAGE_ERROR)
    }

    /// Get the full error chain as a formatted string
    pub fn full_chain(&self) -> String {
        let mut result = self.message.clone();

        let mut current_source = self.source.as_deref().and_then(|e| e.source());
        while let Some(err) = current_source {
            result.push_str(&format!("\n  Caused by: {err}"));
            current_source = err.source();
        }

        result
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for CliError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn Error + 'static))
    }
}

/// Extension trait for converting results to CLI results
pub trait IntoCliResult<T> {
    fn cli_tool_error(self) -> CliResult<T>;
    fn cli_usage_error(self) -> CliResult<T>;
}

impl<T, E: Error + Send + Sync + 'static> IntoCliResult<T> for Result<T, E> {
    fn cli_tool_error(self) -> CliResult<T> {
        self.map_err(|e| CliError::from_error(e, EXIT_TOOL_ERROR))
    }

    fn cli_usage_error(self) -> CliResult<T> {
        self.map_err(|e| CliError::from_error(e, EXIT_USAGE_ERROR))
    }
}

/// Convert a CliResult to an exit code, printing the full error chain if needed
pub fn handle_cli_result<T>(result: CliResult<T>) -> i32 {
    match result {
        Ok(_) => EXIT_SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e.full_chain());
            e.exit_code
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kbase::KbError;

    #[test]
    fn test_usage_error_code() {
        let err: CliResult<()> = Err(KbError::Config("bad".to_string())).cli_usage_error();
        assert_eq!(handle_cli_result(err), EXIT_USAGE_ERROR);
    }

    #[test]
    fn test_full_chain_includes_causes() {
        let inner = KbError::Context {
            message: "loading config".to_string(),
            source: Box::new(KbError::Config("unknown backend".to_string())),
        };
        let err = CliError::from_error(inner, EXIT_USAGE_ERROR);
        let chain = err.full_chain();
        assert!(chain.starts_with("loading config"));
        assert!(chain.contains("Caused by: Configuration error: unknown backend"));
    }

    #[test]
    fn test_ok_is_success() {
        assert_eq!(handle_cli_result(Ok(())), EXIT_SUCCESS);
    }
}
