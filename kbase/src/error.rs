//! Unified error handling for the kbase library
//!
//! Every store, codec and engine operation returns [`Result`]. The tool layer
//! is the only place where errors are flattened into text, so the variants
//! here stay precise for library callers and tests.

use std::fmt;
use std::io;
use thiserror::Error;

/// The main error type for the kbase library
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum KbError {
    /// No document exists at the path
    #[error("Document not found: {path}")]
    NotFound {
        /// Relative document path
        path: String,
    },

    /// The write precondition did not match the backend's current revision
    #[error("Write conflict on {path}: expected revision {expected}, found {actual}")]
    Conflict {
        /// Relative document path
        path: String,
        /// Revision the writer expected (`<absent>` for creates)
        expected: String,
        /// Revision the backend holds (`<absent>` if the document is gone)
        actual: String,
    },

    /// Missing or rejected credential
    #[error("Authentication failed: {0}")]
    AuthError(String),

    /// Codec failed to decode a document
    #[error("Malformed document {path}: {reason}")]
    Malformed {
        /// Relative document path, or `<inline>` for detached text
        path: String,
        /// What the decoder tripped over
        reason: String,
    },

    /// Create when the identifier already exists
    #[error("{kind} '{id}' already exists")]
    Duplicate {
        /// Record kind or document type
        kind: String,
        /// Offending identifier
        id: String,
    },

    /// Caller-supplied identifier not found for an update, delete or move
    #[error("{kind} '{id}' not found in {path}")]
    ValidationGap {
        /// Record kind
        kind: String,
        /// Identifier that was looked up
        id: String,
        /// Collection document that was searched
        path: String,
    },

    /// A patch tried to clear a required field or produced an invalid record
    #[error("Invalid patch for field '{field}': {reason}")]
    InvalidPatch {
        /// Field name
        field: String,
        /// Why the patch was rejected
        reason: String,
    },

    /// Tool arguments did not match the tool's schema
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// Path is empty, absolute or escapes the document root
    #[error("Invalid document path '{path}': {reason}")]
    InvalidPath {
        /// The rejected path
        path: String,
        /// Why it was rejected
        reason: String,
    },

    /// The backend does not offer this capability
    #[error("Operation '{operation}' is not supported by the {backend} backend")]
    Unsupported {
        /// Capability that was requested
        operation: String,
        /// Backend name
        backend: String,
    },

    /// A move removed the record from its source but could not write it to
    /// the destination. `record` holds the JSON needed to restore it by hand.
    #[error("Move of '{id}' from {from} to {to} left the record in neither collection: {reason}. Record: {record}")]
    PartialMove {
        /// Identifier being moved
        id: String,
        /// Source collection path
        from: String,
        /// Destination collection path
        to: String,
        /// Failure reported by the destination write
        reason: String,
        /// Serialized record
        record: String,
    },

    /// The remote content API answered with an unexpected status
    #[error("Remote backend error ({status}): {message}")]
    Remote {
        /// HTTP status code, 0 when the request never completed
        status: u16,
        /// Response body or transport error text
        message: String,
    },

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO operation failed
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Generic error with context
    #[error("{message}")]
    Context {
        /// Context message
        message: String,
        /// Underlying error
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl KbError {
    /// Shorthand for [`KbError::NotFound`]
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound { path: path.into() }
    }

    /// Shorthand for [`KbError::Malformed`]
    pub fn malformed(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Malformed {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand for [`KbError::Duplicate`]
    pub fn duplicate(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self::Duplicate {
            kind: kind.into(),
            id: id.into(),
        }
    }

    /// Shorthand for [`KbError::ValidationGap`]
    pub fn validation_gap(
        kind: impl Into<String>,
        id: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self::ValidationGap {
            kind: kind.into(),
            id: id.into(),
            path: path.into(),
        }
    }

    /// Shorthand for [`KbError::InvalidPatch`]
    pub fn invalid_patch(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPatch {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// True for [`KbError::NotFound`]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// True for [`KbError::Conflict`]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

/// Result type alias for kbase operations
pub type Result<T> = std::result::Result<T, KbError>;

/// Extension trait for adding context to errors
pub trait ErrorContext<T> {
    /// Add context to an error
    fn context<S: Into<String>>(self, msg: S) -> Result<T>;

    /// Add context with a closure that's only called on error
    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context<S: Into<String>>(self, msg: S) -> Result<T> {
        self.map_err(|e| KbError::Context {
            message: msg.into(),
            source: Box::new(e),
        })
    }

    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|e| KbError::Context {
            message: f().into(),
            source: Box::new(e),
        })
    }
}

/// Error chain formatter for detailed error reporting
pub struct ErrorChain<'a>(&'a dyn std::error::Error);

impl<'a> fmt::Display for ErrorChain<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)?;

        let mut current = self.0.source();
        let mut level = 1;

        while let Some(err) = current {
            write!(f, "\n{:indent$}Caused by: {}", "", err, indent = level * 2)?;
            current = err.source();
            level += 1;
        }

        Ok(())
    }
}

/// Extension trait for error types to format the full error chain
pub trait ErrorChainExt {
    /// Format the full error chain
    fn error_chain(&self) -> ErrorChain<'_>;
}

impl<E: std::error::Error> ErrorChainExt for E {
    fn error_chain(&self) -> ErrorChain<'_> {
        ErrorChain(self)
    }
}
