//! Error taxonomy for the memory core.
//!
//! Every public `Manager` method returns [`Result<T>`]. Mutating operations
//! are all-or-nothing: on any error, both the in-memory tiers and the
//! backend's durable state are left exactly as they were before the call.

use thiserror::Error;

/// Which external collaborator a boundary failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExternalService {
    Embed,
    ConceptExtract,
    Llm,
    Backend,
}

impl std::fmt::Display for ExternalService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ExternalService::Embed => "embed",
            ExternalService::ConceptExtract => "extract_concepts",
            ExternalService::Llm => "llm",
            ExternalService::Backend => "backend",
        };
        write!(f, "{s}")
    }
}

/// Crate-wide error type.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum MemoryError {
    /// An embedding's length did not equal the configured dimension after
    /// [`crate::vector::standardize`] was applied (or was bypassed under
    /// `strict_dimension`). Reaching this in normal operation indicates a
    /// bug — standardization is supposed to be the only coercion path.
    #[error("embedding has {actual} dimensions, expected {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// `embed_fn`, `extract_concepts_fn`, `llm_fn`, or backend I/O failed.
    #[error("external service '{which}' failed: {message}")]
    ExternalServiceError {
        which: ExternalService,
        message: String,
    },

    /// An external call exceeded `external_call_timeout_ms`.
    #[error("external service '{which}' timed out")]
    Timeout { which: ExternalService },

    /// The storage backend reported a durable-write failure. The in-memory
    /// change that triggered the write has already been rolled back by the
    /// time this is returned to the caller.
    #[error("storage error: {0}")]
    StorageError(String),

    /// Operation invoked after [`crate::manager::Manager::dispose`].
    #[error("manager has been disposed")]
    Disposed,

    /// A caller-supplied argument violated its documented contract
    /// (e.g. `threshold` outside `[0, 100]`, `limit == 0` where the
    /// operation requires `limit >= 1`, ranking weights not summing to 1).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

pub type Result<T> = std::result::Result<T, MemoryError>;

impl From<rusqlite::Error> for MemoryError {
    fn from(err: rusqlite::Error) -> Self {
        MemoryError::StorageError(err.to_string())
    }
}

impl From<std::io::Error> for MemoryError {
    fn from(err: std::io::Error) -> Self {
        MemoryError::StorageError(err.to_string())
    }
}

impl From<serde_json::Error> for MemoryError {
    fn from(err: serde_json::Error) -> Self {
        MemoryError::StorageError(err.to_string())
    }
}
