use thiserror::Error;

use crate::types::ChunkId;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unsupported file type: {0:?}")]
    UnsupportedFileType(String),

    #[error("File too large: {size} bytes (limit {limit})")]
    FileTooLarge { size: u64, limit: u64 },

    #[error("Failed to load document: {0}")]
    Load(String),

    #[error("Document produced no chunks: {0}")]
    EmptyDocument(String),

    #[error("Embedding failed: {0}")]
    Embedding(String),

    #[error("Arity mismatch: {left} ids vs {right} items")]
    ArityMismatch { left: usize, right: usize },

    #[error("Duplicate id: {0}")]
    DuplicateId(ChunkId),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Not found: {0}")]
    NotFound(ChunkId),

    #[error("Persistence failed: {0}")]
    Persistence(String),

    #[error("Operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Errors caused by the caller's input. Boundary layers map these to
    /// HTTP 400; everything else is a server-side fault.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidConfig(_)
                | Error::UnsupportedFileType(_)
                | Error::FileTooLarge { .. }
                | Error::Load(_)
                | Error::EmptyDocument(_)
        )
    }

    /// Index/store disagreements. Seeing one of these means the coordinator
    /// has a bug.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            Error::ArityMismatch { .. }
                | Error::DuplicateId(_)
                | Error::DimensionMismatch { .. }
                | Error::NotFound(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
