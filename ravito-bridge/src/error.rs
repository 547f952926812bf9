//! Bridge error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BridgeError {
    /// The adapter could not produce an answer.
    #[error("Chat adapter failure: {0}")]
    Adapter(String),

    /// The query was empty or otherwise unusable.
    #[error("Invalid chat query: {0}")]
    InvalidQuery(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for bridge operations.
pub type BridgeResult<T> = Result<T, BridgeError>;
