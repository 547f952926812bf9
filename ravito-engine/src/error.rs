//! Engine error taxonomy.
//!
//! Every failure mode has a named variant. No stringly-typed errors.
//! The HTTP layer maps these onto status codes; the engine itself never
//! produces partial results alongside an error.

use thiserror::Error;

use crate::types::SessionKind;

#[derive(Debug, Error)]
pub enum EngineError {
    /// The input could not be read as a spreadsheet at all, or its layout
    /// does not match the declared kind.
    #[error("Malformed {kind} input: {reason}")]
    MalformedInput { kind: SessionKind, reason: String },

    /// The file parsed but zero rows survived the filtering rules.
    #[error("Empty {kind} input: {discarded} row(s) discarded, none retained")]
    EmptyInput { kind: SessionKind, discarded: usize },

    /// A calculation was requested without an active orders session.
    #[error("No active {0} session")]
    MissingInputs(SessionKind),

    /// A caller-supplied parameter is out of range or refers to nothing.
    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    /// Unexpected internal failure. Reads against the session store remain
    /// valid after this is returned.
    #[error("Internal failure: {0}")]
    Internal(String),
}

/// Result type alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

impl EngineError {
    /// Machine-readable kind token carried in structured error payloads.
    pub fn kind_token(&self) -> &'static str {
        match self {
            EngineError::MalformedInput { .. } => "malformed_input",
            EngineError::EmptyInput { .. } => "empty_input",
            EngineError::MissingInputs(_) => "missing_inputs",
            EngineError::InvalidParameter { .. } => "invalid_parameter",
            EngineError::Internal(_) => "internal_failure",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_kind() {
        let err = EngineError::EmptyInput {
            kind: SessionKind::Orders,
            discarded: 4,
        };
        assert!(err.to_string().contains("commandes"));
        assert!(err.to_string().contains('4'));
        assert_eq!(err.kind_token(), "empty_input");
    }

    #[test]
    fn kind_tokens_are_distinct() {
        let tokens = [
            EngineError::MalformedInput {
                kind: SessionKind::Stock,
                reason: "x".into(),
            }
            .kind_token(),
            EngineError::EmptyInput {
                kind: SessionKind::Stock,
                discarded: 0,
            }
            .kind_token(),
            EngineError::MissingInputs(SessionKind::Orders).kind_token(),
            EngineError::InvalidParameter {
                name: "days",
                reason: "x".into(),
            }
            .kind_token(),
            EngineError::Internal("x".into()).kind_token(),
        ];
        let mut dedup = tokens.to_vec();
        dedup.sort();
        dedup.dedup();
        assert_eq!(dedup.len(), tokens.len());
    }
}
