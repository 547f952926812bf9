//! HTTP error mapping.
//!
//! Engine and bridge errors carry their own taxonomy; this layer only
//! assigns status codes and renders the structured body
//! `{error, kind, discarded?}`. All errors are terminal for the request.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use ravito_bridge::BridgeError;
use ravito_engine::EngineError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Bridge(#[from] BridgeError),

    /// The multipart upload itself was unusable (no file part, read error).
    #[error("Upload error: {0}")]
    Upload(String),

    /// Export rendering failed.
    #[error("Export error: {0}")]
    Export(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    discarded: Option<usize>,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Engine(EngineError::MalformedInput { .. }) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Engine(EngineError::EmptyInput { .. })
            | ApiError::Engine(EngineError::MissingInputs(_))
            | ApiError::Engine(EngineError::InvalidParameter { .. }) => StatusCode::BAD_REQUEST,
            ApiError::Engine(EngineError::Internal(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Bridge(BridgeError::InvalidQuery(_)) => StatusCode::BAD_REQUEST,
            ApiError::Bridge(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Upload(_) => StatusCode::BAD_REQUEST,
            ApiError::Export(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ApiError::Engine(e) => e.kind_token(),
            ApiError::Bridge(BridgeError::InvalidQuery(_)) => "invalid_parameter",
            ApiError::Bridge(_) => "internal_failure",
            ApiError::Upload(_) => "malformed_input",
            ApiError::Export(_) => "internal_failure",
        }
    }

    fn discarded(&self) -> Option<usize> {
        match self {
            ApiError::Engine(EngineError::EmptyInput { discarded, .. }) => Some(*discarded),
            _ => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.to_string(),
            kind: self.kind(),
            discarded: self.discarded(),
        };
        (self.status(), Json(body)).into_response()
    }
}
