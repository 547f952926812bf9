//! The boundary between the planning engine and the LLM chat surface.
//!
//! The engine holds typed sessions with real timestamps; language models
//! consume JSON text. This crate owns the conversion (context snapshots
//! with stringified timestamps) and the adapter trait the transport layer
//! plugs a model into. Nothing engine-side depends on it.

pub mod context;
pub mod error;
pub mod protocol;

pub use context::{ChatContext, SessionContext};
pub use error::{BridgeError, BridgeResult};
pub use protocol::{chat, ChatAdapter, ChatRequest, ChatResponse, OfflineAdapter};
