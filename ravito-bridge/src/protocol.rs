//! Chat protocol: the seam between the HTTP layer and whatever answers
//! natural-language questions about the uploaded data.
//!
//! The core guarantees only the shape and JSON-safety of what crosses this
//! boundary: a [`ChatContext`] snapshot plus the operator's query in, a
//! text reply out. The adapter behind the trait is a black box: a hosted
//! model, a local one, or the built-in offline fallback.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::context::ChatContext;
use crate::error::{BridgeError, BridgeResult};

#[derive(Clone, Debug, Deserialize)]
pub struct ChatRequest {
    pub query: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct ChatResponse {
    pub reply: String,
    /// Echo of the query, so transcripts are self-contained.
    pub query: String,
    /// The snapshot the adapter saw.
    pub context: ChatContext,
}

#[async_trait]
pub trait ChatAdapter: Send + Sync {
    /// Answer a query over the given snapshot.
    async fn answer(&self, context: &ChatContext, query: &str) -> BridgeResult<String>;
}

/// Validate a request and run it through the adapter.
pub async fn chat(
    adapter: &dyn ChatAdapter,
    context: ChatContext,
    request: ChatRequest,
) -> BridgeResult<ChatResponse> {
    let query = request.query.trim();
    if query.is_empty() {
        return Err(BridgeError::InvalidQuery("query must not be empty".into()));
    }
    let reply = adapter.answer(&context, query).await?;
    Ok(ChatResponse {
        reply,
        query: query.to_string(),
        context,
    })
}

/// Fallback adapter used when no LLM is configured: answers from the
/// snapshot alone, deterministically.
pub struct OfflineAdapter;

#[async_trait]
impl ChatAdapter for OfflineAdapter {
    async fn answer(&self, context: &ChatContext, _query: &str) -> BridgeResult<String> {
        if context.is_empty() {
            return Ok(
                "No data has been uploaded yet. Upload the orders, stock, and transit \
                 files first."
                    .into(),
            );
        }
        Ok(format!(
            "No language model is configured; here is the current data instead.\n{}",
            context.to_prompt()
        ))
    }
}
