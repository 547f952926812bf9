//! Chat context snapshots.
//!
//! The LLM adapter never sees engine types. It sees a compact, JSON-safe
//! snapshot of the active sessions. Every timestamp is flattened to an
//! ISO-8601 string here, at the boundary, never inside the engine's own
//! types; nested collections hold only primitives.

use serde::{Deserialize, Serialize};

use ravito_engine::session::SessionStore;
use ravito_engine::types::SessionKind;

/// Snapshot of one active session.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionContext {
    /// Upload time as an ISO-8601 string.
    pub uploaded_at: String,
    pub file_name: String,
    pub record_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depots: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub articles: Option<Vec<String>>,
}

/// The full snapshot handed to the adapter. Absent kinds stay absent
/// rather than defaulting, so the adapter can tell "not uploaded" from
/// "uploaded empty".
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ChatContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commandes: Option<SessionContext>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stock: Option<SessionContext>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transit: Option<SessionContext>,
}

impl ChatContext {
    /// Capture the store's current active sessions.
    pub fn capture(store: &SessionStore) -> Self {
        let snapshot = |kind: SessionKind| {
            store.get_active(kind).map(|session| SessionContext {
                uploaded_at: session.uploaded_at.to_rfc3339(),
                file_name: session.file_name.clone(),
                record_count: session.records.len(),
                depots: non_empty(&session.summary.depots),
                articles: non_empty(&session.summary.articles),
            })
        };
        ChatContext {
            commandes: snapshot(SessionKind::Orders),
            stock: snapshot(SessionKind::Stock),
            transit: snapshot(SessionKind::Transit),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.commandes.is_none() && self.stock.is_none() && self.transit.is_none()
    }

    /// Text rendition of the snapshot for the LLM's context window.
    pub fn to_prompt(&self) -> String {
        if self.is_empty() {
            return "No data has been uploaded yet.".into();
        }
        let mut lines = vec!["[UPLOADED DATA]".to_string()];
        for (label, entry) in [
            ("orders", &self.commandes),
            ("central stock", &self.stock),
            ("transit", &self.transit),
        ] {
            if let Some(ctx) = entry {
                lines.push(format!(
                    "{label}: {} records from '{}' uploaded {}",
                    ctx.record_count, ctx.file_name, ctx.uploaded_at
                ));
                if let Some(depots) = &ctx.depots {
                    lines.push(format!("  depots: {}", depots.join(", ")));
                }
                if let Some(articles) = &ctx.articles {
                    lines.push(format!("  articles: {} distinct", articles.len()));
                }
            }
        }
        lines.join("\n")
    }
}

fn non_empty(values: &[String]) -> Option<Vec<String>> {
    if values.is_empty() {
        None
    } else {
        Some(values.to_vec())
    }
}
