//! In-memory session store.
//!
//! One active session per upload kind, atomically superseded by the next
//! upload of that kind. Sessions are immutable after creation: writers
//! publish a fresh `Arc<Session>`, readers capture the reference at call
//! entry and keep a consistent snapshot for the whole calculation even if
//! an upload lands mid-flight. Nothing survives process teardown.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::types::{Records, SessionKind, Summary};

/// One uploaded file's normalized records plus metadata.
#[derive(Debug, Serialize)]
pub struct Session {
    /// Opaque id, unique for the process lifetime.
    pub id: String,
    pub kind: SessionKind,
    pub file_name: String,
    pub uploaded_at: DateTime<Utc>,
    pub records: Records,
    pub summary: Summary,
}

/// Listing entry for `/api/sessions`.
#[derive(Clone, Debug, Serialize)]
pub struct SessionHeader {
    pub id: String,
    pub kind: SessionKind,
    pub file_name: String,
    pub uploaded_at: DateTime<Utc>,
    pub record_count: usize,
}

/// The only shared mutable state in the engine.
#[derive(Debug, Default)]
pub struct SessionStore {
    inner: RwLock<HashMap<SessionKind, Arc<Session>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a new active session for the records' kind, superseding any
    /// prior one. Returns the new session id.
    pub fn put(&self, records: Records, file_name: &str, summary: Summary) -> String {
        let session = Arc::new(Session {
            id: Uuid::new_v4().to_string(),
            kind: records.kind(),
            file_name: file_name.to_string(),
            uploaded_at: Utc::now(),
            records,
            summary,
        });
        let id = session.id.clone();
        let mut map = self.inner.write().unwrap_or_else(|e| e.into_inner());
        map.insert(session.kind, session);
        id
    }

    /// Snapshot of the active session for a kind, if any.
    pub fn get_active(&self, kind: SessionKind) -> Option<Arc<Session>> {
        let map = self.inner.read().unwrap_or_else(|e| e.into_inner());
        map.get(&kind).cloned()
    }

    /// Headers of all active sessions, in fixed kind order.
    pub fn list(&self) -> Vec<SessionHeader> {
        let map = self.inner.read().unwrap_or_else(|e| e.into_inner());
        [SessionKind::Orders, SessionKind::Stock, SessionKind::Transit]
            .iter()
            .filter_map(|kind| map.get(kind))
            .map(|s| SessionHeader {
                id: s.id.clone(),
                kind: s.kind,
                file_name: s.file_name.clone(),
                uploaded_at: s.uploaded_at,
                record_count: s.records.len(),
            })
            .collect()
    }
}
