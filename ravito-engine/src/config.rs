//! Depot-article configuration.
//!
//! Operators can restrict which articles a depot is allowed to receive.
//! The mapping is process-lifetime state like the session store: writers
//! replace the whole configuration atomically, readers take a copy at call
//! entry. When disabled (or empty) the calculator behaves as if no
//! configuration existed.

use std::collections::HashMap;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DepotConfiguration {
    pub enabled: bool,
    /// Depot code → allowed article codes.
    #[serde(default)]
    pub mapping: HashMap<String, Vec<String>>,
}

impl DepotConfiguration {
    /// Whether a (depot, article) pair passes the configuration.
    ///
    /// An enabled, non-empty mapping admits only listed pairs: a depot
    /// present in the mapping admits its listed articles, a depot absent
    /// from it admits nothing.
    pub fn allows(&self, depot: &str, article: &str) -> bool {
        if !self.enabled || self.mapping.is_empty() {
            return true;
        }
        match self.mapping.get(depot.trim()) {
            Some(articles) => articles.iter().any(|a| a.trim() == article.trim()),
            None => false,
        }
    }
}

/// Shared configuration cell.
#[derive(Debug, Default)]
pub struct ConfigStore {
    inner: RwLock<DepotConfiguration>,
}

impl ConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the current configuration.
    pub fn get(&self) -> DepotConfiguration {
        self.inner.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Replace the configuration atomically.
    pub fn set(&self, config: DepotConfiguration) {
        *self.inner.write().unwrap_or_else(|e| e.into_inner()) = config;
    }
}
