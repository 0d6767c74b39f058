//! Configuration for the in-memory store.

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use std::collections::HashMap;

/// Population settings: `populate.*` config keys.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PopulateConfig {
    /// Whether to create tables from the rows supplied in `tables` even if no
    /// entity was registered for them ahead of time.
    #[serde(default)]
    pub generate_tables: bool,
    /// Table name to initial row list, loaded verbatim on startup.
    #[serde(default)]
    pub tables: HashMap<String, Vec<Json>>,
    /// Opaque source descriptor (e.g. a fixture file path) — carried through
    /// without interpretation.
    #[serde(default)]
    pub source: Option<Json>,
}

/// Top-level configuration for the in-memory entity store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub populate: PopulateConfig,
}

impl StorageConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_populate(mut self, populate: PopulateConfig) -> Self {
        self.populate = populate;
        self
    }
}
