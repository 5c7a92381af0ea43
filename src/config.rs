//! Runtime settings and the collection catalog.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::dates::DateFilter;

/// Default per-request row cap enforced by the repository API.
pub const DEFAULT_PAGE_CAP: u64 = 5000;

/// Fixed lookup table mapping human-readable collection names to their
/// persistent identifiers, plus the designated PID that addresses the entire
/// repository. Injected from configuration; never mutated at runtime.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectionCatalog {
    collections: BTreeMap<String, String>,
    all_items_pid: String,
}

impl CollectionCatalog {
    pub fn new(collections: BTreeMap<String, String>, all_items_pid: impl Into<String>) -> Self {
        CollectionCatalog {
            collections,
            all_items_pid: all_items_pid.into(),
        }
    }

    /// The PID addressing the entire repository.
    pub fn all_items_pid(&self) -> &str {
        &self.all_items_pid
    }

    /// True when `pid` names a configured collection or the whole repository.
    pub fn is_known_pid(&self, pid: &str) -> bool {
        pid == self.all_items_pid || self.collections.values().any(|known| known == pid)
    }

    /// Display name for a PID, when one is configured.
    pub fn name_for(&self, pid: &str) -> Option<&str> {
        self.collections
            .iter()
            .find(|(_, known)| known.as_str() == pid)
            .map(|(name, _)| name.as_str())
    }

    /// Name/PID pairs in display order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.collections
            .iter()
            .map(|(name, pid)| (name.as_str(), pid.as_str()))
    }

    pub fn len(&self) -> usize {
        self.collections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }
}

/// Fully merged runtime settings for a query session.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Collection endpoint prefix; the PID is appended verbatim.
    pub base_url: String,
    /// Per-request row cap.
    pub page_cap: u64,
    /// Target field list for projection and CSV headers.
    pub fields: Vec<String>,
    /// Known collections.
    pub catalog: CollectionCatalog,
    /// Optional modified-date range applied to every request.
    pub date_filter: Option<DateFilter>,
}

impl Settings {
    pub fn trace_loaded(&self) {
        info!(
            base_url = %self.base_url,
            page_cap = self.page_cap,
            field_count = self.fields.len(),
            collection_count = self.catalog.len(),
            date_filtered = self.date_filter.is_some(),
            "Loaded settings"
        );
        debug!(?self, "Settings loaded (full debug)");
    }
}
