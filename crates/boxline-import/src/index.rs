//! Normalized identifier → resource lookup, built once per run.

use std::collections::HashMap;

use boxline_store::{RecordId, RecordStore, RepoId, StoreResult};

use crate::normalize::normalize_identifier;

/// Where a resource lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceRef {
    pub id: RecordId,
    pub repo_id: RepoId,
}

#[derive(Debug, Clone, Default)]
pub struct ResourceIndex {
    by_key: HashMap<String, ResourceRef>,
}

impl ResourceIndex {
    /// Scan every resource once. Later duplicates of a key replace earlier ones.
    pub fn build(store: &dyn RecordStore) -> StoreResult<Self> {
        let mut by_key = HashMap::new();
        for summary in store.resource_summaries()? {
            let joined = summary.joined_identifier();
            if joined.is_empty() {
                tracing::debug!(resource_id = summary.id, "resource has no identifier");
                continue;
            }
            let key = normalize_identifier(&joined);
            by_key.insert(
                key,
                ResourceRef {
                    id: summary.id,
                    repo_id: summary.repo_id,
                },
            );
        }
        tracing::debug!(resources = by_key.len(), "built resource index");
        Ok(Self { by_key })
    }

    /// Resolve a raw spreadsheet identifier.
    pub fn resolve(&self, raw: &str) -> Option<ResourceRef> {
        self.get(&normalize_identifier(raw))
    }

    /// Look up an already-normalized key.
    pub fn get(&self, key: &str) -> Option<ResourceRef> {
        self.by_key.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    /// Entries sorted by key.
    pub fn entries(&self) -> Vec<(&str, ResourceRef)> {
        let mut entries: Vec<_> = self
            .by_key
            .iter()
            .map(|(k, v)| (k.as_str(), *v))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries
    }
}
