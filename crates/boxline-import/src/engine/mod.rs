//! The import pass.
//!
//! ```text
//! rows ─► admission (index + normalizer) ─► PlacementPolicy::accept ─┐
//!                │                                                  │
//!                └─► complaint                   PlacementPolicy::flush
//!                                                                   │
//!                                       RecordStore writes ◄────────┘
//! ```
//!
//! The driver is shared; what a row turns into is decided by the policy:
//! [`BatchPolicy`] groups rows per (resource, series) and writes each group
//! once, [`IncrementalPolicy`] writes every row as it arrives.
//!
//! Processing is strictly sequential. Later rows rely on observing the
//! writes of earlier ones through the [`RecordCache`].

mod batch;
mod incremental;

pub use batch::BatchPolicy;
pub use incremental::IncrementalPolicy;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::hash::Hash;

use boxline_store::{RecordId, RecordStore, RepoId, RequestContext};

use crate::cache::RecordCache;
use crate::config::ImportMode;
use crate::error::Result;
use crate::index::ResourceIndex;
use crate::matcher::HierarchyMatcher;
use crate::report::Reporter;
use crate::rows::{ImportRow, RawRow, RowRejection};

// ============================================================================
// Summary
// ============================================================================

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub rows_read: usize,
    pub skipped_unresolved: usize,
    pub skipped_missing_fields: usize,
    pub series_created: usize,
    pub barcodes_updated: usize,
    pub update_failures: usize,
    pub series_containers_added: usize,
    pub resource_containers_added: usize,
}

impl ImportSummary {
    pub fn rows_skipped(&self) -> usize {
        self.skipped_unresolved + self.skipped_missing_fields
    }
}

impl std::fmt::Display for ImportSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "rows {} (skipped {}: {} unresolved, {} missing box/barcode), series created {}, \
             barcodes updated {} ({} failed), containers added {} to series / {} to resources",
            self.rows_read,
            self.rows_skipped(),
            self.skipped_unresolved,
            self.skipped_missing_fields,
            self.series_created,
            self.barcodes_updated,
            self.update_failures,
            self.series_containers_added,
            self.resource_containers_added,
        )
    }
}

// ============================================================================
// Session
// ============================================================================

/// Mutable state shared by the driver and the active policy for one run.
pub struct ImportSession<'a> {
    pub(crate) store: &'a dyn RecordStore,
    pub(crate) cache: RecordCache,
    pub(crate) reporter: &'a mut dyn Reporter,
    pub(crate) summary: ImportSummary,
    username: String,
}

impl<'a> ImportSession<'a> {
    fn new(store: &'a dyn RecordStore, reporter: &'a mut dyn Reporter, username: &str) -> Self {
        Self {
            store,
            cache: RecordCache::new(),
            reporter,
            summary: ImportSummary::default(),
            username: username.to_string(),
        }
    }

    pub(crate) fn context(&self, repo_id: RepoId) -> RequestContext {
        RequestContext::new(repo_id, self.username.as_str())
    }

    pub(crate) fn matcher(&self) -> HierarchyMatcher<'a> {
        HierarchyMatcher::new(self.store)
    }

    pub(crate) fn report(&mut self, msg: impl AsRef<str>) {
        self.reporter.report(msg.as_ref());
    }

    pub(crate) fn complain(&mut self, msg: impl AsRef<str>) {
        self.reporter.complain(msg.as_ref());
    }

    pub fn summary(&self) -> &ImportSummary {
        &self.summary
    }
}

pub(crate) fn timestamp() -> String {
    Utc::now().to_rfc3339()
}

// ============================================================================
// Placement policy
// ============================================================================

/// Turns admitted rows into store writes.
pub trait PlacementPolicy {
    fn mode(&self) -> ImportMode;

    /// Take one admitted row. May write immediately or defer.
    fn accept(&mut self, session: &mut ImportSession<'_>, row: ImportRow) -> Result<()>;

    /// Write anything deferred. Called once after the last row.
    fn flush(&mut self, session: &mut ImportSession<'_>) -> Result<()>;
}

pub fn policy_for(mode: ImportMode) -> Box<dyn PlacementPolicy> {
    match mode {
        ImportMode::Batch => Box::new(BatchPolicy::new()),
        ImportMode::Incremental => Box::new(IncrementalPolicy::new()),
    }
}

// ============================================================================
// Insertion-ordered groups
// ============================================================================

/// Groups keyed for lookup but iterated in first-seen order.
pub(crate) struct GroupTable<K, V> {
    positions: HashMap<K, usize>,
    groups: Vec<V>,
}

impl<K, V> Default for GroupTable<K, V> {
    fn default() -> Self {
        Self {
            positions: HashMap::new(),
            groups: Vec::new(),
        }
    }
}

impl<K: Hash + Eq, V> GroupTable<K, V> {
    pub(crate) fn get_or_insert_with(&mut self, key: K, init: impl FnOnce() -> V) -> &mut V {
        let idx = match self.positions.get(&key) {
            Some(&idx) => idx,
            None => {
                self.groups.push(init());
                let idx = self.groups.len() - 1;
                self.positions.insert(key, idx);
                idx
            }
        };
        &mut self.groups[idx]
    }

    pub(crate) fn len(&self) -> usize {
        self.groups.len()
    }

    pub(crate) fn into_groups(self) -> Vec<V> {
        self.groups
    }
}

// ============================================================================
// Engine
// ============================================================================

pub struct ImportEngine<'a> {
    store: &'a dyn RecordStore,
    index: ResourceIndex,
    username: String,
}

impl<'a> ImportEngine<'a> {
    /// Bind to a store and build the resource index.
    pub fn new(store: &'a dyn RecordStore, username: impl Into<String>) -> Result<Self> {
        let index = ResourceIndex::build(store)?;
        Ok(Self {
            store,
            index,
            username: username.into(),
        })
    }

    pub fn index(&self) -> &ResourceIndex {
        &self.index
    }

    /// One forward pass over `rows`.
    ///
    /// Skipped rows are complained about and never abort the run. Store
    /// failures the policy does not trap end the run with an error; writes
    /// made before the failure stay in place.
    pub fn run<I>(
        &self,
        rows: I,
        policy: &mut dyn PlacementPolicy,
        reporter: &mut dyn Reporter,
    ) -> Result<ImportSummary>
    where
        I: IntoIterator<Item = RawRow>,
    {
        let mut session = ImportSession::new(self.store, reporter, &self.username);
        session.report(format!("# Import start: {}", timestamp()));
        session.report("-----");

        let outcome = self.drive(&mut session, rows, policy);
        match outcome {
            Ok(()) => {
                let summary = session.summary.clone();
                session.report(format!("Summary: {summary}"));
                session.report(format!("# Import done: {}", timestamp()));
                session.report("-----");
                session.reporter.finish();
                tracing::info!(mode = policy.mode().as_str(), %summary, "import finished");
                Ok(summary)
            }
            Err(err) => {
                session.complain(format!("Import aborted: {err}"));
                session.report(format!("# Import aborted: {}", timestamp()));
                session.reporter.finish();
                tracing::error!(error = %err, "import aborted");
                Err(err)
            }
        }
    }

    fn drive<I>(
        &self,
        session: &mut ImportSession<'_>,
        rows: I,
        policy: &mut dyn PlacementPolicy,
    ) -> Result<()>
    where
        I: IntoIterator<Item = RawRow>,
    {
        for (offset, raw) in rows.into_iter().enumerate() {
            let row_number = offset + 1;
            session.summary.rows_read += 1;

            let row = match ImportRow::prepare(raw, row_number, &self.index) {
                Ok(row) => row,
                Err(rejection) => {
                    match rejection {
                        RowRejection::UnresolvedResource { .. } => {
                            session.summary.skipped_unresolved += 1
                        }
                        RowRejection::MissingBoxOrBarcode { .. } => {
                            session.summary.skipped_missing_fields += 1
                        }
                    }
                    tracing::debug!(row = row_number, reason = %rejection, "row skipped");
                    session.complain(rejection.to_string());
                    continue;
                }
            };

            session.report(format!("Preparing row {row_number} data: {}", row.describe()));
            let ctx = session.context(row.target.repo_id);
            ctx.scope(|_| policy.accept(session, row))?;
            session.report("-----");
        }

        policy.flush(session)
    }
}

/// Resource id + series label identifying a series group.
pub(crate) type SeriesKey = (RecordId, String);

// ============================================================================
// Entry points
// ============================================================================

/// Run an import over already-decoded rows.
///
/// This is what a host calls once its own store is ready.
pub fn run_import<I>(
    store: &dyn RecordStore,
    mode: ImportMode,
    username: &str,
    rows: I,
    reporter: &mut dyn Reporter,
) -> Result<ImportSummary>
where
    I: IntoIterator<Item = RawRow>,
{
    let engine = ImportEngine::new(store, username)?;
    let mut policy = policy_for(mode);
    engine.run(rows, policy.as_mut(), reporter)
}
