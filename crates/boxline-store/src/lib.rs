//! Boxline Record Store Gateway
//!
//! Read/write access to hierarchical archival records:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        RECORD STORE                          │
//! ├──────────────────────────────────────────────────────────────┤
//! │                                                              │
//! │   Resource (root_id)                                         │
//! │     ├── ArchivalObject  parent_id = none   ("Series 4.")     │
//! │     │     ├── ArchivalObject  parent_id = series             │
//! │     │     │     └── Instance ─► Container { box 12, 007 }    │
//! │     │     └── ...                                            │
//! │     └── Instance ─► Container                                │
//! │                                                              │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Key Features
//!
//! - **Scoped writes**: every mutation runs under a [`RequestContext`]
//!   naming the repository and acting user
//! - **Optimistic locking**: updates carry the `lock_version` they were
//!   fetched at; stale writes are rejected
//! - **Validated payloads**: records are checked before they land
//! - **Two backends**: [`MemoryStore`] and the file-backed [`SnapshotStore`]

pub mod error;
pub mod memory;
pub mod model;
pub mod snapshot;

#[cfg(test)]
mod tests;

pub use error::{RecordKind, StoreError};
pub use memory::{MemoryStore, StoreSnapshot};
pub use model::{
    ArchivalObject, ComponentSummary, Container, ContainerLocation, Instance, NewArchivalObject,
    RecordId, RepoId, Resource, ResourceSummary,
};
pub use snapshot::{JournalEntry, Mutation, SnapshotStore};

pub type StoreResult<T> = Result<T, StoreError>;

// ============================================================================
// Request context
// ============================================================================

/// Repository and actor identity for a block of store writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub repo_id: RepoId,
    pub username: String,
}

impl RequestContext {
    pub fn new(repo_id: RepoId, username: impl Into<String>) -> Self {
        Self {
            repo_id,
            username: username.into(),
        }
    }

    /// Run `f` inside a tracing span carrying this context.
    pub fn scope<T>(&self, f: impl FnOnce(&RequestContext) -> T) -> T {
        let span = tracing::debug_span!(
            "request_context",
            repo_id = self.repo_id,
            user = %self.username
        );
        let _entered = span.enter();
        f(self)
    }
}

// ============================================================================
// Gateway trait
// ============================================================================

/// Query and mutation surface over resources and archival objects.
///
/// Scans return records in the store's iteration order. Callers must not
/// assume anything stronger than "stable for an unchanged store".
pub trait RecordStore {
    /// Every resource's id, repository and serialized identifier.
    fn resource_summaries(&self) -> StoreResult<Vec<ResourceSummary>>;

    /// Top-level components (no parent) of a resource.
    fn top_level_components(
        &self,
        repo_id: RepoId,
        resource_id: RecordId,
    ) -> StoreResult<Vec<ComponentSummary>>;

    /// Ids of the direct children of `parent_id` within a resource.
    fn child_ids(
        &self,
        parent_id: RecordId,
        repo_id: RepoId,
        resource_id: RecordId,
    ) -> StoreResult<Vec<RecordId>>;

    fn get_resource(&self, id: RecordId) -> StoreResult<Resource>;

    fn get_archival_object(&self, id: RecordId) -> StoreResult<ArchivalObject>;

    /// Create a component; returns the new id.
    fn create_archival_object(
        &self,
        ctx: &RequestContext,
        payload: NewArchivalObject,
    ) -> StoreResult<RecordId>;

    /// Replace a component. Returns the new lock version.
    fn update_archival_object(
        &self,
        ctx: &RequestContext,
        record: &ArchivalObject,
    ) -> StoreResult<u32>;

    /// Replace a resource. Returns the new lock version.
    fn update_resource(&self, ctx: &RequestContext, record: &Resource) -> StoreResult<u32>;
}
