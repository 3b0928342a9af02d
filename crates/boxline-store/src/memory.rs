//! In-memory record store.
//!
//! Records live in id-ordered maps behind a single lock, so scans iterate in
//! ascending id order. Fetch counters and one-shot failure injection make the
//! store usable as a test double for callers that cache records.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::error::{RecordKind, StoreError};
use crate::model::{
    ArchivalObject, ComponentSummary, Instance, NewArchivalObject, RecordId, RepoId, Resource,
    ResourceSummary,
};
use crate::{RecordStore, RequestContext, StoreResult};

/// Serializable contents of a store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    #[serde(default)]
    pub resources: Vec<Resource>,
    #[serde(default)]
    pub archival_objects: Vec<ArchivalObject>,
}

#[derive(Debug, Default)]
struct State {
    next_id: RecordId,
    resources: BTreeMap<RecordId, Resource>,
    archival_objects: BTreeMap<RecordId, ArchivalObject>,
    fetches: HashMap<(RecordKind, RecordId), usize>,
    injected_failures: HashMap<RecordId, String>,
}

impl State {
    fn allocate_id(&mut self) -> RecordId {
        self.next_id += 1;
        self.next_id
    }

    fn take_injected(&mut self, id: RecordId) -> StoreResult<()> {
        match self.injected_failures.remove(&id) {
            Some(message) => Err(StoreError::Injected(message)),
            None => Ok(()),
        }
    }
}

fn check_context(
    ctx: &RequestContext,
    kind: RecordKind,
    id: RecordId,
    record_repo: RepoId,
) -> StoreResult<()> {
    if ctx.repo_id != record_repo {
        return Err(StoreError::ContextMismatch {
            kind,
            id,
            record_repo,
            context_repo: ctx.repo_id,
        });
    }
    Ok(())
}

fn check_lock(kind: RecordKind, id: RecordId, submitted: u32, current: u32) -> StoreResult<()> {
    if submitted != current {
        return Err(StoreError::Conflict {
            kind,
            id,
            submitted,
            current,
        });
    }
    Ok(())
}

pub struct MemoryStore {
    state: RwLock<State>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(State::default()),
        }
    }

    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        let mut state = State::default();
        for resource in snapshot.resources {
            state.next_id = state.next_id.max(resource.id);
            state.resources.insert(resource.id, resource);
        }
        for ao in snapshot.archival_objects {
            state.next_id = state.next_id.max(ao.id);
            state.archival_objects.insert(ao.id, ao);
        }
        Self {
            state: RwLock::new(state),
        }
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        let state = self.state.read();
        StoreSnapshot {
            resources: state.resources.values().cloned().collect(),
            archival_objects: state.archival_objects.values().cloned().collect(),
        }
    }

    // ========================================================================
    // Seeding
    // ========================================================================

    /// Insert a resource directly, bypassing request context. Returns its id.
    pub fn insert_resource(
        &self,
        repo_id: RepoId,
        identifier: &[&str],
        title: &str,
        instances: Vec<Instance>,
    ) -> RecordId {
        let mut state = self.state.write();
        let id = state.allocate_id();
        state.resources.insert(
            id,
            Resource {
                id,
                repo_id,
                identifier: identifier.iter().map(|p| Some(p.to_string())).collect(),
                title: title.to_string(),
                instances,
                lock_version: 0,
            },
        );
        id
    }

    /// Insert a component directly under the resource's repository.
    pub fn insert_archival_object(&self, payload: NewArchivalObject) -> StoreResult<RecordId> {
        let repo_id = {
            let state = self.state.read();
            state
                .resources
                .get(&payload.resource_id)
                .map(|r| r.repo_id)
                .ok_or(StoreError::NotFound {
                    kind: RecordKind::Resource,
                    id: payload.resource_id,
                })?
        };
        self.create_archival_object(&RequestContext::new(repo_id, "seed"), payload)
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    /// How many times a record has been fetched through the gateway.
    pub fn fetch_count(&self, kind: RecordKind, id: RecordId) -> usize {
        self.state
            .read()
            .fetches
            .get(&(kind, id))
            .copied()
            .unwrap_or(0)
    }

    /// Make the next update of record `id` fail with `message`.
    pub fn fail_next_update(&self, id: RecordId, message: impl Into<String>) {
        self.state
            .write()
            .injected_failures
            .insert(id, message.into());
    }

    /// All components of a resource, id-ordered, without counting as fetches.
    pub fn archival_objects_of(&self, resource_id: RecordId) -> Vec<ArchivalObject> {
        self.state
            .read()
            .archival_objects
            .values()
            .filter(|ao| ao.resource_id == resource_id)
            .cloned()
            .collect()
    }

    /// Peek at a resource without counting as a fetch.
    pub fn peek_resource(&self, id: RecordId) -> Option<Resource> {
        self.state.read().resources.get(&id).cloned()
    }

    /// Peek at a component without counting as a fetch.
    pub fn peek_archival_object(&self, id: RecordId) -> Option<ArchivalObject> {
        self.state.read().archival_objects.get(&id).cloned()
    }

    // ========================================================================
    // Rollback (used by the file-backed store when persisting fails)
    // ========================================================================

    pub(crate) fn restore_resource(&self, previous: Resource) {
        self.state.write().resources.insert(previous.id, previous);
    }

    pub(crate) fn restore_archival_object(&self, previous: ArchivalObject) {
        self.state
            .write()
            .archival_objects
            .insert(previous.id, previous);
    }

    pub(crate) fn discard_archival_object(&self, id: RecordId) {
        self.state.write().archival_objects.remove(&id);
    }
}

impl RecordStore for MemoryStore {
    fn resource_summaries(&self) -> StoreResult<Vec<ResourceSummary>> {
        let state = self.state.read();
        Ok(state
            .resources
            .values()
            .map(|r| ResourceSummary {
                id: r.id,
                repo_id: r.repo_id,
                identifier: r.identifier.clone(),
            })
            .collect())
    }

    fn top_level_components(
        &self,
        repo_id: RepoId,
        resource_id: RecordId,
    ) -> StoreResult<Vec<ComponentSummary>> {
        let state = self.state.read();
        Ok(state
            .archival_objects
            .values()
            .filter(|ao| {
                ao.parent_id.is_none() && ao.repo_id == repo_id && ao.resource_id == resource_id
            })
            .map(|ao| ComponentSummary {
                id: ao.id,
                component_id: ao.component_id.clone(),
            })
            .collect())
    }

    fn child_ids(
        &self,
        parent_id: RecordId,
        repo_id: RepoId,
        resource_id: RecordId,
    ) -> StoreResult<Vec<RecordId>> {
        let state = self.state.read();
        Ok(state
            .archival_objects
            .values()
            .filter(|ao| {
                ao.parent_id == Some(parent_id)
                    && ao.repo_id == repo_id
                    && ao.resource_id == resource_id
            })
            .map(|ao| ao.id)
            .collect())
    }

    fn get_resource(&self, id: RecordId) -> StoreResult<Resource> {
        let mut state = self.state.write();
        let resource = state
            .resources
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound {
                kind: RecordKind::Resource,
                id,
            })?;
        *state.fetches.entry((RecordKind::Resource, id)).or_default() += 1;
        Ok(resource)
    }

    fn get_archival_object(&self, id: RecordId) -> StoreResult<ArchivalObject> {
        let mut state = self.state.write();
        let ao = state
            .archival_objects
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound {
                kind: RecordKind::ArchivalObject,
                id,
            })?;
        *state
            .fetches
            .entry((RecordKind::ArchivalObject, id))
            .or_default() += 1;
        Ok(ao)
    }

    fn create_archival_object(
        &self,
        ctx: &RequestContext,
        payload: NewArchivalObject,
    ) -> StoreResult<RecordId> {
        payload.validate()?;
        let mut state = self.state.write();

        let repo_id = state
            .resources
            .get(&payload.resource_id)
            .map(|r| r.repo_id)
            .ok_or(StoreError::NotFound {
                kind: RecordKind::Resource,
                id: payload.resource_id,
            })?;
        check_context(ctx, RecordKind::Resource, payload.resource_id, repo_id)?;

        if let Some(parent_id) = payload.parent_id {
            let parent_ok = state
                .archival_objects
                .get(&parent_id)
                .map_or(false, |p| p.resource_id == payload.resource_id);
            if !parent_ok {
                return Err(StoreError::NotFound {
                    kind: RecordKind::ArchivalObject,
                    id: parent_id,
                });
            }
        }

        let id = state.allocate_id();
        state.archival_objects.insert(
            id,
            ArchivalObject {
                id,
                repo_id,
                resource_id: payload.resource_id,
                parent_id: payload.parent_id,
                component_id: payload.component_id,
                level: payload.level,
                title: payload.title,
                instances: payload.instances,
                lock_version: 0,
            },
        );
        Ok(id)
    }

    fn update_archival_object(
        &self,
        ctx: &RequestContext,
        record: &ArchivalObject,
    ) -> StoreResult<u32> {
        let kind = RecordKind::ArchivalObject;
        let mut state = self.state.write();
        let current = state
            .archival_objects
            .get(&record.id)
            .ok_or(StoreError::NotFound {
                kind,
                id: record.id,
            })?;
        check_context(ctx, kind, record.id, current.repo_id)?;
        check_lock(kind, record.id, record.lock_version, current.lock_version)?;
        record.validate()?;

        // Ownership and position are not editable through an update.
        let mut next = record.clone();
        next.repo_id = current.repo_id;
        next.resource_id = current.resource_id;
        next.parent_id = current.parent_id;
        next.lock_version = current.lock_version + 1;

        state.take_injected(record.id)?;
        let version = next.lock_version;
        state.archival_objects.insert(record.id, next);
        Ok(version)
    }

    fn update_resource(&self, ctx: &RequestContext, record: &Resource) -> StoreResult<u32> {
        let kind = RecordKind::Resource;
        let mut state = self.state.write();
        let current = state.resources.get(&record.id).ok_or(StoreError::NotFound {
            kind,
            id: record.id,
        })?;
        check_context(ctx, kind, record.id, current.repo_id)?;
        check_lock(kind, record.id, record.lock_version, current.lock_version)?;
        record.validate()?;

        let mut next = record.clone();
        next.repo_id = current.repo_id;
        next.lock_version = current.lock_version + 1;

        state.take_injected(record.id)?;
        let version = next.lock_version;
        state.resources.insert(record.id, next);
        Ok(version)
    }
}
