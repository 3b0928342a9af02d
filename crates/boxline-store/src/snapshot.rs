//! File-backed record store.
//!
//! Wraps a [`MemoryStore`] with:
//! 1. A JSON snapshot rewritten (temp file + rename) after every successful mutation
//! 2. An append-only JSON-lines journal of mutations, one entry per write
//!
//! A write that cannot be persisted is undone in memory before the error is
//! returned.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::memory::{MemoryStore, StoreSnapshot};
use crate::model::{
    ArchivalObject, ComponentSummary, NewArchivalObject, RecordId, RepoId, Resource,
    ResourceSummary,
};
use crate::{RecordStore, RequestContext, StoreResult};

/// Unique identifier for a journaled mutation
pub type ChangeId = Uuid;

/// What a journaled write did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Mutation {
    CreateArchivalObject {
        id: RecordId,
        resource_id: RecordId,
        component_id: Option<String>,
    },
    UpdateArchivalObject {
        id: RecordId,
        lock_version: u32,
    },
    UpdateResource {
        id: RecordId,
        lock_version: u32,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: ChangeId,
    pub timestamp: DateTime<Utc>,
    pub actor: String,
    pub repo_id: RepoId,
    pub mutation: Mutation,
}

pub struct SnapshotStore {
    inner: MemoryStore,
    snapshot_path: PathBuf,
    journal_path: PathBuf,
}

impl SnapshotStore {
    /// Open (or start) a snapshot. The journal sits next to it as
    /// `<stem>.journal.jsonl`.
    pub fn open(snapshot_path: impl Into<PathBuf>) -> StoreResult<Self> {
        let snapshot_path = snapshot_path.into();
        let journal_path = snapshot_path.with_extension("journal.jsonl");
        Self::open_with_journal(snapshot_path, journal_path)
    }

    pub fn open_with_journal(
        snapshot_path: impl Into<PathBuf>,
        journal_path: impl Into<PathBuf>,
    ) -> StoreResult<Self> {
        let snapshot_path = snapshot_path.into();
        let snapshot = if snapshot_path.exists() {
            let contents = std::fs::read_to_string(&snapshot_path)?;
            serde_json::from_str(&contents)?
        } else {
            StoreSnapshot::default()
        };
        tracing::debug!(
            path = %snapshot_path.display(),
            resources = snapshot.resources.len(),
            archival_objects = snapshot.archival_objects.len(),
            "opened snapshot store"
        );
        Ok(Self {
            inner: MemoryStore::from_snapshot(snapshot),
            snapshot_path,
            journal_path: journal_path.into(),
        })
    }

    /// The wrapped in-memory store (for seeding and inspection).
    pub fn memory(&self) -> &MemoryStore {
        &self.inner
    }

    pub fn snapshot_path(&self) -> &Path {
        &self.snapshot_path
    }

    pub fn journal_path(&self) -> &Path {
        &self.journal_path
    }

    /// Write the current contents to disk.
    pub fn save(&self) -> StoreResult<()> {
        if let Some(parent) = self.snapshot_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(&self.inner.snapshot())?;
        let tmp = self.snapshot_path.with_extension("tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.snapshot_path)?;
        Ok(())
    }

    /// Persist a mutation already applied to `inner`. On failure `rollback`
    /// undoes it in memory, so a failed write is never half-applied.
    fn commit(
        &self,
        ctx: &RequestContext,
        mutation: Mutation,
        rollback: impl FnOnce(&MemoryStore),
    ) -> StoreResult<()> {
        if let Err(err) = self.save() {
            rollback(&self.inner);
            return Err(err);
        }
        if let Err(err) = self.append_journal(ctx, mutation) {
            rollback(&self.inner);
            // The snapshot on disk already holds the change; write it back out.
            if let Err(resave) = self.save() {
                tracing::error!(
                    path = %self.snapshot_path.display(),
                    error = %resave,
                    "snapshot left ahead of journal"
                );
            }
            return Err(err);
        }
        Ok(())
    }

    fn append_journal(&self, ctx: &RequestContext, mutation: Mutation) -> StoreResult<()> {
        let entry = JournalEntry {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            actor: ctx.username.clone(),
            repo_id: ctx.repo_id,
            mutation,
        };
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.journal_path)?;
        writeln!(file, "{}", serde_json::to_string(&entry)?)?;
        Ok(())
    }

    /// Read back every journal entry in write order.
    pub fn read_journal(path: &Path) -> StoreResult<Vec<JournalEntry>> {
        if !path.exists() {
            return Ok(Vec::new());
        }
        let reader = BufReader::new(std::fs::File::open(path)?);
        let mut entries = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            entries.push(serde_json::from_str(&line)?);
        }
        Ok(entries)
    }
}

impl RecordStore for SnapshotStore {
    fn resource_summaries(&self) -> StoreResult<Vec<ResourceSummary>> {
        self.inner.resource_summaries()
    }

    fn top_level_components(
        &self,
        repo_id: RepoId,
        resource_id: RecordId,
    ) -> StoreResult<Vec<ComponentSummary>> {
        self.inner.top_level_components(repo_id, resource_id)
    }

    fn child_ids(
        &self,
        parent_id: RecordId,
        repo_id: RepoId,
        resource_id: RecordId,
    ) -> StoreResult<Vec<RecordId>> {
        self.inner.child_ids(parent_id, repo_id, resource_id)
    }

    fn get_resource(&self, id: RecordId) -> StoreResult<Resource> {
        self.inner.get_resource(id)
    }

    fn get_archival_object(&self, id: RecordId) -> StoreResult<ArchivalObject> {
        self.inner.get_archival_object(id)
    }

    fn create_archival_object(
        &self,
        ctx: &RequestContext,
        payload: NewArchivalObject,
    ) -> StoreResult<RecordId> {
        let resource_id = payload.resource_id;
        let component_id = payload.component_id.clone();
        let id = self.inner.create_archival_object(ctx, payload)?;
        self.commit(
            ctx,
            Mutation::CreateArchivalObject {
                id,
                resource_id,
                component_id,
            },
            |inner| inner.discard_archival_object(id),
        )?;
        Ok(id)
    }

    fn update_archival_object(
        &self,
        ctx: &RequestContext,
        record: &ArchivalObject,
    ) -> StoreResult<u32> {
        let previous = self.inner.peek_archival_object(record.id);
        let lock_version = self.inner.update_archival_object(ctx, record)?;
        self.commit(
            ctx,
            Mutation::UpdateArchivalObject {
                id: record.id,
                lock_version,
            },
            |inner| {
                if let Some(previous) = previous {
                    inner.restore_archival_object(previous);
                }
            },
        )?;
        Ok(lock_version)
    }

    fn update_resource(&self, ctx: &RequestContext, record: &Resource) -> StoreResult<u32> {
        let previous = self.inner.peek_resource(record.id);
        let lock_version = self.inner.update_resource(ctx, record)?;
        self.commit(
            ctx,
            Mutation::UpdateResource {
                id: record.id,
                lock_version,
            },
            |inner| {
                if let Some(previous) = previous {
                    inner.restore_resource(previous);
                }
            },
        )?;
        Ok(lock_version)
    }
}
