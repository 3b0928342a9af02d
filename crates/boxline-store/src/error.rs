use crate::model::{RecordId, RepoId};

/// Which table a record lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Resource,
    ArchivalObject,
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordKind::Resource => f.write_str("resource"),
            RecordKind::ArchivalObject => f.write_str("archival_object"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{kind} {id} not found")]
    NotFound { kind: RecordKind, id: RecordId },

    #[error("{kind} {id} has been updated since it was fetched (lock_version {submitted}, current {current})")]
    Conflict {
        kind: RecordKind,
        id: RecordId,
        submitted: u32,
        current: u32,
    },

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("{kind} {id} belongs to repository {record_repo}, not {context_repo}")]
    ContextMismatch {
        kind: RecordKind,
        id: RecordId,
        record_repo: RepoId,
        context_repo: RepoId,
    },

    #[error("{0}")]
    Injected(String),

    #[error("store io: {0}")]
    Io(#[from] std::io::Error),

    #[error("store serialization: {0}")]
    Serde(#[from] serde_json::Error),
}
