//! Per-run record cache.
//!
//! At most one fetch per id until the entry is refreshed. Anything that
//! writes a record must call the matching `refresh_*` before the next read so
//! later rows see the post-write state (and its new lock version).

use std::collections::HashMap;

use boxline_store::{ArchivalObject, RecordId, RecordStore, Resource, StoreResult};

#[derive(Debug, Default)]
pub struct RecordCache {
    resources: HashMap<RecordId, Resource>,
    archival_objects: HashMap<RecordId, ArchivalObject>,
}

impl RecordCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resource(&mut self, store: &dyn RecordStore, id: RecordId) -> StoreResult<&Resource> {
        if !self.resources.contains_key(&id) {
            let fetched = store.get_resource(id)?;
            self.resources.insert(id, fetched);
        }
        Ok(&self.resources[&id])
    }

    pub fn archival_object(
        &mut self,
        store: &dyn RecordStore,
        id: RecordId,
    ) -> StoreResult<&ArchivalObject> {
        if !self.archival_objects.contains_key(&id) {
            let fetched = store.get_archival_object(id)?;
            self.archival_objects.insert(id, fetched);
        }
        Ok(&self.archival_objects[&id])
    }

    /// Refetch a resource after writing it.
    pub fn refresh_resource(&mut self, store: &dyn RecordStore, id: RecordId) -> StoreResult<()> {
        let fetched = store.get_resource(id)?;
        self.resources.insert(id, fetched);
        Ok(())
    }

    /// Refetch a component after writing it.
    pub fn refresh_archival_object(
        &mut self,
        store: &dyn RecordStore,
        id: RecordId,
    ) -> StoreResult<()> {
        let fetched = store.get_archival_object(id)?;
        self.archival_objects.insert(id, fetched);
        Ok(())
    }

    pub fn contains_resource(&self, id: RecordId) -> bool {
        self.resources.contains_key(&id)
    }

    pub fn contains_archival_object(&self, id: RecordId) -> bool {
        self.archival_objects.contains_key(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boxline_store::{MemoryStore, RecordKind, RequestContext};

    #[test]
    fn second_read_is_served_from_cache() {
        let store = MemoryStore::new();
        let id = store.insert_resource(1, &["AC", "1"], "R", vec![]);
        let mut cache = RecordCache::new();
        assert!(!cache.contains_resource(id));

        cache.resource(&store, id).unwrap();
        assert!(cache.contains_resource(id));
        cache.resource(&store, id).unwrap();
        assert_eq!(store.fetch_count(RecordKind::Resource, id), 1);
    }

    #[test]
    fn refresh_picks_up_new_lock_version() {
        let store = MemoryStore::new();
        let id = store.insert_resource(1, &["AC", "1"], "R", vec![]);
        let mut cache = RecordCache::new();

        let record = cache.resource(&store, id).unwrap().clone();
        store
            .update_resource(&RequestContext::new(1, "admin"), &record)
            .unwrap();
        assert_eq!(cache.resource(&store, id).unwrap().lock_version, 0);

        cache.refresh_resource(&store, id).unwrap();
        assert_eq!(cache.resource(&store, id).unwrap().lock_version, 1);
        assert_eq!(store.fetch_count(RecordKind::Resource, id), 2);
    }

    #[test]
    fn missing_records_are_not_cached() {
        let store = MemoryStore::new();
        let mut cache = RecordCache::new();
        assert!(cache.archival_object(&store, 99).is_err());
        assert!(!cache.contains_archival_object(99));
    }
}
