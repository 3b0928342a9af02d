//! Tests for the record store backends

use super::*;
use tempfile::tempdir;

fn box_instance(indicator: &str, barcode: Option<&str>) -> Instance {
    Instance::Container {
        instance_type: "mixed_materials".to_string(),
        container: Container {
            container_type: "box".to_string(),
            indicator: indicator.to_string(),
            barcode: barcode.map(str::to_string),
            locations: vec![],
        },
    }
}

fn component(resource_id: RecordId, parent_id: Option<RecordId>, label: &str) -> NewArchivalObject {
    NewArchivalObject {
        resource_id,
        parent_id,
        component_id: Some(label.to_string()),
        level: "file".to_string(),
        title: None,
        instances: vec![],
    }
}

/// Helper: one resource with a series and two children.
fn seeded() -> (MemoryStore, RecordId, RecordId) {
    let store = MemoryStore::new();
    let resource = store.insert_resource(2, &["MC", "0042"], "Papers", vec![]);
    let series = store
        .insert_archival_object(component(resource, None, "Series 4."))
        .unwrap();
    store
        .insert_archival_object(component(resource, Some(series), "Folder 1"))
        .unwrap();
    store
        .insert_archival_object(component(resource, Some(series), "Folder 2"))
        .unwrap();
    (store, resource, series)
}

#[test]
fn test_scans_filter_by_parent_and_root() {
    let (store, resource, series) = seeded();

    let top = store.top_level_components(2, resource).unwrap();
    assert_eq!(top.len(), 1);
    assert_eq!(top[0].id, series);
    assert_eq!(top[0].component_id.as_deref(), Some("Series 4."));

    let children = store.child_ids(series, 2, resource).unwrap();
    assert_eq!(children.len(), 2);
    assert!(children.windows(2).all(|w| w[0] < w[1]), "id order");

    // Wrong repository sees nothing.
    assert!(store.top_level_components(3, resource).unwrap().is_empty());
    assert!(store.child_ids(series, 3, resource).unwrap().is_empty());
}

#[test]
fn test_resource_summaries_carry_identifier_parts() {
    let (store, resource, _) = seeded();
    let summaries = store.resource_summaries().unwrap();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].id, resource);
    assert_eq!(summaries[0].joined_identifier(), "MC0042");

    let partial = ResourceSummary {
        id: 9,
        repo_id: 2,
        identifier: vec![Some("AC".to_string()), None, Some("12".to_string()), None],
    };
    assert_eq!(partial.joined_identifier(), "AC12");
}

#[test]
fn test_fetches_are_counted() {
    let (store, resource, series) = seeded();
    assert_eq!(store.fetch_count(RecordKind::Resource, resource), 0);
    store.get_resource(resource).unwrap();
    store.get_resource(resource).unwrap();
    store.get_archival_object(series).unwrap();
    assert_eq!(store.fetch_count(RecordKind::Resource, resource), 2);
    assert_eq!(store.fetch_count(RecordKind::ArchivalObject, series), 1);
}

#[test]
fn test_stale_update_is_a_conflict() {
    let (store, _, series) = seeded();
    let ctx = RequestContext::new(2, "admin");

    let mut first = store.get_archival_object(series).unwrap();
    let stale = first.clone();
    first.instances.push(box_instance("1", Some("111")));
    assert_eq!(store.update_archival_object(&ctx, &first).unwrap(), 1);

    let err = store.update_archival_object(&ctx, &stale).unwrap_err();
    assert!(matches!(
        err,
        StoreError::Conflict {
            submitted: 0,
            current: 1,
            ..
        }
    ));

    let fresh = store.get_archival_object(series).unwrap();
    assert_eq!(fresh.lock_version, 1);
    assert_eq!(fresh.instances.len(), 1);
}

#[test]
fn test_update_requires_matching_repository() {
    let (store, resource, _) = seeded();
    let record = store.get_resource(resource).unwrap();
    let err = store
        .update_resource(&RequestContext::new(9, "admin"), &record)
        .unwrap_err();
    assert!(matches!(err, StoreError::ContextMismatch { context_repo: 9, .. }));
}

#[test]
fn test_update_cannot_move_a_component() {
    let (store, resource, series) = seeded();
    let ctx = RequestContext::new(2, "admin");
    let mut record = store.get_archival_object(series).unwrap();
    record.parent_id = Some(12345);
    record.resource_id = resource + 100;
    store.update_archival_object(&ctx, &record).unwrap();

    let stored = store.peek_archival_object(series).unwrap();
    assert_eq!(stored.parent_id, None);
    assert_eq!(stored.resource_id, resource);
}

#[test]
fn test_validation_rejects_bad_payloads() {
    let (store, resource, _) = seeded();
    let ctx = RequestContext::new(2, "admin");

    let mut untitled = component(resource, None, "");
    untitled.component_id = None;
    assert!(matches!(
        store.create_archival_object(&ctx, untitled),
        Err(StoreError::Validation(_))
    ));

    let mut blank_box = component(resource, None, "Series 9.");
    blank_box.instances.push(box_instance("", Some("1")));
    assert!(matches!(
        store.create_archival_object(&ctx, blank_box),
        Err(StoreError::Validation(_))
    ));
}

#[test]
fn test_create_checks_parent_belongs_to_resource() {
    let (store, resource, _) = seeded();
    let other = store.insert_resource(2, &["AC", "1"], "Other", vec![]);
    let other_series = store
        .insert_archival_object(component(other, None, "Series 1."))
        .unwrap();

    let err = store
        .create_archival_object(
            &RequestContext::new(2, "admin"),
            component(resource, Some(other_series), "Stray"),
        )
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound { .. }));
}

#[test]
fn test_injected_failure_fires_once() {
    let (store, resource, _) = seeded();
    let ctx = RequestContext::new(2, "admin");
    store.fail_next_update(resource, "disk full");

    let record = store.get_resource(resource).unwrap();
    let err = store.update_resource(&ctx, &record).unwrap_err();
    assert_eq!(err.to_string(), "disk full");
    assert_eq!(store.peek_resource(resource).unwrap().lock_version, 0);

    assert_eq!(store.update_resource(&ctx, &record).unwrap(), 1);
}

#[test]
fn test_snapshot_store_persists_and_journals() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("store.json");

    let (resource, series) = {
        let store = SnapshotStore::open(&path).unwrap();
        let resource = store
            .memory()
            .insert_resource(2, &["AC", "7"], "Diaries", vec![]);
        store.save().unwrap();

        let ctx = RequestContext::new(2, "admin");
        let series = store
            .create_archival_object(&ctx, component(resource, None, "Series 1."))
            .unwrap();
        let mut record = store.get_resource(resource).unwrap();
        record.instances.push(box_instance("3", Some("42")));
        store.update_resource(&ctx, &record).unwrap();
        (resource, series)
    };

    let reopened = SnapshotStore::open(&path).unwrap();
    let record = reopened.get_resource(resource).unwrap();
    assert_eq!(record.lock_version, 1);
    assert_eq!(record.instances, vec![box_instance("3", Some("42"))]);
    assert!(reopened.get_archival_object(series).is_ok());

    let journal = SnapshotStore::read_journal(reopened.journal_path()).unwrap();
    assert_eq!(journal.len(), 2);
    assert_eq!(journal[0].actor, "admin");
    assert!(matches!(
        journal[0].mutation,
        Mutation::CreateArchivalObject { id, .. } if id == series
    ));
    assert!(matches!(
        journal[1].mutation,
        Mutation::UpdateResource { lock_version: 1, .. }
    ));
}

#[test]
fn test_snapshot_store_new_ids_do_not_collide_after_reload() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("store.json");
    let store = SnapshotStore::open(&path).unwrap();
    let resource = store.memory().insert_resource(1, &["MC1"], "A", vec![]);
    store.save().unwrap();
    drop(store);

    let reopened = SnapshotStore::open(&path).unwrap();
    let series = reopened
        .create_archival_object(
            &RequestContext::new(1, "admin"),
            component(resource, None, "Series 2."),
        )
        .unwrap();
    assert!(series > resource);
}

#[test]
fn test_failed_write_is_not_journaled() {
    let dir = tempdir().unwrap();
    let store = SnapshotStore::open(dir.path().join("store.json")).unwrap();
    let resource = store.memory().insert_resource(1, &["MC1"], "A", vec![]);
    let record = store.get_resource(resource).unwrap();

    assert!(store
        .update_resource(&RequestContext::new(5, "admin"), &record)
        .is_err());
    let journal = SnapshotStore::read_journal(store.journal_path()).unwrap();
    assert!(journal.is_empty());
}

/// A store whose snapshot can never be written: its parent is a regular file.
fn unwritable_store(dir: &std::path::Path) -> SnapshotStore {
    let blocker = dir.join("blocker");
    std::fs::write(&blocker, b"").unwrap();
    SnapshotStore::open(blocker.join("store.json")).unwrap()
}

#[test]
fn test_unpersisted_update_is_rolled_back() {
    let dir = tempdir().unwrap();
    let store = unwritable_store(dir.path());
    let resource = store.memory().insert_resource(2, &["AC", "1"], "A", vec![]);
    let series = store
        .memory()
        .insert_archival_object(component(resource, None, "Series 1."))
        .unwrap();
    let ctx = RequestContext::new(2, "admin");

    let mut record = store.get_archival_object(series).unwrap();
    record.instances.push(box_instance("12", Some("7")));
    assert!(matches!(
        store.update_archival_object(&ctx, &record),
        Err(StoreError::Io(_))
    ));
    let current = store.memory().peek_archival_object(series).unwrap();
    assert_eq!(current.lock_version, 0);
    assert!(current.instances.is_empty());

    let mut resource_record = store.get_resource(resource).unwrap();
    resource_record.instances.push(box_instance("5", Some("55")));
    assert!(store.update_resource(&ctx, &resource_record).is_err());
    let current = store.memory().peek_resource(resource).unwrap();
    assert_eq!(current.lock_version, 0);
    assert!(current.instances.is_empty());

    // The caller's copy is still current, so nothing is left stale.
    assert!(matches!(
        store.memory().update_archival_object(&ctx, &record),
        Ok(1)
    ));
}

#[test]
fn test_unpersisted_create_is_rolled_back() {
    let dir = tempdir().unwrap();
    let store = unwritable_store(dir.path());
    let resource = store.memory().insert_resource(2, &["AC", "1"], "A", vec![]);

    let result = store.create_archival_object(
        &RequestContext::new(2, "admin"),
        component(resource, None, "Series 3."),
    );
    assert!(result.is_err());
    assert!(store.memory().archival_objects_of(resource).is_empty());
    assert!(SnapshotStore::read_journal(store.journal_path())
        .unwrap()
        .is_empty());
}
