//! Locating series nodes and boxes inside an existing hierarchy.

use boxline_store::{Instance, RecordId, RecordStore, RepoId, StoreResult};

use crate::normalize::first_digit_run;

/// Series number embedded in a component label (`"Series 04."` → `"04"`).
pub fn series_number(component_id: &str) -> Option<&str> {
    first_digit_run(component_id)
}

/// Does any instance hold a box with this indicator?
pub fn has_box(instances: &[Instance], box_indicator: &str) -> bool {
    instances
        .iter()
        .filter_map(Instance::container)
        .any(|c| c.is_box(box_indicator))
}

/// Set the barcode on every box matching `box_indicator`. Returns how many
/// containers were touched.
pub fn patch_box_barcode(instances: &mut [Instance], box_indicator: &str, barcode: &str) -> usize {
    let mut patched = 0;
    for container in instances.iter_mut().filter_map(Instance::container_mut) {
        if container.is_box(box_indicator) {
            container.barcode = Some(barcode.to_string());
            patched += 1;
        }
    }
    patched
}

/// Read-only queries over one store.
pub struct HierarchyMatcher<'a> {
    store: &'a dyn RecordStore,
}

impl<'a> HierarchyMatcher<'a> {
    pub fn new(store: &'a dyn RecordStore) -> Self {
        Self { store }
    }

    /// First top-level node of the resource whose label's digit run equals
    /// `series` exactly. Scan order is the store's; when several labels carry
    /// the same number the first one scanned wins.
    pub fn find_series(
        &self,
        repo_id: RepoId,
        resource_id: RecordId,
        series: &str,
    ) -> StoreResult<Option<RecordId>> {
        let found = self
            .store
            .top_level_components(repo_id, resource_id)?
            .into_iter()
            .find(|node| {
                node.component_id
                    .as_deref()
                    .and_then(series_number)
                    .map_or(false, |number| number == series)
            })
            .map(|node| node.id);
        tracing::debug!(repo_id, resource_id, series, ?found, "series lookup");
        Ok(found)
    }

    pub fn direct_children(
        &self,
        parent_id: RecordId,
        repo_id: RepoId,
        resource_id: RecordId,
    ) -> StoreResult<Vec<RecordId>> {
        self.store.child_ids(parent_id, repo_id, resource_id)
    }
}
