//! Two-pass placement: group everything, then write each group once.

use boxline_store::{RecordId, RequestContext};

use super::{timestamp, GroupTable, ImportSession, PlacementPolicy, SeriesKey};
use crate::builder::{build_container, build_series_stub};
use crate::config::ImportMode;
use crate::error::Result;
use crate::index::ResourceRef;
use crate::matcher::{has_box, patch_box_barcode};
use crate::rows::ImportRow;

/// Rows bound for one series of one resource.
struct SeriesGroup {
    resource: ResourceRef,
    /// Resource identifier as written on the first row of the group.
    resource_label: String,
    series: String,
    series_id: Option<RecordId>,
    exists: bool,
    looked_up: bool,
    /// Direct children of an existing series, already fetched into the cache.
    children: Vec<RecordId>,
    rows: Vec<ImportRow>,
}

/// Rows with no series: containers go straight onto the resource.
struct ResourceGroup {
    resource: ResourceRef,
    rows: Vec<ImportRow>,
}

#[derive(Default)]
pub struct BatchPolicy {
    series_groups: GroupTable<SeriesKey, SeriesGroup>,
    resource_groups: GroupTable<RecordId, ResourceGroup>,
}

impl BatchPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Groups accumulated so far: (series groups, resource groups).
    #[cfg(test)]
    pub(crate) fn pending_groups(&self) -> (usize, usize) {
        (self.series_groups.len(), self.resource_groups.len())
    }

    fn flush_series_group(
        session: &mut ImportSession<'_>,
        ctx: &RequestContext,
        mut group: SeriesGroup,
    ) -> Result<()> {
        let resource_id = group.resource.id;
        let series = group.series.clone();
        session.report(format!(
            "Processing series {series} for resource {} ({resource_id})",
            group.resource_label
        ));

        // a) Create the series if the store has none.
        let series_id = match group.series_id.filter(|_| group.exists) {
            Some(id) => id,
            None => {
                let id = session
                    .store
                    .create_archival_object(ctx, build_series_stub(&series, resource_id))?;
                group.series_id = Some(id);
                session.summary.series_created += 1;
                session.report(format!(
                    "Created series {series} ({id}) for resource {} ({resource_id})",
                    group.resource_label
                ));
                id
            }
        };

        // b) Rows whose box already sits in a child get the barcode patched there.
        let mut unplaced = Vec::new();
        for row in std::mem::take(&mut group.rows) {
            let mut matched = false;
            for &child_id in &group.children {
                let mut child = session.cache.archival_object(session.store, child_id)?.clone();
                if !has_box(&child.instances, &row.box_indicator) {
                    continue;
                }
                matched = true;
                patch_box_barcode(&mut child.instances, &row.box_indicator, &row.barcode);

                let described = format!(
                    "barcode for resource {} ({resource_id}), series {series} ({series_id}), box {} to {}",
                    row.resource, row.box_indicator, row.barcode
                );
                match session.store.update_archival_object(ctx, &child) {
                    Ok(_) => {
                        session
                            .cache
                            .refresh_archival_object(session.store, child_id)?;
                        session.summary.barcodes_updated += 1;
                        session.report(format!("Updated {described}"));
                    }
                    Err(err) => {
                        session.summary.update_failures += 1;
                        tracing::warn!(child_id, error = %err, "barcode update failed");
                        session.complain(format!("Failed updating {described}: {err}"));
                    }
                }
            }
            if !matched {
                unplaced.push(row);
            }
        }

        // c) Everything left becomes new boxes on the series itself, in one write.
        if !unplaced.is_empty() {
            let mut series_node = session
                .cache
                .archival_object(session.store, series_id)?
                .clone();
            for row in &unplaced {
                series_node
                    .instances
                    .push(build_container(&row.box_indicator, &row.barcode));
                session.report(format!(
                    "Added container box {} with barcode {} to series {series} ({series_id}) in resource {} ({resource_id})",
                    row.box_indicator, row.barcode, row.resource
                ));
            }
            session.store.update_archival_object(ctx, &series_node)?;
            session
                .cache
                .refresh_archival_object(session.store, series_id)?;
            session.summary.series_containers_added += unplaced.len();
            session.report(format!("Created containers for series {series} ({series_id})"));
        }

        tracing::info!(resource_id, series = %series, series_id, "series group flushed");
        session.report("-----");
        Ok(())
    }

    fn flush_resource_group(
        session: &mut ImportSession<'_>,
        ctx: &RequestContext,
        group: ResourceGroup,
    ) -> Result<()> {
        let resource_id = group.resource.id;

        let mut resource = session.cache.resource(session.store, resource_id)?.clone();
        for row in &group.rows {
            resource
                .instances
                .push(build_container(&row.box_indicator, &row.barcode));
            session.report(format!(
                "Added container box {} with barcode {} to resource {} ({resource_id})",
                row.box_indicator, row.barcode, row.resource
            ));
        }
        session.store.update_resource(ctx, &resource)?;
        session.cache.refresh_resource(session.store, resource_id)?;
        session.summary.resource_containers_added += group.rows.len();

        tracing::info!(resource_id, containers = group.rows.len(), "resource group flushed");
        session.report(format!("Created containers for resource ({resource_id})"));
        session.report("-----");
        Ok(())
    }
}

impl PlacementPolicy for BatchPolicy {
    fn mode(&self) -> ImportMode {
        ImportMode::Batch
    }

    fn accept(&mut self, session: &mut ImportSession<'_>, row: ImportRow) -> Result<()> {
        let target = row.target;
        session.cache.resource(session.store, target.id)?;

        let Some(series) = row.series.clone() else {
            self.resource_groups
                .get_or_insert_with(target.id, || ResourceGroup {
                    resource: target,
                    rows: Vec::new(),
                })
                .rows
                .push(row);
            return Ok(());
        };

        let group = self
            .series_groups
            .get_or_insert_with((target.id, series.clone()), || SeriesGroup {
                resource: target,
                resource_label: row.resource.clone(),
                series: series.clone(),
                series_id: None,
                exists: false,
                looked_up: false,
                children: Vec::new(),
                rows: Vec::new(),
            });

        if !group.looked_up {
            group.looked_up = true;
            let matcher = session.matcher();
            if let Some(series_id) = matcher.find_series(target.repo_id, target.id, &series)? {
                group.series_id = Some(series_id);
                group.exists = true;
                group.children = matcher.direct_children(series_id, target.repo_id, target.id)?;
                // Pay for the child fetches once, up front.
                for &child_id in &group.children {
                    session.cache.archival_object(session.store, child_id)?;
                }
            }
        }

        group.rows.push(row);
        Ok(())
    }

    fn flush(&mut self, session: &mut ImportSession<'_>) -> Result<()> {
        session.report(format!("# Import series groups: {}", timestamp()));
        session.report("-----");
        for group in std::mem::take(&mut self.series_groups).into_groups() {
            let ctx = session.context(group.resource.repo_id);
            ctx.scope(|ctx| Self::flush_series_group(session, ctx, group))?;
        }

        session.report(format!("# Import resource groups: {}", timestamp()));
        session.report("-----");
        for group in std::mem::take(&mut self.resource_groups).into_groups() {
            let ctx = session.context(group.resource.repo_id);
            ctx.scope(|ctx| Self::flush_resource_group(session, ctx, group))?;
        }
        Ok(())
    }
}
