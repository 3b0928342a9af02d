//! Row-at-a-time placement: every row is written before the next is read.
//!
//! Store failures are not trapped here; the first one ends the run.

use boxline_store::{RecordId, RequestContext};

use super::{ImportSession, PlacementPolicy};
use crate::builder::{build_container, build_series_with_container};
use crate::config::ImportMode;
use crate::error::Result;
use crate::matcher::{has_box, patch_box_barcode};
use crate::rows::ImportRow;

#[derive(Debug, Default)]
pub struct IncrementalPolicy;

impl IncrementalPolicy {
    pub fn new() -> Self {
        Self
    }

    /// Patch the barcode on every child holding the row's box. Returns
    /// whether any child matched.
    fn update_matching_children(
        session: &mut ImportSession<'_>,
        ctx: &RequestContext,
        row: &ImportRow,
        series: &str,
        series_id: RecordId,
    ) -> Result<bool> {
        let target = row.target;
        let children = session
            .matcher()
            .direct_children(series_id, target.repo_id, target.id)?;

        let mut matched = false;
        for child_id in children {
            let mut child = session.cache.archival_object(session.store, child_id)?.clone();
            if !has_box(&child.instances, &row.box_indicator) {
                continue;
            }
            matched = true;
            patch_box_barcode(&mut child.instances, &row.box_indicator, &row.barcode);
            session.store.update_archival_object(ctx, &child)?;
            session
                .cache
                .refresh_archival_object(session.store, child_id)?;
            session.summary.barcodes_updated += 1;
            session.report(format!(
                "Updated barcode for resource {} ({}), series {series} ({series_id}), box {} to {}",
                row.resource, target.id, row.box_indicator, row.barcode
            ));
        }
        Ok(matched)
    }

    fn add_to_series(
        session: &mut ImportSession<'_>,
        ctx: &RequestContext,
        row: &ImportRow,
        series: &str,
        series_id: RecordId,
    ) -> Result<()> {
        let mut series_node = session
            .cache
            .archival_object(session.store, series_id)?
            .clone();
        series_node
            .instances
            .push(build_container(&row.box_indicator, &row.barcode));
        session.store.update_archival_object(ctx, &series_node)?;
        session
            .cache
            .refresh_archival_object(session.store, series_id)?;
        session.summary.series_containers_added += 1;
        session.report(format!(
            "Added container box {} with barcode {} to series {series} ({series_id}) in resource {} ({})",
            row.box_indicator, row.barcode, row.resource, row.target.id
        ));
        Ok(())
    }

    fn create_series(
        session: &mut ImportSession<'_>,
        ctx: &RequestContext,
        row: &ImportRow,
        series: &str,
    ) -> Result<()> {
        let payload =
            build_series_with_container(series, &row.box_indicator, &row.barcode, row.target.id);
        let series_id = session.store.create_archival_object(ctx, payload)?;
        session.summary.series_created += 1;
        session.summary.series_containers_added += 1;
        session.report(format!(
            "Created series {series} ({series_id}) with container box {} barcode {} for resource {} ({})",
            row.box_indicator, row.barcode, row.resource, row.target.id
        ));
        Ok(())
    }

    fn add_to_resource(
        session: &mut ImportSession<'_>,
        ctx: &RequestContext,
        row: &ImportRow,
    ) -> Result<()> {
        let resource_id = row.target.id;
        let mut resource = session.cache.resource(session.store, resource_id)?.clone();
        resource
            .instances
            .push(build_container(&row.box_indicator, &row.barcode));
        session.store.update_resource(ctx, &resource)?;
        session.cache.refresh_resource(session.store, resource_id)?;
        session.summary.resource_containers_added += 1;
        session.report(format!(
            "Added container box {} with barcode {} to resource {} ({resource_id})",
            row.box_indicator, row.barcode, row.resource
        ));
        Ok(())
    }
}

impl PlacementPolicy for IncrementalPolicy {
    fn mode(&self) -> ImportMode {
        ImportMode::Incremental
    }

    fn accept(&mut self, session: &mut ImportSession<'_>, row: ImportRow) -> Result<()> {
        let target = row.target;
        session.cache.resource(session.store, target.id)?;
        let ctx = session.context(target.repo_id);

        let Some(series) = row.series.as_deref() else {
            return Self::add_to_resource(session, &ctx, &row);
        };

        let found = session
            .matcher()
            .find_series(target.repo_id, target.id, series)?;
        match found {
            Some(series_id) => {
                if !Self::update_matching_children(session, &ctx, &row, series, series_id)? {
                    Self::add_to_series(session, &ctx, &row, series, series_id)?;
                }
                Ok(())
            }
            None => Self::create_series(session, &ctx, &row, series),
        }
    }

    fn flush(&mut self, _session: &mut ImportSession<'_>) -> Result<()> {
        Ok(())
    }
}
