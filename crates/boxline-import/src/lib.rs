//! Container spreadsheet import.
//!
//! Reconciles box/barcode rows (keyed by a collection identifier and an
//! optional series number) against an archival hierarchy:
//! - identifiers are normalized to one key on both sides ([`normalize`]),
//! - each row is bound to a resource through the [`ResourceIndex`],
//! - the series node and its children are located ([`matcher`]),
//! - and the row becomes a barcode update on an existing box, a new box on
//!   the series, a new series, or a new box on the resource ([`engine`]).

pub mod builder;
pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod index;
pub mod matcher;
pub mod normalize;
pub mod report;
pub mod rows;

use std::fs::File;

use boxline_store::RecordStore;

pub use config::{ImportConfig, ImportMode};
pub use engine::{
    policy_for, run_import, BatchPolicy, ImportEngine, ImportSession, ImportSummary,
    IncrementalPolicy, PlacementPolicy,
};
pub use error::{ImportError, Result};
pub use index::{ResourceIndex, ResourceRef};
pub use report::{FileReporter, MemoryReporter, Reporter};
pub use rows::{read_rows, ImportRow, RawRow, RowRejection};

/// Run the import described by `config` against `store`: read the configured
/// spreadsheet, narrate to the configured report files.
pub fn run_import_file(store: &dyn RecordStore, config: &ImportConfig) -> Result<ImportSummary> {
    let mut reporter = FileReporter::open(
        &config.status_path,
        &config.error_path,
        config.mirror_to_console,
    )?;

    let rows = match File::open(&config.csv_path)
        .map_err(ImportError::from)
        .and_then(read_rows)
    {
        Ok(rows) => rows,
        Err(err) => {
            reporter.complain(&format!(
                "Could not read {}: {err}",
                config.csv_path.display()
            ));
            return Err(err);
        }
    };

    tracing::info!(
        csv = %config.csv_path.display(),
        rows = rows.len(),
        mode = config.mode.as_str(),
        "starting container import"
    );
    run_import(store, config.mode, &config.username, rows, &mut reporter)
}
