//! Spreadsheet rows: CSV decoding and per-row admission.

use serde::{Deserialize, Serialize};
use std::io::Read;

use crate::error::ImportError;
use crate::index::{ResourceIndex, ResourceRef};
use crate::normalize::{digits_only, normalize_identifier};

/// One CSV record as written. Empty cells decode as `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawRow {
    pub resource: Option<String>,
    pub series: Option<String>,
    #[serde(rename = "box")]
    pub box_indicator: Option<String>,
    pub barcode: Option<String>,
    pub location: Option<String>,
    pub coordinate: Option<String>,
}

/// Decode all rows of a headed CSV document.
pub fn read_rows<R: Read>(reader: R) -> Result<Vec<RawRow>, ImportError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let mut rows = Vec::new();
    for record in csv_reader.deserialize() {
        rows.push(record?);
    }
    Ok(rows)
}

/// Why a row was dropped. The message is the complaint line.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RowRejection {
    #[error("Skipping row {row} \"{resource}:{key}\" resource not found in the record store")]
    UnresolvedResource {
        row: usize,
        resource: String,
        key: String,
    },
    #[error("Skipping row {row} \"{resource}:{key}\" box and barcode values are required")]
    MissingBoxOrBarcode {
        row: usize,
        resource: String,
        key: String,
    },
}

/// A row that passed admission and is bound to a resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRow {
    /// 1-based data row number (header excluded).
    pub row: usize,
    /// Resource identifier as written in the sheet.
    pub resource: String,
    pub key: String,
    pub target: ResourceRef,
    pub series: Option<String>,
    pub box_indicator: String,
    /// Digits only, never empty.
    pub barcode: String,
    pub location: Option<String>,
    pub coordinate: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

impl ImportRow {
    /// Admit a raw row: resolve the resource first, then require box and
    /// barcode (after digit stripping).
    pub fn prepare(raw: RawRow, row: usize, index: &ResourceIndex) -> Result<Self, RowRejection> {
        let resource = non_empty(raw.resource);
        let key = resource.as_deref().map(normalize_identifier);
        let barcode = non_empty(raw.barcode.as_deref().map(digits_only));
        let box_indicator = non_empty(raw.box_indicator);

        // A blank cell never resolves, whatever the index holds.
        let (Some(resource), Some(key)) = (resource, key) else {
            return Err(RowRejection::UnresolvedResource {
                row,
                resource: String::new(),
                key: String::new(),
            });
        };
        let Some(target) = index.get(&key) else {
            return Err(RowRejection::UnresolvedResource { row, resource, key });
        };

        let (Some(box_indicator), Some(barcode)) = (box_indicator, barcode) else {
            return Err(RowRejection::MissingBoxOrBarcode { row, resource, key });
        };

        Ok(Self {
            row,
            resource,
            key,
            target,
            series: non_empty(raw.series),
            box_indicator,
            barcode,
            location: non_empty(raw.location),
            coordinate: non_empty(raw.coordinate),
        })
    }

    /// One-line rendering for the progress report.
    pub fn describe(&self) -> String {
        serde_json::json!({
            "resource": self.resource,
            "series": self.series,
            "box": self.box_indicator,
            "barcode": self.barcode,
            "location": self.location,
            "coordinate": self.coordinate,
        })
        .to_string()
    }
}
