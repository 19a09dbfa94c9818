//! CSV persistence for consolidated document records
//!
//! One row per processed document, nine columns in schema order, header
//! written on first use. Appends rewrite the whole file: the dataset grows
//! by one row per upload, so a full read-modify-rewrite stays cheap and
//! keeps header handling in one place.

use crate::record::FieldRecord;
use crate::EobError;
use std::path::Path;

/// Append one consolidated record to the dataset at `path`.
///
/// Creates the file (with header) when missing; otherwise reloads the
/// existing rows, appends, and rewrites everything. Single-writer use is
/// assumed, as uploads are processed strictly sequentially.
pub fn append_record<P: AsRef<Path>>(path: P, record: &FieldRecord) -> Result<(), EobError> {
    let path = path.as_ref();

    let mut records = if path.exists() {
        load_records(path)?
    } else {
        Vec::new()
    };
    records.push(record.clone());

    let mut writer = csv::Writer::from_path(path)?;
    for row in &records {
        writer.serialize(row)?;
    }
    writer.flush()?;

    log::debug!(
        "dataset at {} now holds {} record(s)",
        path.display(),
        records.len()
    );
    Ok(())
}

/// Load every record in the dataset, in insertion order.
pub fn load_records<P: AsRef<Path>>(path: P) -> Result<Vec<FieldRecord>, EobError> {
    let mut reader = csv::Reader::from_path(path.as_ref())?;
    let mut records = Vec::new();
    for result in reader.deserialize() {
        let record: FieldRecord = result?;
        records.push(record);
    }
    Ok(records)
}

/// True when the dataset exists and holds at least one row.
pub fn has_records<P: AsRef<Path>>(path: P) -> bool {
    let path = path.as_ref();
    if !path.exists() {
        return false;
    }
    match load_records(path) {
        Ok(records) => !records.is_empty(),
        Err(e) => {
            log::warn!("failed to read dataset at {}: {}", path.display(), e);
            false
        }
    }
}
