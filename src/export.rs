//! File export of the in-memory record collection.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::info;

use crate::error::ExportError;
use crate::project::Record;

/// Default CSV column delimiter.
pub const DEFAULT_CSV_DELIMITER: u8 = b'\t';

/// Dated default file stem, e.g. `collection_export_2026_08_07`.
pub fn default_file_stem() -> String {
    format!("collection_export_{}", Local::now().format("%Y_%m_%d"))
}

/// Creates the export directory when it does not exist yet.
pub fn ensure_dir(dir: &Path) -> Result<(), ExportError> {
    if !dir.exists() {
        fs::create_dir_all(dir).map_err(|source| ExportError::CreateDir {
            path: dir.to_path_buf(),
            source,
        })?;
    }
    Ok(())
}

/// Writes records as delimited CSV with a header row.
///
/// The header always comes from `fields` - the originally configured field
/// list - not from the records' actual keys. Records missing a header field
/// (for example after an explode re-keyed them to PID plus one field) render
/// the empty string in that column.
pub fn write_csv(
    records: &[Record],
    fields: &[String],
    dir: &Path,
    stem: &str,
    delimiter: u8,
) -> Result<PathBuf, ExportError> {
    ensure_dir(dir)?;
    let path = dir.join(format!("{stem}.csv"));

    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_path(&path)
        .map_err(|source| ExportError::Csv {
            path: path.clone(),
            source,
        })?;

    write_rows(&mut writer, records, fields).map_err(|source| ExportError::Csv {
        path: path.clone(),
        source,
    })?;

    info!(path = %path.display(), rows = records.len(), "Wrote CSV export");
    Ok(path)
}

fn write_rows<W: std::io::Write>(
    writer: &mut csv::Writer<W>,
    records: &[Record],
    fields: &[String],
) -> Result<(), csv::Error> {
    writer.write_record(fields)?;
    for record in records {
        let row: Vec<&str> = fields
            .iter()
            .map(|field| record.get(field).unwrap_or(""))
            .collect();
        writer.write_record(&row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes records as a pretty-printed JSON array, fields in record order.
pub fn write_json(records: &[Record], dir: &Path, stem: &str) -> Result<PathBuf, ExportError> {
    ensure_dir(dir)?;
    let path = dir.join(format!("{stem}.json"));

    let body = serde_json::to_string_pretty(records)?;
    fs::write(&path, body).map_err(|source| ExportError::io(&path, source))?;

    info!(path = %path.display(), rows = records.len(), "Wrote JSON export");
    Ok(path)
}
