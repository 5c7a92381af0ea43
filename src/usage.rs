//! Merging retrieved records with a usage-report CSV.
//!
//! The usage report arrives as a separately supplied CSV (already trimmed to
//! the columns below). Rows are joined against the projected record
//! collection on PID, and availability/usage averages are derived from the
//! date each item entered the repository.

use std::path::Path;

use chrono::NaiveDate;
use serde::Deserialize;

use crate::error::UsageError;
use crate::project::{Record, PID_FIELD};

/// Average month length in days, for "months available" arithmetic.
const DAYS_PER_MONTH: f64 = 30.44;

/// Columns appended to each record by the merge.
const USAGE_COLUMNS: [&str; 6] = [
    "Downloads",
    "Views",
    "Date Added",
    "Months Available",
    "Avg Downloads per Month",
    "Avg Views per Month",
];

/// One row of the usage report.
#[derive(Debug, Clone, PartialEq)]
pub struct UsageRow {
    pub pid: String,
    pub downloads: u64,
    pub views: u64,
    pub date_added: NaiveDate,
}

#[derive(Deserialize)]
struct RawUsageRow {
    #[serde(rename = "PID")]
    pid: String,
    #[serde(rename = "Stacks Downloads")]
    downloads: u64,
    #[serde(rename = "Stacks Views")]
    views: u64,
    #[serde(rename = "Date Added")]
    date_added: String,
}

/// Reads a usage-report CSV with `PID`, `Stacks Downloads`, `Stacks Views`
/// and `Date Added` columns.
pub fn read_usage_csv(path: &Path) -> Result<Vec<UsageRow>, UsageError> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut rows = Vec::new();

    for (index, result) in reader.deserialize::<RawUsageRow>().enumerate() {
        let raw = result?;
        let date_added = NaiveDate::parse_from_str(&raw.date_added, "%Y-%m-%d").map_err(|_| {
            UsageError::InvalidDate {
                row: index + 1,
                column: "Date Added",
                value: raw.date_added.clone(),
            }
        })?;
        rows.push(UsageRow {
            pid: raw.pid,
            downloads: raw.downloads,
            views: raw.views,
            date_added,
        });
    }

    Ok(rows)
}

/// Inner-joins records with usage rows on PID, appending usage columns to
/// each matched record. Records without a usage row are dropped, as are
/// usage rows without a record.
///
/// `as_of` anchors the "months available" calculation, normally today.
pub fn merge_with_usage(records: &[Record], usage: &[UsageRow], as_of: NaiveDate) -> Vec<Record> {
    let mut merged = Vec::new();

    for record in records {
        let Some(pid) = record.get(PID_FIELD) else {
            continue;
        };
        let Some(row) = usage.iter().find(|row| row.pid == pid) else {
            continue;
        };

        let days = (as_of - row.date_added).num_days() as f64;
        let months = (days / DAYS_PER_MONTH).max(0.0);
        // Items younger than a month report their full usage as the average.
        let divisor = months.max(1.0);

        let mut joined = record.clone();
        joined.insert("Downloads", row.downloads.to_string());
        joined.insert("Views", row.views.to_string());
        joined.insert("Date Added", row.date_added.format("%Y-%m-%d").to_string());
        joined.insert("Months Available", format!("{months:.1}"));
        joined.insert(
            "Avg Downloads per Month",
            format!("{:.2}", row.downloads as f64 / divisor),
        );
        joined.insert(
            "Avg Views per Month",
            format!("{:.2}", row.views as f64 / divisor),
        );
        merged.push(joined);
    }

    merged
}

/// Header list for a merged usage report: the configured fields followed by
/// the derived usage columns.
pub fn usage_report_fields(base: &[String]) -> Vec<String> {
    base.iter()
        .cloned()
        .chain(USAGE_COLUMNS.iter().map(|column| column.to_string()))
        .collect()
}
