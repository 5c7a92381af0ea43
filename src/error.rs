//! Error types for the query, export and usage-report pipelines.
//!
//! Every fallible operation in this crate returns a `Result` carrying one of
//! these enums. Callers can match on the variant to distinguish transport
//! failures from protocol, validation and state problems programmatically.

use std::path::PathBuf;

use thiserror::Error;

/// Failures raised by the retrieval and in-memory query pipeline.
#[derive(Debug, Error)]
pub enum QueryError {
    /// The server answered with a non-success HTTP status.
    #[error("GET {url} returned HTTP {status}")]
    Transport { url: String, status: u16 },

    /// The request could not be sent, or the response body could not be read.
    #[error("GET {url} failed")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The response body did not have the expected JSON shape.
    #[error("malformed API response: {0}")]
    Protocol(String),

    /// The identifier is not present in the configured collection catalog.
    #[error("{pid:?} is not a known collection identifier")]
    UnknownCollection { pid: String },

    /// A date filter value did not match the `YYYY-MM-DD` pattern.
    #[error("invalid date {value:?}, expected YYYY-MM-DD")]
    InvalidDate { value: String },

    /// An operation that needs loaded records ran before any retrieval.
    #[error("no collection data loaded; retrieve a collection first")]
    NoData,

    /// A requested field is missing from at least one loaded record.
    #[error("field {field:?} is not present in the loaded records")]
    MissingField { field: String },
}

/// Failures raised while writing CSV or JSON files to disk.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to create export directory {path:?}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV serialization failed for {path:?}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("JSON serialization failed")]
    Json(#[from] serde_json::Error),
}

/// Failures raised while reading or merging a usage-report CSV.
#[derive(Debug, Error)]
pub enum UsageError {
    #[error("failed to read usage report")]
    Csv(#[from] csv::Error),

    #[error("row {row}: invalid date {value:?} in column {column:?}")]
    InvalidDate {
        row: usize,
        column: &'static str,
        value: String,
    },
}

impl ExportError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ExportError::Io {
            path: path.into(),
            source,
        }
    }
}
