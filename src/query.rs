//! Orchestration of the retrieval, projection and search pipeline.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::aggregate;
use crate::api::RepositoryApi;
use crate::config::{CollectionCatalog, DEFAULT_PAGE_CAP};
use crate::dates::DateFilter;
use crate::error::{ExportError, QueryError};
use crate::export;
use crate::pagination::{self, WindowingMode};
use crate::project::{self, Record, MULTI_VALUE_DELIMITER};

/// Retrieval status of a query session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RetrievalState {
    #[default]
    Idle,
    Fetching,
    Ready,
}

/// A single-caller query session over the repository API.
///
/// Owns the query parameters (selected collection, date filter, target field
/// list) and the current in-memory record collection. Each retrieval replaces
/// the collection wholesale; results are never merged across queries.
pub struct RepositoryQuery<A: RepositoryApi> {
    api: A,
    catalog: CollectionCatalog,
    fields: Vec<String>,
    date_filter: Option<DateFilter>,
    page_cap: u64,
    windowing: WindowingMode,
    join_delimiter: char,
    pid: Option<String>,
    state: RetrievalState,
    raw_docs: Vec<Map<String, Value>>,
    records: Vec<Record>,
}

impl<A: RepositoryApi> RepositoryQuery<A> {
    pub fn new(api: A, catalog: CollectionCatalog, fields: Vec<String>) -> Self {
        RepositoryQuery {
            api,
            catalog,
            fields,
            date_filter: None,
            page_cap: DEFAULT_PAGE_CAP,
            windowing: WindowingMode::default(),
            join_delimiter: MULTI_VALUE_DELIMITER,
            pid: None,
            state: RetrievalState::default(),
            raw_docs: Vec::new(),
            records: Vec::new(),
        }
    }

    pub fn set_date_filter(&mut self, filter: Option<DateFilter>) {
        self.date_filter = filter;
    }

    pub fn set_page_cap(&mut self, page_cap: u64) {
        self.page_cap = page_cap;
    }

    pub fn set_windowing_mode(&mut self, mode: WindowingMode) {
        self.windowing = mode;
    }

    pub fn set_join_delimiter(&mut self, delimiter: char) {
        self.join_delimiter = delimiter;
    }

    pub fn state(&self) -> RetrievalState {
        self.state
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn catalog(&self) -> &CollectionCatalog {
        &self.catalog
    }

    /// PID of the most recently selected or retrieved collection.
    pub fn selected_pid(&self) -> Option<&str> {
        self.pid.as_deref()
    }

    /// Projected records currently held. Empty until `apply_field_projection`
    /// has run.
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Raw documents currently held. Cleared once projection runs.
    pub fn raw_docs(&self) -> &[Map<String, Value>] {
        &self.raw_docs
    }

    /// Selects a collection, failing when the identifier is not in the
    /// catalog.
    pub fn select_collection(&mut self, pid: &str) -> Result<(), QueryError> {
        if !self.catalog.is_known_pid(pid) {
            return Err(QueryError::UnknownCollection {
                pid: pid.to_owned(),
            });
        }
        self.pid = Some(pid.to_owned());
        Ok(())
    }

    /// Retrieves one collection's records, replacing any prior results.
    ///
    /// Returns the number of raw records retrieved.
    pub async fn retrieve_collection(&mut self, pid: &str) -> Result<usize, QueryError> {
        self.select_collection(pid)?;
        self.retrieve(pid.to_owned()).await
    }

    /// Retrieves the entire repository via the configured all-items PID.
    pub async fn retrieve_all(&mut self) -> Result<usize, QueryError> {
        let pid = self.catalog.all_items_pid().to_owned();
        self.pid = Some(pid.clone());
        self.retrieve(pid).await
    }

    async fn retrieve(&mut self, pid: String) -> Result<usize, QueryError> {
        self.state = RetrievalState::Fetching;
        self.raw_docs.clear();
        self.records.clear();

        let result = self.fetch_all_windows(&pid).await;
        match result {
            Ok(count) => {
                self.state = RetrievalState::Ready;
                info!(pid = %pid, records = count, "Retrieval complete");
                Ok(count)
            }
            Err(e) => {
                self.state = RetrievalState::Idle;
                Err(e)
            }
        }
    }

    async fn fetch_all_windows(&mut self, pid: &str) -> Result<usize, QueryError> {
        let total = self.api.fetch_total(pid, self.date_filter.as_ref()).await?;
        let windows = pagination::plan(total, self.page_cap, self.windowing);

        if self.windowing == WindowingMode::DropRemainder && total >= self.page_cap {
            let covered = windows.iter().map(|w| w.rows).sum::<u64>();
            if covered < total {
                warn!(
                    total = total,
                    covered = covered,
                    "Window plan drops remainder records"
                );
            }
        }

        // One request at a time, in ascending offset order.
        let mut documents = Vec::with_capacity(windows.len());
        for window in windows {
            let document = self
                .api
                .fetch_window(pid, window, self.date_filter.as_ref())
                .await?;
            documents.push(document);
        }

        self.raw_docs = aggregate::concat_docs(documents)?;
        Ok(self.raw_docs.len())
    }

    /// Projects every raw record down to the configured field list, replacing
    /// the in-memory collection with the projected records.
    ///
    /// A no-op when projection already ran for the current retrieval.
    pub fn apply_field_projection(&mut self) -> Result<(), QueryError> {
        if self.state != RetrievalState::Ready {
            return Err(QueryError::NoData);
        }
        if self.raw_docs.is_empty() && !self.records.is_empty() {
            return Ok(());
        }

        self.records = self
            .raw_docs
            .drain(..)
            .map(|raw| project::project(&raw, &self.fields, self.join_delimiter))
            .collect();

        info!(records = self.records.len(), "Applied field projection");
        Ok(())
    }

    /// Splits a multi-valued field into one record per value, re-keying every
    /// record to PID plus that field.
    pub fn explode_field(&mut self, field: &str, delimiter: char) -> Result<(), QueryError> {
        if self.records.is_empty() {
            return Err(QueryError::NoData);
        }
        self.records = project::explode(&self.records, field, delimiter)?;
        info!(field = field, records = self.records.len(), "Exploded field");
        Ok(())
    }

    /// Case-insensitive substring search of `value` against `field` across
    /// all projected records.
    ///
    /// The first record missing `field` aborts the whole search.
    pub fn search(&self, field: &str, value: &str) -> Result<Vec<Record>, QueryError> {
        if self.records.is_empty() {
            return Err(QueryError::NoData);
        }

        let needle = value.to_lowercase();
        let mut matches = Vec::new();
        for record in &self.records {
            let haystack = record.get(field).ok_or_else(|| QueryError::MissingField {
                field: field.to_owned(),
            })?;
            if haystack.to_lowercase().contains(&needle) {
                matches.push(record.clone());
            }
        }
        Ok(matches)
    }

    /// Writes the current records as delimited CSV under `dir`, using the
    /// dated default filename. The header row comes from the configured field
    /// list.
    pub fn export_csv(&self, dir: &Path, delimiter: u8) -> Result<PathBuf, ExportError> {
        export::write_csv(
            &self.records,
            &self.fields,
            dir,
            &export::default_file_stem(),
            delimiter,
        )
    }

    /// Writes the current records as pretty-printed JSON under `dir`, using
    /// the dated default filename.
    pub fn export_json(&self, dir: &Path) -> Result<PathBuf, ExportError> {
        export::write_json(&self.records, dir, &export::default_file_stem())
    }
}
