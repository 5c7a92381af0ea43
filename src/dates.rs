//! Date-range filtering for retrieval requests.

use std::sync::LazyLock;

use chrono::Local;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::QueryError;

static DATE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("date pattern compiles"));

/// An inclusive modified-date range applied to count and window requests.
///
/// `from` is always present; `until` is optional and defaults to the current
/// local date when the filter is rendered into query parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateFilter {
    from: String,
    until: Option<String>,
}

impl DateFilter {
    /// Builds a filter from `YYYY-MM-DD` date strings.
    pub fn new(from: impl Into<String>, until: Option<String>) -> Result<Self, QueryError> {
        let from = from.into();
        validate_date(&from)?;
        if let Some(ref until) = until {
            validate_date(until)?;
        }
        Ok(DateFilter { from, until })
    }

    pub fn from_date(&self) -> &str {
        &self.from
    }

    pub fn until_date(&self) -> Option<&str> {
        self.until.as_deref()
    }

    /// Renders the filter as API query parameters, e.g.
    /// `from=2023-01-01T00:00:00Z&until=2023-06-30T00:00:00Z`.
    ///
    /// The upstream API filters on the record modified date and expects full
    /// timestamps, so both bounds are pinned to midnight UTC.
    pub fn to_query_params(&self) -> String {
        let until = match &self.until {
            Some(until) => until.clone(),
            None => Local::now().format("%Y-%m-%d").to_string(),
        };
        format!("from={}T00:00:00Z&until={}T00:00:00Z", self.from, until)
    }
}

fn validate_date(value: &str) -> Result<(), QueryError> {
    if DATE_PATTERN.is_match(value) {
        Ok(())
    } else {
        Err(QueryError::InvalidDate {
            value: value.to_owned(),
        })
    }
}
