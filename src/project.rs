//! Field projection: reducing raw API documents to flat, ordered records.

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Value};

use crate::error::QueryError;

/// Canonical delimiter used to join and split multi-valued fields.
pub const MULTI_VALUE_DELIMITER: char = '~';

/// Field carrying the persistent identifier of a record.
pub const PID_FIELD: &str = "PID";

/// One normalized metadata record: field name to scalar value, in projection
/// order. Multi-valued source fields have already been joined into a single
/// delimited string by the time a `Record` exists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    entries: Vec<(String, String)>,
}

impl Record {
    pub fn new() -> Self {
        Record::default()
    }

    /// Appends a field. Later inserts win on lookup only if the field was not
    /// already present; projection never inserts a field twice.
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.entries.push((field.into(), value.into()));
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value.as_str())
    }

    /// Field names in insertion order.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Projects one raw API document down to `fields`, in field-list order.
///
/// Missing or null fields map to the empty string. Array fields are joined
/// with `delimiter` into one string. Every non-empty value has carriage
/// returns and line feeds stripped; record text in the repository is known to
/// carry stray newlines that break tab-delimited output.
pub fn project(raw: &Map<String, Value>, fields: &[String], delimiter: char) -> Record {
    let mut record = Record::new();
    for field in fields {
        let value = match raw.get(field) {
            None | Some(Value::Null) => String::new(),
            Some(Value::Array(items)) => {
                let joined = items
                    .iter()
                    .map(scalar_to_string)
                    .collect::<Vec<_>>()
                    .join(&delimiter.to_string());
                clean_text(&joined)
            }
            Some(scalar) => clean_text(&scalar_to_string(scalar)),
        };
        record.insert(field, value);
    }
    record
}

/// Splits multi-valued records into one record per value.
///
/// Any record whose `field` value contains `delimiter` becomes N records, one
/// per split value, each carrying the original PID. Records without the
/// delimiter pass through as a single record. In both cases the output is
/// re-keyed to exactly `PID` + `field`; all other fields are dropped. Records
/// whose value is empty after the split are removed entirely.
pub fn explode(records: &[Record], field: &str, delimiter: char) -> Result<Vec<Record>, QueryError> {
    let mut exploded = Vec::with_capacity(records.len());

    for record in records {
        let pid = record.get(PID_FIELD).ok_or_else(|| QueryError::MissingField {
            field: PID_FIELD.to_owned(),
        })?;
        let value = record.get(field).ok_or_else(|| QueryError::MissingField {
            field: field.to_owned(),
        })?;

        for part in value.split(delimiter) {
            if part.is_empty() {
                continue;
            }
            let mut split_record = Record::new();
            split_record.insert(PID_FIELD, pid);
            split_record.insert(field, part);
            exploded.push(split_record);
        }
    }

    Ok(exploded)
}

fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn clean_text(text: &str) -> String {
    text.replace(['\n', '\r'], "")
}
