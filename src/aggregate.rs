//! Aggregation of paginated API responses into one flat record sequence.

use serde_json::{Map, Value};

use crate::error::QueryError;

/// Strips the response envelope from each document and concatenates the
/// contained records into a single ordered sequence.
///
/// Input documents are expected in ascending window-offset order; the output
/// preserves that order. No deduplication happens here: a record fetched by
/// two windows appears twice in the output.
pub fn concat_docs(documents: Vec<Value>) -> Result<Vec<Map<String, Value>>, QueryError> {
    let mut records = Vec::new();

    for document in documents {
        let docs = document
            .pointer("/response/docs")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                QueryError::Protocol("expected response.docs array in API response".to_owned())
            })?;

        for doc in docs {
            match doc.as_object() {
                Some(object) => records.push(object.clone()),
                None => {
                    return Err(QueryError::Protocol(
                        "response.docs entry is not a JSON object".to_owned(),
                    ))
                }
            }
        }
    }

    Ok(records)
}
