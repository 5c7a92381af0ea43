//! HTTP access to the repository's JSON search API.
//!
//! The `RepositoryApi` trait is the seam between the retrieval pipeline and
//! the network: the orchestrator only ever talks to the trait, so tests plug
//! in a mock and a future bounded-parallel client could be substituted without
//! touching the planner or the aggregator.

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info};

#[cfg(any(test, feature = "test-api-mocks"))]
use mockall::automock;

use crate::dates::DateFilter;
use crate::error::QueryError;
use crate::pagination::RequestWindow;

/// Executes count and window requests against the repository API.
///
/// Implementations perform no retries; failures propagate to the caller
/// immediately.
#[cfg_attr(any(test, feature = "test-api-mocks"), automock)]
#[async_trait]
pub trait RepositoryApi: Send + Sync {
    /// Issues a metadata-only request and returns the server-reported total
    /// number of matching records.
    async fn fetch_total<'a>(
        &self,
        pid: &str,
        date_filter: Option<&'a DateFilter>,
    ) -> Result<u64, QueryError>;

    /// Issues one paginated request and returns the raw JSON document,
    /// response envelope included.
    async fn fetch_window<'a>(
        &self,
        pid: &str,
        window: RequestWindow,
        date_filter: Option<&'a DateFilter>,
    ) -> Result<Value, QueryError>;
}

/// Reqwest-backed client for the live API.
#[derive(Debug, Clone)]
pub struct HttpRepositoryApi {
    base_url: String,
    client: reqwest::Client,
}

impl HttpRepositoryApi {
    /// `base_url` is the collection endpoint prefix; the collection PID is
    /// appended verbatim.
    pub fn new(base_url: impl Into<String>) -> Self {
        HttpRepositoryApi {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }

    fn total_url(&self, pid: &str, date_filter: Option<&DateFilter>) -> String {
        match date_filter {
            None => format!("{}{}", self.base_url, pid),
            Some(filter) => format!("{}{}?{}", self.base_url, pid, filter.to_query_params()),
        }
    }

    fn window_url(
        &self,
        pid: &str,
        window: RequestWindow,
        date_filter: Option<&DateFilter>,
    ) -> String {
        let mut url = format!(
            "{}{}?rows={}&start={}",
            self.base_url, pid, window.rows, window.start
        );
        if let Some(filter) = date_filter {
            url.push('&');
            url.push_str(&filter.to_query_params());
        }
        url
    }

    async fn get_json(&self, url: &str) -> Result<Value, QueryError> {
        debug!(url = %url, "Issuing API request");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| QueryError::Network {
                url: url.to_owned(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(QueryError::Transport {
                url: url.to_owned(),
                status: status.as_u16(),
            });
        }

        response.json().await.map_err(|source| QueryError::Network {
            url: url.to_owned(),
            source,
        })
    }
}

#[async_trait]
impl RepositoryApi for HttpRepositoryApi {
    async fn fetch_total<'a>(
        &self,
        pid: &str,
        date_filter: Option<&'a DateFilter>,
    ) -> Result<u64, QueryError> {
        let url = self.total_url(pid, date_filter);
        let body = self.get_json(&url).await?;

        let total = body
            .pointer("/response/numFound")
            .and_then(Value::as_u64)
            .ok_or_else(|| {
                QueryError::Protocol(format!("missing response.numFound in body from {url}"))
            })?;

        info!(pid = pid, total = total, "Fetched collection row total");
        Ok(total)
    }

    async fn fetch_window<'a>(
        &self,
        pid: &str,
        window: RequestWindow,
        date_filter: Option<&'a DateFilter>,
    ) -> Result<Value, QueryError> {
        let url = self.window_url(pid, window, date_filter);
        let body = self.get_json(&url).await?;

        debug!(
            pid = pid,
            rows = window.rows,
            start = window.start,
            "Fetched window"
        );
        Ok(body)
    }
}
