//! Flake corpus clients.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use provcert_types::FlakeRecord;
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::FlakeConfig;
use crate::error::{FlakeError, FlakeResult};

const TESTS_PATH: &str = "/tests";

/// Source of historical per-test CI statistics.
#[async_trait]
pub trait FlakeCorpus: Send + Sync {
    /// Records whose name equals `test_name` for the given release.
    ///
    /// An empty vector means the corpus does not know the test.
    async fn query_tests(&self, test_name: &str, release: &str) -> FlakeResult<Vec<FlakeRecord>>;
}

/// HTTP client for the Sippy `/tests` endpoint.
///
/// One `reqwest::Client` is shared by every query so connections are reused
/// across the whole batch.
#[derive(Debug, Clone)]
pub struct SippyClient {
    client: Client,
    base_url: String,
}

impl SippyClient {
    /// Create a client for `base_url` with a per-request timeout.
    pub fn new(base_url: &str, timeout: Duration) -> FlakeResult<Self> {
        let base_url = base_url.trim_end_matches('/');
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(FlakeError::InvalidUrl(base_url.to_string()));
        }

        let client = Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(100)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.to_string(),
        })
    }

    /// Create a client from configuration.
    pub fn from_config(config: &FlakeConfig) -> FlakeResult<Self> {
        Self::new(&config.base_url, config.request_timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Equality filter on the test name, in the corpus' grid filter format.
    pub fn name_filter(test_name: &str) -> String {
        serde_json::json!({
            "items": [{
                "columnField": "name",
                "operatorValue": "equals",
                "value": test_name,
            }]
        })
        .to_string()
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> FlakeResult<T> {
        let status = response.status();

        if status.is_success() {
            let body = response.text().await?;
            serde_json::from_str(&body).map_err(|e| FlakeError::Decode(e.to_string()))
        } else {
            let message = response.text().await.unwrap_or_default();
            Err(FlakeError::Api {
                status: status.as_u16(),
                message,
            })
        }
    }
}

#[async_trait]
impl FlakeCorpus for SippyClient {
    async fn query_tests(&self, test_name: &str, release: &str) -> FlakeResult<Vec<FlakeRecord>> {
        let filter = Self::name_filter(test_name);
        debug!(test = %test_name, release = %release, "Querying flake corpus");

        let response = self
            .client
            .get(format!("{}{}", self.base_url, TESTS_PATH))
            .query(&[("release", release), ("filter", filter.as_str())])
            .send()
            .await?;

        self.handle_response(response).await
    }
}

/// Frozen in-memory corpus.
///
/// Release is ignored: the snapshot is assumed to be taken for the release
/// under review.
#[derive(Debug, Clone, Default)]
pub struct StaticCorpus {
    records: HashMap<String, Vec<FlakeRecord>>,
}

impl StaticCorpus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a list of records, grouped by test name.
    pub fn from_records(records: impl IntoIterator<Item = FlakeRecord>) -> Self {
        let mut corpus = Self::new();
        for record in records {
            corpus.insert(record);
        }
        corpus
    }

    /// Load a snapshot in the corpus API's JSON array format.
    pub fn from_json(json: &str) -> FlakeResult<Self> {
        let records: Vec<FlakeRecord> =
            serde_json::from_str(json).map_err(|e| FlakeError::Decode(e.to_string()))?;
        Ok(Self::from_records(records))
    }

    pub fn insert(&mut self, record: FlakeRecord) {
        self.records
            .entry(record.test_name.clone())
            .or_default()
            .push(record);
    }

    pub fn with_record(mut self, record: FlakeRecord) -> Self {
        self.insert(record);
        self
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl FlakeCorpus for StaticCorpus {
    async fn query_tests(&self, test_name: &str, _release: &str) -> FlakeResult<Vec<FlakeRecord>> {
        Ok(self.records.get(test_name).cloned().unwrap_or_default())
    }
}
