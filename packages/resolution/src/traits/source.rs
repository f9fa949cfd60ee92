//! Filing source trait - the upstream listing API.
//!
//! The raw API client is a collaborator, not part of the core: the
//! pipeline consumes whatever batch of raw items a source yields and owns
//! deduplication by submission id (distinct queries may return the same
//! filing).

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::{debug, warn};

use crate::error::{PipelineError, Result};
use crate::security::SecretString;
use crate::types::filing::RawFiling;

/// Source of raw filing items.
///
/// Implementations handle pagination, query construction, and transient
/// retries internally; the pipeline sees one batch per query.
#[async_trait]
pub trait FilingSource: Send + Sync {
    /// Fetch all raw filings matching a query.
    ///
    /// Duplicates across queries are fine; the normalizer dedups.
    async fn list_filings(&self, query: &str) -> Result<Vec<RawFiling>>;
}

/// Mock filing source for testing.
#[derive(Default)]
pub struct MockFilingSource {
    batches: RwLock<HashMap<String, Vec<RawFiling>>>,
}

impl MockFilingSource {
    /// Create a new mock source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a batch of filings for a query.
    pub fn with_filings(self, query: &str, filings: Vec<RawFiling>) -> Self {
        self.batches
            .write()
            .unwrap()
            .insert(query.to_string(), filings);
        self
    }
}

#[async_trait]
impl FilingSource for MockFilingSource {
    async fn list_filings(&self, query: &str) -> Result<Vec<RawFiling>> {
        Ok(self
            .batches
            .read()
            .unwrap()
            .get(query)
            .cloned()
            .unwrap_or_default())
    }
}

/// ECFS-backed filing source.
///
/// Paginates `publicapi.fcc.gov/ecfs/filings` with bounded retry and an
/// offset safety cap. Total source unavailability (every retry exhausted
/// on the first page) is the one fatal pipeline condition.
pub struct EcfsFilingSource {
    api_key: SecretString,
    client: reqwest::Client,
    base_url: String,
    /// Page size per request.
    pub page_limit: usize,
    /// Stop paginating past this offset even if the source claims more.
    pub max_offset: usize,
}

impl EcfsFilingSource {
    /// Create a new ECFS source.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::new(api_key),
            client: reqwest::Client::new(),
            base_url: "https://publicapi.fcc.gov/ecfs/filings".to_string(),
            page_limit: 25,
            max_offset: 5000,
        }
    }

    /// Create from the `FCC_API_KEY` environment variable.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("FCC_API_KEY")
            .map_err(|_| PipelineError::Config("FCC_API_KEY not set".into()))?;
        Ok(Self::new(api_key))
    }

    /// Set a custom base URL (for testing against a stub server).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Fetch a single page, retrying transient failures with backoff.
    async fn fetch_page(&self, query: &str, offset: usize) -> Result<EcfsPage> {
        let mut last_err: Option<reqwest::Error> = None;

        for attempt in 0u32..3 {
            if attempt > 0 {
                tokio::time::sleep(std::time::Duration::from_secs(1 << attempt)).await;
            }

            let response = self
                .client
                .get(&self.base_url)
                .header("X-Api-Key", self.api_key.expose())
                .query(&[
                    ("q", query),
                    ("limit", &self.page_limit.to_string()),
                    ("offset", &offset.to_string()),
                    ("sort", "date_received,DESC"),
                ])
                .send()
                .await;

            match response {
                Ok(resp) => match resp.error_for_status() {
                    Ok(resp) => {
                        return resp
                            .json::<EcfsPage>()
                            .await
                            .map_err(|e| PipelineError::Http(Box::new(e)));
                    }
                    Err(e) => {
                        warn!("ECFS query failed (attempt {}): {}", attempt + 1, e);
                        last_err = Some(e);
                    }
                },
                Err(e) => {
                    warn!("ECFS request error (attempt {}): {}", attempt + 1, e);
                    last_err = Some(e);
                }
            }
        }

        Err(match last_err {
            Some(e) => PipelineError::SourceUnavailable(Box::new(e)),
            None => PipelineError::SourceUnavailable("listing retries exhausted".into()),
        })
    }
}

/// One page of the ECFS response. The API has emitted both `filings` and
/// `filing` as the batch key over time.
#[derive(Debug, Default, Deserialize)]
struct EcfsPage {
    #[serde(default)]
    filings: Vec<RawFiling>,
    #[serde(default)]
    filing: Vec<RawFiling>,
}

impl EcfsPage {
    fn into_batch(self) -> Vec<RawFiling> {
        if self.filings.is_empty() {
            self.filing
        } else {
            self.filings
        }
    }
}

#[async_trait]
impl FilingSource for EcfsFilingSource {
    async fn list_filings(&self, query: &str) -> Result<Vec<RawFiling>> {
        let mut all = Vec::new();
        let mut offset = 0;

        loop {
            debug!("Fetching ECFS page: query={:?} offset={}", query, offset);
            let batch = self.fetch_page(query, offset).await?.into_batch();
            if batch.is_empty() {
                break;
            }

            all.extend(batch);
            offset += self.page_limit;

            if offset > self.max_offset {
                warn!("Reached ECFS offset cap ({}); stopping pagination", self.max_offset);
                break;
            }

            // Be polite to the public API between pages.
            tokio::time::sleep(std::time::Duration::from_millis(500)).await;
        }

        Ok(all)
    }
}
