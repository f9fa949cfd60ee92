//! Document transport and text extraction collaborators.
//!
//! Fetching handles the regulatory server's quirks (exact header set,
//! viewer-to-download URL transform); extraction turns fetched bytes into
//! plain text. Both are per-document and non-fatal: a failure degrades one
//! entity's evidence, never the run.

use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use nonzero_ext::nonzero;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::error::{PipelineError, Result};
use crate::types::filing::DocumentRef;

/// Fetches document bytes by locator.
///
/// Transient retries are the implementation's concern; the pipeline only
/// distinguishes success from failure.
#[async_trait]
pub trait DocumentFetcher: Send + Sync {
    /// Fetch a document's bytes.
    async fn fetch(&self, doc: &DocumentRef) -> Result<Vec<u8>>;
}

/// Extracts plain text from document bytes.
///
/// PDF/DOCX parsing lives outside the core; failure means "no document
/// text available", not an error the pipeline propagates.
pub trait TextExtractor: Send + Sync {
    /// Extract text, or fail for unsupported/corrupt payloads.
    fn extract_text(&self, bytes: &[u8], filename: &str) -> Result<String>;
}

/// Transform a viewer URL into a download URL.
///
/// The source publishes `/ecfs/document/{id}/{seq}` viewer links; the
/// download endpoint is the plural form.
pub fn download_url(viewer_url: &str) -> String {
    viewer_url.replace("/ecfs/document/", "/ecfs/documents/")
}

/// HTTP fetcher carrying the header set the regulatory server requires.
pub struct HttpDocumentFetcher {
    client: reqwest::Client,
    max_retries: u32,
}

impl HttpDocumentFetcher {
    /// Create a fetcher with the server's required header set.
    pub fn new() -> Result<Self> {
        use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONNECTION, COOKIE, USER_AGENT};

        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("PostmanRuntime/7.47.1"));
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
        headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
        headers.insert(COOKIE, HeaderValue::from_static("lmao=1"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .http1_only()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .map_err(|e| PipelineError::Http(Box::new(e)))?;

        Ok(Self {
            client,
            max_retries: 3,
        })
    }

    /// Heuristic: small HTML payloads mentioning an error are the
    /// server's soft-404 page, not document content.
    fn is_error_page(content_type: &str, body: &[u8]) -> bool {
        if !content_type.contains("text/html") || body.len() >= 5000 {
            return false;
        }
        let lowered = body.to_ascii_lowercase();
        lowered.windows(5).any(|w| w == b"error")
            || lowered.windows(9).any(|w| w == b"not found")
    }
}

#[async_trait]
impl DocumentFetcher for HttpDocumentFetcher {
    async fn fetch(&self, doc: &DocumentRef) -> Result<Vec<u8>> {
        let url = download_url(&doc.locator);
        let mut last_failure = String::from("no attempts made");

        // Backoff schedule matches the server's observed throttling.
        let backoff = [1u64, 3, 10];

        for attempt in 0..self.max_retries {
            if attempt > 0 {
                let secs = backoff[(attempt as usize - 1).min(backoff.len() - 1)];
                tokio::time::sleep(std::time::Duration::from_secs(secs)).await;
            }

            match self.client.get(&url).send().await {
                Ok(resp) if resp.status().is_success() => {
                    let content_type = resp
                        .headers()
                        .get(reqwest::header::CONTENT_TYPE)
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or_default()
                        .to_string();
                    let body = resp
                        .bytes()
                        .await
                        .map_err(|e| PipelineError::Http(Box::new(e)))?;

                    if Self::is_error_page(&content_type, &body) {
                        last_failure = "HTML error page returned".to_string();
                        continue;
                    }
                    return Ok(body.to_vec());
                }
                Ok(resp) => {
                    last_failure = format!("status {}", resp.status());
                }
                Err(e) => {
                    last_failure = e.to_string();
                }
            }
        }

        Err(PipelineError::FetchFailed {
            locator: doc.locator.clone(),
            source: last_failure.into(),
        })
    }
}

/// A fetcher wrapper that enforces a request rate against the document
/// server, using the governor crate.
pub struct RateLimitedFetcher<F: DocumentFetcher> {
    inner: F,
    limiter: Arc<
        RateLimiter<
            governor::state::NotKeyed,
            governor::state::InMemoryState,
            governor::clock::DefaultClock,
        >,
    >,
}

impl<F: DocumentFetcher> RateLimitedFetcher<F> {
    /// Wrap a fetcher with a sustained requests-per-second limit.
    pub fn new(inner: F, requests_per_second: u32) -> Self {
        let quota = Quota::per_second(
            std::num::NonZeroU32::new(requests_per_second).unwrap_or(nonzero!(1u32)),
        );
        Self {
            inner,
            limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }
}

#[async_trait]
impl<F: DocumentFetcher> DocumentFetcher for RateLimitedFetcher<F> {
    async fn fetch(&self, doc: &DocumentRef) -> Result<Vec<u8>> {
        self.limiter.until_ready().await;
        self.inner.fetch(doc).await
    }
}

/// Pass-through extractor for payloads that are already plain text.
///
/// Binary formats are rejected so the evidence extractor never sees
/// garbage; richer format support plugs in via the trait.
#[derive(Default)]
pub struct PlainTextExtractor;

impl PlainTextExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl TextExtractor for PlainTextExtractor {
    fn extract_text(&self, bytes: &[u8], filename: &str) -> Result<String> {
        match std::str::from_utf8(bytes) {
            Ok(text) if !text.trim().is_empty() => Ok(text.to_string()),
            _ => Err(PipelineError::ExtractionFailed {
                filename: filename.to_string(),
            }),
        }
    }
}

/// Mock fetcher returning canned bytes per locator.
#[derive(Default)]
pub struct MockDocumentFetcher {
    documents: RwLock<HashMap<String, Vec<u8>>>,
    failures: RwLock<Vec<String>>,
}

impl MockDocumentFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve text content for a locator.
    pub fn with_text(self, locator: &str, text: &str) -> Self {
        self.documents
            .write()
            .unwrap()
            .insert(locator.to_string(), text.as_bytes().to_vec());
        self
    }

    /// Fail every fetch for a locator.
    pub fn with_failure(self, locator: &str) -> Self {
        self.failures.write().unwrap().push(locator.to_string());
        self
    }
}

#[async_trait]
impl DocumentFetcher for MockDocumentFetcher {
    async fn fetch(&self, doc: &DocumentRef) -> Result<Vec<u8>> {
        if self.failures.read().unwrap().contains(&doc.locator) {
            return Err(PipelineError::FetchFailed {
                locator: doc.locator.clone(),
                source: "mock failure".into(),
            });
        }
        self.documents
            .read()
            .unwrap()
            .get(&doc.locator)
            .cloned()
            .ok_or_else(|| PipelineError::FetchFailed {
                locator: doc.locator.clone(),
                source: "not found in mock".into(),
            })
    }
}
