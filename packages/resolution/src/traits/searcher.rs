//! Web searcher trait for external evidence.
//!
//! The fusion stage issues exactly one query per entity per run and
//! treats empty results as a valid outcome. Implementations wrap a search
//! provider; the pipeline only consumes the snippets.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;
use url::Url;

use crate::error::{PipelineError, Result};
use crate::security::SecretString;

/// A search hit with the fields the evidence pack carries.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SearchSnippet {
    /// Result URL.
    pub url: String,

    /// Title of the result, if the provider gave one.
    pub title: Option<String>,

    /// Snippet/description text.
    pub snippet: Option<String>,
}

impl SearchSnippet {
    /// Create a snippet from a URL string, rejecting unparseable URLs.
    pub fn from_url(url: &str) -> Option<Self> {
        Url::parse(url).ok().map(|u| Self {
            url: u.to_string(),
            title: None,
            snippet: None,
        })
    }

    /// Add a title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Add snippet text.
    pub fn with_snippet(mut self, snippet: impl Into<String>) -> Self {
        self.snippet = Some(snippet.into());
        self
    }
}

/// Web search collaborator.
#[async_trait]
pub trait WebSearcher: Send + Sync {
    /// Search the web for snippets relevant to the query.
    async fn search(&self, query: &str) -> Result<Vec<SearchSnippet>>;

    /// Search with a specific result limit.
    async fn search_with_limit(&self, query: &str, limit: usize) -> Result<Vec<SearchSnippet>> {
        let mut results = self.search(query).await?;
        results.truncate(limit);
        Ok(results)
    }
}

/// Mock web searcher for testing.
#[derive(Default)]
pub struct MockWebSearcher {
    results: RwLock<HashMap<String, Vec<SearchSnippet>>>,
}

impl MockWebSearcher {
    /// Create a new mock searcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add results for a query.
    pub fn with_results(self, query: &str, results: Vec<SearchSnippet>) -> Self {
        self.results
            .write()
            .unwrap()
            .insert(query.to_string(), results);
        self
    }

    /// Add URL strings as results.
    pub fn with_urls(self, query: &str, urls: &[&str]) -> Self {
        let results: Vec<_> = urls
            .iter()
            .filter_map(|u| SearchSnippet::from_url(u))
            .collect();
        self.with_results(query, results)
    }
}

#[async_trait]
impl WebSearcher for MockWebSearcher {
    async fn search(&self, query: &str) -> Result<Vec<SearchSnippet>> {
        Ok(self
            .results
            .read()
            .unwrap()
            .get(query)
            .cloned()
            .unwrap_or_default())
    }
}

/// Tavily-backed web searcher.
pub struct TavilyWebSearcher {
    api_key: SecretString,
    client: reqwest::Client,
    /// Default number of results to return.
    pub default_limit: usize,
}

impl TavilyWebSearcher {
    /// Create a new Tavily web searcher.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::new(api_key),
            client: reqwest::Client::new(),
            default_limit: 5,
        }
    }

    /// Create from the `TAVILY_API_KEY` environment variable.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("TAVILY_API_KEY")
            .map_err(|_| PipelineError::Config("TAVILY_API_KEY not set".into()))?;
        Ok(Self::new(api_key))
    }

    /// Set the default result limit.
    pub fn with_default_limit(mut self, limit: usize) -> Self {
        self.default_limit = limit;
        self
    }
}

#[async_trait]
impl WebSearcher for TavilyWebSearcher {
    async fn search(&self, query: &str) -> Result<Vec<SearchSnippet>> {
        self.search_with_limit(query, self.default_limit).await
    }

    async fn search_with_limit(&self, query: &str, limit: usize) -> Result<Vec<SearchSnippet>> {
        #[derive(serde::Serialize)]
        struct Request {
            query: String,
            search_depth: String,
            max_results: usize,
        }

        #[derive(serde::Deserialize)]
        struct Response {
            results: Vec<TavilyResult>,
        }

        #[derive(serde::Deserialize)]
        struct TavilyResult {
            url: String,
            title: Option<String>,
            content: Option<String>,
        }

        let request = Request {
            query: query.to_string(),
            search_depth: "basic".to_string(),
            max_results: limit,
        };

        let response = self
            .client
            .post("https://api.tavily.com/search")
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", self.api_key.expose()))
            .json(&request)
            .send()
            .await
            .map_err(|e| PipelineError::SearchFailed(Box::new(e)))?;

        if !response.status().is_success() {
            return Err(PipelineError::SearchFailed(
                format!("Tavily API error: {}", response.status()).into(),
            ));
        }

        let parsed: Response = response
            .json()
            .await
            .map_err(|e| PipelineError::SearchFailed(Box::new(e)))?;

        let results = parsed
            .results
            .into_iter()
            .filter_map(|r| {
                let mut snippet = SearchSnippet::from_url(&r.url)?;
                if let Some(title) = r.title {
                    snippet = snippet.with_title(title);
                }
                if let Some(content) = r.content {
                    snippet = snippet.with_snippet(content);
                }
                Some(snippet)
            })
            .collect();

        Ok(results)
    }
}

/// The single search query issued per entity.
pub fn entity_search_query(company_name: &str) -> String {
    format!("\"{}\" VoIP telecommunications", company_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_web_searcher() {
        let searcher = MockWebSearcher::new().with_urls(
            "\"ULEC, LLC\" VoIP telecommunications",
            &["https://ulec.example.com", "https://ulec.example.com/about"],
        );

        let results = searcher
            .search("\"ULEC, LLC\" VoIP telecommunications")
            .await
            .unwrap();
        assert_eq!(results.len(), 2);

        // Unknown queries are valid empty results, not errors.
        let empty = searcher.search("\"Nobody\" VoIP").await.unwrap();
        assert!(empty.is_empty());
    }

    #[tokio::test]
    async fn test_search_with_limit() {
        let searcher = MockWebSearcher::new().with_urls(
            "query",
            &["https://a.com", "https://b.com", "https://c.com"],
        );

        let results = searcher.search_with_limit("query", 2).await.unwrap();
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn test_entity_search_query_shape() {
        assert_eq!(
            entity_search_query("Mix Networks, Inc"),
            "\"Mix Networks, Inc\" VoIP telecommunications"
        );
    }
}
