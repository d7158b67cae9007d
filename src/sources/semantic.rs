//! Semantic Scholar research source implementation.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;

use crate::models::{Paper, SearchQuery, SourceType};
use crate::sources::{normalize, RawRecord, Source, SourceError};
use crate::utils::{semantic_scholar_retry_config, with_retry, HttpClient, RetryConfig};

const SEMANTIC_API_BASE: &str = "https://api.semanticscholar.org/graph/v1";

/// Fields requested from the paper search endpoint
const SEARCH_FIELDS: &str = "title,abstract,url";

/// Semantic Scholar research source
///
/// Uses the Graph API paper search. Only HTTP 429, timeouts and connection
/// failures are retried; any other non-200 status ends the search.
#[derive(Debug, Clone)]
pub struct SemanticScholarSource {
    client: HttpClient,
    base_url: String,
    api_key: Option<String>,
    retry: RetryConfig,
}

impl SemanticScholarSource {
    /// Create a new Semantic Scholar source
    pub fn new() -> Result<Self, SourceError> {
        Ok(Self::with_client(HttpClient::new()?))
    }

    /// Create with a shared HTTP client
    pub fn with_client(client: HttpClient) -> Self {
        Self {
            client,
            base_url: SEMANTIC_API_BASE.to_string(),
            api_key: std::env::var("SEMANTIC_SCHOLAR_API_KEY").ok(),
            retry: semantic_scholar_retry_config(),
        }
    }

    /// Point the source at a different API root (for testing or proxies)
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the API key (optional, for higher rate limits)
    pub fn api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    /// Override the retry policy
    pub fn retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Build the paper search URL
    fn build_search_url(&self, query: &SearchQuery) -> String {
        format!(
            "{}/paper/search?query={}&limit={}&fields={}",
            self.base_url,
            urlencoding::encode(query.text()),
            query.limit(),
            SEARCH_FIELDS
        )
    }

    /// Add API key to request headers if available
    fn add_api_key_if_present(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(ref key) = self.api_key {
            builder.header("x-api-key", key)
        } else {
            builder
        }
    }

    /// Parse a search response body into papers
    ///
    /// A missing `data` list means no results. Individual entries are read
    /// field by field so a malformed entry degrades to placeholders instead of
    /// failing the whole response.
    fn parse_search_response(body: &str) -> Result<Vec<Paper>, SourceError> {
        let response: S2SearchResponse = serde_json::from_str(body)?;

        Ok(response
            .data
            .unwrap_or_default()
            .iter()
            .map(|item| {
                normalize(
                    RawRecord::new()
                        .title(string_field(item, "title"))
                        .abstract_text(string_field(item, "abstract"))
                        .url(string_field(item, "url")),
                )
            })
            .collect())
    }
}

fn string_field(item: &Value, key: &str) -> Option<String> {
    item.get(key).and_then(Value::as_str).map(str::to_string)
}

#[async_trait]
impl Source for SemanticScholarSource {
    fn source_type(&self) -> SourceType {
        SourceType::SemanticScholar
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<Paper>, SourceError> {
        let url = self.build_search_url(query);

        let body = with_retry("Semantic Scholar search", self.retry, || {
            let request = self.add_api_key_if_present(self.client.get(&url));
            async move {
                let response = request.send().await?;

                match response.status() {
                    StatusCode::OK => Ok(response.text().await?),
                    StatusCode::TOO_MANY_REQUESTS => Err(SourceError::RateLimit),
                    status => Err(SourceError::Api(format!(
                        "Semantic Scholar API returned status: {}",
                        status
                    ))),
                }
            }
        })
        .await?;

        Self::parse_search_response(&body)
    }
}

// ===== Semantic Scholar API Types =====

#[derive(Debug, Deserialize)]
struct S2SearchResponse {
    #[serde(default)]
    data: Option<Vec<Value>>,
}
