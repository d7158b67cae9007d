//! Provider clients behind a common trait.
//!
//! Every provider implements [`Source`]. `search` does the provider-specific
//! work (HTTP, retry policy, payload parsing) and may fail; `fetch` wraps it
//! and folds any failure into a [`ProviderResult`] with `ok = false`, so one
//! provider's outage never reaches its siblings or the caller.
//!
//! # Providers
//!
//! | Source | Transport | Retry policy |
//! |--------|-----------|--------------|
//! | Semantic Scholar | JSON search | 3 attempts; only 429, timeouts and connection errors retry |
//! | PubMed | JSON id-search, then XML fetch | 5 attempts per phase on any HTTP/transport error |
//! | arXiv | Atom feed | single attempt; an empty feed counts as a failure |
//!
//! Retried providers sleep 5s after the first failure and double the delay
//! each time. Attempt budgets, delays and timeouts can be overridden through
//! [`crate::config::Config`].

mod arxiv;
mod normalize;
mod pubmed;
mod registry;
mod semantic;

pub mod mock;

pub use arxiv::ArxivSource;
pub use mock::MockSource;
pub use normalize::{normalize, RawRecord};
pub use pubmed::PubMedSource;
pub use registry::SourceRegistry;
pub use semantic::SemanticScholarSource;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::models::{Paper, ProviderResult, SearchQuery, SourceType};

/// The Source trait defines the interface for every literature provider.
///
/// # Implementing a New Source
///
/// 1. Create a struct that implements `Source`
/// 2. Implement `source_type` and `search`, applying the provider's retry policy
///    inside `search`
/// 3. Map raw records through [`normalize`] so every field is populated
/// 4. Register it with [`SourceRegistry::register`]
#[async_trait]
pub trait Source: Send + Sync + std::fmt::Debug {
    /// Which provider this is; also fixes its position in merged results
    fn source_type(&self) -> SourceType;

    /// Unique identifier for this source (e.g., "arxiv", "pubmed")
    fn id(&self) -> &str {
        self.source_type().id()
    }

    /// Human-readable name of this source
    fn name(&self) -> &str {
        self.source_type().name()
    }

    /// Search the provider, retrying per its policy
    async fn search(&self, query: &SearchQuery) -> Result<Vec<Paper>, SourceError>;

    /// Search and fold any failure into the result
    async fn fetch(&self, query: &SearchQuery) -> ProviderResult {
        let start = Instant::now();
        let result = match self.search(query).await {
            Ok(papers) => {
                tracing::debug!("{} returned {} papers", self.name(), papers.len());
                ProviderResult::success(self.source_type(), papers)
            }
            Err(e) => {
                tracing::warn!("{} search failed: {}", self.name(), e);
                ProviderResult::failure(self.source_type(), e.to_string())
            }
        };
        result.with_elapsed(start.elapsed())
    }
}

/// Errors that can occur when interacting with a source
#[derive(Debug, Clone, thiserror::Error)]
pub enum SourceError {
    /// Connection-level network error
    #[error("Network error: {0}")]
    Network(String),

    /// The request did not complete in time
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Rate limit exceeded (HTTP 429)
    #[error("Rate limit exceeded")]
    RateLimit,

    /// Unsuccessful HTTP status that the provider retries
    #[error("HTTP status {0}")]
    Status(u16),

    /// API error from the source that is not worth retrying
    #[error("API error: {0}")]
    Api(String),

    /// Parsing error (XML, JSON, Atom)
    #[error("Parse error: {0}")]
    Parse(String),

    /// A success status whose body could not be decoded; retried like a
    /// transport error
    #[error("Undecodable response: {0}")]
    Decode(String),

    /// Invalid request parameters
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The provider answered but had nothing to return
    #[error("No results: {0}")]
    NotFound(String),

    /// Other error
    #[error("Error: {0}")]
    Other(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SourceError::Timeout(err.to_string())
        } else {
            SourceError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        SourceError::Parse(format!("JSON: {}", err))
    }
}
