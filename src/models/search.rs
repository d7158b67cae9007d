//! Search request, per-provider result and aggregated result models.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{Paper, SourceType};
use crate::aggregate::budget;

/// Reasons a [`SearchQuery`] cannot be built
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    #[error("Query text must not be empty")]
    EmptyText,

    #[error("Per-provider limit must be at least 1")]
    ZeroLimit,
}

/// A query dispatched to every provider.
///
/// Holds non-empty text and a per-provider result limit of at least one.
/// Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    text: String,
    limit: usize,
}

impl SearchQuery {
    /// Create a query, trimming surrounding whitespace from the text
    pub fn new(text: impl Into<String>, limit: usize) -> Result<Self, QueryError> {
        let text = text.into();
        let text = text.trim();
        if text.is_empty() {
            return Err(QueryError::EmptyText);
        }
        if limit == 0 {
            return Err(QueryError::ZeroLimit);
        }

        Ok(Self {
            text: text.to_string(),
            limit,
        })
    }

    /// The query text
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Maximum number of results requested from each provider
    pub fn limit(&self) -> usize {
        self.limit
    }
}

/// What one provider produced for one query.
///
/// A failed provider always carries an empty paper list.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderResult {
    source: SourceType,
    papers: Vec<Paper>,
    ok: bool,
    error: Option<String>,
    elapsed: Option<Duration>,
}

impl ProviderResult {
    /// A provider that answered; `papers` may be empty
    pub fn success(source: SourceType, papers: Vec<Paper>) -> Self {
        Self {
            source,
            papers,
            ok: true,
            error: None,
            elapsed: None,
        }
    }

    /// A provider that gave up after exhausting its policy
    pub fn failure(source: SourceType, error: impl Into<String>) -> Self {
        Self {
            source,
            papers: Vec::new(),
            ok: false,
            error: Some(error.into()),
            elapsed: None,
        }
    }

    /// Record how long the provider took
    pub fn with_elapsed(mut self, elapsed: Duration) -> Self {
        self.elapsed = Some(elapsed);
        self
    }

    pub fn source(&self) -> SourceType {
        self.source
    }

    pub fn papers(&self) -> &[Paper] {
        &self.papers
    }

    pub fn is_ok(&self) -> bool {
        self.ok
    }

    /// Failure message, if the provider failed
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn elapsed(&self) -> Option<Duration> {
        self.elapsed
    }

    pub fn into_papers(self) -> Vec<Paper> {
        self.papers
    }

    fn outcome(&self) -> ProviderOutcome {
        ProviderOutcome {
            source: self.source,
            ok: self.ok,
            papers: self.papers.len(),
            error: self.error.clone(),
            elapsed_ms: self.elapsed.map(|d| d.as_millis() as u64),
        }
    }
}

/// Per-provider diagnostics kept next to the merged papers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderOutcome {
    pub source: SourceType,
    pub ok: bool,
    /// Number of papers the provider returned before budgeting
    pub papers: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed_ms: Option<u64>,
}

/// Papers from all providers, merged in provider priority order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedResult {
    /// The query text that was dispatched
    pub query: String,

    /// Merged papers: Semantic Scholar first, then PubMed, then arXiv
    pub papers: Vec<Paper>,

    /// One entry per provider, in the same order
    pub outcomes: Vec<ProviderOutcome>,
}

impl AggregatedResult {
    /// Merge provider results; arrival order of `results` does not matter
    pub fn from_results(query: impl Into<String>, mut results: Vec<ProviderResult>) -> Self {
        results.sort_by_key(|r| r.source.priority());

        let outcomes = results.iter().map(ProviderResult::outcome).collect();
        let papers = results
            .into_iter()
            .flat_map(ProviderResult::into_papers)
            .collect();

        Self {
            query: query.into(),
            papers,
            outcomes,
        }
    }

    /// Keep at most `max_total` papers, preserving order
    pub fn truncate(mut self, max_total: usize) -> Self {
        self.papers = budget::truncate(self.papers, max_total);
        self
    }

    pub fn len(&self) -> usize {
        self.papers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.papers.is_empty()
    }

    /// True when no provider produced a usable answer
    pub fn all_failed(&self) -> bool {
        self.outcomes.iter().all(|o| !o.ok)
    }
}
