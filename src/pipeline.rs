//! End-to-end research flow: refine, aggregate, budget, summarize.
//!
//! Query refinement and summarization are external capabilities. They are
//! modelled as traits so any backend (an LLM, a rules engine, a test double)
//! can be plugged in around the aggregation core.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;

use crate::aggregate::{budget, Aggregator};
use crate::models::{Paper, ProviderOutcome, QueryError, ResearchSummary, SearchQuery};

/// Turns a user question into a search query string
#[async_trait]
pub trait QueryRefiner: Send + Sync {
    async fn refine(&self, raw: &str) -> Result<String, PipelineError>;
}

/// Produces a structured summary from the budgeted papers
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(
        &self,
        query: &str,
        papers: &[Paper],
    ) -> Result<ResearchSummary, PipelineError>;
}

/// Refiner that uses the raw text as-is, minus surrounding whitespace
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughRefiner;

#[async_trait]
impl QueryRefiner for PassthroughRefiner {
    async fn refine(&self, raw: &str) -> Result<String, PipelineError> {
        Ok(raw.trim().to_string())
    }
}

/// Errors raised by the pipeline's collaborators
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Query refinement failed: {0}")]
    Refine(String),

    #[error("Summarization failed: {0}")]
    Summarize(String),

    #[error("Invalid query: {0}")]
    Query(#[from] QueryError),
}

/// Everything one pipeline run produced
#[derive(Debug, Clone, Serialize)]
pub struct ResearchOutcome {
    pub refined_query: String,
    pub papers: Vec<Paper>,
    pub outcomes: Vec<ProviderOutcome>,
    pub summary: ResearchSummary,
}

/// Wires a refiner and a summarizer around an [`Aggregator`]
pub struct ResearchPipeline {
    aggregator: Aggregator,
    refiner: Arc<dyn QueryRefiner>,
    summarizer: Arc<dyn Summarizer>,
    per_provider_limit: usize,
    max_total: usize,
}

impl ResearchPipeline {
    pub fn new(aggregator: Aggregator, summarizer: Arc<dyn Summarizer>) -> Self {
        Self {
            aggregator,
            refiner: Arc::new(PassthroughRefiner),
            summarizer,
            per_provider_limit: 5,
            max_total: budget::DEFAULT_BUDGET,
        }
    }

    pub fn refiner(mut self, refiner: Arc<dyn QueryRefiner>) -> Self {
        self.refiner = refiner;
        self
    }

    pub fn per_provider_limit(mut self, limit: usize) -> Self {
        self.per_provider_limit = limit;
        self
    }

    pub fn max_total(mut self, max_total: usize) -> Self {
        self.max_total = max_total;
        self
    }

    /// Run one research request.
    ///
    /// Provider failures never surface here; if nothing comes back the
    /// summarizer is skipped and [`ResearchSummary::no_papers`] is returned.
    pub async fn run(&self, raw: &str) -> Result<ResearchOutcome, PipelineError> {
        if raw.trim().is_empty() {
            return Err(QueryError::EmptyText.into());
        }

        let refined = self.refiner.refine(raw).await?;
        tracing::debug!("Refined '{}' into '{}'", raw, refined);

        let query = SearchQuery::new(refined, self.per_provider_limit)?;
        let result = self
            .aggregator
            .aggregate(&query)
            .await
            .truncate(self.max_total);

        let summary = if result.is_empty() {
            tracing::info!("No papers for '{}'; skipping summarization", query.text());
            ResearchSummary::no_papers()
        } else {
            self.summarizer
                .summarize(query.text(), &result.papers)
                .await?
        };

        Ok(ResearchOutcome {
            refined_query: query.text().to_string(),
            papers: result.papers,
            outcomes: result.outcomes,
            summary,
        })
    }
}
