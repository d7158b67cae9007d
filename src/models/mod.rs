//! Core data models for papers, queries and aggregation results.

mod paper;
mod search;
mod summary;

pub use paper::{Paper, SourceType, NO_ABSTRACT, NO_TITLE, NO_URL};
pub use search::{AggregatedResult, ProviderOutcome, ProviderResult, QueryError, SearchQuery};
pub use summary::{ConsensusMeter, Insight, ResearchSummary};
