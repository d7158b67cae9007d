//! # Research Aggregator
//!
//! Concurrent literature search across Semantic Scholar, PubMed and arXiv.
//!
//! Each provider is queried independently with its own retry policy, its raw
//! records are normalized into a common [`Paper`] shape, and the per-provider
//! lists are concatenated in a fixed priority order and cut down to a budget
//! before being handed to a synthesis step.
//!
//! ## Architecture
//!
//! - [`models`]: Core data structures (Paper, SearchQuery, ProviderResult, etc.)
//! - [`sources`]: Provider clients behind the [`Source`] trait, plus normalization
//! - [`aggregate`]: Concurrent fan-out over all sources and result budgeting
//! - [`pipeline`]: Handoff to external query-refinement and summarization steps
//! - [`utils`]: HTTP client and retry with exponential backoff
//! - [`config`]: Configuration management
//! - [`ui`]: Terminal output for the CLI

pub mod aggregate;
pub mod config;
pub mod models;
pub mod pipeline;
pub mod sources;
pub mod ui;
pub mod utils;

// Re-export commonly used types
pub use aggregate::Aggregator;
pub use models::{AggregatedResult, Paper, ProviderResult, SearchQuery, SourceType};
pub use sources::{Source, SourceError, SourceRegistry};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
