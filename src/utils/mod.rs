//! Utility modules supporting provider clients.
//!
//! - [`HttpClient`]: shared reqwest client with sensible defaults
//! - [`RetryConfig`]: configuration for retry logic with exponential backoff
//! - [`with_retry`]: execute an operation with automatic retry on transient errors
//!
//! # Retry with Backoff
//!
//! ```rust,no_run
//! use research_aggregator::sources::SourceError;
//! use research_aggregator::utils::{with_retry, RetryConfig};
//!
//! # async fn fetch_data() -> Result<String, SourceError> { Ok("data".to_string()) }
//! # #[tokio::main]
//! # async fn main() -> Result<(), SourceError> {
//! let config = RetryConfig::default().max_attempts(3);
//! let result = with_retry("example", config, || fetch_data()).await?;
//! # Ok(())
//! # }
//! ```

mod http;
mod retry;

pub use http::HttpClient;
pub use retry::{
    arxiv_retry_config, pubmed_retry_config, semantic_scholar_retry_config, with_retry,
    RetryConfig, RetryState, TransientError,
};
