//! Concurrent fan-out of one query to every registered provider.
//!
//! Each provider runs in its own task. The coordinator waits for all of them
//! (or for the optional query deadline), then merges their papers in provider
//! priority order regardless of which finished first. A provider that fails,
//! panics or misses the deadline contributes no papers and never affects the
//! others.

pub mod budget;

use futures_util::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{timeout_at, Instant};

use crate::models::{AggregatedResult, ProviderResult, SearchQuery, SourceType};
use crate::sources::{Source, SourceRegistry};

/// Runs a query against every source and merges the results
#[derive(Debug, Clone)]
pub struct Aggregator {
    sources: Vec<Arc<dyn Source>>,
    deadline: Option<Duration>,
}

impl Aggregator {
    /// Create an aggregator over the sources in `registry`
    pub fn new(registry: &SourceRegistry) -> Self {
        Self {
            sources: registry.all().cloned().collect(),
            deadline: None,
        }
    }

    /// Bound the whole aggregation; providers still running are abandoned
    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    /// Query all providers concurrently and merge their papers.
    ///
    /// Never fails: when every provider fails the result is simply empty.
    pub async fn aggregate(&self, query: &SearchQuery) -> AggregatedResult {
        let start = Instant::now();
        let deadline = self.deadline.map(|d| start + d);

        tracing::debug!(
            "Dispatching '{}' to {} providers (limit {})",
            query.text(),
            self.sources.len(),
            query.limit()
        );

        let handles: Vec<_> = self
            .sources
            .iter()
            .map(|source| {
                let source = Arc::clone(source);
                let query = query.clone();
                let source_type = source.source_type();
                let handle = tokio::spawn(async move { source.fetch(&query).await });
                (source_type, handle)
            })
            .collect();

        let results = join_all(handles.into_iter().map(|(source_type, mut handle)| async move {
            let joined = match deadline {
                Some(at) => match timeout_at(at, &mut handle).await {
                    Ok(joined) => joined,
                    Err(_) => {
                        handle.abort();
                        tracing::warn!("{} did not finish before the query deadline", source_type);
                        return ProviderResult::failure(source_type, "query deadline elapsed")
                            .with_elapsed(start.elapsed());
                    }
                },
                None => handle.await,
            };

            match joined {
                Ok(result) => result,
                Err(e) => task_failure(source_type, e),
            }
        }))
        .await;

        let merged = AggregatedResult::from_results(query.text(), results);

        let succeeded = merged.outcomes.iter().filter(|o| o.ok).count();
        tracing::info!(
            "Aggregated {} papers for '{}' from {}/{} providers in {:?}",
            merged.len(),
            query.text(),
            succeeded,
            merged.outcomes.len(),
            start.elapsed()
        );

        merged
    }
}

fn task_failure(source_type: SourceType, err: tokio::task::JoinError) -> ProviderResult {
    if err.is_panic() {
        tracing::error!("{} provider task panicked", source_type);
        ProviderResult::failure(source_type, "provider task panicked")
    } else {
        tracing::warn!("{} provider task was cancelled", source_type);
        ProviderResult::failure(source_type, "provider task cancelled")
    }
}
