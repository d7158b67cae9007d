//! Mock source for testing purposes.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::models::{Paper, SearchQuery, SourceType};
use crate::sources::{Source, SourceError};

#[derive(Debug, Clone)]
enum Behavior {
    Return(Vec<Paper>),
    Fail(SourceError),
    Panic,
}

/// A mock source that answers with a predefined response.
///
/// Stands in for any provider type, so it can be registered in place of a
/// real client.
#[derive(Debug)]
pub struct MockSource {
    source_type: SourceType,
    behavior: Behavior,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl MockSource {
    fn with_behavior(source_type: SourceType, behavior: Behavior) -> Self {
        Self {
            source_type,
            behavior,
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// A source that returns `papers`, ignoring the query limit
    pub fn returning(source_type: SourceType, papers: Vec<Paper>) -> Self {
        Self::with_behavior(source_type, Behavior::Return(papers))
    }

    /// A source whose search always fails with `error`
    pub fn failing(source_type: SourceType, error: SourceError) -> Self {
        Self::with_behavior(source_type, Behavior::Fail(error))
    }

    /// A source whose search panics
    pub fn panicking(source_type: SourceType) -> Self {
        Self::with_behavior(source_type, Behavior::Panic)
    }

    /// Sleep before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of times `search` has been called
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Source for MockSource {
    fn source_type(&self) -> SourceType {
        self.source_type
    }

    async fn search(&self, _query: &SearchQuery) -> Result<Vec<Paper>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match &self.behavior {
            Behavior::Return(papers) => Ok(papers.clone()),
            Behavior::Fail(error) => Err(error.clone()),
            Behavior::Panic => panic!("mock {} source panicked", self.source_type),
        }
    }
}

/// Helper function to create a mock paper for testing.
pub fn make_paper(id: &str) -> Paper {
    Paper::new(
        id.to_string(),
        format!("Abstract of {}", id),
        format!("https://example.com/{}", id),
    )
}
