//! Retry utilities with exponential backoff for resilient API calls.

use std::time::Duration;
use tokio::time::{sleep, timeout};

use crate::sources::SourceError;

/// Configuration for retry behavior
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first one
    pub max_attempts: u32,
    /// Delay slept after the first failed attempt
    pub initial_delay: Duration,
    /// Upper bound for a single delay
    pub max_delay: Duration,
    /// Multiplier applied to the delay after every sleep
    pub backoff_multiplier: f64,
    /// Time allowed for one attempt (request plus body) before it counts as a timeout
    pub attempt_timeout: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(120),
            backoff_multiplier: 2.0,
            attempt_timeout: Duration::from_secs(30),
        }
    }
}

impl RetryConfig {
    /// Set the attempt budget
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Set the first backoff delay
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Set the per-attempt timeout
    pub fn attempt_timeout(mut self, limit: Duration) -> Self {
        self.attempt_timeout = limit;
        self
    }
}

/// Semantic Scholar: 3 attempts, 5s doubling, 10s per request
pub fn semantic_scholar_retry_config() -> RetryConfig {
    RetryConfig {
        max_attempts: 3,
        attempt_timeout: Duration::from_secs(10),
        ..RetryConfig::default()
    }
}

/// PubMed: 5 attempts per phase, 5s doubling, 20s per request
pub fn pubmed_retry_config() -> RetryConfig {
    RetryConfig {
        max_attempts: 5,
        attempt_timeout: Duration::from_secs(20),
        ..RetryConfig::default()
    }
}

/// arXiv: a single attempt
pub fn arxiv_retry_config() -> RetryConfig {
    RetryConfig {
        max_attempts: 1,
        attempt_timeout: Duration::from_secs(30),
        ..RetryConfig::default()
    }
}

/// Transient errors that should trigger a retry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransientError {
    /// Too many requests (429)
    RateLimited,
    /// The attempt did not complete in time
    Timeout,
    /// Connection-level failure
    Network,
    /// Unsuccessful HTTP status the provider treats as retryable
    Status(u16),
    /// Body that could not be decoded despite a success status
    Decode,
}

impl TransientError {
    /// Classify a SourceError; `None` means the error is permanent
    pub fn from_source_error(err: &SourceError) -> Option<Self> {
        match err {
            SourceError::RateLimit => Some(TransientError::RateLimited),
            SourceError::Timeout(_) => Some(TransientError::Timeout),
            SourceError::Network(_) => Some(TransientError::Network),
            SourceError::Status(code) => Some(TransientError::Status(*code)),
            SourceError::Decode(_) => Some(TransientError::Decode),
            _ => None,
        }
    }
}

/// Progress through one attempt sequence
#[derive(Debug)]
pub struct RetryState {
    /// Attempts made so far
    pub attempt: u32,
    /// Delay to sleep before the next attempt
    pub delay: Duration,
    /// Error from the most recent failed attempt
    pub last_error: Option<SourceError>,
}

impl RetryState {
    fn new(config: &RetryConfig) -> Self {
        Self {
            attempt: 0,
            delay: config.initial_delay,
            last_error: None,
        }
    }

    fn exhausted(&self, config: &RetryConfig) -> bool {
        self.attempt >= config.max_attempts.max(1)
    }

    fn backoff(&mut self, config: &RetryConfig) {
        let next = self.delay.as_secs_f64() * config.backoff_multiplier;
        self.delay = Duration::from_secs_f64(next.min(config.max_delay.as_secs_f64()));
    }

    fn into_error(self) -> SourceError {
        self.last_error
            .unwrap_or_else(|| SourceError::Other("retry loop ended without an attempt".to_string()))
    }
}

/// Execute an async operation with retry logic
///
/// Each attempt is bounded by `config.attempt_timeout`; an attempt that runs
/// out of time is a transient failure like any other. Transient failures sleep
/// the current delay and then multiply it. Permanent failures return at once.
///
/// # Arguments
///
/// * `label` - Name used in log lines (e.g. "PubMed search")
/// * `config` - Retry configuration
/// * `operation` - The async operation to execute
pub async fn with_retry<T, F, Fut>(
    label: &str,
    config: RetryConfig,
    mut operation: F,
) -> Result<T, SourceError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, SourceError>>,
{
    let mut state = RetryState::new(&config);

    loop {
        state.attempt += 1;

        let outcome = match timeout(config.attempt_timeout, operation()).await {
            Ok(outcome) => outcome,
            Err(_) => Err(SourceError::Timeout(format!(
                "no response within {:?}",
                config.attempt_timeout
            ))),
        };

        let error = match outcome {
            Ok(result) => {
                if state.attempt > 1 {
                    tracing::info!(
                        "{} succeeded on attempt {} after {} transient failures",
                        label,
                        state.attempt,
                        state.attempt - 1
                    );
                }
                return Ok(result);
            }
            Err(error) => error,
        };

        let Some(transient) = TransientError::from_source_error(&error) else {
            tracing::debug!("{} failed permanently on attempt {}: {}", label, state.attempt, error);
            return Err(error);
        };

        state.last_error = Some(error);

        if state.exhausted(&config) {
            tracing::warn!(
                "{} gave up after {} attempts ({:?})",
                label,
                state.attempt,
                transient
            );
            return Err(state.into_error());
        }

        tracing::debug!(
            "{}: {:?} on attempt {}/{}, retrying in {:?}",
            label,
            transient,
            state.attempt,
            config.max_attempts,
            state.delay
        );

        sleep(state.delay).await;
        state.backoff(&config);
    }
}
