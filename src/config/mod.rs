//! Configuration management.
//!
//! Settings come from an optional TOML file, overlaid by environment
//! variables prefixed with `RESEARCH_AGGREGATOR__` (sections separated by a
//! double underscore, e.g. `RESEARCH_AGGREGATOR__AGGREGATION__MAX_TOTAL=8`).
//!
//! # Configuration File Format
//!
//! ```toml
//! [api_keys]
//! semantic_scholar = "your-api-key"
//! ncbi = "your-ncbi-key"
//!
//! [semantic_scholar]
//! timeout_secs = 10
//! max_attempts = 3
//! initial_delay_ms = 5000
//!
//! [pubmed]
//! max_attempts = 5
//!
//! [arxiv]
//! max_attempts = 1
//!
//! [aggregation]
//! per_provider_limit = 5
//! max_total = 5
//! query_deadline_secs = 60
//!
//! [logging]
//! level = "info"
//! format = "json"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::aggregate::budget::DEFAULT_BUDGET;
use crate::utils::{
    arxiv_retry_config, pubmed_retry_config, semantic_scholar_retry_config, RetryConfig,
};

/// Prefix for environment overrides
pub const ENV_PREFIX: &str = "RESEARCH_AGGREGATOR";

/// File name looked up by [`find_config_file`]
pub const CONFIG_FILE_NAME: &str = "research-aggregator.toml";

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// API keys for the providers that accept one
    pub api_keys: ApiKeys,

    /// Semantic Scholar overrides
    pub semantic_scholar: ProviderConfig,

    /// PubMed overrides
    pub pubmed: ProviderConfig,

    /// arXiv overrides
    pub arxiv: ProviderConfig,

    /// Fan-out and budget settings
    pub aggregation: AggregationConfig,

    /// Log level and format for the binary
    pub logging: LoggingConfig,
}

/// API keys for external services
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiKeys {
    /// Semantic Scholar API key (optional, for higher rate limits)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semantic_scholar: Option<String>,

    /// NCBI E-utilities key (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ncbi: Option<String>,
}

impl Default for ApiKeys {
    fn default() -> Self {
        Self {
            semantic_scholar: std::env::var("SEMANTIC_SCHOLAR_API_KEY").ok(),
            ncbi: std::env::var("NCBI_API_KEY").ok(),
        }
    }
}

/// Per-provider overrides; unset values keep the provider's own defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_delay_ms: Option<u64>,

    /// API root, mostly useful for tests and proxies
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl ProviderConfig {
    /// Apply these overrides on top of a provider's default retry policy
    pub fn apply(&self, mut retry: RetryConfig) -> RetryConfig {
        if let Some(attempts) = self.max_attempts {
            retry = retry.max_attempts(attempts);
        }
        if let Some(ms) = self.initial_delay_ms {
            retry = retry.initial_delay(Duration::from_millis(ms));
        }
        if let Some(secs) = self.timeout_secs {
            retry = retry.attempt_timeout(Duration::from_secs(secs));
        }
        retry
    }
}

/// Aggregation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationConfig {
    /// Results requested from each provider
    pub per_provider_limit: usize,

    /// Papers kept after merging
    pub max_total: usize,

    /// Bound on the whole fan-out; unset waits for every provider
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_deadline_secs: Option<u64>,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            per_provider_limit: 5,
            max_total: DEFAULT_BUDGET,
            query_deadline_secs: None,
        }
    }
}

impl AggregationConfig {
    pub fn deadline(&self) -> Option<Duration> {
        self.query_deadline_secs.map(Duration::from_secs)
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,

    /// `"json"` for structured output, anything else for human-readable lines
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: None,
        }
    }
}

impl LoggingConfig {
    pub fn is_json(&self) -> bool {
        self.format
            .as_deref()
            .is_some_and(|f| f.eq_ignore_ascii_case("json"))
    }
}

impl Config {
    /// A default configuration without API keys, suitable for writing to disk
    pub fn template() -> Self {
        Self {
            api_keys: ApiKeys {
                semantic_scholar: None,
                ncbi: None,
            },
            ..Self::default()
        }
    }

    /// Effective Semantic Scholar retry policy
    pub fn semantic_scholar_retry(&self) -> RetryConfig {
        self.semantic_scholar.apply(semantic_scholar_retry_config())
    }

    /// Effective PubMed retry policy (applied to each phase)
    pub fn pubmed_retry(&self) -> RetryConfig {
        self.pubmed.apply(pubmed_retry_config())
    }

    /// Effective arXiv retry policy
    pub fn arxiv_retry(&self) -> RetryConfig {
        self.arxiv.apply(arxiv_retry_config())
    }

    /// Reject settings that could never produce a valid query
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.aggregation.per_provider_limit == 0 {
            return Err(ConfigError::Invalid(
                "aggregation.per_provider_limit must be at least 1".to_string(),
            ));
        }

        for (name, provider) in [
            ("semantic_scholar", &self.semantic_scholar),
            ("pubmed", &self.pubmed),
            ("arxiv", &self.arxiv),
        ] {
            if provider.max_attempts == Some(0) {
                return Err(ConfigError::Invalid(format!(
                    "{}.max_attempts must be at least 1",
                    name
                )));
            }
            if provider.timeout_secs == Some(0) {
                return Err(ConfigError::Invalid(format!(
                    "{}.timeout_secs must be at least 1",
                    name
                )));
            }
        }

        Ok(())
    }

    /// Save configuration to a TOML file, creating parent directories
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Load configuration from an optional TOML file plus environment overrides
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let mut builder = config::Config::builder();

    if let Some(path) = path {
        builder = builder.add_source(config::File::from(path).format(config::FileFormat::Toml));
    }

    let settings = builder
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let config: Config = settings.try_deserialize()?;
    config.validate()?;

    tracing::debug!("Loaded configuration (file: {:?})", path);
    Ok(config)
}

/// Candidate locations for the config file, in lookup order
pub fn config_file_candidates() -> Vec<PathBuf> {
    let mut candidates = vec![PathBuf::from(CONFIG_FILE_NAME)];
    if let Some(dir) = dirs::config_dir() {
        candidates.push(dir.join("research-aggregator").join("config.toml"));
    }
    candidates
}

/// First existing config file, if any
pub fn find_config_file() -> Option<PathBuf> {
    config_file_candidates().into_iter().find(|p| p.is_file())
}
