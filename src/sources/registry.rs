//! Registry of the providers a query fans out to.

use std::sync::Arc;

use super::{ArxivSource, PubMedSource, SemanticScholarSource, Source, SourceError};
use crate::config::Config;
use crate::models::SourceType;
use crate::utils::HttpClient;

/// Registry for all available research sources
///
/// Sources are kept in provider priority order, which is also the order their
/// papers appear in merged results. At most one source per [`SourceType`].
#[derive(Debug, Clone)]
pub struct SourceRegistry {
    sources: Vec<Arc<dyn Source>>,
}

impl SourceRegistry {
    /// Create a registry with the three providers and their default policies
    pub fn new() -> Result<Self, SourceError> {
        Self::from_config(&Config::default())
    }

    /// Create a registry with no sources
    pub fn empty() -> Self {
        Self {
            sources: Vec::new(),
        }
    }

    /// Build the three providers from configuration, sharing one HTTP client
    pub fn from_config(config: &Config) -> Result<Self, SourceError> {
        let client = HttpClient::new()?;
        let mut registry = Self::empty();

        let mut semantic = SemanticScholarSource::with_client(client.clone())
            .api_key(config.api_keys.semantic_scholar.clone())
            .retry_config(config.semantic_scholar_retry());
        if let Some(ref url) = config.semantic_scholar.base_url {
            semantic = semantic.base_url(url.as_str());
        }

        let mut pubmed = PubMedSource::with_client(client.clone())
            .api_key(config.api_keys.ncbi.clone())
            .retry_config(config.pubmed_retry());
        if let Some(ref url) = config.pubmed.base_url {
            pubmed = pubmed.base_url(url.as_str());
        }

        let mut arxiv = ArxivSource::with_client(client).retry_config(config.arxiv_retry());
        if let Some(ref url) = config.arxiv.base_url {
            arxiv = arxiv.base_url(url.as_str());
        }

        registry.register(Arc::new(semantic));
        registry.register(Arc::new(pubmed));
        registry.register(Arc::new(arxiv));

        Ok(registry)
    }

    /// Register a source, replacing any existing source of the same type
    pub fn register(&mut self, source: Arc<dyn Source>) {
        let source_type = source.source_type();
        match self
            .sources
            .iter_mut()
            .find(|s| s.source_type() == source_type)
        {
            Some(slot) => *slot = source,
            None => {
                self.sources.push(source);
                self.sources.sort_by_key(|s| s.source_type().priority());
            }
        }
    }

    /// Get the source for a provider
    pub fn get(&self, source_type: SourceType) -> Option<&Arc<dyn Source>> {
        self.sources.iter().find(|s| s.source_type() == source_type)
    }

    /// All registered sources in priority order
    pub fn all(&self) -> impl Iterator<Item = &Arc<dyn Source>> {
        self.sources.iter()
    }

    /// Check if a provider is registered
    pub fn has(&self, source_type: SourceType) -> bool {
        self.get(source_type).is_some()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}
