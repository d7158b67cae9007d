//! Paper model representing a normalized search hit from any provider.

use serde::{Deserialize, Serialize};

/// Placeholder used when a provider record has no title
pub const NO_TITLE: &str = "No title available";

/// Placeholder used when a provider record has no abstract
pub const NO_ABSTRACT: &str = "No abstract available";

/// Placeholder used when a provider record has no URL
pub const NO_URL: &str = "No URL available";

/// The provider a result came from
///
/// Variants are declared in aggregation priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    SemanticScholar,
    PubMed,
    Arxiv,
}

impl SourceType {
    /// All providers in the order their results are concatenated
    pub const PRIORITY: [SourceType; 3] = [
        SourceType::SemanticScholar,
        SourceType::PubMed,
        SourceType::Arxiv,
    ];

    /// Returns the display name of the source
    pub fn name(&self) -> &'static str {
        match self {
            SourceType::SemanticScholar => "Semantic Scholar",
            SourceType::PubMed => "PubMed",
            SourceType::Arxiv => "arXiv",
        }
    }

    /// Returns the short source identifier
    pub fn id(&self) -> &'static str {
        match self {
            SourceType::SemanticScholar => "semantic",
            SourceType::PubMed => "pubmed",
            SourceType::Arxiv => "arxiv",
        }
    }

    /// Position of this source in the concatenation order
    pub fn priority(&self) -> usize {
        match self {
            SourceType::SemanticScholar => 0,
            SourceType::PubMed => 1,
            SourceType::Arxiv => 2,
        }
    }
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A research paper in the shape consumed by synthesis.
///
/// All three fields are always populated. Providers that lack a value get the
/// matching placeholder ([`NO_TITLE`], [`NO_ABSTRACT`], [`NO_URL`]) instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paper {
    /// Paper title
    pub title: String,

    /// Abstract text
    pub r#abstract: String,

    /// Paper page URL
    pub url: String,
}

impl Paper {
    /// Create a paper from already-normalized fields
    pub fn new(
        title: impl Into<String>,
        abstract_text: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            r#abstract: abstract_text.into(),
            url: url.into(),
        }
    }

    /// Whether the URL is a real link rather than the placeholder
    pub fn has_url(&self) -> bool {
        self.url != NO_URL
    }
}
