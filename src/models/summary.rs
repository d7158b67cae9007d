//! Structured synthesis output produced from the budgeted papers.

use serde::{Deserialize, Serialize};

/// One finding drawn from a paper
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Insight {
    pub title: String,
    pub insight: String,
    pub url: String,
}

/// Rough share of papers agreeing with a specific query, as percentages
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsensusMeter {
    #[serde(default)]
    pub yes: Option<String>,
    #[serde(default)]
    pub possibly: Option<String>,
    #[serde(default)]
    pub no: Option<String>,
}

/// Summary returned by the synthesis step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchSummary {
    #[serde(default)]
    pub insights: Vec<Insight>,
    /// Only set for specific queries
    #[serde(default)]
    pub consensus_meter: Option<ConsensusMeter>,
    pub short_summary: String,
    pub conclusion: String,
}

impl ResearchSummary {
    /// The fixed summary used when no provider returned papers
    pub fn no_papers() -> Self {
        Self {
            insights: Vec::new(),
            consensus_meter: None,
            short_summary: "No papers available for summarization.".to_string(),
            conclusion: "No conclusion available due to lack of papers.".to_string(),
        }
    }

    /// Unique insight URLs in first-seen order
    pub fn sources(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for insight in &self.insights {
            if !seen.contains(&insight.url.as_str()) {
                seen.push(insight.url.as_str());
            }
        }
        seen
    }
}
