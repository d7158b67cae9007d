//! Basic usage of the research aggregator library.
//!
//! Run with: `cargo run --example basic_usage -- "gut microbiome and depression"`

use research_aggregator::aggregate::budget::DEFAULT_BUDGET;
use research_aggregator::{Aggregator, SearchQuery, SourceRegistry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("research_aggregator=info")
        .with_writer(std::io::stderr)
        .init();

    let text = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "gut microbiome and depression".to_string());

    let registry = SourceRegistry::new()?;
    println!("Querying {} providers for \"{}\"", registry.len(), text);

    let query = SearchQuery::new(text, 5)?;
    let result = Aggregator::new(&registry)
        .aggregate(&query)
        .await
        .truncate(DEFAULT_BUDGET);

    for outcome in &result.outcomes {
        match &outcome.error {
            None => println!("  {}: {} papers", outcome.source, outcome.papers),
            Some(err) => println!("  {}: failed ({})", outcome.source, err),
        }
    }

    println!();
    for (i, paper) in result.papers.iter().enumerate() {
        println!("{}. {}", i + 1, paper.title);
        println!("   {}", paper.url);
    }

    if result.is_empty() {
        println!("No papers available.");
    }

    Ok(())
}
