use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use research_aggregator::config::{config_file_candidates, find_config_file, load_config, Config};
use research_aggregator::models::SearchQuery;
use research_aggregator::sources::SourceRegistry;
use research_aggregator::{ui, AggregatedResult, Aggregator};
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Research Aggregator - Search Semantic Scholar, PubMed and arXiv at once
#[derive(Parser, Debug)]
#[command(name = "research-aggregator")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = "hongkongkiwi")]
#[command(about = "Search Semantic Scholar, PubMed and arXiv concurrently and merge the results", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (can be used multiple times for more verbosity: -v, -vv, -vvv)
    #[arg(long, short, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Output format
    #[arg(long, short, value_enum, global = true, default_value_t = OutputFormat::Auto)]
    output: OutputFormat,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Output format for results
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    /// Automatic based on terminal (plain if TTY, JSON otherwise)
    Auto,
    /// JSON format (machine-readable)
    Json,
    /// Plain text format
    Plain,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Search all providers and print the merged, budgeted papers
    #[command(alias = "s")]
    Search {
        /// Search query string
        query: String,

        /// Results requested from each provider
        #[arg(long, short)]
        limit: Option<usize>,

        /// Papers kept after merging
        #[arg(long)]
        max_total: Option<usize>,

        /// Give up on providers still running after this many seconds
        #[arg(long)]
        deadline: Option<u64>,
    },

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Write a default configuration file
    Init {
        /// Where to write it (defaults to the platform config directory)
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the effective configuration
    Show,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().or_else(find_config_file);
    let config = load_config(config_path.as_deref()).with_context(|| match &config_path {
        Some(path) => format!("Failed to load config from {}", path.display()),
        None => "Failed to load config from environment".to_string(),
    })?;

    init_tracing(&cli, &config);

    if let Some(ref path) = config_path {
        tracing::debug!("Using config file: {}", path.display());
    }

    match cli.command {
        Commands::Search {
            query,
            limit,
            max_total,
            deadline,
        } => {
            let mut config = config;
            if let Some(limit) = limit {
                config.aggregation.per_provider_limit = limit;
            }
            if let Some(max_total) = max_total {
                config.aggregation.max_total = max_total;
            }
            if deadline.is_some() {
                config.aggregation.query_deadline_secs = deadline;
            }

            run_search(&config, &query, cli.output).await
        }
        Commands::Config { action } => match action {
            ConfigAction::Init { path, force } => init_config(path, force),
            ConfigAction::Show => show_config(&config),
        },
    }
}

/// Install the tracing subscriber; `RUST_LOG` takes precedence over flags and config
fn init_tracing(cli: &Cli, config: &Config) {
    let level = if cli.quiet {
        "error".to_string()
    } else {
        match cli.verbose {
            0 => config.logging.level.clone(),
            1 => "debug".to_string(),
            _ => "trace".to_string(),
        }
    };

    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| format!("research_aggregator={}", level)),
    );
    let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    if config.logging.is_json() {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer.json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

async fn run_search(config: &Config, query: &str, format: OutputFormat) -> Result<()> {
    let query = SearchQuery::new(query, config.aggregation.per_provider_limit)?;
    let registry = SourceRegistry::from_config(config)?;
    let aggregator = Aggregator::new(&registry).with_deadline(config.aggregation.deadline());

    let start = Instant::now();
    let result = aggregator
        .aggregate(&query)
        .await
        .truncate(config.aggregation.max_total);

    output_result(&result, format, start.elapsed())
}

fn output_result(
    result: &AggregatedResult,
    format: OutputFormat,
    elapsed: std::time::Duration,
) -> Result<()> {
    let actual_format = if format == OutputFormat::Auto {
        if ui::is_terminal() {
            OutputFormat::Plain
        } else {
            OutputFormat::Json
        }
    } else {
        format
    };

    match actual_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(result)?);
        }
        OutputFormat::Plain | OutputFormat::Auto => {
            ui::print_search_header(&result.query, result.len(), elapsed);
            if result.is_empty() {
                println!();
                println!("No papers available.");
            }
            for (i, paper) in result.papers.iter().enumerate() {
                ui::print_paper(i + 1, paper);
            }
            ui::print_outcomes(&result.outcomes);
        }
    }

    Ok(())
}

fn init_config(path: Option<PathBuf>, force: bool) -> Result<()> {
    let path = match path {
        Some(path) => path,
        None => config_file_candidates()
            .pop()
            .context("No location available for the config file")?,
    };

    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }

    Config::template()
        .save(&path)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    println!("Wrote default configuration to {}", path.display());
    Ok(())
}

fn show_config(config: &Config) -> Result<()> {
    let mut shown = config.clone();
    for key in [&mut shown.api_keys.semantic_scholar, &mut shown.api_keys.ncbi] {
        if key.is_some() {
            *key = Some("********".to_string());
        }
    }

    print!("{}", toml::to_string_pretty(&shown)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_search_args() {
        let cli = Cli::parse_from([
            "research-aggregator",
            "search",
            "gut microbiome",
            "--limit",
            "3",
            "--max-total",
            "4",
            "-o",
            "json",
        ]);

        assert_eq!(cli.output, OutputFormat::Json);
        match cli.command {
            Commands::Search {
                query,
                limit,
                max_total,
                deadline,
            } => {
                assert_eq!(query, "gut microbiome");
                assert_eq!(limit, Some(3));
                assert_eq!(max_total, Some(4));
                assert_eq!(deadline, None);
            }
            _ => panic!("expected search"),
        }
    }

    #[test]
    fn test_config_init_writes_template() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        init_config(Some(path.clone()), false).unwrap();
        assert!(path.exists());
        assert!(init_config(Some(path.clone()), false).is_err());
        assert!(init_config(Some(path), true).is_ok());
    }
}
