//! Terminal output helpers for the CLI.

use owo_colors::OwoColorize;
use std::io::IsTerminal;
use std::time::Duration;

use crate::models::{Paper, ProviderOutcome, SourceType};

/// Check if stdout is a terminal.
pub fn is_terminal() -> bool {
    std::io::stdout().is_terminal()
}

/// Icon shown next to each provider.
pub fn source_icon(source: SourceType) -> &'static str {
    match source {
        SourceType::SemanticScholar => "🧠",
        SourceType::PubMed => "🏥",
        SourceType::Arxiv => "📝",
    }
}

/// Status icons for provider outcomes.
pub fn status_icon(ok: bool) -> &'static str {
    if ok {
        "✓"
    } else {
        "✗"
    }
}

/// Print a section header.
pub fn print_section(title: &str) {
    println!();
    println!("{}", format!("━━━ {} ━━━", title).bold().cyan());
}

/// Print search results header.
pub fn print_search_header(query: &str, count: usize, duration: Duration) {
    println!();
    println!("🔍 Search results for: \"{}\"", query.cyan().bold());
    println!(
        "{} Kept {} papers in {:.2}s",
        "─".repeat(30).dimmed(),
        count.to_string().green().bold(),
        duration.as_secs_f64()
    );
}

/// Print one paper with a numbered heading.
pub fn print_paper(index: usize, paper: &Paper) {
    println!();
    println!("{}. {}", index, paper.title.blue().bold());
    println!("   {}", truncate_with_ellipsis(&paper.r#abstract, 200).dimmed());
    if paper.has_url() {
        println!("   {}", paper.url.underline());
    } else {
        println!("   {}", paper.url.yellow());
    }
}

/// Print one line per provider with its outcome.
pub fn print_outcomes(outcomes: &[ProviderOutcome]) {
    print_section("Providers");
    for outcome in outcomes {
        let icon = status_icon(outcome.ok);
        let elapsed = outcome
            .elapsed_ms
            .map(|ms| format!(" in {}ms", ms))
            .unwrap_or_default();

        if outcome.ok {
            println!(
                "{} {} {}: {} papers{}",
                icon.green().bold(),
                source_icon(outcome.source),
                outcome.source,
                outcome.papers,
                elapsed.dimmed()
            );
        } else {
            println!(
                "{} {} {}: {}{}",
                icon.red().bold(),
                source_icon(outcome.source),
                outcome.source,
                outcome.error.as_deref().unwrap_or("failed").red(),
                elapsed.dimmed()
            );
        }
    }
}

/// Truncate text to at most `max_chars` characters, marking the cut with "...".
pub fn truncate_with_ellipsis(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    if max_chars <= 3 {
        return "...".to_string();
    }

    let kept: String = text.chars().take(max_chars - 3).collect();
    format!("{}...", kept.trim_end())
}
