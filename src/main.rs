//! docdex - Main CLI Entry Point

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use docdex::cli::{Args, Commands};
use docdex::config::Config;
use docdex::ollama::OllamaClient;
use docdex::search::{Candidate, SearchOutcome, SearchPipeline};
use docdex::store::{DocumentStore, ScanOutcome, Scanner};
use docdex::SearchError;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let config = Config::load()?;
    let base_url = args.ollama_url(&config.ollama.base_url);

    let db_path = match &args.db {
        Some(path) => path.clone(),
        None => Config::db_path()?,
    };
    let store = Arc::new(DocumentStore::open(&db_path)?);

    let client = Arc::new(OllamaClient::new(
        &base_url,
        &config.ollama.generation_model,
        &config.ollama.embedding_model,
    )?);

    let mut pipeline_config = config.pipeline_config();
    if let Some(limit) = args.limit {
        pipeline_config.result_limit = limit;
    }
    let pipeline = SearchPipeline::new(
        client.clone(),
        client.clone(),
        store.clone(),
        store.clone(),
        pipeline_config,
    );

    match args.command {
        Commands::Index { dir } => {
            if !client.is_available().await {
                println!(
                    "{}",
                    "Ollama is not reachable; indexing without embeddings.".yellow()
                );
            }
            let scanner = Scanner::new(store.clone(), client.clone());

            let spinner = ProgressBar::new_spinner();
            spinner.set_style(ProgressStyle::with_template("{spinner} {msg}")?);
            spinner.set_message(format!("Indexing {}", dir.display()));
            spinner.enable_steady_tick(Duration::from_millis(100));

            let outcome = scanner.index_directory(&dir).await?;
            spinner.finish_and_clear();
            print_scan_outcome(&outcome);
        }

        Commands::Search { query } => {
            let results = unwrap_or_usage(pipeline.search_lexical(&query).await)?;
            print_results(&results);
        }

        Commands::Vsearch { query, debug } => {
            require_ollama(&client).await;
            let outcome = unwrap_or_usage(pipeline.search_vector(&query).await)?;
            if debug {
                print_debug(&outcome);
            }
            print_results(&outcome.results);
        }

        Commands::Query { query, debug } => {
            require_ollama(&client).await;
            let outcome = unwrap_or_usage(pipeline.search_combined(&query).await)?;
            if debug {
                print_debug(&outcome);
            }
            print_results(&outcome.results);
        }

        Commands::Status => {
            let stats = store.stats()?;
            println!("Index:     {}", db_path.display());
            println!("Documents: {}", stats.documents);
            println!("Embedded:  {}", stats.embedded);
            if client.is_available().await {
                println!("Ollama:    {} ({base_url})", "available".green());
            } else {
                println!("Ollama:    {} ({base_url})", "unreachable".red());
            }
        }
    }

    Ok(())
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Turn a too-short query into a usage error with a distinct exit code;
/// let everything else bubble up.
fn unwrap_or_usage<T>(result: docdex::Result<T>) -> Result<T> {
    match result {
        Ok(value) => Ok(value),
        Err(SearchError::QueryTooShort { min, got }) => {
            eprintln!(
                "{}",
                format!("Query too short: need at least {min} characters, got {got}.").yellow()
            );
            std::process::exit(2);
        }
        Err(err) => Err(err.into()),
    }
}

async fn require_ollama(client: &OllamaClient) {
    if !client.is_available().await {
        eprintln!("{}", "Ollama is not running! Start with: ollama serve".red());
        std::process::exit(1);
    }
}

fn print_results(results: &[Candidate]) {
    if results.is_empty() {
        println!("{}", "No matching documents.".yellow());
        return;
    }

    for (at, result) in results.iter().enumerate() {
        println!(
            "{:>2}. {} {}",
            at + 1,
            result.title.bold(),
            format!("({:.3})", result.score).dimmed()
        );
        println!("    {}", result.path.blue());
        let line = snippet(&result.body);
        if !line.is_empty() {
            println!("    {}", line.dimmed());
        }
    }
}

fn print_debug(outcome: &SearchOutcome) {
    println!("{}", "Expanded queries:".bold());
    for (at, variant) in outcome.debug.variants.iter().enumerate() {
        let marker = if at == 0 { " (original)" } else { "" };
        println!("  {}. {variant}{marker}", at + 1);
    }
    println!("{} {}", "Candidates:".bold(), outcome.debug.fused_count);
    println!();
}

fn print_scan_outcome(outcome: &ScanOutcome) {
    println!(
        "{} {} indexed, {} unchanged, {} removed",
        "Done:".green().bold(),
        outcome.indexed,
        outcome.unchanged,
        outcome.removed
    );
    if outcome.embedded > 0 || outcome.embed_failures > 0 {
        println!(
            "Embeddings: {} stored, {} failed",
            outcome.embedded, outcome.embed_failures
        );
    }
}

/// First contentful line of the body, trimmed for display.
fn snippet(body: &str) -> String {
    const MAX_SNIPPET_CHARS: usize = 120;

    let line = body
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty() && !line.starts_with('#'))
        .unwrap_or("");

    if line.chars().count() <= MAX_SNIPPET_CHARS {
        return line.to_string();
    }
    let truncated: String = line.chars().take(MAX_SNIPPET_CHARS).collect();
    format!("{truncated}…")
}
