//! Command-line argument parsing for docdex
//!
//! Provides clap-based CLI with subcommands for indexing and the three
//! search modes.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// docdex - hybrid local document search powered by Ollama
#[derive(Parser, Debug)]
#[command(name = "docdex")]
#[command(version)]
#[command(about = "Hybrid local document search powered by Ollama", long_about = None)]
pub struct Args {
    /// Ollama host (overrides the configured base URL)
    #[arg(long)]
    pub host: Option<String>,

    /// Ollama port (overrides the configured base URL)
    #[arg(long)]
    pub port: Option<u16>,

    /// Index database path (defaults to ~/.docdex/index.db)
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Maximum number of results to return
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,

    /// Verbosity level: default (warn), -v (info), -vv (debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Index a directory of documents into the local corpus
    Index {
        /// Directory to index
        dir: PathBuf,
    },

    /// Full-text (BM25) search, no model calls
    Search {
        /// Search query
        query: String,
    },

    /// Semantic (embedding) search across expanded query variants
    Vsearch {
        /// Search query
        query: String,

        /// Print the expanded query list and candidate count
        #[arg(long)]
        debug: bool,
    },

    /// Combined hybrid search with LLM reranking
    Query {
        /// Search query
        query: String,

        /// Print the expanded query list and fused-candidate count
        #[arg(long)]
        debug: bool,
    },

    /// Show corpus statistics and Ollama availability
    Status,
}

impl Args {
    /// Ollama base URL: CLI host/port flags win over the configured value.
    pub fn ollama_url(&self, configured: &str) -> String {
        if self.host.is_none() && self.port.is_none() {
            return configured.to_string();
        }
        format!(
            "http://{}:{}",
            self.host.as_deref().unwrap_or("127.0.0.1"),
            self.port.unwrap_or(11434)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_search_command() {
        let args = Args::parse_from(["docdex", "search", "borrow checker"]);
        match args.command {
            Commands::Search { query } => assert_eq!(query, "borrow checker"),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_query_with_debug() {
        let args = Args::parse_from(["docdex", "query", "borrow checker", "--debug"]);
        match args.command {
            Commands::Query { query, debug } => {
                assert_eq!(query, "borrow checker");
                assert!(debug);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_vsearch_defaults() {
        let args = Args::parse_from(["docdex", "vsearch", "ownership"]);
        match args.command {
            Commands::Vsearch { query, debug } => {
                assert_eq!(query, "ownership");
                assert!(!debug);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_ollama_url_flags_win() {
        let args = Args::parse_from(["docdex", "--host", "localhost", "--port", "8080", "status"]);
        assert_eq!(args.ollama_url("http://configured:1234"), "http://localhost:8080");
    }

    #[test]
    fn test_ollama_url_falls_back_to_configured() {
        let args = Args::parse_from(["docdex", "status"]);
        assert_eq!(args.ollama_url("http://configured:1234"), "http://configured:1234");
    }

    #[test]
    fn test_ollama_url_partial_override() {
        let args = Args::parse_from(["docdex", "--port", "8080", "status"]);
        assert_eq!(args.ollama_url("http://configured:1234"), "http://127.0.0.1:8080");
    }

    #[test]
    fn test_limit_flag() {
        let args = Args::parse_from(["docdex", "-n", "5", "search", "ownership"]);
        assert_eq!(args.limit, Some(5));
    }

    #[test]
    fn test_missing_subcommand_is_error() {
        assert!(Args::try_parse_from(["docdex"]).is_err());
    }
}
