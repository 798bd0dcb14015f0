//! Configuration for docdex
//!
//! A TOML file under `~/.docdex/` holds the Ollama endpoint, model names,
//! and search tuning. Values are read once at startup and handed to the
//! pipeline constructor; nothing here is consulted mid-query.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::search::PipelineConfig;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub ollama: OllamaConfig,

    #[serde(default)]
    pub search: SearchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    /// Base URL of the Ollama server
    pub base_url: String,
    /// Model used for query expansion and relevance judgments
    pub generation_model: String,
    /// Model used for embeddings (768-dimensional)
    pub embedding_model: String,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:11434".to_string(),
            generation_model: "qwen2.5:7b-instruct".to_string(),
            embedding_model: "nomic-embed-text".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Results returned to the caller
    pub result_limit: usize,
    /// Model-generated query rewrites on top of the original
    pub expansion_count: usize,
    /// Per-method, per-variant retrieval depth
    pub retrieval_depth: usize,
    /// Fused candidates kept for the reranking stage
    pub fused_limit: usize,
    /// Concurrent judgment requests per rerank batch
    pub rerank_batch_width: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        let pipeline = PipelineConfig::default();
        Self {
            result_limit: pipeline.result_limit,
            expansion_count: pipeline.expansion_count,
            retrieval_depth: pipeline.retrieval_depth,
            fused_limit: pipeline.fused_limit,
            rerank_batch_width: pipeline.rerank_batch_width,
        }
    }
}

impl Config {
    /// Load configuration from file, creating the default if it doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            let config = Config::default();
            config.save()?;
            return Ok(config);
        }

        let contents = fs::read_to_string(&config_path).context("Failed to read config file")?;

        let config: Config = toml::from_str(&contents).context("Failed to parse config file")?;

        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let toml_string = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(&config_path, toml_string).context("Failed to write config file")?;

        Ok(())
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::data_dir()?.join("config.toml"))
    }

    /// Directory holding the config file and the index database
    pub fn data_dir() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not determine home directory")?;
        Ok(home.join(".docdex"))
    }

    /// Default location of the index database
    pub fn db_path() -> Result<PathBuf> {
        Ok(Self::data_dir()?.join("index.db"))
    }

    /// Pipeline knobs derived from the search section
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            result_limit: self.search.result_limit,
            expansion_count: self.search.expansion_count,
            retrieval_depth: self.search.retrieval_depth,
            fused_limit: self.search.fused_limit,
            rerank_batch_width: self.search.rerank_batch_width,
            ..PipelineConfig::default()
        }
    }
}
