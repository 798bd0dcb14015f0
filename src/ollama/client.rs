//! HTTP client for the Ollama generate and embed endpoints
//!
//! This is the only place the pipeline touches the network for model
//! calls. Generation failures surface as errors for the caller to absorb;
//! embedding failures are soft per batch, matching the "unembeddable text
//! is not an error" contract.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::errors::{Result, SearchError};
use crate::ollama::types::{EmbedRequest, EmbedResponse, GenerateOptions, GenerateRequest, GenerateResponse};
use crate::search::types::{Completion, CompletionOptions, TextEmbedder, TextGenerator, TokenLogprob};

/// Default Ollama API endpoint
pub const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";

/// Request timeout; local models can be slow to load on first call
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Maximum characters per text sent to the embedding API. The embedding
/// model has an 8 192-token context and Ollama's truncate flag has been
/// unreliable for over-length input, so we pre-truncate as well.
const MAX_EMBED_CHARS: usize = 3_000;

/// Texts per embed request
const EMBED_BATCH_SIZE: usize = 32;

/// HTTP client for the Ollama API
pub struct OllamaClient {
    client: Client,
    base_url: String,
    generation_model: String,
    embedding_model: String,
}

impl OllamaClient {
    pub fn new(base_url: &str, generation_model: &str, embedding_model: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(SearchError::Http)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            generation_model: generation_model.to_string(),
            embedding_model: embedding_model.to_string(),
        })
    }

    /// Check whether the Ollama server is reachable
    pub async fn is_available(&self) -> bool {
        let url = format!("{}/api/tags", self.base_url);
        self.client
            .get(&url)
            .timeout(Duration::from_secs(2))
            .send()
            .await
            .map(|response| response.status().is_success())
            .unwrap_or(false)
    }

    async fn embed_chunk(&self, input: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let url = format!("{}/api/embed", self.base_url);
        let request = EmbedRequest {
            model: self.embedding_model.clone(),
            input,
            truncate: true,
        };

        let response = self.client.post(&url).json(&request).send().await?;
        if !response.status().is_success() {
            return Err(SearchError::OllamaApi(format!(
                "embed returned {}",
                response.status()
            )));
        }

        let body: EmbedResponse = response.json().await?;
        Ok(body.embeddings)
    }
}

#[async_trait]
impl TextGenerator for OllamaClient {
    async fn complete(&self, prompt: &str, options: &CompletionOptions) -> Result<Completion> {
        let url = format!("{}/api/generate", self.base_url);
        let request = GenerateRequest {
            model: self.generation_model.clone(),
            prompt: prompt.to_string(),
            stream: false,
            logprobs: options.logprobs.then_some(true),
            options: Some(GenerateOptions {
                num_predict: options.max_tokens,
                temperature: Some(0.0),
            }),
        };

        let response = self.client.post(&url).json(&request).send().await?;
        if !response.status().is_success() {
            return Err(SearchError::OllamaApi(format!(
                "generate returned {}",
                response.status()
            )));
        }

        let body: GenerateResponse = response.json().await?;
        Ok(Completion {
            text: body.response,
            logprobs: body
                .logprobs
                .into_iter()
                .map(|entry| TokenLogprob {
                    token: entry.token,
                    logprob: entry.logprob,
                })
                .collect(),
        })
    }
}

#[async_trait]
impl TextEmbedder for OllamaClient {
    /// Embed a batch of texts. A failed embed call marks that chunk's
    /// texts unembeddable rather than failing the whole batch.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Option<Vec<f32>>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut out = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(EMBED_BATCH_SIZE) {
            let input: Vec<String> = chunk
                .iter()
                .map(|text| truncate_for_embedding(text).to_string())
                .collect();

            match self.embed_chunk(input).await {
                Ok(embeddings) => {
                    for at in 0..chunk.len() {
                        out.push(embeddings.get(at).filter(|e| !e.is_empty()).cloned());
                    }
                }
                Err(err) => {
                    tracing::warn!("embed call failed for a chunk of {}: {err}", chunk.len());
                    out.extend(std::iter::repeat_with(|| None).take(chunk.len()));
                }
            }
        }

        Ok(out)
    }
}

/// Truncate to at most MAX_EMBED_CHARS, splitting on a UTF-8 char boundary.
fn truncate_for_embedding(text: &str) -> &str {
    if text.len() <= MAX_EMBED_CHARS {
        return text;
    }
    let mut end = MAX_EMBED_CHARS;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
