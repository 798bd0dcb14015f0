//! Type definitions for the Ollama HTTP API
//!
//! Request and response shapes for the generate and embed endpoints the
//! pipeline consumes.

use serde::{Deserialize, Serialize};

/// Request body for POST /api/generate (non-streaming)
#[derive(Debug, Clone, Serialize)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    pub stream: bool,

    /// Ask for per-token log-probabilities in the response
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logprobs: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<GenerateOptions>,
}

/// Model options nested inside a generate request
#[derive(Debug, Clone, Serialize)]
pub struct GenerateOptions {
    /// Cap on generated tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_predict: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

/// Response body for POST /api/generate
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub response: String,

    /// Present only when the request asked for logprobs and the server
    /// supports them
    #[serde(default)]
    pub logprobs: Vec<ResponseLogprob>,

    #[serde(default)]
    pub done: bool,
}

/// One generated token with its log-probability
#[derive(Debug, Clone, Deserialize)]
pub struct ResponseLogprob {
    pub token: String,
    pub logprob: f64,
}

/// Request body for POST /api/embed
#[derive(Debug, Clone, Serialize)]
pub struct EmbedRequest {
    pub model: String,
    pub input: Vec<String>,
    /// Silently truncate over-length inputs instead of failing the call
    pub truncate: bool,
}

/// Response body for POST /api/embed
#[derive(Debug, Clone, Deserialize)]
pub struct EmbedResponse {
    #[serde(default)]
    pub embeddings: Vec<Vec<f32>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_request_omits_unset_fields() {
        let request = GenerateRequest {
            model: "qwen2.5:7b-instruct".to_string(),
            prompt: "hello".to_string(),
            stream: false,
            logprobs: None,
            options: None,
        };

        let json = serde_json::to_string(&request).unwrap();
        assert!(!json.contains("logprobs"));
        assert!(!json.contains("options"));
    }

    #[test]
    fn test_generate_request_serializes_options() {
        let request = GenerateRequest {
            model: "qwen2.5:7b-instruct".to_string(),
            prompt: "hello".to_string(),
            stream: false,
            logprobs: Some(true),
            options: Some(GenerateOptions {
                num_predict: Some(2),
                temperature: Some(0.0),
            }),
        };

        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("\"logprobs\":true"));
        assert!(json.contains("\"num_predict\":2"));
    }

    #[test]
    fn test_generate_response_without_logprobs() {
        let json = r#"{"response":"yes","done":true}"#;
        let response: GenerateResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.response, "yes");
        assert!(response.logprobs.is_empty());
        assert!(response.done);
    }

    #[test]
    fn test_generate_response_with_logprobs() {
        let json = r#"{"response":"yes","logprobs":[{"token":"yes","logprob":-0.12}],"done":true}"#;
        let response: GenerateResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.logprobs.len(), 1);
        assert_eq!(response.logprobs[0].token, "yes");
        assert!((response.logprobs[0].logprob + 0.12).abs() < 1e-12);
    }

    #[test]
    fn test_embed_response_defaults_to_empty() {
        let response: EmbedResponse = serde_json::from_str("{}").unwrap();
        assert!(response.embeddings.is_empty());
    }
}
