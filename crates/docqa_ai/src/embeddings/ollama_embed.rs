use std::time::Duration;

use docqa_core::error::AppError;
use serde::{Deserialize, Serialize};

use super::Embedder;
use crate::http::post_json;
use crate::ollama::OllamaClient;

/// Inputs longer than this many chars are truncated before embedding.
const MAX_EMBED_INPUT_CHARS: usize = 12_000;

#[derive(Debug, Clone)]
pub struct OllamaEmbedder {
    client: OllamaClient,
}

impl OllamaEmbedder {
    pub fn new(client: OllamaClient) -> Self {
        Self { client }
    }
}

#[derive(Debug, Clone, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
struct EmbeddingsResponse {
    embedding: Vec<f32>,
}

fn truncate_chars(input: &str, max: usize) -> &str {
    match input.char_indices().nth(max) {
        Some((byte, _)) => &input[..byte],
        None => input,
    }
}

impl Embedder for OllamaEmbedder {
    fn embed(&self, model: &str, input: &str) -> Result<Vec<f32>, AppError> {
        let url = format!("{}/api/embeddings", self.client.base_url());
        let req = EmbeddingsRequest {
            model,
            prompt: truncate_chars(input, MAX_EMBED_INPUT_CHARS),
        };
        let resp: EmbeddingsResponse = post_json(
            &url,
            &req,
            Duration::from_secs(30),
            None,
            "EMBEDDINGS_FAILED",
        )?;
        if resp.embedding.is_empty() {
            return Err(AppError::new("EMBEDDINGS_FAILED", "Embeddings response was empty")
                .with_details(format!("model={model}")));
        }
        Ok(resp.embedding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("", 0), "");
    }
}
