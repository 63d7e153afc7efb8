use std::time::Duration;

use docqa_core::error::AppError;
use serde::{Deserialize, Serialize};

use super::{user_message, Generation, Llm, SYSTEM_PROMPT};
use crate::http::post_json;
use crate::ollama::OllamaClient;

#[derive(Debug, Clone)]
pub struct OllamaLlm {
    client: OllamaClient,
    model: String,
    temperature: f32,
    max_output_tokens: u32,
}

impl OllamaLlm {
    pub fn new(
        client: OllamaClient,
        model: impl Into<String>,
        temperature: f32,
        max_output_tokens: u32,
    ) -> Self {
        Self {
            client,
            model: model.into(),
            temperature,
            max_output_tokens,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Debug, Clone, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    system: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Clone, Deserialize)]
struct GenerateResponse {
    response: String,
    #[serde(default)]
    prompt_eval_count: u64,
    #[serde(default)]
    eval_count: u64,
}

impl Llm for OllamaLlm {
    fn generate(&self, question: &str, context: &str) -> Result<Generation, AppError> {
        let url = format!("{}/api/generate", self.client.base_url());
        let prompt = user_message(question, context);
        let req = GenerateRequest {
            model: &self.model,
            system: SYSTEM_PROMPT,
            prompt: &prompt,
            stream: false,
            options: GenerateOptions {
                temperature: self.temperature,
                num_predict: self.max_output_tokens,
            },
        };
        let resp: GenerateResponse = post_json(
            &url,
            &req,
            Duration::from_secs(60),
            None,
            "LLM_REQUEST_FAILED",
        )?;
        if resp.response.trim().is_empty() {
            return Err(AppError::new("LLM_EMPTY_RESPONSE", "Model returned an empty answer")
                .with_details(format!("model={}", self.model)));
        }
        Ok(Generation {
            answer: resp.response.trim().to_string(),
            input_tokens: resp.prompt_eval_count,
            output_tokens: resp.eval_count,
        })
    }
}
