use std::time::Duration;

use docqa_core::config::LlmConfig;
use docqa_core::error::AppError;
use serde::{Deserialize, Serialize};

use super::{user_message, Generation, Llm, SYSTEM_PROMPT};
use crate::http::post_json;

/// Chat-completions client for OpenAI-compatible gateways such as OpenRouter.
#[derive(Clone)]
pub struct OpenAiCompatLlm {
    base_url: String,
    model: String,
    api_key: String,
    temperature: f32,
    max_output_tokens: u32,
}

impl std::fmt::Debug for OpenAiCompatLlm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatLlm")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_output_tokens", &self.max_output_tokens)
            .finish_non_exhaustive()
    }
}

impl OpenAiCompatLlm {
    pub fn new(config: &LlmConfig, api_key: impl Into<String>) -> Result<Self, AppError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(AppError::new("LLM_API_KEY_MISSING", "An API key is required")
                .with_details(format!("env={}", config.api_key_env)));
        }
        let base_url = config.base_url.trim().trim_end_matches('/').to_string();
        if !base_url.starts_with("https://") && !base_url.starts_with("http://") {
            return Err(AppError::new("LLM_BASE_URL_INVALID", "LLM base URL must be http(s)")
                .with_details(format!("base_url={base_url}")));
        }
        Ok(Self {
            base_url,
            model: config.model.clone(),
            api_key,
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
        })
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

fn into_generation(resp: ChatResponse) -> Result<Generation, AppError> {
    let answer = resp
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .unwrap_or_default();
    if answer.trim().is_empty() {
        return Err(AppError::new("LLM_EMPTY_RESPONSE", "Model returned an empty answer"));
    }
    let usage = resp.usage.unwrap_or_default();
    Ok(Generation {
        answer: answer.trim().to_string(),
        input_tokens: usage.prompt_tokens,
        output_tokens: usage.completion_tokens,
    })
}

impl Llm for OpenAiCompatLlm {
    fn generate(&self, question: &str, context: &str) -> Result<Generation, AppError> {
        let user = user_message(question, context);
        let req = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &user,
                },
            ],
            temperature: self.temperature,
            max_tokens: self.max_output_tokens,
        };
        let url = format!("{}/chat/completions", self.base_url);
        let resp: ChatResponse = post_json(
            &url,
            &req,
            Duration::from_secs(60),
            Some(&self.api_key),
            "LLM_REQUEST_FAILED",
        )?;
        into_generation(resp)
    }
}
