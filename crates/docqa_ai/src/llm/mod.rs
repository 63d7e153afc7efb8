use docqa_core::error::AppError;
use serde::{Deserialize, Serialize};

pub mod ollama_llm;
pub mod openai_compat;

/// Instruction sent with every question.
pub const SYSTEM_PROMPT: &str = "You are an HR SaaS product assistant. Use only the provided chunks to answer the user. \
When appropriate, cite the chunk ids you used in brackets like [chunk_0001]. \
If the answer is not found, say you don't know and suggest next steps.";

/// Generated answer plus the token usage reported by the provider (zero when not reported).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Generation {
    pub answer: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

pub trait Llm {
    fn generate(&self, question: &str, context: &str) -> Result<Generation, AppError>;
}

pub fn user_message(question: &str, context: &str) -> String {
    format!(
        "Context:\n{context}\n\nQuestion: {question}\n\nAnswer concisely, accurately, and cite chunk ids that support the answer."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_message_places_context_before_question() {
        let msg = user_message("Who approves leave?", "--- chunk_0000 ---\nManagers approve leave.\n");
        let ctx = msg.find("Managers approve").expect("context");
        let q = msg.find("Who approves").expect("question");
        assert!(ctx < q);
        assert!(msg.ends_with("cite chunk ids that support the answer."));
    }

    #[test]
    fn system_prompt_shows_citation_format() {
        assert!(SYSTEM_PROMPT.contains("[chunk_0001]"));
    }
}
