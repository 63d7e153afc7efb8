use std::time::Instant;

use docqa_core::config::Pricing;
use docqa_core::domain::RetrievedChunk;
use docqa_core::error::AppError;
use docqa_core::metrics::{estimate_cost, now_utc_timestamp, RequestMetrics};
use serde::{Deserialize, Serialize};

use crate::embeddings::Embedder;
use crate::index::VectorIndex;
use crate::llm::Llm;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryInput {
    pub question: String,
    pub collection_name: String,
    pub embed_model: String,
    pub top_k: usize,
}

/// What `docqa query` prints. The first three fields are what `docqa evaluate` reads back.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryOutcome {
    pub user_question: String,
    pub system_answer: String,
    pub chunks_related: Vec<RetrievedChunk>,
    pub metrics: RequestMetrics,
}

/// Label each chunk with its id (or `chunk_<position>` when it has none) and join them.
pub fn build_context(chunks: &[RetrievedChunk]) -> String {
    chunks
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let label = c
                .metadata_chunk_id()
                .map(str::to_string)
                .unwrap_or_else(|| format!("chunk_{i}"));
            format!("--- {label} ---\n{}\n", c.document_text())
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn answer_question(
    index: &dyn VectorIndex,
    embedder: &dyn Embedder,
    llm: &dyn Llm,
    pricing: &Pricing,
    input: QueryInput,
) -> Result<QueryOutcome, AppError> {
    let question = input.question.trim();
    if question.is_empty() {
        return Err(AppError::new("INPUT_QUESTION_EMPTY", "Question must not be empty"));
    }

    let started = Instant::now();
    let query_vector = embedder.embed(&input.embed_model, question)?;
    let retrieved = index.query(&input.collection_name, &query_vector, input.top_k)?;
    tracing::info!(retrieved = retrieved.len(), k = input.top_k, "retrieved chunks");

    let context = build_context(&retrieved);
    let generation = llm.generate(question, &context)?;
    let latency = started.elapsed();

    let cost = estimate_cost(pricing, generation.input_tokens, generation.output_tokens);
    tracing::info!(
        input_tokens = generation.input_tokens,
        output_tokens = generation.output_tokens,
        cost_usd = cost,
        "generated answer"
    );

    let metrics = RequestMetrics::new(
        now_utc_timestamp()?,
        latency,
        generation.input_tokens,
        generation.output_tokens,
        cost,
    );

    Ok(QueryOutcome {
        user_question: question.to_string(),
        system_answer: generation.answer,
        chunks_related: retrieved,
        metrics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn context_uses_chunk_ids_with_positional_fallback() {
        let chunks = vec![
            RetrievedChunk {
                document: Some("Leave is approved by managers.".to_string()),
                metadata: json!({ "chunk_id": "chunk_0004" }).as_object().cloned(),
                ..RetrievedChunk::default()
            },
            RetrievedChunk {
                document: Some("Payroll runs monthly.".to_string()),
                ..RetrievedChunk::default()
            },
        ];
        assert_eq!(
            build_context(&chunks),
            "--- chunk_0004 ---\nLeave is approved by managers.\n\n--- chunk_1 ---\nPayroll runs monthly.\n"
        );
        assert_eq!(build_context(&[]), "");
    }
}
