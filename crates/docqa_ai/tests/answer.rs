use std::cell::RefCell;

use docqa_ai::embeddings::Embedder;
use docqa_ai::index::{SqliteIndex, VectorIndex};
use docqa_ai::llm::{Generation, Llm};
use docqa_ai::pipeline::{answer_question, QueryInput};
use docqa_core::config::Pricing;
use docqa_core::error::AppError;
use docqa_core::eval::evaluate;
use pretty_assertions::assert_eq;
use serde_json::{json, Map, Value};

/// Maps a few keywords onto axes so retrieval is predictable.
struct KeywordEmbedder;

impl Embedder for KeywordEmbedder {
    fn embed(&self, _model: &str, input: &str) -> Result<Vec<f32>, AppError> {
        let lower = input.to_lowercase();
        let axis = |word: &str| if lower.contains(word) { 1.0 } else { 0.0 };
        Ok(vec![axis("laptop"), axis("payroll"), axis("holiday")])
    }
}

/// Answers with a fixed text and remembers the context it was given.
struct ScriptedLlm {
    answer: String,
    seen_context: RefCell<Option<String>>,
}

impl Llm for ScriptedLlm {
    fn generate(&self, _question: &str, context: &str) -> Result<Generation, AppError> {
        *self.seen_context.borrow_mut() = Some(context.to_string());
        Ok(Generation {
            answer: self.answer.clone(),
            input_tokens: 1_000,
            output_tokens: 100,
        })
    }
}

fn meta(chunk_id: &str) -> Map<String, Value> {
    json!({ "chunk_id": chunk_id }).as_object().cloned().unwrap_or_default()
}

fn seeded_index() -> SqliteIndex {
    let mut index = SqliteIndex::open_in_memory().expect("open");
    let docs = vec![
        "New hires receive a laptop and email account on day one.".to_string(),
        "Payroll runs on the last working day of each month.".to_string(),
        "Holiday calendars are published every January.".to_string(),
    ];
    let ids: Vec<String> = (0..3).map(|i| format!("chunk_{i:04}")).collect();
    let metas: Vec<_> = ids.iter().map(|id| meta(id)).collect();
    let vectors: Vec<Vec<f32>> = docs
        .iter()
        .map(|d| KeywordEmbedder.embed("m", d).expect("embed"))
        .collect();
    index
        .upsert("hr_faq", &ids, &docs, &metas, &vectors)
        .expect("upsert");
    index
}

fn query(question: &str, k: usize) -> QueryInput {
    QueryInput {
        question: question.to_string(),
        collection_name: "hr_faq".to_string(),
        embed_model: "m".to_string(),
        top_k: k,
    }
}

#[test]
fn answers_with_retrieved_context_and_metrics() {
    let index = seeded_index();
    let llm = ScriptedLlm {
        answer: "New hires get a laptop and email account on day one [chunk_0000].".to_string(),
        seen_context: RefCell::new(None),
    };
    let outcome = answer_question(
        &index,
        &KeywordEmbedder,
        &llm,
        &Pricing::default(),
        query("  When do I get my laptop?  ", 2),
    )
    .expect("answer");

    assert_eq!(outcome.user_question, "When do I get my laptop?");
    assert_eq!(outcome.chunks_related.len(), 2);
    assert_eq!(outcome.chunks_related[0].id.as_deref(), Some("chunk_0000"));

    let context = llm.seen_context.borrow().clone().expect("context");
    assert!(context.starts_with("--- chunk_0000 ---\nNew hires receive a laptop"));

    assert_eq!(outcome.metrics.tokens_prompt, 1_000);
    assert_eq!(outcome.metrics.tokens_completion, 100);
    assert_eq!(outcome.metrics.tokens_total, 1_100);
    assert_eq!(outcome.metrics.estimated_cost_usd, "0.000210");

    let result = evaluate(
        &outcome.user_question,
        &outcome.system_answer,
        &outcome.chunks_related,
    );
    assert_eq!(result.components.citation_score, 2.0);
    assert_eq!(result.metadata.supported_sentences, 1);
}

#[test]
fn outcome_json_feeds_the_evaluator() {
    let index = seeded_index();
    let llm = ScriptedLlm {
        answer: "Payroll runs monthly [chunk_0001].".to_string(),
        seen_context: RefCell::new(None),
    };
    let outcome = answer_question(
        &index,
        &KeywordEmbedder,
        &llm,
        &Pricing::default(),
        query("When is payroll?", 1),
    )
    .expect("answer");

    let saved = serde_json::to_value(&outcome).expect("encode");
    let input: docqa_core::eval::EvaluationInput =
        serde_json::from_value(saved).expect("decode as evaluation input");
    assert_eq!(input.evaluate().metadata.available_chunk_ids, vec!["chunk_0001"]);
}

#[test]
fn empty_question_is_rejected_before_any_call() {
    let index = seeded_index();
    let llm = ScriptedLlm {
        answer: String::new(),
        seen_context: RefCell::new(None),
    };
    let err = answer_question(
        &index,
        &KeywordEmbedder,
        &llm,
        &Pricing::default(),
        query("   ", 3),
    )
    .unwrap_err();
    assert_eq!(err.code, "INPUT_QUESTION_EMPTY");
    assert!(llm.seen_context.borrow().is_none());
}

#[test]
fn unknown_collection_surfaces_index_error() {
    let index = seeded_index();
    let llm = ScriptedLlm {
        answer: "n/a".to_string(),
        seen_context: RefCell::new(None),
    };
    let mut input = query("laptop?", 3);
    input.collection_name = "missing".to_string();
    let err = answer_question(&index, &KeywordEmbedder, &llm, &Pricing::default(), input)
        .unwrap_err();
    assert_eq!(err.code, "INDEX_COLLECTION_NOT_FOUND");
}
