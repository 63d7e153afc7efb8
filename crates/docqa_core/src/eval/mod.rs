//! Lexical grading of a generated answer against the chunks it was retrieved with.
//!
//! Four independent components are computed and summed into a score out of ten:
//!
//! - support (0-4): share of answer sentences whose content words appear in the evidence
//! - citation (0-2): share of cited chunk ids that were actually retrieved
//! - completeness (0-3): share of the evidence's top keywords reproduced in the answer
//! - clarity (0-1): bucketed mean sentence length
//!
//! Everything here is a pure function of its inputs. Malformed chunks (no document, no metadata)
//! contribute nothing instead of failing.

pub mod citations;
pub mod policy;

use serde::{Deserialize, Serialize};

use crate::domain::RetrievedChunk;
use crate::lexical::{content_vocabulary, is_supported, tokenize, top_keywords};
use crate::text::segment;

use self::citations::{available_chunk_ids, extract_cited_chunk_ids};
use self::policy::{
    clarity_for_avg_len, round2, CITATION_MAX, CLARITY_MAX, COMPLETENESS_MAX, FINAL_MAX,
    KEYWORD_TOP_K, SUPPORT_MAX, SUPPORT_OVERLAP_THRESHOLD,
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoreComponents {
    pub support_score: f64,
    pub citation_score: f64,
    pub completeness_score: f64,
    pub clarity_score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvaluationMetadata {
    pub sentences: usize,
    pub supported_sentences: usize,
    pub cited_ids: Vec<String>,
    pub valid_cited_ids: usize,
    pub available_chunk_ids: Vec<String>,
    pub top_keywords: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvaluationResult {
    pub final_score: f64,
    pub components: ScoreComponents,
    pub metadata: EvaluationMetadata,
    pub explanation: String,
}

/// A saved question/answer/evidence triple, as written by `docqa query --output`.
/// Nulls and missing fields are treated as empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EvaluationInput {
    #[serde(default)]
    pub user_question: Option<String>,
    #[serde(default)]
    pub system_answer: Option<String>,
    #[serde(default)]
    pub chunks_related: Option<Vec<RetrievedChunk>>,
}

impl EvaluationInput {
    pub fn evaluate(&self) -> EvaluationResult {
        evaluate(
            self.user_question.as_deref().unwrap_or(""),
            self.system_answer.as_deref().unwrap_or(""),
            self.chunks_related.as_deref().unwrap_or(&[]),
        )
    }
}

struct Support {
    score: f64,
    supported: usize,
    ratio: f64,
}

struct Citations {
    score: f64,
    cited: Vec<String>,
    valid: usize,
    available: Vec<String>,
}

struct Completeness {
    score: f64,
    keywords: Vec<String>,
    coverage: f64,
}

struct Clarity {
    score: f64,
    avg_sentence_len: f64,
}

/// Score `answer` against `chunks`.
///
/// `question` is accepted so the signature stays stable for callers, but no component uses it
/// today.
pub fn evaluate(question: &str, answer: &str, chunks: &[RetrievedChunk]) -> EvaluationResult {
    let _ = question;

    let sentences = segment(answer);
    let documents: Vec<&str> = chunks.iter().map(RetrievedChunk::document_text).collect();

    let support = score_support(&sentences, &documents);
    let citations = score_citations(answer, chunks);
    let completeness = score_completeness(answer, &documents);
    let clarity = score_clarity(&sentences);

    let raw = support.score + citations.score + completeness.score + clarity.score;
    let final_score = round2(raw).clamp(0.0, FINAL_MAX);

    let explanation = [
        format!(
            "Support: {:.2}/4 - {:.1}% of sentences supported.",
            support.score,
            support.ratio * 100.0
        ),
        format!(
            "Citations: {:.2}/2 - found [{}], valid: {}.",
            citations.score,
            citations.cited.join(", "),
            citations.valid
        ),
        format!(
            "Completeness: {:.2}/3 - keyword coverage: {:.1}%.",
            completeness.score,
            completeness.coverage * 100.0
        ),
        format!(
            "Clarity: {:.2}/1 - avg sentence length: {:.1} tokens.",
            clarity.score, clarity.avg_sentence_len
        ),
    ]
    .join("\n");

    EvaluationResult {
        final_score,
        components: ScoreComponents {
            support_score: support.score,
            citation_score: citations.score,
            completeness_score: completeness.score,
            clarity_score: clarity.score,
        },
        metadata: EvaluationMetadata {
            sentences: sentences.len(),
            supported_sentences: support.supported,
            cited_ids: citations.cited,
            valid_cited_ids: citations.valid,
            available_chunk_ids: citations.available,
            top_keywords: completeness.keywords,
        },
        explanation,
    }
}

fn score_support(sentences: &[String], documents: &[&str]) -> Support {
    if sentences.is_empty() {
        return Support {
            score: 0.0,
            supported: 0,
            ratio: 0.0,
        };
    }
    let vocabulary = content_vocabulary(documents.iter().copied());
    let supported = sentences
        .iter()
        .filter(|s| is_supported(s, &vocabulary, SUPPORT_OVERLAP_THRESHOLD))
        .count();
    let ratio = supported as f64 / sentences.len() as f64;
    Support {
        score: round2(ratio * SUPPORT_MAX).clamp(0.0, SUPPORT_MAX),
        supported,
        ratio,
    }
}

fn score_citations(answer: &str, chunks: &[RetrievedChunk]) -> Citations {
    let cited = extract_cited_chunk_ids(answer);
    let available = available_chunk_ids(chunks);
    let valid = cited.iter().filter(|id| available.contains(*id)).count();
    let score = if cited.is_empty() {
        0.0
    } else {
        (CITATION_MAX * valid as f64 / cited.len() as f64).min(CITATION_MAX)
    };
    Citations {
        score,
        cited,
        valid,
        available: available.into_iter().collect(),
    }
}

fn score_completeness(answer: &str, documents: &[&str]) -> Completeness {
    let keywords = top_keywords(documents.iter().copied(), KEYWORD_TOP_K);
    if keywords.is_empty() {
        return Completeness {
            score: 0.0,
            keywords,
            coverage: 0.0,
        };
    }
    let answer_tokens: std::collections::HashSet<String> = tokenize(answer).into_iter().collect();
    let covered = keywords.iter().filter(|k| answer_tokens.contains(*k)).count();
    let coverage = covered as f64 / keywords.len() as f64;
    Completeness {
        score: round2(coverage * COMPLETENESS_MAX).clamp(0.0, COMPLETENESS_MAX),
        keywords,
        coverage,
    }
}

fn score_clarity(sentences: &[String]) -> Clarity {
    let avg_sentence_len = if sentences.is_empty() {
        0.0
    } else {
        let tokens: usize = sentences.iter().map(|s| tokenize(s).len()).sum();
        tokens as f64 / sentences.len() as f64
    };
    Clarity {
        score: clarity_for_avg_len(avg_sentence_len).clamp(0.0, CLARITY_MAX),
        avg_sentence_len,
    }
}
