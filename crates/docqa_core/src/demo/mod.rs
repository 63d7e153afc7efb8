use serde_json::json;

use crate::domain::RetrievedChunk;
use crate::eval::EvaluationInput;

fn demo_chunk(chunk_id: &str, document: &str) -> RetrievedChunk {
    let metadata = json!({ "chunk_id": chunk_id });
    RetrievedChunk {
        id: Some(chunk_id.to_string()),
        document: Some(document.to_string()),
        metadata: metadata.as_object().cloned(),
        distance: None,
    }
}

/// Small onboarding example: an answer that cites one of two retrieved chunks.
pub fn sample_evaluation_input() -> EvaluationInput {
    EvaluationInput {
        user_question: Some("What are the onboarding steps?".to_string()),
        system_answer: Some(
            "Onboarding includes Digital Offer Letter, Document Collection, IT provisioning, and orientation. See [chunk_0001]."
                .to_string(),
        ),
        chunks_related: Some(vec![
            demo_chunk(
                "chunk_0001",
                "Digital Offer Letter and Acceptance. Document collection for ID proofs, tax forms.",
            ),
            demo_chunk(
                "chunk_0002",
                "IT provisioning includes email, laptop, and access permissions.",
            ),
        ]),
    }
}
