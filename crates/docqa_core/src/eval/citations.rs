use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::RetrievedChunk;

// "chunk", optional `_` or `-`, then 3 to 6 digits; matches inside `[chunk_0001]` too.
static CHUNK_REF_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)chunk[_\-]?\d{3,6}").expect("chunk reference pattern compiles"));

/// Chunk references cited in `answer`, lower-cased, deduplicated and sorted.
pub fn extract_cited_chunk_ids(answer: &str) -> Vec<String> {
    let lowered = answer.to_lowercase();
    let ids: BTreeSet<String> = CHUNK_REF_RE
        .find_iter(&lowered)
        .map(|m| m.as_str().to_string())
        .collect();
    ids.into_iter().collect()
}

/// Lower-cased identifiers of the retrieved chunks that carry one in their metadata.
pub fn available_chunk_ids(chunks: &[RetrievedChunk]) -> BTreeSet<String> {
    chunks
        .iter()
        .filter_map(RetrievedChunk::metadata_chunk_id)
        .map(str::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn finds_bracketed_and_bare_references() {
        let ids = extract_cited_chunk_ids(
            "See [chunk_0002] and CHUNK-0001, also chunk0003 and again [chunk_0002].",
        );
        assert_eq!(ids, vec!["chunk-0001", "chunk0003", "chunk_0002"]);
    }

    #[test]
    fn ignores_short_digit_runs() {
        assert!(extract_cited_chunk_ids("chunk_12 and chunk").is_empty());
        // Longer runs match their first six digits.
        assert_eq!(extract_cited_chunk_ids("chunk_12345678"), vec!["chunk_123456"]);
    }
}
