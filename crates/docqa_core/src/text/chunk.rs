use serde::{Deserialize, Serialize};

use super::segment::segment;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chunk {
    pub index: usize,
    pub chunk_id: String,
    pub text: String,
}

/// Stable identifier for the chunk at `index`: `chunk_0000`, `chunk_0001`, ...
pub fn chunk_id_for(index: usize) -> String {
    format!("chunk_{index:04}")
}

/// Length in characters, which is what the chunk budgets are expressed in.
pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Accumulate sentences into chunks of roughly `approx_chars` characters.
///
/// A sentence is appended while the running length stays within the budget, or when the
/// accumulator is empty, so a single oversized sentence becomes its own chunk rather than being
/// split. When the next sentence does not fit, the accumulator is emitted (space-joined) and
/// reseeded with its trailing sentences covering at least `overlap_chars`; the sentence that
/// did not fit is then retried against the reseeded accumulator.
///
/// Any parameter values are accepted. Output is a pure function of the inputs.
pub fn build_chunks<S: AsRef<str>>(
    sentences: &[S],
    approx_chars: usize,
    overlap_chars: usize,
) -> Vec<Chunk> {
    let mut texts: Vec<String> = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut cur_len = 0usize;

    let mut i = 0usize;
    while i < sentences.len() {
        let s = sentences[i].as_ref();
        let s_len = char_len(s);
        if current.is_empty() || cur_len + s_len <= approx_chars {
            current.push(s);
            cur_len += s_len;
            i += 1;
            continue;
        }

        emit_joined(&current, &mut texts);
        current = overlap_seed(&current, overlap_chars);
        cur_len = current.iter().map(|s| char_len(s)).sum();
    }
    if !current.is_empty() {
        emit_joined(&current, &mut texts);
    }

    texts
        .into_iter()
        .enumerate()
        .map(|(index, text)| Chunk {
            index,
            chunk_id: chunk_id_for(index),
            text,
        })
        .collect()
}

/// Segment `text` and chunk the resulting sentences.
pub fn chunk_text(text: &str, approx_chars: usize, overlap_chars: usize) -> Vec<Chunk> {
    build_chunks(&segment(text), approx_chars, overlap_chars)
}

fn emit_joined(sentences: &[&str], out: &mut Vec<String>) {
    let joined = sentences.join(" ");
    let t = joined.trim();
    if !t.is_empty() {
        out.push(t.to_string());
    }
}

/// Trailing sentences of a closed chunk that open the next one, in order.
///
/// The scan stops one sentence short of the start: the seed is always a proper suffix, so the
/// retried sentence meets a strictly smaller accumulator each time and the loop terminates.
fn overlap_seed<'a>(closed: &[&'a str], overlap_chars: usize) -> Vec<&'a str> {
    let mut taken = 0usize;
    let mut len = 0usize;
    while taken + 1 < closed.len() && len < overlap_chars {
        len += char_len(closed[closed.len() - 1 - taken]);
        taken += 1;
    }
    closed[closed.len() - taken..].to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn texts(chunks: &[Chunk]) -> Vec<&str> {
        chunks.iter().map(|c| c.text.as_str()).collect()
    }

    #[test]
    fn ids_are_zero_padded() {
        assert_eq!(chunk_id_for(0), "chunk_0000");
        assert_eq!(chunk_id_for(42), "chunk_0042");
        assert_eq!(chunk_id_for(12345), "chunk_12345");
    }

    #[test]
    fn small_input_fits_in_one_chunk() {
        let chunks = build_chunks(&["One.", "Two.", "Three."], 100, 10);
        assert_eq!(texts(&chunks), vec!["One. Two. Three."]);
        assert_eq!(chunks[0].chunk_id, "chunk_0000");
    }

    #[test]
    fn overflow_carries_trailing_sentences_forward() {
        // Each sentence is 4 chars; 3 fit in 12, overlap of 4 carries one back.
        let chunks = build_chunks(&["aaa.", "bbb.", "ccc.", "ddd.", "eee."], 12, 4);
        assert_eq!(texts(&chunks), vec!["aaa. bbb. ccc.", "ccc. ddd. eee."]);
        assert_eq!(chunks[1].index, 1);
    }

    #[test]
    fn oversized_sentence_is_kept_whole() {
        let big = "x".repeat(50);
        let chunks = build_chunks(&["tiny.", big.as_str(), "end."], 10, 0);
        assert_eq!(texts(&chunks), vec!["tiny.", big.as_str(), "end."]);
    }

    #[test]
    fn zero_overlap_carries_nothing() {
        let chunks = build_chunks(&["aaaa", "bbbb", "cccc"], 8, 0);
        assert_eq!(texts(&chunks), vec!["aaaa bbbb", "cccc"]);
    }

    #[test]
    fn overlap_covering_whole_chunk_still_terminates() {
        // The seed would be the entire closed chunk; it is shrunk to a proper suffix.
        let chunks = build_chunks(&["aaaa", "bbbb", "cccccccc"], 8, 100);
        assert_eq!(texts(&chunks), vec!["aaaa bbbb", "bbbb", "cccccccc"]);
    }

    #[test]
    fn single_sentence_chunk_followed_by_large_sentence_terminates() {
        let a = "a".repeat(300);
        let b = "b".repeat(600);
        let chunks = build_chunks(&[a.as_str(), b.as_str()], 800, 200);
        assert_eq!(texts(&chunks), vec![a.as_str(), b.as_str()]);
    }

    #[test]
    fn degenerate_budgets_terminate() {
        let sentences = ["one", "two", "three", "four"];
        assert_eq!(build_chunks(&sentences, 0, 0).len(), 4);
        assert_eq!(build_chunks(&sentences, 0, 1000).len(), 4);
        assert_eq!(build_chunks(&sentences, 5, 5).len(), 4);
    }

    #[test]
    fn empty_sentences_are_not_emitted() {
        let chunks = build_chunks(&["", "  "], 1, 0);
        assert!(chunks.is_empty());
        assert!(build_chunks::<&str>(&[], 800, 200).is_empty());
    }

    #[test]
    fn chunk_text_segments_first() {
        let chunks = chunk_text("Alpha one. Beta two. Gamma three.", 25, 5);
        assert_eq!(texts(&chunks), vec!["Alpha one. Beta two.", "Beta two. Gamma three."]);
    }
}
