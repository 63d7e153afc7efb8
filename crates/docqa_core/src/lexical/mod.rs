//! Word tokenization and content-word filtering shared by the answer evaluator.
//!
//! The tokenizer and the filtering policy are separate so callers can pick what they need:
//! the completeness check compares against unfiltered answer tokens, while support and keyword
//! extraction work on content tokens only.

use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;

/// Tokens shorter than this are dropped by [`tokenize`].
pub const MIN_TOKEN_CHARS: usize = 2;

/// Content tokens must be strictly longer than this.
pub const MAX_SHORT_TOKEN_CHARS: usize = 3;

/// Default distinct-token overlap for [`is_supported`]. The evaluator uses its own, lower value.
pub const DEFAULT_OVERLAP_THRESHOLD: usize = 3;

pub const STOP_WORDS: &[&str] = &[
    "the", "and", "is", "in", "to", "of", "a", "for", "with", "that", "on", "as", "by", "an",
    "be", "are", "this", "it", "or", "from", "at", "which", "have", "has", "was", "were", "but",
    "not", "their", "they", "we", "our", "you", "your", "will", "can", "may", "such",
];

static STOP_WORD_SET: Lazy<HashSet<&'static str>> =
    Lazy::new(|| STOP_WORDS.iter().copied().collect());

static WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w+").expect("word pattern compiles"));

/// Lowercase word tokens (runs of alphanumerics/underscore) of at least two characters.
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    WORD_RE
        .find_iter(&lowered)
        .map(|m| m.as_str())
        .filter(|w| w.chars().count() >= MIN_TOKEN_CHARS)
        .map(str::to_string)
        .collect()
}

pub fn is_stop_word(token: &str) -> bool {
    STOP_WORD_SET.contains(token)
}

/// Not a stop-word and longer than three characters.
pub fn is_content_token(token: &str) -> bool {
    !is_stop_word(token) && token.chars().count() > MAX_SHORT_TOKEN_CHARS
}

pub fn content_tokens(text: &str) -> Vec<String> {
    tokenize(text)
        .into_iter()
        .filter(|t| is_content_token(t))
        .collect()
}

/// Union of content tokens across `texts`.
pub fn content_vocabulary<'a, I>(texts: I) -> HashSet<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut out = HashSet::new();
    for text in texts {
        out.extend(content_tokens(text));
    }
    out
}

/// Number of distinct content tokens of `sentence` present in `vocabulary`.
pub fn token_overlap(sentence: &str, vocabulary: &HashSet<String>) -> usize {
    let distinct: HashSet<String> = content_tokens(sentence).into_iter().collect();
    distinct.iter().filter(|t| vocabulary.contains(*t)).count()
}

/// Whether `sentence` shares at least `threshold` distinct content tokens with `vocabulary`.
/// A sentence without content tokens is never supported.
pub fn is_supported(sentence: &str, vocabulary: &HashSet<String>, threshold: usize) -> bool {
    if content_tokens(sentence).is_empty() {
        return false;
    }
    token_overlap(sentence, vocabulary) >= threshold
}

/// The `k` most frequent content tokens across `texts`; equal counts keep first-seen order.
pub fn top_keywords<'a, I>(texts: I, k: usize) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts: Vec<(String, usize)> = Vec::new();
    let mut slots: HashMap<String, usize> = HashMap::new();
    for text in texts {
        for token in content_tokens(text) {
            match slots.get(&token) {
                Some(&slot) => counts[slot].1 += 1,
                None => {
                    slots.insert(token.clone(), counts.len());
                    counts.push((token, 1));
                }
            }
        }
    }
    // Stable sort: ties stay in first-seen order.
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts.into_iter().take(k).map(|(t, _)| t).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn tokenize_lowercases_and_drops_single_chars() {
        assert_eq!(
            tokenize("A quick, Brown_Fox jumps! x 42"),
            vec!["quick", "brown_fox", "jumps", "42"]
        );
    }

    #[test]
    fn stop_word_set_is_fixed() {
        assert_eq!(STOP_WORDS.len(), 38);
        assert!(is_stop_word("the"));
        assert!(is_stop_word("such"));
        assert!(!is_stop_word("laptop"));
    }

    #[test]
    fn content_tokens_drop_stop_words_and_short_words() {
        assert_eq!(
            content_tokens("The laptop and the email are ready for use"),
            vec!["laptop", "email", "ready"]
        );
    }

    #[test]
    fn overlap_counts_distinct_tokens() {
        let vocab = content_vocabulary(["email laptop access permissions"]);
        assert_eq!(token_overlap("laptop laptop email phone", &vocab), 2);
        assert!(is_supported("laptop email access", &vocab, DEFAULT_OVERLAP_THRESHOLD));
        assert!(!is_supported("laptop email", &vocab, DEFAULT_OVERLAP_THRESHOLD));
        assert!(is_supported("laptop email", &vocab, 2));
    }

    #[test]
    fn sentence_without_content_is_never_supported() {
        let vocab = content_vocabulary(["anything"]);
        assert!(!is_supported("it is", &vocab, 0));
    }

    #[test]
    fn top_keywords_rank_by_count_then_first_seen() {
        let docs = ["zeta alpha beta", "beta gamma alpha beta"];
        assert_eq!(top_keywords(docs, 2), vec!["beta", "alpha"]);
        assert_eq!(top_keywords(docs, 10), vec!["beta", "alpha", "zeta", "gamma"]);
        assert!(top_keywords(["the and of"], 5).is_empty());
    }
}
