/// Split raw text into sentence-like units.
///
/// Paragraphs are separated by blank lines. Inside a paragraph a boundary follows every `?`,
/// every `!` and every `. ` (period then space). Fragments are trimmed and empty ones dropped;
/// the output is one flat sequence, paragraph structure is not kept.
///
/// A paragraph without terminal punctuation comes back as a single sentence. Single line
/// breaks are not boundaries, so a bulleted list inside one paragraph stays one sentence.
pub fn segment(text: &str) -> Vec<String> {
    let normalized = normalize_line_endings(text);
    let mut out = Vec::new();
    for paragraph in normalized.split("\n\n") {
        let paragraph = paragraph.trim();
        if paragraph.is_empty() {
            continue;
        }
        split_terminators(paragraph, &mut out);
    }
    out
}

pub fn normalize_line_endings(s: &str) -> String {
    s.replace("\r\n", "\n").replace('\r', "\n")
}

fn split_terminators(paragraph: &str, out: &mut Vec<String>) {
    let mut start = 0usize;
    let mut chars = paragraph.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        let boundary = match c {
            '?' | '!' => true,
            '.' => matches!(chars.peek(), Some((_, ' '))),
            _ => false,
        };
        if boundary {
            let end = i + c.len_utf8();
            push_trimmed(&paragraph[start..end], out);
            start = end;
        }
    }
    push_trimmed(&paragraph[start..], out);
}

fn push_trimmed(fragment: &str, out: &mut Vec<String>) {
    let t = fragment.trim();
    if !t.is_empty() {
        out.push(t.to_string());
    }
}
