//! Text shaping helpers for snippets and compacted documents

use blake3::Hasher;
use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

/// Regex for sentence boundary detection
static SENTENCE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"[.!?]["”'’)]?(\s|$)"#).expect("sentence boundary regex should compile")
});

/// Cap text at the last sentence boundary that fits, else hard-cut on a char boundary
pub fn cap_text(text: &mut String, max_len: usize) {
    if text.len() <= max_len {
        return;
    }

    let boundary = SENTENCE_REGEX
        .find_iter(text)
        .map(|m| m.end())
        .take_while(|end| *end <= max_len)
        .last();
    if let Some(end) = boundary {
        text.truncate(end);
        let trimmed_len = text.trim_end().len();
        text.truncate(trimmed_len);
        return;
    }

    // Hard cut at UTF-8 boundary
    let mut end = max_len;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    text.truncate(end);
}

/// Normalize for comparison: NFKC, lowercase, collapse whitespace
pub fn normalize_for_hash(text: &str) -> String {
    text.nfkc()
        .collect::<String>()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Hash content for deduping
pub fn hash_content(text: &str) -> String {
    let mut hasher = Hasher::new();
    hasher.update(normalize_for_hash(text).as_bytes());
    hasher.finalize().to_hex().to_string()
}
