/// Collapse runs of whitespace into single spaces and trim the ends.
pub fn collapse_whitespace(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Cut `text` to at most `max` characters, marking the cut with "...".
pub fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let head: String = text.chars().take(max).collect();
        format!("{}...", head)
    }
}

/// Normalize text for embedding in an attribute or element body of the
/// pseudo-HTML listing. Returns None for text that carries nothing.
pub fn normalize_text(raw: &str, max: usize) -> Option<String> {
    let text = collapse_whitespace(raw);
    if text.is_empty() {
        return None;
    }

    // Quotes would break the attribute syntax the model reads
    let text = text.replace('"', "'");
    Some(truncate_chars(&text, max))
}

pub fn text_fingerprint(text: &str) -> String {
    use sha1::{Digest, Sha1};

    let mut hasher = Sha1::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}
