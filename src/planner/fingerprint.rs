//! Short text excerpts used to recognise a message on the host page

use crate::config::NavigationConfig;

/// Collapse every whitespace run to one space and trim
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Up to three excerpts of `text`: a prefix, and for long texts a middle and
/// a suffix excerpt. Duplicates are dropped.
pub fn fingerprints(text: &str, config: &NavigationConfig) -> Vec<String> {
    let normalized: Vec<char> = normalize_whitespace(text).chars().collect();
    if normalized.is_empty() {
        return Vec::new();
    }

    let len = normalized.len();
    let take = config.needle_len;
    let mut needles = vec![slice(&normalized, 0, take)];

    if len > config.long_text_threshold {
        let mid_start = (len / 2).saturating_sub(take / 2);
        let mid = slice(&normalized, mid_start, mid_start + take);
        if !needles.contains(&mid) {
            needles.push(mid);
        }

        let tail = slice(&normalized, len.saturating_sub(take), len);
        if !needles.contains(&tail) {
            needles.push(tail);
        }
    }

    needles
}

/// The prefix excerpt, if the text has any content
pub fn primary_fingerprint(text: &str, config: &NavigationConfig) -> Option<String> {
    fingerprints(text, config).into_iter().next()
}

/// Normalized prefix of at most `max_chars` characters
pub fn anchor_excerpt(text: &str, max_chars: usize) -> Option<String> {
    let normalized = normalize_whitespace(text);
    if normalized.is_empty() {
        return None;
    }
    Some(normalized.chars().take(max_chars).collect())
}

fn slice(chars: &[char], start: usize, end: usize) -> String {
    let end = end.min(chars.len());
    let start = start.min(end);
    chars[start..end].iter().collect()
}
