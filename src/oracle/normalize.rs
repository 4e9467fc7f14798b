//! Text normalization shared by the visibility oracle and the navigator
//!
//! Host pages render stored markdown as HTML, so stored text and rendered
//! text never compare byte for byte. Both sides go through the same pipeline
//! before any equality or substring test.

use regex::Regex;
use scraper::{ElementRef, Html, Node};
use std::sync::OnceLock;
use unicode_normalization::UnicodeNormalization;

fn artifact_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)<antArtifact[^>]*title="([^"]+)"[^>]*>[\s\S]*?</antArtifact>"#)
            .expect("artifact regex must compile")
    })
}

fn markdown_chars_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[*_`~>#-]").expect("markdown regex must compile"))
}

fn link_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[(.*?)\]\(.*?\)").expect("link regex must compile"))
}

fn image_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"!\[(.*?)\]\(.*?\)").expect("image regex must compile"))
}

fn numbered_item_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^\d+\.\s*").expect("numbered item regex must compile"))
}

fn bullet_item_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^•\s*").expect("bullet regex must compile"))
}

/// Replace artifact blocks with `"<title> Document"`
pub fn collapse_artifacts(text: &str) -> String {
    artifact_re().replace_all(text, "${1} Document").into_owned()
}

/// Drop emphasis, heading, quote and list markers; keep link and image text
pub fn strip_markdown(text: &str) -> String {
    let stripped = markdown_chars_re().replace_all(text, "");
    let linked = link_re().replace_all(&stripped, "${1}");
    image_re().replace_all(&linked, "${1}").into_owned()
}

/// Decode the few entities the host leaves in rendered text
pub fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ").replace("&amp;", "&").replace("&#39;", "'").replace("&quot;", "\"")
}

/// Full matching pipeline: artifacts, markdown, entities, list prefixes,
/// then whitespace
pub fn normalize_for_match(text: &str) -> String {
    let decoded = decode_entities(&strip_markdown(&collapse_artifacts(text)));
    let unnumbered = numbered_item_re().replace_all(&decoded, "");
    let unbulleted = bullet_item_re().replace_all(&unnumbered, "");
    unbulleted.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Case-folded, quote-folded, whitespace-collapsed form used for fuzzy
/// substring tests
pub fn canonicalize(text: &str) -> String {
    let folded: String = text
        .nfkc()
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' => '\'',
            '\u{201c}' | '\u{201d}' => '"',
            other => other,
        })
        .collect();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Stored markdown and rendered page text reduced to one comparable form.
/// Both excerpts and page texts go through this before substring tests.
pub fn match_form(text: &str) -> String {
    canonicalize(&normalize_for_match(text))
}

/// Text of an HTML fragment as a reader sees it: line breaks for block
/// elements and `<br>`, list items prefixed with `n. ` or `• `
pub fn html_visible_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let mut lists = Vec::new();
    visible_text(fragment.root_element(), &mut lists)
}

fn visible_text(element: ElementRef<'_>, lists: &mut Vec<i64>) -> String {
    let mut out = String::new();

    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(_) => {
                let Some(el) = ElementRef::wrap(child) else {
                    continue;
                };
                match el.value().name() {
                    "br" => out.push('\n'),
                    "ol" => {
                        let start = el.value().attr("start").and_then(|s| s.trim().parse().ok()).unwrap_or(1);
                        lists.push(start);
                        out.push('\n');
                        out.push_str(&visible_text(el, lists));
                        out.push('\n');
                        lists.pop();
                    }
                    "ul" => {
                        lists.push(-1);
                        out.push('\n');
                        out.push_str(&visible_text(el, lists));
                        out.push('\n');
                        lists.pop();
                    }
                    "li" => {
                        let bullet = match lists.last_mut() {
                            Some(n) if *n >= 0 => {
                                let label = format!("{}. ", n);
                                *n += 1;
                                label
                            }
                            _ => "• ".to_string(),
                        };
                        out.push_str(&bullet);
                        out.push_str(visible_text(el, lists).trim());
                        out.push('\n');
                    }
                    tag => {
                        out.push_str(&visible_text(el, lists));
                        if matches!(tag, "p" | "div" | "section" | "article") {
                            out.push('\n');
                        }
                    }
                }
            }
            _ => {}
        }
    }

    out
}

/// Whether a rendered container's HTML shows exactly `text`
pub fn html_text_equals(html: &str, text: &str) -> bool {
    normalize_for_match(&html_visible_text(html)) == normalize_for_match(text)
}

/// Whether any rendered message text contains enough target needles.
///
/// Needles shorter than `min_len` are ignored. With two or more usable
/// needles, a single message must contain at least two of them.
pub fn target_matches(texts: &[String], needles: &[String], min_len: usize) -> bool {
    let usable: Vec<String> =
        needles.iter().map(|n| match_form(n)).filter(|n| n.chars().count() >= min_len).collect();
    if usable.is_empty() {
        return false;
    }
    let required = if usable.len() >= 2 { 2 } else { 1 };

    texts.iter().any(|text| {
        let haystack = match_form(text);
        usable.iter().filter(|needle| haystack.contains(needle.as_str())).count() >= required
    })
}
