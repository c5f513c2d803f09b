//! Turning a raw planner buffer into an ordered, non-empty list of phases.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::core::extract::{ExtractKind, extract_structured};
use crate::core::markup::collapse_whitespace;

static BULLET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*[-*]\s*").expect("bullet regex"));
static NUMBERING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\d+\.\s*").expect("numbering regex"));
static PHASE_LINE_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*Phase\s*\d+\s*:?\s*").expect("phase line regex"));
static PHASE_ITEM_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*Phase\s*\d+\s*[:\-]?\s*").expect("phase item regex"));

/// Word-count bounds for a line to count as a short title.
const MIN_TITLE_WORDS: usize = 2;
const MAX_TITLE_WORDS: usize = 10;

/// Object keys that may hold a phase title when the model emits objects.
const TITLE_KEYS: [&str; 4] = ["title", "phase", "name", "step"];

/// Parse phases from the planner buffer.
///
/// Order is parse order and is the execution order. The result is never
/// empty: `fallback` is used when the buffer yields nothing.
pub fn phases_from_buffer(buffer: &str, fallback: &str) -> Vec<String> {
    let cleaned = buffer.trim();
    let phases = match extract_structured(cleaned, ExtractKind::List) {
        Some(Value::Array(items)) => normalize_all(items.iter().map(item_text)),
        _ => {
            let titles = heuristic_titles(cleaned);
            if titles.is_empty() {
                normalize_all([cleaned.to_string()])
            } else {
                normalize_all(titles)
            }
        }
    };
    if phases.is_empty() {
        return vec![collapse_whitespace(fallback)];
    }
    phases
}

fn normalize_all(items: impl IntoIterator<Item = String>) -> Vec<String> {
    items
        .into_iter()
        .map(|item| normalize_title(&item))
        .filter(|title| !title.is_empty())
        .collect()
}

/// Line-based extraction for output that contains no parseable list.
pub fn heuristic_titles(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut titles = Vec::new();
    for line in text.lines() {
        let stripped = BULLET_RE.replace(line, "");
        let stripped = NUMBERING_RE.replace(&stripped, "");
        let stripped = PHASE_LINE_PREFIX_RE.replace(&stripped, "");
        let title = stripped.trim();
        if title.is_empty() || title.starts_with("```") {
            continue;
        }
        let words = title.split_whitespace().count();
        if !(MIN_TITLE_WORDS..=MAX_TITLE_WORDS).contains(&words) {
            continue;
        }
        if seen.insert(title.to_string()) {
            titles.push(title.to_string());
        }
    }
    titles
}

/// Strip a residual `Phase N:` prefix and trailing punctuation, collapse whitespace.
pub fn normalize_title(raw: &str) -> String {
    let without_prefix = PHASE_ITEM_PREFIX_RE.replace(raw.trim(), "");
    let trimmed = without_prefix.trim_end_matches([' ', '.', ':', '-']);
    collapse_whitespace(trimmed)
}

fn item_text(item: &Value) -> String {
    match item {
        Value::String(s) => s.clone(),
        Value::Object(obj) => TITLE_KEYS
            .iter()
            .find_map(|key| obj.get(*key).and_then(Value::as_str))
            .map(str::to_string)
            .unwrap_or_else(|| item.to_string()),
        other => other.to_string(),
    }
}
