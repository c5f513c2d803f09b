//! Post-processing of a collected micro-task paragraph.
//!
//! Transforms run in a fixed order: editor-request rewriting, elision of
//! commands already executed in earlier phases, then paragraph-local sentence
//! dedup. Each transform is idempotent.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::core::context::ExecutionContext;
use crate::core::markup::{
    CMD_CLOSE, CMD_OPEN, CMD_SPAN_RE, collapse_prose_whitespace, collapse_whitespace,
    extract_commands, normalize_command, wrap_command,
};

/// Replacement for a command span that was already executed.
pub const ALREADY_DONE_MARKER: &str = " (already done) ";

/// Paragraph used when nothing actionable remains.
pub const NO_ACTION_PLACEHOLDER: &str = "No action required.";

/// Outputs treated as "nothing to do".
const NO_OP_SENTINELS: [&str; 2] = ["(already done)", NO_ACTION_PLACEHOLDER];

const FILE_WRITE_TEMPLATE: &str = "use <cmd>cat > ${file} <<'EOF'\\n...\\nEOF</cmd>";

static PREFERRED_EDITOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bopen\s+(?P<file>[^\s,]+)\s+in\s+(?:your|the)\s+preferred\s+editor")
        .expect("preferred editor regex")
});
static ANY_EDITOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bopen\s+(?P<file>[^\s,]+)\s+in\s+an?\s+editor").expect("any editor regex")
});
static EDITOR_PROGRAM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:nano|vim|vi|emacs|subl|gedit)\b").expect("editor program regex")
});
/// `code` is only an editor invocation when it takes `.` or a file argument.
static VSCODE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bcode(?P<arg>\s+\.|\s+[\w./-]+\.[A-Za-z0-9]+)").expect("vscode regex")
});

/// Apply all transforms and the empty/no-op placeholder rule.
pub fn finalize_paragraph(raw: &str, context: &ExecutionContext) -> String {
    let paragraph = rewrite_editor_requests(raw.trim());
    let paragraph = elide_executed_commands(&paragraph, context);
    let paragraph = dedupe_sentences(&paragraph);
    let paragraph = paragraph.trim();
    if paragraph.is_empty() || NO_OP_SENTINELS.contains(&paragraph) {
        return NO_ACTION_PLACEHOLDER.to_string();
    }
    paragraph.to_string()
}

/// Rewrite interactive editor steps into a non-interactive file-write command.
pub fn rewrite_editor_requests(paragraph: &str) -> String {
    let rewritten = PREFERRED_EDITOR_RE.replace_all(paragraph, FILE_WRITE_TEMPLATE);
    let rewritten = ANY_EDITOR_RE.replace_all(&rewritten, FILE_WRITE_TEMPLATE);
    let rewritten = EDITOR_PROGRAM_RE.replace_all(&rewritten, "editor");
    VSCODE_RE.replace_all(&rewritten, "editor$arg").into_owned()
}

/// Replace every command span already in `context` with [`ALREADY_DONE_MARKER`].
pub fn elide_executed_commands(paragraph: &str, context: &ExecutionContext) -> String {
    CMD_SPAN_RE
        .replace_all(paragraph, |caps: &regex::Captures<'_>| {
            let cmd = caps.get(1).map_or("", |m| m.as_str()).trim();
            if context.contains(&normalize_command(cmd)) {
                ALREADY_DONE_MARKER.to_string()
            } else {
                wrap_command(cmd)
            }
        })
        .into_owned()
}

/// Drop repeated sentences and sentences that repeat an earlier command.
///
/// Both seen-sets are local to this paragraph.
pub fn dedupe_sentences(paragraph: &str) -> String {
    let mut seen_sentences = HashSet::new();
    let mut seen_commands = HashSet::new();
    let mut kept = Vec::new();

    for sentence in split_sentences(paragraph) {
        let sentence = collapse_prose_whitespace(sentence);
        if sentence.is_empty() {
            continue;
        }
        let key = collapse_whitespace(&sentence);
        if seen_sentences.contains(&key) {
            continue;
        }
        let commands: Vec<String> = extract_commands(&sentence)
            .iter()
            .map(|cmd| normalize_command(cmd))
            .collect();
        if commands.iter().any(|cmd| seen_commands.contains(cmd)) {
            continue;
        }
        seen_sentences.insert(key);
        seen_commands.extend(commands);
        kept.push(sentence);
    }
    kept.join(" ")
}

/// Split on whitespace that follows `.`, `?` or `!`, never inside a command span.
fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut in_command = false;
    let mut prev: Option<char> = None;
    let mut iter = text.char_indices().peekable();

    while let Some((idx, c)) = iter.next() {
        let rest = &text[idx..];
        if rest.starts_with(CMD_OPEN) {
            in_command = true;
        } else if rest.starts_with(CMD_CLOSE) {
            in_command = false;
        }

        if !in_command && c.is_whitespace() && matches!(prev, Some('.' | '?' | '!')) {
            sentences.push(&text[start..idx]);
            while let Some((_, next)) = iter.peek() {
                if !next.is_whitespace() {
                    break;
                }
                iter.next();
            }
            start = iter.peek().map_or(text.len(), |(next_idx, _)| *next_idx);
            prev = None;
            continue;
        }
        prev = Some(c);
    }
    if start < text.len() {
        sentences.push(&text[start..]);
    }
    sentences
}
