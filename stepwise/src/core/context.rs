//! Execution context carried between successive phase generations.

use serde::Serialize;

use crate::core::markup::{extract_commands, normalize_command, wrap_command};

/// Prompt text used when there is no prior narrative.
const NO_PREVIOUS_CONTEXT: &str = "None yet.";
/// Prompt text used when no commands have been executed.
const NO_EXECUTED_COMMANDS: &str = "None";

/// Recent narrative tail plus the ordered set of executed commands.
///
/// `executed_commands` holds normalized commands in first-seen order without
/// duplicates and never shrinks. `previous_text_tail` is a sliding window of
/// at most `tail_limit` characters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionContext {
    previous_text_tail: String,
    executed_commands: Vec<String>,
    #[serde(skip)]
    tail_limit: usize,
}

impl ExecutionContext {
    pub fn new(tail_limit: usize) -> Self {
        Self {
            previous_text_tail: String::new(),
            executed_commands: Vec::new(),
            tail_limit,
        }
    }

    pub fn previous_text_tail(&self) -> &str {
        &self.previous_text_tail
    }

    pub fn executed_commands(&self) -> &[String] {
        &self.executed_commands
    }

    /// Whether a normalized command has already been executed.
    pub fn contains(&self, normalized: &str) -> bool {
        self.executed_commands.iter().any(|cmd| cmd == normalized)
    }

    /// Last `max_chars` characters of the narrative, or a "none yet" marker.
    pub fn prompt_tail(&self, max_chars: usize) -> String {
        let trimmed = self.previous_text_tail.trim();
        if trimmed.is_empty() {
            return NO_PREVIOUS_CONTEXT.to_string();
        }
        tail_chars(trimmed, max_chars).to_string()
    }

    /// Executed commands rendered as inline spans, or a "none" marker.
    pub fn executed_snippet(&self) -> String {
        if self.executed_commands.is_empty() {
            return NO_EXECUTED_COMMANDS.to_string();
        }
        self.executed_commands
            .iter()
            .map(|cmd| wrap_command(cmd))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Fold a finished paragraph into the context.
    ///
    /// Returns the normalized commands that were newly added.
    pub fn record(&mut self, paragraph: &str) -> Vec<String> {
        let mut added = Vec::new();
        for cmd in extract_commands(paragraph) {
            let normalized = normalize_command(&cmd);
            if normalized.is_empty() || self.contains(&normalized) {
                continue;
            }
            self.executed_commands.push(normalized.clone());
            added.push(normalized);
        }

        let combined = if self.previous_text_tail.is_empty() {
            paragraph.trim().to_string()
        } else {
            format!("{}\n{}", self.previous_text_tail, paragraph)
                .trim()
                .to_string()
        };
        self.previous_text_tail = tail_chars(&combined, self.tail_limit).to_string();
        added
    }
}

/// Suffix of at most `max_chars` characters, respecting char boundaries.
fn tail_chars(text: &str, max_chars: usize) -> &str {
    let count = text.chars().count();
    if count <= max_chars {
        return text;
    }
    let skip = count - max_chars;
    let start = text
        .char_indices()
        .nth(skip)
        .map_or(text.len(), |(idx, _)| idx);
    &text[start..]
}
