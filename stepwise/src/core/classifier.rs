//! Deterministic pieces of mode classification.

use std::sync::LazyLock;

use regex::Regex;

use crate::core::types::Mode;

/// Imperative and task-indicator phrases that force phase mode.
static TASK_PHRASE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(create|build|make|setup|set up|initialize|initialise|install|deploy|generate|scaffold|bootstrap|start|how to|how do i|steps?|step-by-step|guide|roadmap|plan|break down|break into steps)\b",
    )
    .expect("task phrase regex")
});

/// Fast path: `Some(Mode::Phase)` when the input contains a task phrase.
///
/// A match is final; the backend is never consulted and cannot override it.
pub fn keyword_mode(input: &str) -> Option<Mode> {
    TASK_PHRASE_RE.is_match(input).then_some(Mode::Phase)
}

/// Interpret a one-word classification reply. Unrecognized replies are `None`.
pub fn parse_mode_reply(reply: &str) -> Option<Mode> {
    match reply.trim().to_lowercase().as_str() {
        "phase" => Some(Mode::Phase),
        "normal" => Some(Mode::Normal),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_match_is_case_insensitive() {
        assert_eq!(keyword_mode("Set Up a python project"), Some(Mode::Phase));
        assert_eq!(keyword_mode("HOW DO I deploy this"), Some(Mode::Phase));
        assert_eq!(keyword_mode("give me the steps"), Some(Mode::Phase));
    }

    #[test]
    fn keyword_match_respects_word_boundaries() {
        assert_eq!(keyword_mode("explain python generators"), None);
        assert_eq!(keyword_mode("what is a makefile"), None);
        assert_eq!(keyword_mode("restart"), None);
    }

    #[test]
    fn parse_reply_accepts_only_exact_words() {
        assert_eq!(parse_mode_reply("  Phase\n"), Some(Mode::Phase));
        assert_eq!(parse_mode_reply("normal"), Some(Mode::Normal));
        assert_eq!(parse_mode_reply("phase."), None);
        assert_eq!(parse_mode_reply("I think phase"), None);
        assert_eq!(parse_mode_reply(""), None);
    }
}
