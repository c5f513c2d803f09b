//! Normalization of clarifying questions and choice answers.

use serde_json::Value;

use crate::core::types::{ClarifyingQuestion, QuestionKind};

/// Choices beyond this count cannot be given a single-letter label.
pub const MAX_CHOICES: usize = 26;

pub const FALLBACK_QUESTION: &str =
    "Please describe what specific kind of project you want (1-2 short words).";

/// Single open-text question used when the backend yields nothing usable.
pub fn fallback_questions() -> Vec<ClarifyingQuestion> {
    vec![ClarifyingQuestion {
        id: 1,
        question: FALLBACK_QUESTION.to_string(),
        kind: QuestionKind::Text,
        choices: Vec::new(),
    }]
}

/// Turn extracted model output into normalized questions.
///
/// Anything that is not a non-empty array (or normalizes to no questions)
/// yields [`fallback_questions`].
pub fn normalize_questions(parsed: Option<&Value>) -> Vec<ClarifyingQuestion> {
    let Some(Value::Array(items)) = parsed else {
        return fallback_questions();
    };
    let questions: Vec<ClarifyingQuestion> = items
        .iter()
        .enumerate()
        .filter_map(|(idx, item)| normalize_question(idx as u64 + 1, item))
        .collect();
    if questions.is_empty() {
        return fallback_questions();
    }
    questions
}

fn normalize_question(position: u64, item: &Value) -> Option<ClarifyingQuestion> {
    let Value::Object(obj) = item else {
        let question = value_text(item).trim().to_string();
        return (!question.is_empty()).then(|| ClarifyingQuestion {
            id: position,
            question,
            kind: QuestionKind::Text,
            choices: Vec::new(),
        });
    };

    let question = obj
        .get("question")
        .or_else(|| obj.get("q"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| item.to_string());
    let question = question.trim().to_string();
    if question.is_empty() {
        return None;
    }

    let id = obj.get("id").and_then(Value::as_u64).unwrap_or(position);
    let type_hint = obj.get("type").and_then(Value::as_str).unwrap_or("text");
    let choices = obj.get("choices").map(normalize_choices).unwrap_or_default();
    let kind = if type_hint.to_lowercase().starts_with("cho") && !choices.is_empty() {
        QuestionKind::Choice
    } else {
        QuestionKind::Text
    };

    Some(ClarifyingQuestion {
        id,
        question,
        kind,
        choices,
    })
}

/// Choices may arrive as a list or as a `|`-delimited string.
fn normalize_choices(raw: &Value) -> Vec<String> {
    let choices: Vec<String> = match raw {
        Value::Array(items) => items.iter().map(value_text).collect(),
        Value::String(s) => s.split('|').map(str::to_string).collect(),
        _ => Vec::new(),
    };
    choices
        .into_iter()
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .take(MAX_CHOICES)
        .collect()
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Option label for the choice at `index` (`A` through `Z`).
pub fn choice_label(index: usize) -> Option<char> {
    u8::try_from(index)
        .ok()
        .filter(|i| usize::from(*i) < MAX_CHOICES)
        .map(|i| char::from(b'A' + i))
}

/// Map a raw answer to its final text.
///
/// For choice questions a single in-range letter (any case) selects that
/// choice; anything else is taken literally.
pub fn resolve_answer(question: &ClarifyingQuestion, raw: &str) -> String {
    let answer = raw.trim();
    if question.kind != QuestionKind::Choice {
        return answer.to_string();
    }
    let mut chars = answer.chars();
    if let (Some(letter), None) = (chars.next(), chars.next())
        && letter.is_ascii_alphabetic()
    {
        let index = (letter.to_ascii_uppercase() as u8 - b'A') as usize;
        if let Some(choice) = question.choices.get(index) {
            return choice.clone();
        }
    }
    answer.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn choice(choices: &[&str]) -> ClarifyingQuestion {
        ClarifyingQuestion {
            id: 1,
            question: "Pick one".to_string(),
            kind: QuestionKind::Choice,
            choices: choices.iter().map(|c| c.to_string()).collect(),
        }
    }

    #[test]
    fn pipe_delimited_choices_become_choice_question() {
        let parsed = json!([{"question": "Which?", "type": "choice", "choices": "a|b|c"}]);
        let questions = normalize_questions(Some(&parsed));
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].kind, QuestionKind::Choice);
        assert_eq!(questions[0].choices, vec!["a", "b", "c"]);
        assert_eq!(questions[0].id, 1);
    }

    #[test]
    fn choice_type_without_choices_is_text() {
        let parsed = json!([{"id": 7, "question": "Name?", "type": "choice", "choices": []}]);
        let questions = normalize_questions(Some(&parsed));
        assert_eq!(questions[0].kind, QuestionKind::Text);
        assert_eq!(questions[0].id, 7);
    }

    #[test]
    fn type_prefix_check_is_case_insensitive() {
        let parsed = json!([{"q": "Venv?", "type": "Choices", "choices": ["yes", "no"]}]);
        let questions = normalize_questions(Some(&parsed));
        assert_eq!(questions[0].question, "Venv?");
        assert_eq!(questions[0].kind, QuestionKind::Choice);
    }

    #[test]
    fn bare_strings_become_text_questions() {
        let parsed = json!(["What language?", "  "]);
        let questions = normalize_questions(Some(&parsed));
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].question, "What language?");
        assert_eq!(questions[0].kind, QuestionKind::Text);
    }

    #[test]
    fn missing_or_empty_output_uses_fallback() {
        assert_eq!(normalize_questions(None), fallback_questions());
        assert_eq!(normalize_questions(Some(&json!([]))), fallback_questions());
        assert_eq!(
            normalize_questions(Some(&json!({"question": "x"}))),
            fallback_questions()
        );
    }

    #[test]
    fn letter_answers_map_to_choice_text() {
        let q = choice(&["console app", "web app"]);
        assert_eq!(resolve_answer(&q, "b"), "web app");
        assert_eq!(resolve_answer(&q, " A "), "console app");
    }

    #[test]
    fn out_of_range_letters_and_free_text_are_literal() {
        let q = choice(&["console app", "web app"]);
        assert_eq!(resolve_answer(&q, "c"), "c");
        assert_eq!(resolve_answer(&q, "desktop app"), "desktop app");
        assert_eq!(resolve_answer(&q, "1"), "1");
    }

    #[test]
    fn text_questions_ignore_letters() {
        let mut q = choice(&["x"]);
        q.kind = QuestionKind::Text;
        assert_eq!(resolve_answer(&q, "a"), "a");
    }

    #[test]
    fn labels_are_sequential_letters() {
        assert_eq!(choice_label(0), Some('A'));
        assert_eq!(choice_label(2), Some('C'));
        assert_eq!(choice_label(25), Some('Z'));
        assert_eq!(choice_label(26), None);
        assert_eq!(choice_label(300), None);
    }

    #[test]
    fn choices_beyond_the_alphabet_are_dropped() {
        let choices: Vec<String> = (0..30).map(|i| format!("option {i}")).collect();
        let parsed = json!([{"question": "Which?", "type": "choice", "choices": choices}]);
        let questions = normalize_questions(Some(&parsed));
        assert_eq!(questions[0].choices.len(), MAX_CHOICES);
        assert_eq!(questions[0].choices[25], "option 25");
        assert_eq!(resolve_answer(&questions[0], "a"), "option 0");
        assert_eq!(resolve_answer(&questions[0], "z"), "option 25");
    }
}
