//! Goal refiner agent: clarifying questions, interactive answers, summary.

use std::time::Duration;

use anyhow::Result;
use tracing::{debug, info, instrument, warn};

use crate::core::extract::{ExtractKind, extract_structured};
use crate::core::questions::{choice_label, fallback_questions, normalize_questions, resolve_answer};
use crate::core::types::{ClarifyingQuestion, QaPair, QuestionKind, RefinedGoal};
use crate::io::backend::{Backend, CompletionRequest};
use crate::io::config::StepwiseConfig;
use crate::io::console::Console;
use crate::io::prompt::{questions_prompt, summarize_prompt};
use crate::io::terminal::notice;

const QUESTIONS_MAX_TOKENS: i64 = 300;
const SUMMARY_MAX_TOKENS: i64 = 160;
const SUMMARY_TEMPERATURE: f64 = 0.15;

pub const CHOICE_PROMPT: &str = "Your choice (letter or text): ";
pub const TEXT_PROMPT: &str = "Your answer: ";

#[derive(Debug, Clone)]
pub struct GoalRefiner {
    timeout: Duration,
}

impl GoalRefiner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn from_config(config: &StepwiseConfig) -> Self {
        Self::new(config.timeouts.complete())
    }

    /// Run the full dialogue for `raw_goal`.
    ///
    /// Only console I/O errors propagate; backend trouble falls back to the
    /// single default question and to the raw goal as the summary.
    #[instrument(skip_all)]
    pub fn refine<B, C>(&self, backend: &B, console: &mut C, raw_goal: &str) -> Result<RefinedGoal>
    where
        B: Backend + ?Sized,
        C: Console + ?Sized,
    {
        let questions = self.ask_questions(backend, raw_goal);
        info!(count = questions.len(), "clarifying questions ready");

        let mut qa = Vec::with_capacity(questions.len());
        for question in &questions {
            let answer = ask(console, question)?;
            qa.push(QaPair {
                question: question.question.clone(),
                answer,
            });
        }

        let paragraph = self.summarize(backend, raw_goal, &qa);
        console.print_plain("");
        console.print(&notice("Refined Goal:"));
        console.print_plain(&paragraph);

        Ok(RefinedGoal {
            paragraph,
            qa,
            original_goal: raw_goal.to_string(),
        })
    }

    /// Questions for `raw_goal`; never empty.
    pub fn ask_questions<B: Backend + ?Sized>(
        &self,
        backend: &B,
        raw_goal: &str,
    ) -> Vec<ClarifyingQuestion> {
        let reply = questions_prompt(raw_goal).and_then(|prompt| {
            let request = CompletionRequest::user(prompt, 0.0, QUESTIONS_MAX_TOKENS)
                .with_timeout(self.timeout);
            backend.complete(&request)
        });
        match reply {
            Ok(reply) => {
                let parsed = extract_structured(&reply, ExtractKind::Array);
                if parsed.is_none() {
                    debug!("no question array in reply");
                }
                normalize_questions(parsed.as_ref())
            }
            Err(err) => {
                warn!(err = %format!("{err:#}"), "question request failed; using fallback");
                fallback_questions()
            }
        }
    }

    /// One-line refined goal; the trimmed raw goal when summarizing fails.
    pub fn summarize<B: Backend + ?Sized>(&self, backend: &B, raw_goal: &str, qa: &[QaPair]) -> String {
        let reply = summarize_prompt(raw_goal, qa).and_then(|prompt| {
            let request = CompletionRequest::user(prompt, SUMMARY_TEMPERATURE, SUMMARY_MAX_TOKENS)
                .with_timeout(self.timeout);
            backend.complete(&request)
        });
        let collapsed = match reply {
            Ok(reply) => collapse_lines(&reply),
            Err(err) => {
                warn!(err = %format!("{err:#}"), "summary request failed; using raw goal");
                String::new()
            }
        };
        if collapsed.is_empty() {
            return raw_goal.trim().to_string();
        }
        collapsed
    }
}

/// Trim each line, drop empty ones, join with single spaces.
fn collapse_lines(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn ask<C: Console + ?Sized>(console: &mut C, question: &ClarifyingQuestion) -> Result<String> {
    console.print_plain("");
    console.print_plain(&question.question);
    let prompt = match question.kind {
        QuestionKind::Choice => {
            for (idx, choice) in question.choices.iter().enumerate() {
                let Some(label) = choice_label(idx) else {
                    break;
                };
                console.print_plain(&format!("  {label}) {choice}"));
            }
            CHOICE_PROMPT
        }
        QuestionKind::Text => TEXT_PROMPT,
    };
    let raw = console.read_line(prompt)?.unwrap_or_default();
    Ok(resolve_answer(question, &raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::questions::FALLBACK_QUESTION;
    use crate::test_support::{ScriptedBackend, ScriptedConsole, ScriptedReply};

    fn refiner() -> GoalRefiner {
        GoalRefiner::new(Duration::from_secs(15))
    }

    #[test]
    fn dialogue_maps_letters_and_summarizes() {
        let backend = ScriptedBackend::new(vec![
            ScriptedReply::text(
                "Sure! [{\"id\":1,\"question\":\"Project type?\",\"type\":\"choice\",\"choices\":[\"console app\",\"web app\"]},\
                 {\"id\":2,\"question\":\"Folder name?\",\"type\":\"text\",\"choices\":[]}]",
            ),
            ScriptedReply::text("  Create a console app\n\n   in folder demo.  \n"),
        ]);
        let mut console = ScriptedConsole::new(&["a", "demo"]);

        let refined = refiner()
            .refine(&backend, &mut console, "create a python project")
            .expect("refine");

        assert_eq!(refined.paragraph, "Create a console app in folder demo.");
        assert_eq!(refined.original_goal, "create a python project");
        assert_eq!(
            refined.qa,
            vec![
                QaPair {
                    question: "Project type?".to_string(),
                    answer: "console app".to_string()
                },
                QaPair {
                    question: "Folder name?".to_string(),
                    answer: "demo".to_string()
                },
            ]
        );
        assert_eq!(console.prompts(), vec![CHOICE_PROMPT, TEXT_PROMPT]);
        assert!(console.output().contains(&"  B) web app".to_string()));

        let requests = backend.requests();
        assert_eq!(requests[0].max_tokens, 300);
        assert_eq!(requests[1].temperature, 0.15);
        assert_eq!(requests[1].max_tokens, 160);
        assert!(backend.prompts()[1].contains("\"answer\":\"console app\""));
    }

    #[test]
    fn unparseable_questions_fall_back_to_single_text_question() {
        let backend = ScriptedBackend::new(vec![
            ScriptedReply::text("I cannot help with that."),
            ScriptedReply::fail("timeout"),
        ]);
        let mut console = ScriptedConsole::new(&["cli tool"]);
        let refined = refiner()
            .refine(&backend, &mut console, "  make something  ")
            .expect("refine");
        assert_eq!(refined.qa.len(), 1);
        assert_eq!(refined.qa[0].question, FALLBACK_QUESTION);
        assert_eq!(refined.paragraph, "make something");
    }

    #[test]
    fn backend_failure_uses_fallback_question() {
        let backend = ScriptedBackend::new(vec![ScriptedReply::fail("refused")]);
        assert_eq!(
            refiner().ask_questions(&backend, "goal"),
            fallback_questions()
        );
    }

    #[test]
    fn blank_summary_uses_raw_goal() {
        let backend = ScriptedBackend::new(vec![ScriptedReply::text(" \n \n")]);
        assert_eq!(refiner().summarize(&backend, " goal ", &[]), "goal");
    }

    #[test]
    fn choice_listing_stops_at_the_last_letter() {
        let question = ClarifyingQuestion {
            id: 1,
            question: "Pick a template".to_string(),
            kind: QuestionKind::Choice,
            choices: (0..28).map(|i| format!("template {i}")).collect(),
        };
        let mut console = ScriptedConsole::new(&["a"]);
        let answer = ask(&mut console, &question).expect("ask");

        assert_eq!(answer, "template 0");
        let listed: Vec<String> = console
            .output()
            .into_iter()
            .filter(|line| line.starts_with("  "))
            .collect();
        assert_eq!(listed.len(), 26);
        assert_eq!(listed[0], "  A) template 0");
        assert_eq!(listed[25], "  Z) template 25");
    }

    #[test]
    fn end_of_input_gives_empty_answer() {
        let backend = ScriptedBackend::new(vec![
            ScriptedReply::text("[\"Which language?\"]"),
            ScriptedReply::text("Use python."),
        ]);
        let mut console = ScriptedConsole::new(&[]);
        let refined = refiner()
            .refine(&backend, &mut console, "write a script")
            .expect("refine");
        assert_eq!(refined.qa[0].answer, "");
        assert_eq!(refined.paragraph, "Use python.");
    }
}
