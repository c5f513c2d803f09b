//! Prompt rendering for every backend request.
//!
//! Templates are compiled into the binary and loaded once into a shared
//! minijinja environment.

use std::sync::LazyLock;

use anyhow::{Context, Result};
use minijinja::{Environment, context};

use crate::core::types::QaPair;

const MODE_TEMPLATE: &str = include_str!("prompts/mode.md");
const QUESTIONS_TEMPLATE: &str = include_str!("prompts/questions.md");
const SUMMARIZE_TEMPLATE: &str = include_str!("prompts/summarize.md");
const PHASES_TEMPLATE: &str = include_str!("prompts/phases.md");
const MICRO_TASK_TEMPLATE: &str = include_str!("prompts/micro_task.md");

/// System message for the planning request.
pub const PLANNER_SYSTEM_MESSAGE: &str = "You are a helpful assistant.";

static PROMPTS: LazyLock<Environment<'static>> = LazyLock::new(|| {
    let mut env = Environment::new();
    for (name, source) in [
        ("mode", MODE_TEMPLATE),
        ("questions", QUESTIONS_TEMPLATE),
        ("summarize", SUMMARIZE_TEMPLATE),
        ("phases", PHASES_TEMPLATE),
        ("micro_task", MICRO_TASK_TEMPLATE),
    ] {
        env.add_template(name, source)
            .expect("bundled prompt template should be valid");
    }
    env
});

fn render(name: &str, ctx: minijinja::Value) -> Result<String> {
    let template = PROMPTS
        .get_template(name)
        .with_context(|| format!("load prompt template {name}"))?;
    template
        .render(ctx)
        .with_context(|| format!("render prompt template {name}"))
}

pub fn mode_prompt(input: &str) -> Result<String> {
    render("mode", context! { input => input.trim() })
}

pub fn questions_prompt(goal: &str) -> Result<String> {
    render("questions", context! { goal => goal.trim() })
}

/// Summary prompt; the Q&A pairs are embedded as a JSON array.
pub fn summarize_prompt(goal: &str, qa: &[QaPair]) -> Result<String> {
    let qa_json = serde_json::to_string(qa).context("serialize clarifying answers")?;
    render(
        "summarize",
        context! { goal => goal.trim(), qa_json => qa_json },
    )
}

pub fn phases_prompt(goal: &str) -> Result<String> {
    render("phases", context! { goal => goal.trim() })
}

/// Inputs for one micro-task prompt.
#[derive(Debug, Clone)]
pub struct MicroTaskPrompt<'a> {
    pub goal: &'a str,
    pub phase: &'a str,
    /// Tail of the narrative so far ("None yet." when empty).
    pub previous: &'a str,
    /// Executed commands as inline spans ("None" when empty).
    pub executed: &'a str,
}

pub fn micro_task_prompt(input: &MicroTaskPrompt<'_>) -> Result<String> {
    render(
        "micro_task",
        context! {
            goal => input.goal.trim(),
            phase => input.phase.trim(),
            previous => input.previous,
            executed => input.executed,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_templates_render() {
        assert!(mode_prompt("hello").expect("mode").ends_with("Message: hello\nMode:"));
        assert!(questions_prompt("make a site").expect("questions").contains("Goal: make a site"));
        assert!(phases_prompt("  build it ").expect("phases").ends_with("Task: build it"));
    }

    #[test]
    fn summarize_embeds_answers_as_json() {
        let qa = vec![QaPair {
            question: "Use venv?".to_string(),
            answer: "yes".to_string(),
        }];
        let prompt = summarize_prompt("create a python project", &qa).expect("summarize");
        assert!(prompt.contains("Original Goal: create a python project"));
        assert!(prompt.contains(r#"Clarifying Q&A: [{"question":"Use venv?","answer":"yes"}]"#));
    }

    #[test]
    fn micro_task_prompt_orders_sections() {
        let prompt = micro_task_prompt(&MicroTaskPrompt {
            goal: "Create a CLI",
            phase: "Create project folder",
            previous: "None yet.",
            executed: "<cmd>mkdir app</cmd>",
        })
        .expect("micro task");
        let goal = prompt.find("Goal: Create a CLI").expect("goal");
        let phase = prompt.find("Phase: Create project folder").expect("phase");
        let previous = prompt.find("Previous Steps Context: None yet.").expect("previous");
        let executed = prompt
            .find("Previously executed commands: <cmd>mkdir app</cmd>")
            .expect("executed");
        assert!(goal < phase && phase < previous && previous < executed);
    }
}
