//! Phase planner agent.

use std::ops::ControlFlow;
use std::time::Duration;

use tracing::{info, instrument, warn};

use crate::core::planning::phases_from_buffer;
use crate::core::types::RefinedGoal;
use crate::io::backend::{Backend, CompletionRequest};
use crate::io::config::StepwiseConfig;
use crate::io::console::Console;
use crate::io::prompt::{PLANNER_SYSTEM_MESSAGE, phases_prompt};
use crate::io::terminal::notice;

#[derive(Debug, Clone)]
pub struct PhasePlanner {
    temperature: f64,
    max_tokens: i64,
    timeout: Duration,
}

impl PhasePlanner {
    pub fn new(temperature: f64, max_tokens: i64, timeout: Duration) -> Self {
        Self {
            temperature,
            max_tokens,
            timeout,
        }
    }

    pub fn from_config(config: &StepwiseConfig) -> Self {
        Self::new(
            config.generation.plan_temperature,
            config.generation.max_tokens,
            config.timeouts.stream_read(),
        )
    }

    /// Ordered, non-empty plan for the refined goal.
    ///
    /// The stream is collected silently; only the final list is printed.
    #[instrument(skip_all)]
    pub fn plan<B, C>(&self, backend: &B, console: &mut C, goal: &RefinedGoal) -> Vec<String>
    where
        B: Backend + ?Sized,
        C: Console + ?Sized,
    {
        let buffer = self.collect(backend, &goal.paragraph);
        let phases = phases_from_buffer(&buffer, &goal.paragraph);
        info!(count = phases.len(), "plan ready");

        let listing = serde_json::to_string(&phases).unwrap_or_else(|_| phases.join(", "));
        console.print_plain("");
        console.print(&notice(listing));
        phases
    }

    fn collect<B: Backend + ?Sized>(&self, backend: &B, goal: &str) -> String {
        let prompt = match phases_prompt(goal) {
            Ok(prompt) => prompt,
            Err(err) => {
                warn!(err = %format!("{err:#}"), "render planning prompt");
                return String::new();
            }
        };
        let request = CompletionRequest::user(prompt, self.temperature, self.max_tokens)
            .with_system(PLANNER_SYSTEM_MESSAGE)
            .with_timeout(self.timeout);

        let mut buffer = String::new();
        let result = backend.stream(&request, &mut |token| {
            buffer.push_str(token);
            ControlFlow::Continue(())
        });
        if let Err(err) = result {
            warn!(err = %format!("{err:#}"), chars = buffer.len(), "planning stream failed");
        }
        buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ScriptedBackend, ScriptedConsole, ScriptedReply};

    fn goal(paragraph: &str) -> RefinedGoal {
        RefinedGoal {
            paragraph: paragraph.to_string(),
            qa: Vec::new(),
            original_goal: paragraph.to_string(),
        }
    }

    fn planner() -> PhasePlanner {
        PhasePlanner::new(0.7, -1, Duration::from_secs(300))
    }

    #[test]
    fn streamed_list_becomes_plan_and_is_printed() {
        let backend = ScriptedBackend::new(vec![ScriptedReply::tokens(&[
            "[\"Create project",
            " folder\", \"Run main",
            " script.\"]",
        ])]);
        let mut console = ScriptedConsole::default();
        let phases = planner().plan(&backend, &mut console, &goal("Make a CLI"));
        assert_eq!(phases, vec!["Create project folder", "Run main script"]);
        assert!(
            console
                .output()
                .contains(&"[\"Create project folder\",\"Run main script\"]".to_string())
        );

        let request = &backend.requests()[0];
        assert_eq!(request.messages[0].content, "You are a helpful assistant.");
        assert_eq!(request.max_tokens, -1);
    }

    #[test]
    fn partial_stream_still_plans() {
        let backend = ScriptedBackend::new(vec![ScriptedReply::TokensThenFail(
            vec!["1. Create project folder\n2. Write main file\n".to_string()],
            "connection reset".to_string(),
        )]);
        let mut console = ScriptedConsole::default();
        let phases = planner().plan(&backend, &mut console, &goal("Make a CLI"));
        assert_eq!(phases, vec!["Create project folder", "Write main file"]);
    }

    #[test]
    fn failed_stream_falls_back_to_goal() {
        let backend = ScriptedBackend::new(vec![ScriptedReply::fail("down")]);
        let mut console = ScriptedConsole::default();
        let phases = planner().plan(&backend, &mut console, &goal("Make a CLI tool"));
        assert_eq!(phases, vec!["Make a CLI tool"]);
    }
}
