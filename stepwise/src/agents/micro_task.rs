//! Micro-task generator agent.
//!
//! Streams one paragraph per phase, rendering complete lines as they arrive,
//! then post-processes the collected text against the execution context and
//! folds the result back into it.

use std::ops::ControlFlow;
use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use crate::core::context::ExecutionContext;
use crate::core::postprocess::finalize_paragraph;
use crate::core::render::{LineBuffer, LineRenderer};
use crate::core::types::PhaseReport;
use crate::io::backend::{Backend, CompletionRequest, StreamEnd};
use crate::io::config::StepwiseConfig;
use crate::io::console::Console;
use crate::io::interrupt::InterruptFlag;
use crate::io::prompt::{MicroTaskPrompt, micro_task_prompt};
use crate::io::terminal::{micro_task_banner, notice};

#[derive(Debug, Clone)]
pub struct MicroTaskSettings {
    pub temperature: f64,
    pub max_tokens: i64,
    pub timeout: Duration,
    /// Characters of prior narrative shown to the model.
    pub prompt_tail_chars: usize,
}

impl MicroTaskSettings {
    pub fn from_config(config: &StepwiseConfig) -> Self {
        Self {
            temperature: config.generation.micro_task_temperature,
            max_tokens: config.generation.max_tokens,
            timeout: config.timeouts.stream_read(),
            prompt_tail_chars: config.context.prompt_tail_chars,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MicroTaskGenerator {
    settings: MicroTaskSettings,
    interrupt: InterruptFlag,
}

impl MicroTaskGenerator {
    pub fn new(settings: MicroTaskSettings, interrupt: InterruptFlag) -> Self {
        Self {
            settings,
            interrupt,
        }
    }

    /// Generate, render and post-process the paragraph for one phase.
    ///
    /// Stream errors and interrupts end the stream early; whatever arrived is
    /// still post-processed. `context` is updated before returning.
    #[instrument(skip_all, fields(phase = %phase))]
    pub fn generate<B, C>(
        &self,
        backend: &B,
        console: &mut C,
        goal: &str,
        phase: &str,
        context: &mut ExecutionContext,
    ) -> PhaseReport
    where
        B: Backend + ?Sized,
        C: Console + ?Sized,
    {
        console.print_plain("");
        console.print(&micro_task_banner(phase));
        console.print_plain("");

        let raw = self.stream_paragraph(backend, console, goal, phase, context);
        let paragraph = finalize_paragraph(&raw, context);
        let new_commands = context.record(&paragraph);
        info!(
            new_commands = new_commands.len(),
            executed_total = context.executed_commands().len(),
            "phase paragraph ready"
        );

        PhaseReport {
            phase: phase.to_string(),
            paragraph,
            new_commands,
            executions: Vec::new(),
        }
    }

    fn stream_paragraph<B, C>(
        &self,
        backend: &B,
        console: &mut C,
        goal: &str,
        phase: &str,
        context: &ExecutionContext,
    ) -> String
    where
        B: Backend + ?Sized,
        C: Console + ?Sized,
    {
        let previous = context.prompt_tail(self.settings.prompt_tail_chars);
        let executed = context.executed_snippet();
        let prompt = match micro_task_prompt(&MicroTaskPrompt {
            goal,
            phase,
            previous: &previous,
            executed: &executed,
        }) {
            Ok(prompt) => prompt,
            Err(err) => {
                warn!(err = %format!("{err:#}"), "render micro-task prompt");
                return String::new();
            }
        };
        let request = CompletionRequest::user(prompt, self.settings.temperature, self.settings.max_tokens)
            .with_timeout(self.settings.timeout);

        let mut collected = String::new();
        let mut lines = LineBuffer::default();
        let mut renderer = LineRenderer::new();
        let guard = self.interrupt.begin_stream();
        let result = backend.stream(&request, &mut |token| {
            collected.push_str(token);
            for line in lines.push(token) {
                console.print(&renderer.render(&line));
            }
            if guard.interrupted() {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        });
        drop(guard);

        if let Some(rest) = lines.finish() {
            console.print(&renderer.render(&rest));
        }
        match result {
            Ok(StreamEnd::Done | StreamEnd::Closed) => {
                debug!(chars = collected.len(), "stream finished");
            }
            Ok(StreamEnd::Interrupted) => {
                console.print(&notice("⚠ Stream interrupted; keeping partial output."));
            }
            Err(err) => {
                warn!(err = %format!("{err:#}"), chars = collected.len(), "micro-task stream failed");
                console.print(&notice(format!("❌ Stream error: {err:#}")));
            }
        }
        collected
    }
}
