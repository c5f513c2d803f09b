//! Interactive session loop: read a line, classify it, route it.

use anyhow::Result;
use tracing::{info, instrument};

use crate::agents::mode::ModeClassifier;
use crate::chat::ChatRelay;
use crate::core::types::Mode;
use crate::io::backend::Backend;
use crate::io::commands::CommandRunner;
use crate::io::config::StepwiseConfig;
use crate::io::console::Console;
use crate::io::interrupt::InterruptFlag;
use crate::io::terminal::notice;
use crate::pipeline::PhaseMode;

pub const INPUT_PROMPT: &str = "You: ";
pub const FAREWELL: &str = "Goodbye!";

/// Counters for one session, mostly for logging and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionSummary {
    pub turns: usize,
    pub phase_runs: usize,
    pub chats: usize,
}

#[derive(Debug, Clone)]
pub struct Session {
    pub classifier: ModeClassifier,
    pub phase_mode: PhaseMode,
    pub chat: ChatRelay,
}

impl Session {
    pub fn from_config(config: &StepwiseConfig, interrupt: InterruptFlag) -> Self {
        Self {
            classifier: ModeClassifier::from_config(config),
            phase_mode: PhaseMode::from_config(config, interrupt.clone()),
            chat: ChatRelay::from_config(config, interrupt),
        }
    }

    /// Loop until `quit`, `exit` or end of input.
    #[instrument(skip_all)]
    pub fn run<B, C, R>(&self, backend: &B, console: &mut C, runner: &R) -> Result<SessionSummary>
    where
        B: Backend + ?Sized,
        C: Console + ?Sized,
        R: CommandRunner + ?Sized,
    {
        let mut summary = SessionSummary::default();
        loop {
            let Some(line) = console.read_line(INPUT_PROMPT)? else {
                console.print_plain("");
                console.print_plain(FAREWELL);
                break;
            };
            let input = line.trim();
            if input.is_empty() {
                continue;
            }
            if is_exit(input) {
                console.print_plain(FAREWELL);
                break;
            }

            summary.turns += 1;
            let mode = self.classifier.classify(backend, input);
            info!(mode = mode.as_str(), "routing input");
            console.print(&notice(format!("[Mode detected: {}]", mode.as_str())));
            match mode {
                Mode::Phase => {
                    self.phase_mode.run(backend, console, runner, input)?;
                    summary.phase_runs += 1;
                }
                Mode::Normal => {
                    self.chat.relay(backend, console, input);
                    summary.chats += 1;
                }
            }
        }
        Ok(summary)
    }
}

fn is_exit(input: &str) -> bool {
    input.eq_ignore_ascii_case("quit") || input.eq_ignore_ascii_case("exit")
}
