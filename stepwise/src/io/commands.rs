//! Sequential execution of the commands embedded in a micro-task paragraph.
//!
//! The [`CommandRunner`] trait decouples execution from process spawning;
//! tests record argument vectors instead of running anything.

use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use anyhow::{Result, anyhow};
use tracing::{debug, info, instrument, warn};

use crate::core::markup::extract_commands;
use crate::core::render::Segment;
use crate::core::safety::destructive_reason;
use crate::core::types::{CommandReport, CommandStatus};
use crate::io::console::Console;
use crate::io::process::{StreamKind, run_command_forwarding};
use crate::io::terminal::notice;

pub const NO_COMMANDS_NOTICE: &str =
    "(No commands found; this micro-task only describes an action.)";

/// Exit information and bounded output for one finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOutcome {
    pub code: Option<i32>,
    pub timed_out: bool,
    pub stdout: String,
    pub stderr: String,
    /// Bytes beyond `output_limit_bytes`, summed over both streams.
    pub truncated_bytes: usize,
}

/// Abstraction over process execution.
pub trait CommandRunner {
    /// Run `argv` to completion, passing each output line to `forward`.
    fn run(&self, argv: &[String], forward: &mut dyn FnMut(StreamKind, &str))
    -> Result<RunOutcome>;
}

/// Runner that spawns real child processes (no shell).
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    pub timeout: Duration,
    pub output_limit_bytes: usize,
    pub workdir: Option<PathBuf>,
}

impl CommandRunner for ProcessRunner {
    fn run(
        &self,
        argv: &[String],
        forward: &mut dyn FnMut(StreamKind, &str),
    ) -> Result<RunOutcome> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| anyhow!("empty argument vector"))?;
        let mut cmd = Command::new(program);
        cmd.args(args);
        if let Some(dir) = &self.workdir {
            cmd.current_dir(dir);
        }
        let output = run_command_forwarding(cmd, self.timeout, self.output_limit_bytes, forward)?;
        Ok(RunOutcome {
            code: output.status.code(),
            timed_out: output.timed_out,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            truncated_bytes: output.stdout_truncated + output.stderr_truncated,
        })
    }
}

/// Extract every command span and run each in document order.
///
/// Returns one report per extracted command; an empty vector when the
/// paragraph holds no commands.
#[instrument(skip_all)]
pub fn execute_paragraph<R, C>(runner: &R, console: &mut C, paragraph: &str) -> Vec<CommandReport>
where
    R: CommandRunner + ?Sized,
    C: Console + ?Sized,
{
    let commands = extract_commands(paragraph);
    if commands.is_empty() {
        console.print_plain(NO_COMMANDS_NOTICE);
        return Vec::new();
    }
    info!(count = commands.len(), "executing commands");
    commands
        .iter()
        .map(|cmd| execute_one(runner, console, cmd))
        .collect()
}

fn execute_one<R, C>(runner: &R, console: &mut C, raw: &str) -> CommandReport
where
    R: CommandRunner + ?Sized,
    C: Console + ?Sized,
{
    let command = raw.trim().to_string();
    console.print(&[
        Segment::Notice("→ Running:".to_string()),
        Segment::Plain(" ".to_string()),
        Segment::Command(command.clone()),
    ]);

    let (status, outcome) = run_checked(runner, console, &command);
    match &status {
        CommandStatus::Succeeded => console.print(&[Segment::Success("✓ Success".to_string())]),
        CommandStatus::Failed { code: Some(code) } => {
            console.print(&notice(format!("⚠ Command exited with code {code}")));
        }
        CommandStatus::Failed { code: None } => {
            console.print(&notice("⚠ Command terminated by signal"));
        }
        CommandStatus::TimedOut => console.print(&notice("⚠ Command timed out")),
        CommandStatus::SpawnFailed { error } => {
            console.print(&notice(format!("❌ Error running command: {error}")));
        }
        CommandStatus::Refused { reason } => {
            console.print(&notice(format!("✖ Refused ({reason})")));
        }
        CommandStatus::InvalidSyntax { error } => {
            console.print(&notice(format!("❌ Cannot parse command: {error}")));
        }
    }
    CommandReport {
        command,
        status,
        stdout: outcome.stdout,
        stderr: outcome.stderr,
        truncated_bytes: outcome.truncated_bytes,
    }
}

/// Status plus whatever output was captured (empty when nothing ran).
fn run_checked<R, C>(runner: &R, console: &mut C, command: &str) -> (CommandStatus, RunOutcome)
where
    R: CommandRunner + ?Sized,
    C: Console + ?Sized,
{
    if let Some(reason) = destructive_reason(command) {
        warn!(command, reason, "refusing destructive command");
        let status = CommandStatus::Refused {
            reason: reason.to_string(),
        };
        return (status, RunOutcome::default());
    }
    let argv = match shell_words::split(command) {
        Ok(argv) if !argv.is_empty() => argv,
        Ok(_) => {
            let status = CommandStatus::InvalidSyntax {
                error: "empty command".to_string(),
            };
            return (status, RunOutcome::default());
        }
        Err(err) => {
            let status = CommandStatus::InvalidSyntax {
                error: err.to_string(),
            };
            return (status, RunOutcome::default());
        }
    };

    match runner.run(&argv, &mut |_, line| console.print_plain(line)) {
        Ok(outcome) => {
            let status = if outcome.timed_out {
                CommandStatus::TimedOut
            } else if outcome.code == Some(0) {
                CommandStatus::Succeeded
            } else {
                warn!(command, code = ?outcome.code, "command failed");
                CommandStatus::Failed { code: outcome.code }
            };
            if outcome.truncated_bytes > 0 {
                debug!(command, truncated_bytes = outcome.truncated_bytes, "captured output truncated");
            }
            (status, outcome)
        }
        Err(err) => {
            warn!(command, err = %format!("{err:#}"), "command could not run");
            let status = CommandStatus::SpawnFailed {
                error: format!("{err:#}"),
            };
            (status, RunOutcome::default())
        }
    }
}
