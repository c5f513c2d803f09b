//! Orchestration for one phase-mode run: refine, plan, then generate (and
//! optionally execute) every phase in order.

use std::thread;
use std::time::Duration;

use anyhow::Result;
use tracing::{info, instrument};

use crate::agents::micro_task::{MicroTaskGenerator, MicroTaskSettings};
use crate::agents::planner::PhasePlanner;
use crate::agents::refiner::GoalRefiner;
use crate::core::context::ExecutionContext;
use crate::core::types::{PhaseReport, RefinedGoal};
use crate::io::backend::Backend;
use crate::io::commands::{CommandRunner, execute_paragraph};
use crate::io::config::StepwiseConfig;
use crate::io::console::Console;
use crate::io::interrupt::InterruptFlag;

/// Result of one phase-mode run.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub refined: RefinedGoal,
    /// Phases in execution order.
    pub plan: Vec<String>,
    /// One report per phase, in plan order.
    pub reports: Vec<PhaseReport>,
    pub context: ExecutionContext,
}

/// Agents and settings for phase mode.
#[derive(Debug, Clone)]
pub struct PhaseMode {
    pub refiner: GoalRefiner,
    pub planner: PhasePlanner,
    pub generator: MicroTaskGenerator,
    /// Run each phase's commands after it is generated.
    pub execute: bool,
    pub phase_delay: Duration,
    pub tail_limit_chars: usize,
}

impl PhaseMode {
    pub fn from_config(config: &StepwiseConfig, interrupt: InterruptFlag) -> Self {
        Self {
            refiner: GoalRefiner::from_config(config),
            planner: PhasePlanner::from_config(config),
            generator: MicroTaskGenerator::new(MicroTaskSettings::from_config(config), interrupt),
            execute: config.execution.enabled,
            phase_delay: Duration::from_millis(config.phase_delay_ms),
            tail_limit_chars: config.context.tail_limit_chars,
        }
    }

    /// Run phase mode for `raw_goal`.
    ///
    /// Phases run strictly in plan order; each generation sees the context
    /// left by the previous one. Only console I/O errors propagate.
    #[instrument(skip_all, fields(execute = self.execute))]
    pub fn run<B, C, R>(
        &self,
        backend: &B,
        console: &mut C,
        runner: &R,
        raw_goal: &str,
    ) -> Result<PipelineOutcome>
    where
        B: Backend + ?Sized,
        C: Console + ?Sized,
        R: CommandRunner + ?Sized,
    {
        let refined = self.refiner.refine(backend, console, raw_goal)?;
        let plan = self.planner.plan(backend, console, &refined);
        info!(phases = plan.len(), "starting micro-task generation");

        let mut context = ExecutionContext::new(self.tail_limit_chars);
        let mut reports = Vec::with_capacity(plan.len());
        for (idx, phase) in plan.iter().enumerate() {
            if idx > 0 && !self.phase_delay.is_zero() {
                thread::sleep(self.phase_delay);
            }
            let mut report =
                self.generator
                    .generate(backend, console, &refined.paragraph, phase, &mut context);
            if self.execute {
                report.executions = execute_paragraph(runner, console, &report.paragraph);
            }
            reports.push(report);
        }

        Ok(PipelineOutcome {
            refined,
            plan,
            reports,
            context,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::CommandStatus;
    use crate::test_support::{RecordingRunner, ScriptedBackend, ScriptedConsole, ScriptedReply};

    fn phase_mode(execute: bool) -> PhaseMode {
        let mut config = StepwiseConfig::default();
        config.phase_delay_ms = 0;
        config.execution.enabled = execute;
        PhaseMode::from_config(&config, InterruptFlag::new())
    }

    fn script() -> Vec<ScriptedReply> {
        vec![
            ScriptedReply::text("[\"Folder name?\"]"),
            ScriptedReply::text("Create a demo folder with a README."),
            ScriptedReply::text("[\"Create demo folder\", \"Write README file\"]"),
            ScriptedReply::text("Create it with <cmd>mkdir demo</cmd>."),
            ScriptedReply::text(
                "The folder exists: <cmd>mkdir demo</cmd>. Write it with <cmd>touch demo/README.md</cmd>.",
            ),
        ]
    }

    #[test]
    fn phases_run_in_order_and_share_context() {
        let backend = ScriptedBackend::new(script());
        let mut console = ScriptedConsole::new(&["demo"]);
        let runner = RecordingRunner::default();

        let outcome = phase_mode(false)
            .run(&backend, &mut console, &runner, "make a demo")
            .expect("run");

        assert_eq!(outcome.plan, vec!["Create demo folder", "Write README file"]);
        assert_eq!(outcome.reports.len(), 2);
        assert_eq!(outcome.reports[0].phase, "Create demo folder");
        assert_eq!(
            outcome.reports[1].paragraph,
            "The folder exists: (already done) . Write it with <cmd>touch demo/README.md</cmd>."
        );
        assert_eq!(
            outcome.context.executed_commands(),
            &["mkdir demo".to_string(), "touch demo/README.md".to_string()]
        );
        assert!(runner.calls().is_empty());
        assert!(outcome.reports.iter().all(|r| r.executions.is_empty()));
        assert_eq!(backend.remaining(), 0);
    }

    #[test]
    fn execution_runs_only_live_commands() {
        let backend = ScriptedBackend::new(script());
        let mut console = ScriptedConsole::new(&["demo"]);
        let runner = RecordingRunner::default();

        let outcome = phase_mode(true)
            .run(&backend, &mut console, &runner, "make a demo")
            .expect("run");

        assert_eq!(
            runner.calls(),
            vec![
                vec!["mkdir".to_string(), "demo".to_string()],
                vec!["touch".to_string(), "demo/README.md".to_string()],
            ]
        );
        assert_eq!(outcome.reports[1].executions.len(), 1);
        assert_eq!(
            outcome.reports[1].executions[0].status,
            CommandStatus::Succeeded
        );
    }
}
