//! Stepwise CLI.
//!
//! Without a subcommand, starts the interactive session: every input line is
//! classified and either relayed as chat or planned into phases.

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use stepwise::agents::mode::ModeClassifier;
use stepwise::exit_codes;
use stepwise::io::backend::HttpBackend;
use stepwise::io::commands::ProcessRunner;
use stepwise::io::config::{StepwiseConfig, default_config_path, load_config, write_config};
use stepwise::io::console::StdConsole;
use stepwise::io::interrupt::InterruptFlag;
use stepwise::logging;
use stepwise::pipeline::PhaseMode;
use stepwise::session::Session;
use tracing::info;

#[derive(Parser)]
#[command(
    name = "stepwise",
    version,
    about = "Break goals into phases and terminal-ready micro-tasks"
)]
struct Cli {
    /// Config file (defaults to `.stepwise/config.toml`).
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Interactive session (the default).
    Chat,
    /// Print the mode (`phase` or `normal`) chosen for TEXT.
    Classify { text: String },
    /// Run phase mode once for GOAL.
    Plan {
        goal: String,
        /// Run each phase's commands after it is generated.
        #[arg(long)]
        execute: bool,
    },
    /// Write the default config file.
    Init {
        /// Overwrite an existing file.
        #[arg(short, long)]
        force: bool,
    },
}

fn main() {
    logging::init();
    if let Err(err) = run() {
        eprintln!("{:#}", err);
        std::process::exit(exit_codes::FAILED);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.unwrap_or_else(default_config_path);
    match cli.command {
        Some(Command::Init { force }) => cmd_init(&config_path, force),
        Some(Command::Classify { text }) => cmd_classify(&config_path, &text),
        Some(Command::Plan { goal, execute }) => cmd_plan(&config_path, &goal, execute),
        Some(Command::Chat) | None => cmd_chat(&config_path),
    }
}

fn cmd_init(path: &Path, force: bool) -> Result<()> {
    if !force && path.exists() {
        println!("{} already exists (use --force to overwrite)", path.display());
        return Ok(());
    }
    write_config(path, &StepwiseConfig::default())?;
    println!("wrote {}", path.display());
    Ok(())
}

fn cmd_classify(path: &Path, text: &str) -> Result<()> {
    let config = load_config(path)?;
    let backend = HttpBackend::new(&config.backend)?;
    let mode = ModeClassifier::from_config(&config).classify(&backend, text);
    println!("{}", mode.as_str());
    Ok(())
}

fn cmd_plan(path: &Path, goal: &str, execute: bool) -> Result<()> {
    let config = load_config(path)?;
    let interrupt = install_interrupt()?;
    let backend = HttpBackend::new(&config.backend)?.with_interrupt(interrupt.clone());
    let mut phase_mode = PhaseMode::from_config(&config, interrupt);
    phase_mode.execute |= execute;

    let outcome = phase_mode.run(&backend, &mut StdConsole::new(), &runner(&config), goal)?;
    info!(
        phases = outcome.plan.len(),
        commands = outcome.context.executed_commands().len(),
        "plan finished"
    );
    Ok(())
}

fn cmd_chat(path: &Path) -> Result<()> {
    let config = load_config(path)?;
    let interrupt = install_interrupt()?;
    let backend = HttpBackend::new(&config.backend)?.with_interrupt(interrupt.clone());
    let session = Session::from_config(&config, interrupt);

    let summary = session.run(&backend, &mut StdConsole::new(), &runner(&config))?;
    info!(turns = summary.turns, "session ended");
    Ok(())
}

fn install_interrupt() -> Result<InterruptFlag> {
    let interrupt = InterruptFlag::new();
    interrupt.install()?;
    Ok(interrupt)
}

fn runner(config: &StepwiseConfig) -> ProcessRunner {
    ProcessRunner {
        timeout: config.timeouts.command(),
        output_limit_bytes: config.execution.output_limit_bytes,
        workdir: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_subcommand_means_chat() {
        let cli = Cli::parse_from(["stepwise"]);
        assert!(cli.command.is_none());
        assert!(cli.config.is_none());
    }

    #[test]
    fn parse_plan_with_execute_and_global_config() {
        let cli = Cli::parse_from([
            "stepwise",
            "plan",
            "set up a python project",
            "--execute",
            "--config",
            "cfg.toml",
        ]);
        assert_eq!(cli.config, Some(PathBuf::from("cfg.toml")));
        assert!(matches!(
            cli.command,
            Some(Command::Plan { ref goal, execute: true }) if goal == "set up a python project"
        ));
    }

    #[test]
    fn parse_init_force() {
        let cli = Cli::parse_from(["stepwise", "init", "--force"]);
        assert!(matches!(cli.command, Some(Command::Init { force: true })));
    }

    #[test]
    fn parse_classify() {
        let cli = Cli::parse_from(["stepwise", "classify", "hello there"]);
        assert!(matches!(cli.command, Some(Command::Classify { ref text }) if text == "hello there"));
    }
}
