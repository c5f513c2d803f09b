//! End-to-end phase-mode runs driven through the public API with scripted
//! backend replies, console input and command runner.

use stepwise::agents::mode::ModeClassifier;
use stepwise::core::types::{CommandStatus, Mode};
use stepwise::io::config::StepwiseConfig;
use stepwise::io::interrupt::InterruptFlag;
use stepwise::pipeline::PhaseMode;
use stepwise::session::{FAREWELL, Session};
use stepwise::test_support::{RecordingRunner, ScriptedBackend, ScriptedConsole, ScriptedReply};

fn config(execute: bool) -> StepwiseConfig {
    let mut config = StepwiseConfig::default();
    config.phase_delay_ms = 0;
    config.execution.enabled = execute;
    config
}

/// Replies for one phase run: two questions, summary, three-phase plan and
/// one paragraph per phase. The last paragraph repeats `mkdir demo`.
fn python_project_script() -> Vec<ScriptedReply> {
    vec![
        ScriptedReply::text(
            r#"[{"id":1,"question":"What kind of project?","type":"choice","choices":["console app","web app"]},
                {"id":2,"question":"Folder name?","type":"text","choices":[]}]"#,
        ),
        ScriptedReply::text("Set up a Python console app in a folder named demo."),
        ScriptedReply::tokens(&[
            "[\"Create project folder\", ",
            "\"Create virtual environment\", ",
            "\"Add main script\"]",
        ]),
        ScriptedReply::tokens(&["Create the folder with ", "<cmd>mkdir demo</cmd>."]),
        ScriptedReply::text("Create the environment with <cmd>python3 -m venv demo/.venv</cmd>."),
        ScriptedReply::text(
            "Make sure the folder exists with <cmd>mkdir demo</cmd> and add the script with <cmd>touch demo/main.py</cmd>.",
        ),
    ]
}

#[test]
fn task_phrase_is_phase_mode_without_backend() {
    let backend = ScriptedBackend::default();
    let classifier = ModeClassifier::from_config(&StepwiseConfig::default());
    assert_eq!(classifier.classify(&backend, "set up a python project"), Mode::Phase);
    assert!(backend.requests().is_empty());
}

#[test]
fn phase_run_answers_questions_plans_and_never_repeats_commands() {
    let backend = ScriptedBackend::new(python_project_script());
    let mut console = ScriptedConsole::new(&["a", "demo"]);
    let runner = RecordingRunner::default();

    let outcome = PhaseMode::from_config(&config(true), InterruptFlag::new())
        .run(&backend, &mut console, &runner, "set up a python project")
        .expect("phase run");

    assert_eq!(outcome.refined.qa.len(), 2);
    assert_eq!(outcome.refined.qa[0].answer, "console app");
    assert_eq!(outcome.refined.qa[1].answer, "demo");
    assert_eq!(
        outcome.plan,
        vec!["Create project folder", "Create virtual environment", "Add main script"]
    );

    let last = &outcome.reports[2];
    assert!(last.paragraph.contains("(already done)"));
    assert!(!last.paragraph.contains("<cmd>mkdir demo</cmd>"));
    assert_eq!(last.new_commands, vec!["touch demo/main.py"]);

    assert_eq!(
        outcome.context.executed_commands(),
        &[
            "mkdir demo".to_string(),
            "python3 -m venv demo/.venv".to_string(),
            "touch demo/main.py".to_string(),
        ]
    );
    assert_eq!(
        runner.calls(),
        vec![
            vec!["mkdir".to_string(), "demo".to_string()],
            vec![
                "python3".to_string(),
                "-m".to_string(),
                "venv".to_string(),
                "demo/.venv".to_string(),
            ],
            vec!["touch".to_string(), "demo/main.py".to_string()],
        ]
    );
    assert!(
        outcome
            .reports
            .iter()
            .flat_map(|r| &r.executions)
            .all(|e| e.status == CommandStatus::Succeeded)
    );

    // The third prompt carries the commands issued by the first two phases.
    let third_prompt = &backend.prompts()[5];
    assert!(third_prompt.contains("<cmd>mkdir demo</cmd>"));
    assert!(third_prompt.contains("<cmd>python3 -m venv demo/.venv</cmd>"));
    assert_eq!(backend.remaining(), 0);
}

#[test]
fn session_routes_task_input_through_phase_mode() {
    let backend = ScriptedBackend::new(python_project_script());
    let mut console = ScriptedConsole::new(&["set up a python project", "b", "demo"]);

    let summary = Session::from_config(&config(false), InterruptFlag::new())
        .run(&backend, &mut console, &RecordingRunner::default())
        .expect("session");

    assert_eq!(summary.phase_runs, 1);
    assert_eq!(summary.chats, 0);
    let transcript = console.transcript();
    assert!(transcript.contains("[Mode detected: phase]"));
    assert!(transcript.contains("Refined Goal:"));
    assert!(transcript.contains("--- Micro Task: Add main script ---"));
    assert!(transcript.ends_with(FAREWELL));
}
