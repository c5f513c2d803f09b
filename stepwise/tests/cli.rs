//! CLI tests that spawn the stepwise binary.

use std::process::Command;

use stepwise::io::config::{StepwiseConfig, load_config};

#[test]
fn init_writes_default_config() {
    let temp = tempfile::tempdir().expect("tempdir");

    let status = Command::new(env!("CARGO_BIN_EXE_stepwise"))
        .current_dir(temp.path())
        .arg("init")
        .status()
        .expect("stepwise init");
    assert!(status.success());

    let path = temp.path().join(".stepwise/config.toml");
    assert_eq!(load_config(&path).expect("load"), StepwiseConfig::default());
}

#[test]
fn init_keeps_existing_config_without_force() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("custom.toml");
    std::fs::write(&path, "phase_delay_ms = 5\n").expect("write");

    let status = Command::new(env!("CARGO_BIN_EXE_stepwise"))
        .current_dir(temp.path())
        .args(["init", "--config", "custom.toml"])
        .status()
        .expect("stepwise init");
    assert!(status.success());
    assert_eq!(load_config(&path).expect("load").phase_delay_ms, 5);
}

#[test]
fn classify_task_phrase_needs_no_backend() {
    let temp = tempfile::tempdir().expect("tempdir");

    let output = Command::new(env!("CARGO_BIN_EXE_stepwise"))
        .current_dir(temp.path())
        .args(["classify", "set up a project"])
        .output()
        .expect("stepwise classify");

    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "phase");
}

#[test]
fn invalid_config_fails_with_message() {
    let temp = tempfile::tempdir().expect("tempdir");
    std::fs::write(temp.path().join("bad.toml"), "phase_delay_ms = \"soon\"\n").expect("write");

    let output = Command::new(env!("CARGO_BIN_EXE_stepwise"))
        .current_dir(temp.path())
        .args(["classify", "hello", "--config", "bad.toml"])
        .output()
        .expect("stepwise classify");

    assert_eq!(output.status.code(), Some(stepwise::exit_codes::FAILED));
    assert!(String::from_utf8_lossy(&output.stderr).contains("bad.toml"));
}
