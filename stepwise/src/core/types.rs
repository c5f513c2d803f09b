//! Shared deterministic types for the planning pipeline.
//!
//! These types carry structured data between pipeline stages. They hold no
//! I/O handles and serialize to stable JSON.

use serde::{Deserialize, Serialize};

/// Routing decision for a user utterance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Decompose into phases and generate terminal actions.
    Phase,
    /// Relay to the backend as ordinary conversation.
    Normal,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Phase => "phase",
            Mode::Normal => "normal",
        }
    }
}

/// How a clarifying question expects to be answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionKind {
    Choice,
    Text,
}

/// A normalized clarifying question.
///
/// `kind` is `Choice` only when `choices` is non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClarifyingQuestion {
    pub id: u64,
    pub question: String,
    pub kind: QuestionKind,
    pub choices: Vec<String>,
}

/// One answered clarifying question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QaPair {
    pub question: String,
    pub answer: String,
}

/// Result of the clarification dialogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefinedGoal {
    /// Single-line goal statement handed to the planner.
    pub paragraph: String,
    pub qa: Vec<QaPair>,
    pub original_goal: String,
}

/// How one extracted command ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CommandStatus {
    Succeeded,
    /// Non-zero exit; `code` is `None` when the process was killed by a signal.
    Failed { code: Option<i32> },
    TimedOut,
    SpawnFailed { error: String },
    /// Matched the destructive-command denylist; never spawned.
    Refused { reason: String },
    /// Could not be tokenized into an argument vector.
    InvalidSyntax { error: String },
}

/// One executed (or refused) command with its bounded output copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandReport {
    pub command: String,
    #[serde(flatten)]
    pub status: CommandStatus,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub stdout: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub stderr: String,
    /// Output bytes forwarded live but not kept.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub truncated_bytes: usize,
}

fn is_zero(n: &usize) -> bool {
    *n == 0
}

/// Outcome of one phase: the post-processed paragraph and what ran.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseReport {
    pub phase: String,
    pub paragraph: String,
    /// Normalized commands this phase added to the executed set.
    pub new_commands: Vec<String>,
    /// Empty unless execution is enabled.
    pub executions: Vec<CommandReport>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn command_report_flattens_status_tag() {
        let report = CommandReport {
            command: "false".to_string(),
            status: CommandStatus::Failed { code: Some(1) },
            stdout: String::new(),
            stderr: "boom\n".to_string(),
            truncated_bytes: 0,
        };
        assert_eq!(
            serde_json::to_value(&report).expect("serialize"),
            json!({"command": "false", "status": "failed", "code": 1, "stderr": "boom\n"})
        );
        let refused: CommandReport = serde_json::from_value(
            json!({"command": "rm -rf /", "status": "refused", "reason": "recursive forced removal"}),
        )
        .expect("deserialize");
        assert!(matches!(refused.status, CommandStatus::Refused { .. }));
        assert!(refused.stdout.is_empty());
        assert_eq!(refused.truncated_bytes, 0);
    }

    #[test]
    fn mode_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Mode::Phase).expect("serialize"), "\"phase\"");
        assert_eq!(Mode::Normal.as_str(), "normal");
    }
}
