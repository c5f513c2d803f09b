//! Scripted collaborators for driving the pipeline in tests.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::ops::ControlFlow;

use anyhow::{Result, anyhow};

use crate::core::render::{Segment, plain_text};
use crate::io::backend::{Backend, CompletionRequest, StreamEnd};
use crate::io::commands::{CommandRunner, RunOutcome};
use crate::io::console::Console;
use crate::io::process::StreamKind;

/// One canned backend reply, consumed in order by either request kind.
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    /// Whole reply; streamed as a single token.
    Text(String),
    /// Streamed token by token, then the end-of-stream sentinel.
    Tokens(Vec<String>),
    /// Tokens, then the stream reports an interrupt.
    Interrupted(Vec<String>),
    /// Tokens, then a transport error.
    TokensThenFail(Vec<String>, String),
    Fail(String),
}

impl ScriptedReply {
    pub fn text(text: &str) -> Self {
        Self::Text(text.to_string())
    }

    pub fn tokens(tokens: &[&str]) -> Self {
        Self::Tokens(tokens.iter().map(|t| t.to_string()).collect())
    }

    pub fn fail(message: &str) -> Self {
        Self::Fail(message.to_string())
    }
}

/// Backend that replays [`ScriptedReply`] values and records every request.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    replies: RefCell<VecDeque<ScriptedReply>>,
    requests: RefCell<Vec<CompletionRequest>>,
}

impl ScriptedBackend {
    pub fn new(replies: Vec<ScriptedReply>) -> Self {
        Self {
            replies: RefCell::new(replies.into()),
            requests: RefCell::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.borrow().clone()
    }

    /// User-message content of every request, in order.
    pub fn prompts(&self) -> Vec<String> {
        self.requests
            .borrow()
            .iter()
            .filter_map(|r| r.messages.iter().rev().find(|m| m.role == "user"))
            .map(|m| m.content.clone())
            .collect()
    }

    pub fn remaining(&self) -> usize {
        self.replies.borrow().len()
    }

    fn next(&self, request: &CompletionRequest) -> Result<ScriptedReply> {
        self.requests.borrow_mut().push(request.clone());
        self.replies
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| anyhow!("scripted backend has no reply left"))
    }
}

impl Backend for ScriptedBackend {
    fn complete(&self, request: &CompletionRequest) -> Result<String> {
        match self.next(request)? {
            ScriptedReply::Text(text) => Ok(text),
            ScriptedReply::Tokens(tokens) | ScriptedReply::Interrupted(tokens) => {
                Ok(tokens.concat())
            }
            ScriptedReply::TokensThenFail(_, message) | ScriptedReply::Fail(message) => {
                Err(anyhow!(message))
            }
        }
    }

    fn stream(
        &self,
        request: &CompletionRequest,
        on_token: &mut dyn FnMut(&str) -> ControlFlow<()>,
    ) -> Result<StreamEnd> {
        let (tokens, end) = match self.next(request)? {
            ScriptedReply::Text(text) => (vec![text], Ok(StreamEnd::Done)),
            ScriptedReply::Tokens(tokens) => (tokens, Ok(StreamEnd::Done)),
            ScriptedReply::Interrupted(tokens) => (tokens, Ok(StreamEnd::Interrupted)),
            ScriptedReply::TokensThenFail(tokens, message) => (tokens, Err(anyhow!(message))),
            ScriptedReply::Fail(message) => (Vec::new(), Err(anyhow!(message))),
        };
        for token in &tokens {
            if on_token(token).is_break() {
                return Ok(StreamEnd::Interrupted);
            }
        }
        end
    }
}

/// Console fed from a queue of input lines; records prompts and output.
#[derive(Debug, Default)]
pub struct ScriptedConsole {
    inputs: VecDeque<String>,
    prompts: Vec<String>,
    output: Vec<String>,
}

impl ScriptedConsole {
    pub fn new(inputs: &[&str]) -> Self {
        Self {
            inputs: inputs.iter().map(|s| s.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.clone()
    }

    /// Printed lines without styling.
    pub fn output(&self) -> Vec<String> {
        self.output.clone()
    }

    pub fn transcript(&self) -> String {
        self.output.join("\n")
    }
}

impl Console for ScriptedConsole {
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        self.prompts.push(prompt.to_string());
        Ok(self.inputs.pop_front())
    }

    fn print(&mut self, line: &[Segment]) {
        self.output.push(plain_text(line));
    }
}

/// Command runner that records argument vectors instead of spawning.
///
/// Outcomes are replayed in order; once exhausted every command succeeds.
#[derive(Debug, Default)]
pub struct RecordingRunner {
    calls: RefCell<Vec<Vec<String>>>,
    outcomes: RefCell<VecDeque<Result<RunOutcome>>>,
}

impl RecordingRunner {
    pub fn with_outcomes(outcomes: Vec<Result<RunOutcome>>) -> Self {
        Self {
            calls: RefCell::new(Vec::new()),
            outcomes: RefCell::new(outcomes.into()),
        }
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.borrow().clone()
    }
}

impl CommandRunner for RecordingRunner {
    fn run(
        &self,
        argv: &[String],
        _forward: &mut dyn FnMut(StreamKind, &str),
    ) -> Result<RunOutcome> {
        self.calls.borrow_mut().push(argv.to_vec());
        self.outcomes.borrow_mut().pop_front().unwrap_or(Ok(RunOutcome {
            code: Some(0),
            ..RunOutcome::default()
        }))
    }
}
