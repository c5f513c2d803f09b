//! Mode classifier agent: keyword fast path, then a one-word backend vote.

use std::time::Duration;

use tracing::{debug, instrument, warn};

use crate::core::classifier::{keyword_mode, parse_mode_reply};
use crate::core::types::Mode;
use crate::io::backend::{Backend, CompletionRequest};
use crate::io::config::StepwiseConfig;
use crate::io::prompt::mode_prompt;

const CLASSIFY_MAX_TOKENS: i64 = 8;

#[derive(Debug, Clone)]
pub struct ModeClassifier {
    timeout: Duration,
}

impl ModeClassifier {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn from_config(config: &StepwiseConfig) -> Self {
        Self::new(config.timeouts.classify())
    }

    /// Never fails: backend errors and unrecognized replies yield `Normal`.
    #[instrument(skip_all)]
    pub fn classify<B: Backend + ?Sized>(&self, backend: &B, input: &str) -> Mode {
        if let Some(mode) = keyword_mode(input) {
            debug!("task phrase matched");
            return mode;
        }

        let prompt = match mode_prompt(input) {
            Ok(prompt) => prompt,
            Err(err) => {
                warn!(err = %format!("{err:#}"), "render mode prompt");
                return Mode::Normal;
            }
        };
        let request =
            CompletionRequest::user(prompt, 0.0, CLASSIFY_MAX_TOKENS).with_timeout(self.timeout);
        match backend.complete(&request) {
            Ok(reply) => parse_mode_reply(&reply).unwrap_or_else(|| {
                debug!(reply = reply.trim(), "unrecognized mode reply");
                Mode::Normal
            }),
            Err(err) => {
                warn!(err = %format!("{err:#}"), "mode classification failed; using normal");
                Mode::Normal
            }
        }
    }
}
