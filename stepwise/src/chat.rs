//! Normal-mode relay: stream the backend's answer with fenced-code rendering.

use std::ops::ControlFlow;
use std::time::Duration;

use tracing::{debug, instrument, warn};

use crate::core::render::{FenceRenderer, LineBuffer};
use crate::io::backend::{Backend, CompletionRequest, StreamEnd};
use crate::io::config::StepwiseConfig;
use crate::io::console::Console;
use crate::io::interrupt::InterruptFlag;
use crate::io::terminal::{end_banner, notice, streaming_banner};

#[derive(Debug, Clone)]
pub struct ChatRelay {
    temperature: f64,
    max_tokens: i64,
    timeout: Duration,
    interrupt: InterruptFlag,
}

impl ChatRelay {
    pub fn new(temperature: f64, max_tokens: i64, timeout: Duration, interrupt: InterruptFlag) -> Self {
        Self {
            temperature,
            max_tokens,
            timeout,
            interrupt,
        }
    }

    pub fn from_config(config: &StepwiseConfig, interrupt: InterruptFlag) -> Self {
        Self::new(
            config.generation.chat_temperature,
            config.generation.max_tokens,
            config.timeouts.stream_read(),
            interrupt,
        )
    }

    /// Relay `input` and return the collected reply text.
    ///
    /// Transport errors and interrupts are reported on the console; the
    /// partial reply is still returned.
    #[instrument(skip_all)]
    pub fn relay<B, C>(&self, backend: &B, console: &mut C, input: &str) -> String
    where
        B: Backend + ?Sized,
        C: Console + ?Sized,
    {
        console.print_plain("");
        console.print(&notice("Response:"));
        console.print(&streaming_banner());

        let request = CompletionRequest::user(input, self.temperature, self.max_tokens)
            .with_timeout(self.timeout);
        let mut collected = String::new();
        let mut lines = LineBuffer::default();
        let mut renderer = FenceRenderer::new();
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
            Ok(StreamEnd::Done | StreamEnd::Closed) => debug!(chars = collected.len(), "reply finished"),
            Ok(StreamEnd::Interrupted) => console.print(&notice("⚠ Response interrupted.")),
            Err(err) => {
                warn!(err = %format!("{err:#}"), "chat stream failed");
                console.print(&notice(format!("❌ Stream error: {err:#}")));
            }
        }
        console.print(&end_banner());
        collected
    }
}
