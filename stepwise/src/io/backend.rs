//! Text-generation backend abstraction and the HTTP chat-completion client.
//!
//! The [`Backend`] trait decouples the agents from the network. Tests use a
//! scripted backend that replays canned replies without opening sockets.
//!
//! Streams are read on a worker thread. The caller polls the line channel so
//! that Ctrl-C and the idle timeout apply even while the server is silent.

use std::io::{BufRead, BufReader};
use std::ops::ControlFlow;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::io::config::BackendConfig;
use crate::io::interrupt::InterruptFlag;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
/// How often a waiting stream checks the interrupt flag.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// One chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Parameters for one generation request.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub messages: Vec<Message>,
    pub temperature: f64,
    /// `-1` means unlimited and is sent as-is.
    pub max_tokens: i64,
    /// Total deadline for `complete`; longest silence allowed for `stream`.
    pub timeout: Duration,
}

impl CompletionRequest {
    pub fn user(prompt: impl Into<String>, temperature: f64, max_tokens: i64) -> Self {
        Self {
            messages: vec![Message::user(prompt)],
            temperature,
            max_tokens,
            timeout: Duration::from_secs(15),
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.messages.insert(0, Message::system(system));
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// How a token stream ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEnd {
    /// The backend sent its end-of-stream sentinel.
    Done,
    /// The connection closed without a sentinel.
    Closed,
    /// The token callback asked to stop, or Ctrl-C arrived while waiting.
    Interrupted,
}

/// Abstraction over text-generation services.
pub trait Backend {
    /// Non-streaming request; returns the reply text.
    fn complete(&self, request: &CompletionRequest) -> Result<String>;

    /// Streaming request; `on_token` sees each content delta in order and may
    /// break to stop reading.
    fn stream(
        &self,
        request: &CompletionRequest,
        on_token: &mut dyn FnMut(&str) -> ControlFlow<()>,
    ) -> Result<StreamEnd>;
}

#[derive(Serialize)]
struct ChatBody<'a> {
    model: &'a str,
    stream: bool,
    temperature: f64,
    max_tokens: i64,
    messages: &'a [Message],
}

/// Backend that speaks the OpenAI-style chat-completions protocol.
pub struct HttpBackend {
    transport: Transport,
    interrupt: Option<InterruptFlag>,
}

/// Everything a request needs; cloned into stream workers.
#[derive(Clone)]
struct Transport {
    client: reqwest::blocking::Client,
    url: String,
    model: String,
    api_key: Option<String>,
}

impl HttpBackend {
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let api_key = config.api_key_env.as_deref().and_then(|var| {
            let key = std::env::var(var).ok().filter(|k| !k.trim().is_empty());
            if key.is_none() {
                warn!(env = var, "api key variable is unset; sending no credentials");
            }
            key
        });
        Self::with_client(config, api_key, reqwest::blocking::Client::builder())
    }

    fn with_client(
        config: &BackendConfig,
        api_key: Option<String>,
        builder: reqwest::blocking::ClientBuilder,
    ) -> Result<Self> {
        // No client-wide deadline: streams are bounded by idle time instead.
        let client = builder
            .timeout(None::<Duration>)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .context("build http client")?;
        Ok(Self {
            transport: Transport {
                client,
                url: config.url.clone(),
                model: config.model.clone(),
                api_key,
            },
            interrupt: None,
        })
    }

    /// Let Ctrl-C end a stream that is waiting on the network.
    pub fn with_interrupt(mut self, interrupt: InterruptFlag) -> Self {
        self.interrupt = Some(interrupt);
        self
    }

    fn interrupted(&self) -> bool {
        self.interrupt.as_ref().is_some_and(InterruptFlag::is_interrupted)
    }
}

impl Transport {
    fn post(&self, request: &CompletionRequest, stream: bool) -> Result<reqwest::blocking::Response> {
        let body = ChatBody {
            model: &self.model,
            stream,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            messages: &request.messages,
        };
        let mut builder = self.client.post(&self.url).json(&body);
        if !stream {
            builder = builder.timeout(request.timeout);
        }
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        let response = builder
            .send()
            .with_context(|| format!("send request to {}", self.url))?
            .error_for_status()
            .context("backend returned error status")?;
        Ok(response)
    }

    /// Send a streaming request on a worker thread and forward its lines.
    ///
    /// The channel closes at end of body. A transport error is sent once and
    /// ends the worker. If the receiver goes away the worker stops at the next
    /// line.
    fn spawn_stream(self, request: CompletionRequest) -> Receiver<Result<String>> {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let response = match self.post(&request, true) {
                Ok(response) => response,
                Err(err) => {
                    let _ = tx.send(Err(err));
                    return;
                }
            };
            for line in BufReader::new(response).lines() {
                let line = line.context("read stream line");
                let failed = line.is_err();
                if tx.send(line).is_err() || failed {
                    return;
                }
            }
        });
        rx
    }
}

impl Backend for HttpBackend {
    #[instrument(skip_all, fields(temperature = request.temperature, max_tokens = request.max_tokens))]
    fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let response = self.transport.post(request, false)?;
        let raw = response.text().context("read completion body")?;
        let content = match serde_json::from_str::<Value>(&raw) {
            Ok(payload) => extract_content(&payload),
            Err(_) => raw,
        };
        debug!(chars = content.len(), "completion received");
        Ok(content)
    }

    #[instrument(skip_all, fields(temperature = request.temperature, max_tokens = request.max_tokens))]
    fn stream(
        &self,
        request: &CompletionRequest,
        on_token: &mut dyn FnMut(&str) -> ControlFlow<()>,
    ) -> Result<StreamEnd> {
        let lines = self.transport.clone().spawn_stream(request.clone());
        let poll = POLL_INTERVAL.min(request.timeout);
        let mut last_activity = Instant::now();
        loop {
            if self.interrupted() {
                debug!("stream abandoned on interrupt");
                return Ok(StreamEnd::Interrupted);
            }
            let line = match lines.recv_timeout(poll) {
                Ok(line) => line?,
                Err(RecvTimeoutError::Timeout) => {
                    if last_activity.elapsed() >= request.timeout {
                        bail!(
                            "no data from backend for {:.1}s",
                            request.timeout.as_secs_f64()
                        );
                    }
                    continue;
                }
                Err(RecvTimeoutError::Disconnected) => return Ok(StreamEnd::Closed),
            };
            last_activity = Instant::now();
            match parse_sse_line(&line) {
                SseEvent::Skip => {}
                SseEvent::Done => return Ok(StreamEnd::Done),
                SseEvent::Token(token) => {
                    if on_token(&token).is_break() {
                        debug!("stream stopped by caller");
                        return Ok(StreamEnd::Interrupted);
                    }
                }
            }
        }
    }
}

type ContentStrategy = fn(&Value) -> Option<String>;

/// Reply shapes tried in order for non-streaming responses.
const CONTENT_STRATEGIES: [ContentStrategy; 4] =
    [message_content, choice_text, choice_content, top_level_content];

fn message_content(payload: &Value) -> Option<String> {
    string_at(payload, &["choices", "0", "message", "content"])
}

fn choice_text(payload: &Value) -> Option<String> {
    string_at(payload, &["choices", "0", "text"])
}

fn choice_content(payload: &Value) -> Option<String> {
    string_at(payload, &["choices", "0", "content"])
}

fn top_level_content(payload: &Value) -> Option<String> {
    string_at(payload, &["content"])
}

/// Reply text from a completion payload; the raw payload when no shape fits.
pub fn extract_content(payload: &Value) -> String {
    CONTENT_STRATEGIES
        .iter()
        .find_map(|strategy| strategy(payload))
        .unwrap_or_else(|| payload.to_string())
}

fn string_at(value: &Value, path: &[&str]) -> Option<String> {
    let mut current = value;
    for key in path {
        current = match key.parse::<usize>() {
            Ok(idx) => current.get(idx)?,
            Err(_) => current.get(*key)?,
        };
    }
    current.as_str().map(str::to_string)
}

/// One parsed server-sent-events line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    Skip,
    Token(String),
    Done,
}

pub fn parse_sse_line(line: &str) -> SseEvent {
    let Some(data) = line.trim().strip_prefix("data:") else {
        return SseEvent::Skip;
    };
    let data = data.trim();
    if data == "[DONE]" {
        return SseEvent::Done;
    }
    let Ok(frame) = serde_json::from_str::<Value>(data) else {
        return SseEvent::Skip;
    };
    let token = string_at(&frame, &["choices", "0", "delta", "content"])
        .or_else(|| string_at(&frame, &["content"]));
    match token {
        Some(token) if !token.is_empty() => SseEvent::Token(token),
        _ => SseEvent::Skip,
    }
}
