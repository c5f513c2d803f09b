//! Incremental rendering of streamed text into styled lines.
//!
//! Tokens arrive in arbitrary chunks; [`LineBuffer`] releases complete lines,
//! and a renderer turns each line into [`Segment`]s. Color is applied later by
//! the terminal layer.

use std::sync::LazyLock;

use regex::Regex;

use crate::core::markup::{CMD_CLOSE, CMD_OPEN};

/// A styled run of text within one rendered line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Plain(String),
    /// Shell command content (from command markup).
    Command(String),
    /// Line inside a fenced code block.
    CodeBlock(String),
    /// Inline backtick span.
    Code(String),
    /// `**bold**` span.
    Emphasis(String),
    /// Banners and warnings from the tool itself.
    Notice(String),
    Success(String),
}

pub type RenderedLine = Vec<Segment>;

/// Plain text of a rendered line, without styling.
pub fn plain_text(line: &[Segment]) -> String {
    line.iter()
        .map(|segment| match segment {
            Segment::Plain(s)
            | Segment::Command(s)
            | Segment::CodeBlock(s)
            | Segment::Code(s)
            | Segment::Emphasis(s)
            | Segment::Notice(s)
            | Segment::Success(s) => s.as_str(),
        })
        .collect()
}

/// Accumulates streamed tokens and yields complete lines.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: String,
}

impl LineBuffer {
    /// Append a token, returning every line it completed (without `\n`).
    pub fn push(&mut self, token: &str) -> Vec<String> {
        self.pending.push_str(token);
        let mut lines = Vec::new();
        while let Some(pos) = self.pending.find('\n') {
            let line: String = self.pending.drain(..=pos).collect();
            lines.push(line.trim_end_matches(['\n', '\r']).to_string());
        }
        lines
    }

    /// Remaining partial line at end of stream, if any.
    pub fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.pending);
        (!rest.is_empty()).then_some(rest)
    }
}

/// Rendering state for command markup that may span several lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommandState {
    #[default]
    Plain,
    InCommand,
}

/// Line renderer for micro-task paragraphs.
///
/// Create one per paragraph; state carries across lines of that paragraph.
#[derive(Debug, Default)]
pub struct LineRenderer {
    state: CommandState,
}

impl LineRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> CommandState {
        self.state
    }

    pub fn render(&mut self, line: &str) -> RenderedLine {
        let opens = line.contains(CMD_OPEN);
        let closes = line.contains(CMD_CLOSE);
        match (opens, closes) {
            (true, true) => vec![Segment::Command(strip_markers(line))],
            (true, false) => {
                self.state = CommandState::InCommand;
                vec![Segment::Command(strip_markers(line))]
            }
            (false, true) => {
                self.state = CommandState::Plain;
                vec![Segment::Command(strip_markers(line))]
            }
            (false, false) if self.state == CommandState::InCommand => {
                vec![Segment::Command(line.to_string())]
            }
            (false, false) => inline_segments(line),
        }
    }
}

fn strip_markers(line: &str) -> String {
    line.replace(CMD_OPEN, "").replace(CMD_CLOSE, "")
}

/// Line renderer for chat replies with fenced code blocks.
#[derive(Debug, Default)]
pub struct FenceRenderer {
    in_block: bool,
}

impl FenceRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn render(&mut self, line: &str) -> RenderedLine {
        if line.contains("```") {
            self.in_block = !self.in_block;
            return if self.in_block {
                vec![Segment::CodeBlock(line.to_string())]
            } else {
                vec![Segment::Plain(line.to_string())]
            };
        }
        if self.in_block {
            return vec![Segment::CodeBlock(line.to_string())];
        }
        inline_segments(line)
    }
}

static INLINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<cmd>(?P<cmd>.*?)</cmd>|`(?P<code>[^`]+)`|\*\*(?P<bold>[^*]+)\*\*")
        .expect("inline markup regex")
});

/// Split a plain line into inline command, code and emphasis spans.
pub fn inline_segments(line: &str) -> RenderedLine {
    let mut segments = Vec::new();
    let mut last = 0;
    for caps in INLINE_RE.captures_iter(line) {
        let Some(whole) = caps.get(0) else { continue };
        if whole.start() > last {
            segments.push(Segment::Plain(line[last..whole.start()].to_string()));
        }
        let segment = if let Some(m) = caps.name("cmd") {
            Segment::Command(m.as_str().to_string())
        } else if let Some(m) = caps.name("code") {
            Segment::Code(m.as_str().to_string())
        } else if let Some(m) = caps.name("bold") {
            Segment::Emphasis(m.as_str().to_string())
        } else {
            Segment::Plain(whole.as_str().to_string())
        };
        segments.push(segment);
        last = whole.end();
    }
    if last < line.len() || segments.is_empty() {
        segments.push(Segment::Plain(line[last..].to_string()));
    }
    segments
}
