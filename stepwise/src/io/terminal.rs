//! ANSI styling for rendered lines and the fixed banners.

use colored::Colorize;

use crate::core::render::{RenderedLine, Segment};

/// Styled text for one rendered line.
pub fn paint(line: &[Segment]) -> String {
    line.iter()
        .map(|segment| match segment {
            Segment::Plain(s) => s.normal().to_string(),
            Segment::Command(s) | Segment::CodeBlock(s) | Segment::Success(s) => {
                s.green().to_string()
            }
            Segment::Code(s) => s.blue().to_string(),
            Segment::Emphasis(s) => s.magenta().to_string(),
            Segment::Notice(s) => s.yellow().to_string(),
        })
        .collect()
}

pub fn notice(text: impl Into<String>) -> RenderedLine {
    vec![Segment::Notice(text.into())]
}

pub fn micro_task_banner(phase: &str) -> RenderedLine {
    notice(format!("--- Micro Task: {phase} ---"))
}

pub fn streaming_banner() -> RenderedLine {
    notice("--- Streaming Response ---")
}

pub fn end_banner() -> RenderedLine {
    notice("--- End of Response ---")
}
