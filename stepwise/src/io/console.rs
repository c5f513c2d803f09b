//! Interactive console abstraction.
//!
//! The [`Console`] trait separates user interaction from stdin/stdout so the
//! dialogue and session loop can be driven by scripted input in tests.

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};

use crate::core::render::Segment;
use crate::io::terminal::paint;

pub trait Console {
    /// Show `prompt` and read one line without its terminator.
    ///
    /// Returns `None` at end of input.
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>>;

    /// Print one styled line.
    fn print(&mut self, line: &[Segment]);

    fn print_plain(&mut self, text: &str) {
        self.print(&[Segment::Plain(text.to_string())]);
    }
}

/// Console bound to the process stdin/stdout.
pub struct StdConsole {
    stdin: io::Stdin,
}

impl StdConsole {
    pub fn new() -> Self {
        Self { stdin: io::stdin() }
    }
}

impl Default for StdConsole {
    fn default() -> Self {
        Self::new()
    }
}

impl Console for StdConsole {
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        let mut stdout = io::stdout().lock();
        stdout
            .write_all(prompt.as_bytes())
            .and_then(|()| stdout.flush())
            .context("write prompt")?;
        drop(stdout);

        let mut line = String::new();
        let read = self
            .stdin
            .lock()
            .read_line(&mut line)
            .context("read stdin")?;
        if read == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\n', '\r']).to_string()))
    }

    fn print(&mut self, line: &[Segment]) {
        let mut stdout = io::stdout().lock();
        // Write errors (closed pipe) are ignored.
        let _ = writeln!(stdout, "{}", paint(line)).and_then(|()| stdout.flush());
    }
}
