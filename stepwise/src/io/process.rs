//! Helpers for running child processes with timeouts and live output.

use std::io::{BufRead, BufReader, Read};
use std::process::{Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use tracing::{debug, error, instrument, warn};
use wait_timeout::ChildExt;

/// Which pipe a forwarded line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Stdout,
    Stderr,
}

/// Captured child process output.
#[derive(Debug)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub stdout_truncated: usize,
    pub stderr_truncated: usize,
    pub timed_out: bool,
}

type Line = (StreamKind, Vec<u8>);

/// Run a command with a timeout, forwarding each output line as it arrives.
///
/// Both pipes are drained on reader threads; lines reach `forward` on the
/// calling thread in arrival order. `output_limit_bytes` bounds the copy kept
/// per stream (bytes beyond this are still forwarded, just not stored).
#[instrument(skip_all, fields(timeout_secs = timeout.as_secs(), output_limit_bytes))]
pub fn run_command_forwarding(
    mut cmd: Command,
    timeout: Duration,
    output_limit_bytes: usize,
    forward: &mut dyn FnMut(StreamKind, &str),
) -> Result<CommandOutput> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    debug!("spawning child process");
    let mut child = match cmd.spawn() {
        Ok(c) => c,
        Err(e) => {
            error!(err = %e, "failed to spawn command");
            return Err(e).context("spawn command");
        }
    };

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("stdout was not piped"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow!("stderr was not piped"))?;

    let (tx, rx) = mpsc::channel::<Line>();
    let stdout_tx = tx.clone();
    let stdout_handle = thread::spawn(move || {
        forward_stream_limited(stdout, StreamKind::Stdout, output_limit_bytes, &stdout_tx)
    });
    let stderr_handle = thread::spawn(move || {
        forward_stream_limited(stderr, StreamKind::Stderr, output_limit_bytes, &tx)
    });

    let deadline = Instant::now() + timeout;
    let mut timed_out = false;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            timed_out = true;
            break;
        }
        match rx.recv_timeout(remaining) {
            Ok((kind, line)) => forward_line(forward, kind, &line),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    let status = if timed_out {
        None
    } else {
        let remaining = deadline.saturating_duration_since(Instant::now());
        child.wait_timeout(remaining).context("wait for command")?
    };
    let status = match status {
        Some(status) => status,
        None => {
            warn!(
                timeout_secs = timeout.as_secs(),
                "command timed out, killing"
            );
            timed_out = true;
            child.kill().context("kill command")?;
            child.wait().context("wait command after kill")?
        }
    };

    let (stdout, stdout_truncated) = join_output(stdout_handle).context("join stdout")?;
    let (stderr, stderr_truncated) = join_output(stderr_handle).context("join stderr")?;
    for (kind, line) in rx.try_iter() {
        forward_line(forward, kind, &line);
    }

    if stdout_truncated > 0 || stderr_truncated > 0 {
        warn!(stdout_truncated, stderr_truncated, "output truncated");
    }

    debug!(exit_code = ?status.code(), timed_out, "command finished");
    Ok(CommandOutput {
        status,
        stdout,
        stderr,
        stdout_truncated,
        stderr_truncated,
        timed_out,
    })
}

fn forward_line(forward: &mut dyn FnMut(StreamKind, &str), kind: StreamKind, line: &[u8]) {
    let text = String::from_utf8_lossy(line);
    forward(kind, text.trim_end_matches(['\n', '\r']));
}

fn join_output(handle: thread::JoinHandle<Result<(Vec<u8>, usize)>>) -> Result<(Vec<u8>, usize)> {
    match handle.join() {
        Ok(result) => result,
        Err(_) => Err(anyhow!("output reader thread panicked")),
    }
}

/// Read a stream line by line, sending each line and keeping a bounded copy.
fn forward_stream_limited<R: Read>(
    reader: R,
    kind: StreamKind,
    limit: usize,
    tx: &Sender<Line>,
) -> Result<(Vec<u8>, usize)> {
    let mut buf_reader = BufReader::new(reader);
    let mut collected = Vec::new();
    let mut truncated = 0usize;

    loop {
        let mut line = Vec::new();
        let n = buf_reader
            .read_until(b'\n', &mut line)
            .context("read line")?;
        if n == 0 {
            break;
        }

        let remaining = limit.saturating_sub(collected.len());
        if remaining > 0 {
            let keep = n.min(remaining);
            collected.extend_from_slice(&line[..keep]);
            truncated += n.saturating_sub(keep);
        } else {
            truncated += n;
        }

        // The receiver is gone once the caller stops listening; keep draining.
        let _ = tx.send((kind, line));
    }

    Ok((collected, truncated))
}
