//! Ctrl-C handling.
//!
//! While a token stream is being read, Ctrl-C only marks the stream as
//! interrupted so the partial paragraph can still be post-processed. Outside
//! a stream, or on a second Ctrl-C within the same stream, it terminates the
//! process with [`exit_codes::INTERRUPTED`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use tracing::debug;

use crate::exit_codes;

/// Shared interrupt state. Clones observe the same flags.
#[derive(Debug, Clone, Default)]
pub struct InterruptFlag {
    streaming: Arc<AtomicBool>,
    interrupted: Arc<AtomicBool>,
}

impl InterruptFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the process-wide Ctrl-C handler bound to this flag.
    pub fn install(&self) -> Result<()> {
        let flag = self.clone();
        ctrlc::set_handler(move || {
            if !flag.trigger() {
                eprintln!("\nInterrupted.");
                std::process::exit(exit_codes::INTERRUPTED);
            }
        })
        .context("install Ctrl-C handler")
    }

    /// Record an interrupt.
    ///
    /// Returns `false` when no stream is active or the active stream was
    /// already interrupted, so a second Ctrl-C always exits.
    pub fn trigger(&self) -> bool {
        if !self.streaming.load(Ordering::SeqCst) {
            return false;
        }
        !self.interrupted.swap(true, Ordering::SeqCst)
    }

    /// Mark a stream as active until the returned guard drops.
    pub fn begin_stream(&self) -> StreamGuard {
        self.interrupted.store(false, Ordering::SeqCst);
        self.streaming.store(true, Ordering::SeqCst);
        StreamGuard { flag: self.clone() }
    }

    pub fn is_interrupted(&self) -> bool {
        self.interrupted.load(Ordering::SeqCst)
    }
}

/// Active-stream marker returned by [`InterruptFlag::begin_stream`].
pub struct StreamGuard {
    flag: InterruptFlag,
}

impl StreamGuard {
    pub fn interrupted(&self) -> bool {
        self.flag.is_interrupted()
    }
}

impl Drop for StreamGuard {
    fn drop(&mut self) {
        self.flag.streaming.store(false, Ordering::SeqCst);
        if self.flag.interrupted.swap(false, Ordering::SeqCst) {
            debug!("stream interrupted by user");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trigger_outside_stream_is_not_recorded() {
        let flag = InterruptFlag::new();
        assert!(!flag.trigger());
        assert!(!flag.is_interrupted());
    }

    #[test]
    fn trigger_during_stream_is_scoped_to_the_guard() {
        let flag = InterruptFlag::new();
        {
            let guard = flag.begin_stream();
            assert!(!guard.interrupted());
            assert!(flag.clone().trigger());
            assert!(guard.interrupted());
        }
        assert!(!flag.is_interrupted());
        let guard = flag.begin_stream();
        assert!(!guard.interrupted());
    }

    #[test]
    fn second_trigger_in_the_same_stream_asks_to_exit() {
        let flag = InterruptFlag::new();
        let guard = flag.begin_stream();
        assert!(flag.trigger());
        assert!(!flag.trigger());
        assert!(guard.interrupted());
        drop(guard);

        // A fresh stream gets its own first press.
        let _guard = flag.begin_stream();
        assert!(flag.trigger());
    }
}
