//! Stable exit codes for stepwise CLI commands.

/// Command completed (including sessions ended with `quit` or end of input).
pub const OK: i32 = 0;
/// Invalid config, unreadable files or other setup errors.
pub const FAILED: i32 = 1;
/// Ctrl-C outside of a streaming read.
pub const INTERRUPTED: i32 = 130;
