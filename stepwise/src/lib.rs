//! Stepwise: turn a goal into ordered phases and one terminal action per phase.
//!
//! Input is first classified. Conversational input is relayed to the
//! completion backend; task-like input goes through phase mode: clarifying
//! questions, a refined goal, an ordered plan, then one streamed micro-task
//! paragraph per phase with commands that were already issued elided.
//!
//! - **[`core`]**: Pure, deterministic logic (markup, extraction, dedup,
//!   rendering state machines, safety checks). No I/O.
//! - **[`io`]**: Side-effecting operations (HTTP backend, console, child
//!   processes, config files). Behind traits where tests need to script them.
//! - **[`agents`]**: One struct per backend-driven step.
//!
//! [`pipeline`] and [`session`] wire the agents together for the CLI.

pub mod agents;
pub mod chat;
pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod pipeline;
pub mod session;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
