//! Side-effecting collaborators: backend transport, console, processes, config.

pub mod backend;
pub mod commands;
pub mod config;
pub mod console;
pub mod interrupt;
pub mod process;
pub mod prompt;
pub mod terminal;
