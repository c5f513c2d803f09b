//! Deterministic, pure logic for the planning pipeline.
//!
//! Core modules must be free of I/O side effects. They turn raw model text
//! into structured values and return deterministic outputs suitable for tests.

pub mod classifier;
pub mod context;
pub mod extract;
pub mod markup;
pub mod planning;
pub mod postprocess;
pub mod questions;
pub mod render;
pub mod safety;
pub mod types;
