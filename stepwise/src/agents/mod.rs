//! Backend-driven agents for each pipeline stage.
//!
//! Agents own their generation settings and take the backend and console as
//! arguments. None of them fail on bad model output; they log and fall back.

pub mod micro_task;
pub mod mode;
pub mod planner;
pub mod refiner;
