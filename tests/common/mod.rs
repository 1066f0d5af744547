//! Shared helpers for integration tests.
//!
//! - `fixtures`: engine/orchestrator harnesses over the mock source
//! - `log_capture`: tracing capture with assertions
//! - `logger`: per-test progress logging

pub mod fixtures;
pub mod log_capture;
pub mod logger;
