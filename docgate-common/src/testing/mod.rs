//! Test utilities: JSONL logging and phase-tagged test loggers.

pub mod log;

pub use log::{TestLogEntry, TestLogger, TestPhase, init_global_test_logging};
