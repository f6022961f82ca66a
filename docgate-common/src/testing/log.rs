//! JSONL logging for tests, so a failed CI run leaves a trace of what each
//! check saw.
//!
//! ```ignore
//! use docgate_common::testing::init_global_test_logging;
//!
//! #[ctor::ctor]
//! fn setup() {
//!     init_global_test_logging();
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::path::PathBuf;
use std::sync::{Mutex, Once};
use std::time::Instant;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::prelude::*;

/// Phase of a test, attached to each entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestPhase {
    /// Fixture tree creation.
    Setup,
    /// Checklist evaluation.
    Execute,
    /// Outcome verification.
    Verify,
    /// Temporary directory removal.
    Teardown,
}

impl std::fmt::Display for TestPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Setup => write!(f, "setup"),
            Self::Execute => write!(f, "execute"),
            Self::Verify => write!(f, "verify"),
            Self::Teardown => write!(f, "teardown"),
        }
    }
}

static INIT: Once = Once::new();

/// Route tracing events from every test in the process to one JSONL file
/// (`target/test-logs/all_tests.jsonl`) plus the captured test output.
/// Only the first call has any effect.
///
/// `DOCGATE_TEST_LOG_FILE` overrides the file and `DOCGATE_TEST_LOG_LEVEL`
/// the level (default `info`).
pub fn init_global_test_logging() {
    INIT.call_once(|| {
        let level = std::env::var("DOCGATE_TEST_LOG_LEVEL").unwrap_or_else(|_| "info".into());
        let filter =
            EnvFilter::try_new(format!("docgate={level},docgate_common={level}"))
                .unwrap_or_else(|_| EnvFilter::new("info"));

        let jsonl = open_log_file().map(|file| {
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_events(FmtSpan::CLOSE)
                .with_file(true)
                .with_line_number(true)
                .with_writer(Mutex::new(file))
        });
        let captured = tracing_subscriber::fmt::layer()
            .compact()
            .with_target(true)
            .with_test_writer();

        let registry = tracing_subscriber::registry()
            .with(filter)
            .with(jsonl)
            .with(captured);
        // Another harness may already own the global subscriber.
        let _ = tracing::subscriber::set_global_default(registry);
    });
}

fn open_log_file() -> Option<File> {
    let path = match std::env::var_os("DOCGATE_TEST_LOG_FILE") {
        Some(custom) => PathBuf::from(custom),
        None => target_dir().join("test-logs").join("all_tests.jsonl"),
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).ok()?;
    }
    File::create(path).ok()
}

/// `CARGO_TARGET_DIR`, else the nearest `target/` above the working directory.
fn target_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os("CARGO_TARGET_DIR") {
        return PathBuf::from(dir);
    }
    std::env::current_dir()
        .ok()
        .and_then(|cwd| {
            cwd.ancestors()
                .map(|dir| dir.join("target"))
                .find(|candidate| candidate.is_dir())
        })
        .unwrap_or_else(|| PathBuf::from("target"))
}

/// One line of a test's log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestLogEntry {
    /// RFC 3339 timestamp.
    pub timestamp: String,
    pub test_name: String,
    pub phase: TestPhase,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    /// Milliseconds since the logger was created.
    pub elapsed_ms: u64,
}

/// Collects phase-tagged entries for one test and mirrors them to tracing.
pub struct TestLogger {
    test_name: String,
    started: Instant,
    entries: Mutex<Vec<TestLogEntry>>,
}

impl TestLogger {
    pub fn for_test(test_name: &str) -> Self {
        Self {
            test_name: test_name.to_string(),
            started: Instant::now(),
            entries: Mutex::new(Vec::new()),
        }
    }

    pub fn log(&self, phase: TestPhase, message: impl Into<String>) {
        self.push(phase, message.into(), None);
    }

    pub fn log_with_data(
        &self,
        phase: TestPhase,
        message: impl Into<String>,
        data: serde_json::Value,
    ) {
        self.push(phase, message.into(), Some(data));
    }

    fn push(&self, phase: TestPhase, message: String, data: Option<serde_json::Value>) {
        tracing::info!(test = %self.test_name, %phase, "{}", message);
        let entry = TestLogEntry {
            timestamp: chrono::Utc::now().to_rfc3339(),
            test_name: self.test_name.clone(),
            phase,
            message,
            data,
            elapsed_ms: self.started.elapsed().as_millis() as u64,
        };
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(entry);
        }
    }

    pub fn entries(&self) -> Vec<TestLogEntry> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    /// Render all entries as JSON lines.
    pub fn to_jsonl(&self) -> String {
        self.entries()
            .iter()
            .filter_map(|entry| serde_json::to_string(entry).ok())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logger_records_phases_in_order() {
        let logger = TestLogger::for_test("phases");
        logger.log(TestPhase::Setup, "tree created");
        logger.log_with_data(
            TestPhase::Verify,
            "outcomes",
            serde_json::json!({ "passed": 3 }),
        );

        let entries = logger.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].phase, TestPhase::Setup);
        assert_eq!(entries[1].data.as_ref().unwrap()["passed"], 3);
    }

    #[test]
    fn test_jsonl_has_one_line_per_entry() {
        let logger = TestLogger::for_test("jsonl");
        logger.log(TestPhase::Execute, "a");
        logger.log(TestPhase::Teardown, "b");
        let jsonl = logger.to_jsonl();
        assert_eq!(jsonl.lines().count(), 2);
        assert!(jsonl.contains("\"phase\":\"teardown\""));
    }
}
