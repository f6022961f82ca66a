//! Aggregated results of a checklist run.

use super::Check;
use super::outcome::CheckOutcome;
use chrono::{DateTime, Utc};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Outcome of one check within a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckRecord {
    pub id: String,
    pub group: String,
    pub title: String,
    pub outcome: CheckOutcome,
    pub duration_ms: u64,
}

impl CheckRecord {
    pub fn new(check: &Check, outcome: CheckOutcome, duration: Duration) -> Self {
        Self {
            id: check.id.clone(),
            group: check.group.clone(),
            title: check.title.clone(),
            outcome,
            duration_ms: duration.as_millis() as u64,
        }
    }
}

/// Pass/fail/skip counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// Results of a checklist run, in checklist order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub started_at: DateTime<Utc>,
    pub summary: Summary,
    pub checks: Vec<CheckRecord>,
}

impl Default for Report {
    fn default() -> Self {
        Self::new()
    }
}

impl Report {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            summary: Summary::default(),
            checks: Vec::new(),
        }
    }

    pub fn push(&mut self, record: CheckRecord) {
        self.summary.total += 1;
        match record.outcome {
            CheckOutcome::Passed => self.summary.passed += 1,
            CheckOutcome::Failed(_) => self.summary.failed += 1,
            CheckOutcome::Skipped { .. } => self.summary.skipped += 1,
        }
        self.checks.push(record);
    }

    pub fn summary(&self) -> Summary {
        self.summary
    }

    pub fn failures(&self) -> impl Iterator<Item = &CheckRecord> {
        self.checks.iter().filter(|r| r.outcome.is_failed())
    }

    pub fn get(&self, id: &str) -> Option<&CheckRecord> {
        self.checks.iter().find(|r| r.id == id)
    }

    /// 0 when nothing failed (skips allowed), 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        if self.summary.failed == 0 { 0 } else { 1 }
    }

    /// Grouped PASS/FAIL/SKIP listing with failure details and a summary line.
    pub fn render_human(&self) -> String {
        let mut out = String::new();
        let mut current_group: Option<&str> = None;

        for record in &self.checks {
            if current_group != Some(record.group.as_str()) {
                if current_group.is_some() {
                    out.push('\n');
                }
                out.push_str(&format!("{}\n", record.group.bold()));
                current_group = Some(&record.group);
            }

            let label = match &record.outcome {
                CheckOutcome::Passed => record.outcome.label().green(),
                CheckOutcome::Failed(_) => record.outcome.label().red().bold(),
                CheckOutcome::Skipped { .. } => record.outcome.label().yellow(),
            };
            out.push_str(&format!("  {label}  {}  {}\n", record.id, record.title.dimmed()));

            match &record.outcome {
                CheckOutcome::Passed => {}
                CheckOutcome::Skipped { reason } => {
                    out.push_str(&indent_lines(reason, "        "));
                    out.push('\n');
                }
                CheckOutcome::Failed(failure) => {
                    out.push_str(&indent_lines(
                        &format!("[{}] {}", failure.code, failure.message),
                        "        ",
                    ));
                    out.push('\n');
                    if let Some(entry) = failure.code.remediation().first() {
                        out.push_str(&format!("        {} {}\n", "hint:".cyan(), entry));
                    }
                }
            }
        }

        let s = self.summary;
        if !self.checks.is_empty() {
            out.push('\n');
        }
        out.push_str(&format!(
            "{} passed, {} failed, {} skipped ({} checks)\n",
            s.passed.to_string().green(),
            if s.failed > 0 {
                s.failed.to_string().red().bold()
            } else {
                s.failed.to_string().normal()
            },
            s.skipped.to_string().yellow(),
            s.total
        ));
        out
    }
}

fn indent_lines(text: &str, prefix: &str) -> String {
    let mut out = String::new();
    for (idx, line) in text.lines().enumerate() {
        if idx > 0 {
            out.push('\n');
        }
        out.push_str(prefix);
        out.push_str(line);
    }
    out
}
