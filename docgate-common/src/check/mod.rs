//! Declarative documentation checks.
//!
//! A [`Checklist`] is plain data: each [`Check`] pairs a stable id with an
//! [`Expectation`]. The [`Checker`] evaluates every check independently
//! against an [`EvalContext`] and collects a [`Report`].

mod evaluate;
mod expectation;
mod outcome;
mod report;

pub use evaluate::{
    Checker, EvalContext, NO_OUTPUT_REASON, OutputState, evaluate, evaluate_expectation,
};
pub use expectation::{
    Arg, ChildSelector, EntryKind, Expectation, Matcher, Occupancy, PathRef, PathRoot, PathSpec,
    PathSpecBase, Pattern, ProcessSpec, Structure,
};
pub use outcome::{ArtifactError, CheckFailure, CheckOutcome, DisplayPath};
pub use report::{CheckRecord, Report, Summary};

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// Whether a missing artifact fails the check or skips it.
///
/// | level          | file missing | element missing |
/// |----------------|--------------|-----------------|
/// | `Required`     | fail         | fail            |
/// | `WhenPresent`  | skip         | fail            |
/// | `Optional`     | skip         | skip            |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Requirement {
    #[default]
    Required,
    /// Inspects a file whose existence another check reports.
    WhenPresent,
    Optional,
}

/// One checklist item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Check {
    pub id: String,
    pub group: String,
    pub title: String,
    pub requirement: Requirement,
    pub expectation: Expectation,
    /// Reported as a skip with this reason instead of being evaluated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled: Option<String>,
}

impl Check {
    /// A required check; the group is the id's first dotted segment.
    pub fn new(id: impl Into<String>, title: impl Into<String>, expectation: Expectation) -> Self {
        let id = id.into();
        let group = id.split('.').next().unwrap_or_default().to_string();
        Self {
            id,
            group,
            title: title.into(),
            requirement: Requirement::Required,
            expectation,
            disabled: None,
        }
    }

    pub fn optional(mut self) -> Self {
        self.requirement = Requirement::Optional;
        self
    }

    pub fn when_present(mut self) -> Self {
        self.requirement = Requirement::WhenPresent;
        self
    }

    pub fn disabled(mut self, reason: impl Into<String>) -> Self {
        self.disabled = Some(reason.into());
        self
    }

    pub fn is_optional(&self) -> bool {
        self.requirement == Requirement::Optional
    }
}

/// Problems in a checklist detected before anything runs.
#[derive(Debug, Error)]
pub enum ChecklistError {
    #[error("Check '{check_id}' has an invalid pattern {pattern}: {source}")]
    InvalidPattern {
        check_id: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Duplicate check id '{0}'")]
    DuplicateId(String),
}

/// An ordered set of checks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checklist {
    checks: Vec<Check>,
}

impl Checklist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, check: Check) {
        self.checks.push(check);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Check> {
        self.checks.iter()
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Check> {
        self.checks.iter().find(|c| c.id == id)
    }

    /// Distinct groups in first-seen order.
    pub fn groups(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.checks
            .iter()
            .map(|c| c.group.as_str())
            .filter(|g| seen.insert(*g))
            .collect()
    }

    /// Compile every pattern and reject duplicate ids.
    pub fn validate(&self) -> Result<(), ChecklistError> {
        let mut ids = HashSet::new();
        for check in &self.checks {
            if !ids.insert(check.id.as_str()) {
                return Err(ChecklistError::DuplicateId(check.id.clone()));
            }
            for pattern in check.expectation.patterns() {
                if let Err(source) = pattern.compile() {
                    return Err(ChecklistError::InvalidPattern {
                        check_id: check.id.clone(),
                        pattern: pattern.to_string(),
                        source,
                    });
                }
            }
        }
        Ok(())
    }

    /// Keep checks in any of `groups`; an empty slice keeps everything.
    pub fn filter_groups<S: AsRef<str>>(self, groups: &[S]) -> Self {
        if groups.is_empty() {
            return self;
        }
        Self {
            checks: self
                .checks
                .into_iter()
                .filter(|c| groups.iter().any(|g| g.as_ref() == c.group))
                .collect(),
        }
    }

    /// Keep checks whose id starts with `prefix`.
    pub fn filter_ids(self, prefix: &str) -> Self {
        Self {
            checks: self
                .checks
                .into_iter()
                .filter(|c| c.id.starts_with(prefix))
                .collect(),
        }
    }
}

impl Extend<Check> for Checklist {
    fn extend<T: IntoIterator<Item = Check>>(&mut self, iter: T) {
        self.checks.extend(iter);
    }
}

impl FromIterator<Check> for Checklist {
    fn from_iter<T: IntoIterator<Item = Check>>(iter: T) -> Self {
        Self {
            checks: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Checklist {
    type Item = &'a Check;
    type IntoIter = std::slice::Iter<'a, Check>;

    fn into_iter(self) -> Self::IntoIter {
        self.checks.iter()
    }
}
