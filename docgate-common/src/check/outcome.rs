//! Check outcomes and failure details.

use crate::errors::ErrorCode;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result of evaluating one check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CheckOutcome {
    Passed,
    Failed(CheckFailure),
    Skipped { reason: String },
}

impl CheckOutcome {
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self::Skipped {
            reason: reason.into(),
        }
    }

    pub fn is_passed(&self) -> bool {
        matches!(self, Self::Passed)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped { .. })
    }

    pub fn failure(&self) -> Option<&CheckFailure> {
        match self {
            Self::Failed(failure) => Some(failure),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Passed => "PASS",
            Self::Failed(_) => "FAIL",
            Self::Skipped { .. } => "SKIP",
        }
    }
}

/// Why a check failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckFailure {
    pub code: ErrorCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// Captured diagnostic output of a failed process.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<String>,
}

impl CheckFailure {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            path: None,
            pattern: None,
            diagnostics: None,
        }
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: impl Into<String>) -> Self {
        let text = diagnostics.into();
        if !text.trim().is_empty() {
            self.diagnostics = Some(text);
        }
        self
    }
}

impl fmt::Display for CheckFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

/// Problems with a filesystem artifact.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("{path} does not exist")]
    Missing { path: DisplayPath },

    #[error("{path} is empty")]
    Empty { path: DisplayPath },

    #[error("{path} is not a {expected}")]
    WrongKind {
        path: DisplayPath,
        expected: &'static str,
    },

    #[error("{path} could not be read: {source}")]
    Unreadable {
        path: DisplayPath,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is not empty")]
    Unexpected { path: DisplayPath },
}

impl ArtifactError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Missing { .. } => ErrorCode::MissingArtifact,
            Self::Empty { .. } => ErrorCode::EmptyArtifact,
            Self::WrongKind { .. } => ErrorCode::WrongArtifactKind,
            Self::Unreadable { .. } => ErrorCode::UnreadableArtifact,
            Self::Unexpected { .. } => ErrorCode::UnexpectedArtifact,
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            Self::Missing { path }
            | Self::Empty { path }
            | Self::WrongKind { path, .. }
            | Self::Unreadable { path, .. }
            | Self::Unexpected { path } => &path.0,
        }
    }

    /// Classify an I/O error raised while opening `path`.
    pub fn from_io(path: &Path, err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            Self::Missing {
                path: DisplayPath::from(path),
            }
        } else {
            Self::Unreadable {
                path: DisplayPath::from(path),
                source: err,
            }
        }
    }
}

impl From<ArtifactError> for CheckFailure {
    fn from(err: ArtifactError) -> Self {
        let path = err.path().to_path_buf();
        CheckFailure::new(err.code(), err.to_string()).with_path(path)
    }
}

/// Path wrapper with a `Display` impl, for error messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayPath(pub PathBuf);

impl From<&Path> for DisplayPath {
    fn from(path: &Path) -> Self {
        Self(path.to_path_buf())
    }
}

impl fmt::Display for DisplayPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}
