//! Error Catalog for docgate
//!
//! Every failure docgate can report maps to a stable code (DG-E001 through
//! DG-E499) with a message template and remediation steps, so CI logs can be
//! grepped and linked to the fix.
//!
//! # Error Code Ranges
//!
//! | Range      | Category  | Description                                  |
//! |------------|-----------|----------------------------------------------|
//! | E001-E099  | Config    | Configuration file, environment, patterns    |
//! | E100-E199  | Artifact  | Missing, empty or mistyped files and dirs    |
//! | E200-E299  | Content   | Required text or authoring conventions       |
//! | E300-E399  | Structure | Parsed JSON/HTML/config documents            |
//! | E400-E499  | Process   | External build command invocations           |

use serde::{Deserialize, Serialize};
use std::fmt;

/// Error code enumeration covering every docgate failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[non_exhaustive]
pub enum ErrorCode {
    // =========================================================================
    // Config Errors (E001-E099)
    // =========================================================================
    /// Configuration file given with --config does not exist
    ConfigNotFound,
    /// Configuration file could not be read
    ConfigReadError,
    /// Configuration file contains invalid TOML
    ConfigParseError,
    /// Environment variable has an invalid value
    ConfigEnvError,
    /// A check declares a regular expression that does not compile
    ConfigInvalidPattern,

    // =========================================================================
    // Artifact Errors (E100-E199)
    // =========================================================================
    /// Required path is absent
    MissingArtifact,
    /// Path exists but has no content
    EmptyArtifact,
    /// Path is a file where a directory is expected, or the reverse
    WrongArtifactKind,
    /// Path exists but could not be read
    UnreadableArtifact,
    /// Directory was expected to be empty
    UnexpectedArtifact,

    // =========================================================================
    // Content Errors (E200-E299)
    // =========================================================================
    /// Required text or pattern is absent from a file
    PatternNotFound,
    /// reStructuredText source breaks an authoring convention
    ConventionViolation,

    // =========================================================================
    // Structure Errors (E300-E399)
    // =========================================================================
    /// Parsed document lacks an expected key or element
    MalformedStructure,

    // =========================================================================
    // Process Errors (E400-E499)
    // =========================================================================
    /// Build command exited non-zero or printed forbidden diagnostics
    ExternalProcessFailure,
    /// Build command could not be started
    ProcessLaunchFailure,
    /// Build command exceeded its timeout
    ProcessTimeout,
}

impl ErrorCode {
    /// Every code, in numeric order.
    pub const fn all() -> &'static [ErrorCode] {
        &[
            Self::ConfigNotFound,
            Self::ConfigReadError,
            Self::ConfigParseError,
            Self::ConfigEnvError,
            Self::ConfigInvalidPattern,
            Self::MissingArtifact,
            Self::EmptyArtifact,
            Self::WrongArtifactKind,
            Self::UnreadableArtifact,
            Self::UnexpectedArtifact,
            Self::PatternNotFound,
            Self::ConventionViolation,
            Self::MalformedStructure,
            Self::ExternalProcessFailure,
            Self::ProcessLaunchFailure,
            Self::ProcessTimeout,
        ]
    }

    /// Returns the numeric part of the code.
    #[must_use]
    pub const fn code_number(&self) -> u16 {
        match self {
            Self::ConfigNotFound => 1,
            Self::ConfigReadError => 2,
            Self::ConfigParseError => 3,
            Self::ConfigEnvError => 4,
            Self::ConfigInvalidPattern => 5,

            Self::MissingArtifact => 100,
            Self::EmptyArtifact => 101,
            Self::WrongArtifactKind => 102,
            Self::UnreadableArtifact => 103,
            Self::UnexpectedArtifact => 104,

            Self::PatternNotFound => 200,
            Self::ConventionViolation => 201,

            Self::MalformedStructure => 300,

            Self::ExternalProcessFailure => 400,
            Self::ProcessLaunchFailure => 401,
            Self::ProcessTimeout => 402,
        }
    }

    /// Returns the formatted error code string (e.g., "DG-E100").
    #[must_use]
    pub fn code_string(&self) -> String {
        format!("DG-E{:03}", self.code_number())
    }

    /// Returns the error category.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self.code_number() {
            1..=99 => ErrorCategory::Config,
            100..=199 => ErrorCategory::Artifact,
            200..=299 => ErrorCategory::Content,
            300..=399 => ErrorCategory::Structure,
            _ => ErrorCategory::Process,
        }
    }

    /// Returns the error message template.
    #[must_use]
    pub const fn message(&self) -> &'static str {
        match self {
            Self::ConfigNotFound => "Configuration file not found",
            Self::ConfigReadError => "Failed to read configuration file",
            Self::ConfigParseError => "Configuration file contains invalid TOML",
            Self::ConfigEnvError => "Environment variable has invalid value",
            Self::ConfigInvalidPattern => "Check declares an invalid regular expression",
            Self::MissingArtifact => "Required artifact not found",
            Self::EmptyArtifact => "Artifact is empty",
            Self::WrongArtifactKind => "Artifact has the wrong type",
            Self::UnreadableArtifact => "Artifact could not be read",
            Self::UnexpectedArtifact => "Directory was expected to be empty",
            Self::PatternNotFound => "Required content not found",
            Self::ConventionViolation => "Source breaks an authoring convention",
            Self::MalformedStructure => "Document lacks an expected key or element",
            Self::ExternalProcessFailure => "Build command failed",
            Self::ProcessLaunchFailure => "Build command could not be started",
            Self::ProcessTimeout => "Build command timed out",
        }
    }

    /// Returns remediation steps for this error.
    #[must_use]
    pub const fn remediation(&self) -> &'static [&'static str] {
        match self {
            Self::ConfigNotFound => &[
                "Check the path passed to --config",
                "Omit --config to use docgate.toml at the project root, if present",
            ],
            Self::ConfigReadError => &["Check file permissions on the configuration file"],
            Self::ConfigParseError => &[
                "Validate the file with a TOML linter",
                "Only docs_dir, [build] and [expected] are recognized",
            ],
            Self::ConfigEnvError => &[
                "Run `docgate config` to see which variable is invalid",
                "Unset the variable to fall back to the default",
            ],
            Self::ConfigInvalidPattern => &["Fix the regular expression in the check table"],
            Self::MissingArtifact => &[
                "Create the file or directory named in the failure",
                "Check --project-root and --docs-dir point at the right tree",
            ],
            Self::EmptyArtifact => &["Add content to the file, or remove the empty directory"],
            Self::WrongArtifactKind => &["Replace the path with the expected file or directory"],
            Self::UnreadableArtifact => &[
                "Check file permissions",
                "Make sure text files are UTF-8 encoded",
            ],
            Self::UnexpectedArtifact => &["Check the clean target removes all build output"],
            Self::PatternNotFound => &["Add the missing setting, section or declaration"],
            Self::ConventionViolation => &[
                "Wrap long lines",
                "Surround literal blocks with blank lines",
                "Use `.. code-block:: <language>` for code samples",
            ],
            Self::MalformedStructure => &[
                "Rebuild the documentation from a clean tree",
                "Check templates render the expected element",
            ],
            Self::ExternalProcessFailure => &[
                "Run the build command shown in the failure by hand",
                "Fix every warning; the gate treats warnings as failures",
            ],
            Self::ProcessLaunchFailure => &[
                "Install the documentation generator (e.g. `pip install sphinx`)",
                "Set DOCGATE_BUILD_PROGRAM to the build executable",
            ],
            Self::ProcessTimeout => &["Raise DOCGATE_BUILD_TIMEOUT_SECS"],
        }
    }

    /// Returns the full error entry with all metadata.
    #[must_use]
    pub fn entry(&self) -> ErrorEntry {
        ErrorEntry {
            code: self.code_string(),
            category: self.category(),
            message: self.message().to_string(),
            remediation: self
                .remediation()
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code_string())
    }
}

/// Error categories by code range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Configuration errors (E001-E099)
    Config,
    /// Filesystem artifact errors (E100-E199)
    Artifact,
    /// Text content errors (E200-E299)
    Content,
    /// Parsed document errors (E300-E399)
    Structure,
    /// External process errors (E400-E499)
    Process,
}

impl ErrorCategory {
    /// Returns a human-readable name for the category.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Config => "Configuration",
            Self::Artifact => "Artifact",
            Self::Content => "Content",
            Self::Structure => "Structure",
            Self::Process => "Process",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Complete error entry with all metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEntry {
    /// Error code string (e.g., "DG-E100")
    pub code: String,
    /// Error category
    pub category: ErrorCategory,
    /// Human-readable error message
    pub message: String,
    /// Steps to remediate the error
    pub remediation: Vec<String>,
}

impl ErrorEntry {
    /// Formats the error for display with full remediation steps.
    #[must_use]
    pub fn format_full(&self) -> String {
        let mut output = format!("[{}] {}\n", self.code, self.message);

        if !self.remediation.is_empty() {
            output.push_str("\nRemediation steps:\n");
            for (i, step) in self.remediation.iter().enumerate() {
                output.push_str(&format!("  {}. {}\n", i + 1, step));
            }
        }

        output
    }

    /// Formats the error as a single line.
    #[must_use]
    pub fn format_brief(&self) -> String {
        format!("[{}] {}", self.code, self.message)
    }
}

impl fmt::Display for ErrorEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_brief())
    }
}
