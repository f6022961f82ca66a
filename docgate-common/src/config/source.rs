//! Source tracking for configuration values.
//!
//! Every effective setting remembers where it came from so `docgate config`
//! can explain why a value is what it is.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Where a configuration value was taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigSource {
    /// Built-in default.
    Default,
    /// `docgate.toml` (or the file given with `--config`).
    File,
    /// Environment variable.
    Environment,
    /// Command-line flag.
    Cli,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => write!(f, "default"),
            Self::File => write!(f, "file"),
            Self::Environment => write!(f, "env"),
            Self::Cli => write!(f, "cli"),
        }
    }
}

/// Detailed origin of a value, including the variable name or file path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigValueSource {
    pub source: ConfigSource,
    /// Environment variable name or config file path, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl fmt::Display for ConfigValueSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.detail {
            Some(detail) => write!(f, "{} ({})", self.source, detail),
            None => write!(f, "{}", self.source),
        }
    }
}

/// A value paired with its origin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sourced<T> {
    pub value: T,
    pub origin: ConfigValueSource,
}

impl<T> Sourced<T> {
    pub fn default_value(value: T) -> Self {
        Self {
            value,
            origin: ConfigValueSource {
                source: ConfigSource::Default,
                detail: None,
            },
        }
    }

    pub fn from_env(value: T, var: impl Into<String>) -> Self {
        Self {
            value,
            origin: ConfigValueSource {
                source: ConfigSource::Environment,
                detail: Some(var.into()),
            },
        }
    }

    pub fn from_file(value: T, path: &std::path::Path) -> Self {
        Self {
            value,
            origin: ConfigValueSource {
                source: ConfigSource::File,
                detail: Some(path.display().to_string()),
            },
        }
    }

    pub fn from_cli(value: T, flag: impl Into<String>) -> Self {
        Self {
            value,
            origin: ConfigValueSource {
                source: ConfigSource::Cli,
                detail: Some(flag.into()),
            },
        }
    }

    pub fn source(&self) -> ConfigSource {
        self.origin.source
    }

    /// Replace the value only if `other` came from a later layer.
    pub fn overlay(&mut self, other: Sourced<T>) {
        if other.source() != ConfigSource::Default {
            *self = other;
        }
    }
}

impl Sourced<PathBuf> {
    pub fn display(&self) -> String {
        self.value.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlay_ignores_defaults() {
        let mut value = Sourced::from_env(3u64, "DOCGATE_X");
        value.overlay(Sourced::default_value(7));
        assert_eq!(value.value, 3);
        assert_eq!(value.source(), ConfigSource::Environment);
    }

    #[test]
    fn test_overlay_takes_later_layer() {
        let mut value = Sourced::default_value("docs".to_string());
        value.overlay(Sourced::from_cli("site".to_string(), "--docs-dir"));
        assert_eq!(value.value, "site");
        assert_eq!(value.origin.to_string(), "cli (--docs-dir)");
    }
}
