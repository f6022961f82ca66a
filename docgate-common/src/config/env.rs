//! Typed reads of `DOCGATE_*` environment variables.
//!
//! Bad values are collected rather than returned one at a time, so a single
//! `docgate` run can list every broken variable.

use super::source::Sourced;
use std::env;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EnvError {
    #[error("Invalid value for {var}: expected {expected}, got '{value}'")]
    InvalidValue {
        var: String,
        expected: &'static str,
        value: String,
    },

    #[error("Path not found for {var}: {path}")]
    PathNotFound { var: String, path: PathBuf },

    #[error("Value out of range for {var}: {value} (valid: {min}..={max})")]
    OutOfRange {
        var: String,
        value: u64,
        min: u64,
        max: u64,
    },

    #[error("Invalid log level for {var}: {value}")]
    InvalidLogLevel { var: String, value: String },
}

/// `1/true/yes/on` or `0/false/no/off`, case-insensitive. Blank is false.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

/// Lowercased tracing level name, if it is one.
pub fn parse_log_level(value: &str) -> Option<String> {
    let level = value.trim().to_ascii_lowercase();
    matches!(
        level.as_str(),
        "trace" | "debug" | "info" | "warn" | "error" | "off"
    )
    .then_some(level)
}

/// Comma-separated items, trimmed, blanks dropped.
pub fn parse_string_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// Expand a leading `~/` to the home directory.
pub fn expand_home(value: &str) -> PathBuf {
    if let Some(stripped) = value.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(stripped);
    }
    PathBuf::from(value)
}

/// Reads prefixed variables and remembers every invalid one.
pub struct EnvParser {
    prefix: &'static str,
    errors: Vec<EnvError>,
}

impl EnvParser {
    pub fn new() -> Self {
        Self::with_prefix("DOCGATE_")
    }

    /// Parser for another namespace; `""` reads bare names such as `TEST_DOCS`.
    pub fn with_prefix(prefix: &'static str) -> Self {
        Self {
            prefix,
            errors: Vec::new(),
        }
    }

    pub fn errors(&self) -> &[EnvError] {
        &self.errors
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn take_errors(&mut self) -> Vec<EnvError> {
        std::mem::take(&mut self.errors)
    }

    /// Full variable name and its value, if set and valid unicode.
    fn lookup(&self, name: &str) -> (String, Option<String>) {
        let var = format!("{}{name}", self.prefix);
        let value = env::var(&var).ok();
        (var, value)
    }

    pub fn get_string(&mut self, name: &str, default: &str) -> Sourced<String> {
        match self.lookup(name) {
            (var, Some(value)) => Sourced::from_env(value, var),
            (_, None) => Sourced::default_value(default.to_string()),
        }
    }

    pub fn get_bool(&mut self, name: &str, default: bool) -> Sourced<bool> {
        let (var, Some(raw)) = self.lookup(name) else {
            return Sourced::default_value(default);
        };
        let value = parse_bool(&raw).unwrap_or_else(|| {
            self.errors.push(EnvError::InvalidValue {
                var: var.clone(),
                expected: "boolean (true/false/1/0/yes/no)",
                value: raw.clone(),
            });
            default
        });
        Sourced::from_env(value, var)
    }

    /// Presence flag: any non-empty value turns it on except the false
    /// spellings accepted by [`parse_bool`]. Never records an error.
    pub fn get_flag(&mut self, name: &str) -> Sourced<bool> {
        match self.lookup(name) {
            (var, Some(raw)) if !raw.trim().is_empty() => {
                Sourced::from_env(parse_bool(&raw).unwrap_or(true), var)
            }
            _ => Sourced::default_value(false),
        }
    }

    /// Integer in `min..=max`; out-of-range or unparsable values record an
    /// error and fall back to `default`.
    pub fn get_u64_range(&mut self, name: &str, default: u64, min: u64, max: u64) -> Sourced<u64> {
        let (var, Some(raw)) = self.lookup(name) else {
            return Sourced::default_value(default);
        };
        match raw.trim().parse::<u64>() {
            Ok(value) if (min..=max).contains(&value) => Sourced::from_env(value, var),
            Ok(value) => {
                self.errors.push(EnvError::OutOfRange {
                    var: var.clone(),
                    value,
                    min,
                    max,
                });
                Sourced::from_env(default, var)
            }
            Err(_) => {
                self.errors.push(EnvError::InvalidValue {
                    var,
                    expected: "unsigned integer",
                    value: raw,
                });
                Sourced::default_value(default)
            }
        }
    }

    /// Path with `~/` expanded. With `must_exist`, a missing path is an error.
    pub fn get_path(&mut self, name: &str, default: &str, must_exist: bool) -> Sourced<PathBuf> {
        let (var, raw) = self.lookup(name);
        let path = expand_home(raw.as_deref().unwrap_or(default));
        if must_exist && !path.exists() {
            self.errors.push(EnvError::PathNotFound {
                var: var.clone(),
                path: path.clone(),
            });
        }
        match raw {
            Some(_) => Sourced::from_env(path, var),
            None => Sourced::default_value(path),
        }
    }

    pub fn get_log_level(&mut self, name: &str, default: &str) -> Sourced<String> {
        let (var, Some(raw)) = self.lookup(name) else {
            return Sourced::default_value(default.to_string());
        };
        let level = parse_log_level(&raw).unwrap_or_else(|| {
            self.errors.push(EnvError::InvalidLogLevel {
                var: var.clone(),
                value: raw.clone(),
            });
            default.to_string()
        });
        Sourced::from_env(level, var)
    }

    pub fn get_string_list(&mut self, name: &str, default: Vec<String>) -> Sourced<Vec<String>> {
        match self.lookup(name) {
            (var, Some(raw)) => Sourced::from_env(parse_string_list(&raw), var),
            (_, None) => Sourced::default_value(default),
        }
    }

    /// `None` when unset or set to an empty string.
    pub fn get_optional_string(&mut self, name: &str) -> Sourced<Option<String>> {
        match self.lookup(name) {
            (var, Some(raw)) => Sourced::from_env((!raw.is_empty()).then_some(raw), var),
            (_, None) => Sourced::default_value(None),
        }
    }
}

impl Default for EnvParser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(unsafe_code)]
mod tests {
    use super::*;
    use crate::config::{ConfigSource, env_test_lock};

    /// Run `f` with `var` set to `value` (or unset), then unset it.
    fn with_var<T>(var: &str, value: Option<&str>, f: impl FnOnce() -> T) -> T {
        let _guard = env_test_lock();
        // SAFETY: Tests are serialized via env_test_lock
        unsafe {
            match value {
                Some(value) => env::set_var(var, value),
                None => env::remove_var(var),
            }
        }
        let result = f();
        // SAFETY: Tests are serialized via env_test_lock
        unsafe { env::remove_var(var) };
        result
    }

    #[test]
    fn test_bool_spellings() {
        for raw in ["1", "true", "YES", "On"] {
            let (value, errors) = with_var("DOCGATE_UNIT_BOOL", Some(raw), || {
                let mut parser = EnvParser::new();
                (parser.get_bool("UNIT_BOOL", false).value, parser.has_errors())
            });
            assert!(value, "{raw}");
            assert!(!errors);
        }
    }

    #[test]
    fn test_bad_bool_keeps_default_and_records_error() {
        let mut parser = EnvParser::new();
        let result = with_var("DOCGATE_UNIT_BAD_BOOL", Some("maybe"), || {
            parser.get_bool("UNIT_BAD_BOOL", true)
        });
        assert!(result.value);
        assert!(matches!(
            parser.errors(),
            [EnvError::InvalidValue { value, .. }] if value == "maybe"
        ));
    }

    #[test]
    fn test_unprefixed_gate_flag() {
        let result = with_var("DOCGATE_UNIT_GATE", Some("1"), || {
            EnvParser::with_prefix("").get_bool("DOCGATE_UNIT_GATE", false)
        });
        assert!(result.value);
        assert_eq!(result.origin.detail.as_deref(), Some("DOCGATE_UNIT_GATE"));
    }

    #[test]
    fn test_flag_is_on_for_any_non_false_value() {
        let cases = [
            ("1", true),
            ("docs", true),
            ("0", false),
            ("off", false),
            ("", false),
        ];
        for (raw, expected) in cases {
            let mut parser = EnvParser::with_prefix("");
            let value = with_var("DOCGATE_UNIT_FLAG", Some(raw), || {
                parser.get_flag("DOCGATE_UNIT_FLAG").value
            });
            assert_eq!(value, expected, "{raw:?}");
            assert!(!parser.has_errors());
        }
        let unset = with_var("DOCGATE_UNIT_FLAG", None, || {
            EnvParser::with_prefix("").get_flag("DOCGATE_UNIT_FLAG")
        });
        assert!(!unset.value);
        assert_eq!(unset.source(), ConfigSource::Default);
    }

    #[test]
    fn test_timeout_range() {
        let mut parser = EnvParser::new();
        let ok = with_var("DOCGATE_UNIT_SECS", Some(" 50 "), || {
            parser.get_u64_range("UNIT_SECS", 10, 1, 100)
        });
        assert_eq!(ok.value, 50);
        assert!(!parser.has_errors());

        let high = with_var("DOCGATE_UNIT_SECS", Some("200"), || {
            parser.get_u64_range("UNIT_SECS", 10, 1, 100)
        });
        assert_eq!(high.value, 10);
        assert!(matches!(
            parser.take_errors().as_slice(),
            [EnvError::OutOfRange { value: 200, .. }]
        ));
    }

    #[test]
    fn test_unknown_log_level() {
        let mut parser = EnvParser::new();
        let result = with_var("DOCGATE_UNIT_LEVEL", Some("verbose"), || {
            parser.get_log_level("UNIT_LEVEL", "info")
        });
        assert_eq!(result.value, "info");
        assert!(parser.has_errors());
    }

    #[test]
    fn test_language_list() {
        let result = with_var("DOCGATE_UNIT_LANGS", Some("en, fr,,de "), || {
            EnvParser::new().get_string_list("UNIT_LANGS", vec![])
        });
        assert_eq!(result.value, vec!["en", "fr", "de"]);
        assert_eq!(result.source(), ConfigSource::Environment);
    }

    #[test]
    fn test_missing_required_path() {
        let mut parser = EnvParser::new();
        let result = with_var("DOCGATE_UNIT_PATH", Some("/definitely/not/here/docgate"), || {
            parser.get_path("UNIT_PATH", ".", true)
        });
        assert_eq!(result.source(), ConfigSource::Environment);
        assert!(matches!(
            parser.errors().first(),
            Some(EnvError::PathNotFound { .. })
        ));
    }

    #[test]
    fn test_unset_path_uses_default() {
        let result = with_var("DOCGATE_UNIT_DOCS", None, || {
            EnvParser::new().get_path("UNIT_DOCS", "docs", false)
        });
        assert_eq!(result.value, PathBuf::from("docs"));
        assert_eq!(result.source(), ConfigSource::Default);
    }

    #[test]
    fn test_empty_optional_string_is_none() {
        let empty = with_var("DOCGATE_UNIT_OPT", Some(""), || {
            EnvParser::new().get_optional_string("UNIT_OPT")
        });
        assert!(empty.value.is_none());
        assert_eq!(empty.source(), ConfigSource::Environment);

        let set = with_var("DOCGATE_UNIT_OPT", Some("json"), || {
            EnvParser::new().get_optional_string("UNIT_OPT").value
        });
        assert_eq!(set.as_deref(), Some("json"));
    }

    mod proptest_parsing {
        use super::super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(256))]

            #[test]
            fn test_parse_bool_accepts_only_known_words(s in "[a-zA-Z0-9 _-]{0,12}") {
                let known = ["1", "true", "yes", "on", "0", "false", "no", "off", ""];
                let expected = known.iter().any(|k| s.trim().eq_ignore_ascii_case(k));
                prop_assert_eq!(parse_bool(&s).is_some(), expected);
            }

            #[test]
            fn test_parse_string_list_roundtrips_clean_items(
                items in prop::collection::vec("[a-z_]{1,8}", 0..8)
            ) {
                prop_assert_eq!(parse_string_list(&items.join(" , ")), items);
            }
        }
    }
}
