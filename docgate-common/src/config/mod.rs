//! Configuration system for docgate.
//!
//! Settings are layered, each later layer overriding the earlier one:
//! - built-in defaults (the stock Sphinx site layout)
//! - `docgate.toml` at the project root, or the file passed with `--config`
//! - `DOCGATE_*` environment variables (and the `TEST_DOCS` gate flag)
//! - command-line flags
//!
//! Every effective value keeps its source for `docgate config`.

pub mod env;
pub mod source;

pub use env::{EnvError, EnvParser};
pub use source::{ConfigSource, ConfigValueSource, Sourced};

use crate::errors::ErrorCode;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name looked up at the project root when no `--config` is given.
pub const CONFIG_FILE_NAME: &str = "docgate.toml";

/// Environment flag that enables documentation checks.
pub const GATE_ENV_VAR: &str = "TEST_DOCS";

const DEFAULT_BUILD_PROGRAM: &str = "sphinx-build";
pub const DEFAULT_BUILD_TIMEOUT_SECS: u64 = 600;

/// Errors raised while assembling the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read configuration file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid environment configuration:\n{}", format_env_errors(.0))]
    Env(Vec<EnvError>),
}

impl ConfigError {
    /// Catalog code reported for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound(_) => ErrorCode::ConfigNotFound,
            Self::Read { .. } => ErrorCode::ConfigReadError,
            Self::Parse { .. } => ErrorCode::ConfigParseError,
            Self::Env(_) => ErrorCode::ConfigEnvError,
        }
    }
}

fn format_env_errors(errors: &[EnvError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {e}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Values the default checklist expects to find in the site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpectedValues {
    /// Extension module names that must appear in `extensions = [...]`.
    pub extensions: Vec<String>,
    /// Value of `html_theme`.
    pub theme: String,
    /// Language codes with a `locale/<code>` directory and a switcher link.
    pub languages: Vec<String>,
    /// Terms that must appear in the search index.
    pub search_terms: Vec<String>,
    /// Top-level keys of the search index.
    pub search_index_keys: Vec<String>,
    /// `.rst` pages that must exist (non-empty) in the docs directory.
    pub required_docs: Vec<String>,
    /// Targets that must be declared `.PHONY` in the docs Makefile.
    pub makefile_targets: Vec<String>,
    /// Longest allowed line in `.rst` sources.
    pub max_line_length: usize,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

impl Default for ExpectedValues {
    fn default() -> Self {
        Self {
            extensions: strings(&[
                "sphinx.ext.autodoc",
                "sphinx.ext.napoleon",
                "sphinx.ext.viewcode",
                "sphinx.ext.intersphinx",
            ]),
            theme: "sphinx_rtd_theme".to_string(),
            languages: strings(&["en", "es", "fr", "de", "ja", "zh_CN", "zh_TW"]),
            search_terms: strings(&[
                "installation",
                "usage",
                "api",
                "examples",
                "configuration",
                "contributing",
            ]),
            search_index_keys: strings(&[
                "docnames",
                "filenames",
                "terms",
                "titles",
                "title_terms",
                "terms_index",
            ]),
            required_docs: strings(&[
                "index.rst",
                "getting_started.rst",
                "installation.rst",
                "usage.rst",
                "api.rst",
                "examples.rst",
                "contributing.rst",
                "changelog.rst",
            ]),
            makefile_targets: strings(&[
                "help",
                "clean",
                "html",
                "dirhtml",
                "singlehtml",
                "pickle",
                "json",
                "htmlhelp",
                "qthelp",
                "devhelp",
                "epub",
                "latex",
                "latexpdf",
                "latexpdfja",
                "text",
                "man",
                "texinfo",
                "info",
                "gettext",
                "changes",
                "linkcheck",
                "doctest",
                "coverage",
                "xml",
                "pseudoxml",
            ]),
            max_line_length: 120,
        }
    }
}

/// On-disk shape of `docgate.toml`. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    docs_dir: Option<PathBuf>,
    #[serde(default)]
    build: FileBuildConfig,
    expected: Option<ExpectedValues>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileBuildConfig {
    program: Option<String>,
    timeout_secs: Option<u64>,
}

/// Build command settings.
#[derive(Debug, Clone, Serialize)]
pub struct BuildSettings {
    pub program: Sourced<String>,
    pub timeout_secs: Sourced<u64>,
}

impl BuildSettings {
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_secs.value)
    }
}

/// Effective configuration.
#[derive(Debug, Clone, Serialize)]
pub struct GateConfig {
    pub project_root: Sourced<PathBuf>,
    /// Documentation source directory, relative to the project root unless absolute.
    pub docs_dir: Sourced<PathBuf>,
    /// Whether checks run at all (`TEST_DOCS`, or `--force`).
    pub enabled: Sourced<bool>,
    pub build: BuildSettings,
    pub extensions: Sourced<Vec<String>>,
    pub languages: Sourced<Vec<String>>,
    pub expected: ExpectedValues,
    /// Config file that was applied, if any.
    pub config_file: Option<PathBuf>,
}

impl Default for GateConfig {
    fn default() -> Self {
        let expected = ExpectedValues::default();
        Self {
            project_root: Sourced::default_value(PathBuf::from(".")),
            docs_dir: Sourced::default_value(PathBuf::from("docs")),
            enabled: Sourced::default_value(false),
            build: BuildSettings {
                program: Sourced::default_value(DEFAULT_BUILD_PROGRAM.to_string()),
                timeout_secs: Sourced::default_value(DEFAULT_BUILD_TIMEOUT_SECS),
            },
            extensions: Sourced::default_value(expected.extensions.clone()),
            languages: Sourced::default_value(expected.languages.clone()),
            expected,
            config_file: None,
        }
    }
}

/// Inputs that decide where configuration is read from.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// `--project-root`.
    pub project_root: Option<PathBuf>,
    /// `--docs-dir`.
    pub docs_dir: Option<PathBuf>,
    /// `--config`; must exist when given.
    pub config_file: Option<PathBuf>,
    /// `--force`: run even without `TEST_DOCS`.
    pub force: bool,
}

impl GateConfig {
    /// Assemble the configuration from all layers.
    pub fn load(options: &LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let mut parser = EnvParser::new();

        config.project_root.overlay(parser.get_path("PROJECT_ROOT", ".", false));
        if let Some(root) = &options.project_root {
            config
                .project_root
                .overlay(Sourced::from_cli(root.clone(), "--project-root"));
        }

        let file = match &options.config_file {
            Some(path) if !path.exists() => return Err(ConfigError::NotFound(path.clone())),
            Some(path) => Some(path.clone()),
            None => {
                let candidate = config.project_root.value.join(CONFIG_FILE_NAME);
                candidate.is_file().then_some(candidate)
            }
        };
        if let Some(path) = file {
            config.apply_file(&path)?;
        }

        config.apply_env(&mut parser);
        config
            .enabled
            .overlay(EnvParser::with_prefix("").get_flag(GATE_ENV_VAR));

        let errors = parser.take_errors();
        if !errors.is_empty() {
            return Err(ConfigError::Env(errors));
        }

        if let Some(docs) = &options.docs_dir {
            config
                .docs_dir
                .overlay(Sourced::from_cli(docs.clone(), "--docs-dir"));
        }
        if options.force {
            config.enabled.overlay(Sourced::from_cli(true, "--force"));
        }

        tracing::debug!(
            project_root = %config.project_root.display(),
            docs_dir = %config.docs_dir.display(),
            enabled = config.enabled.value,
            "configuration loaded"
        );
        Ok(config)
    }

    fn apply_file(&mut self, path: &Path) -> Result<(), ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let file: FileConfig = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        if let Some(docs) = file.docs_dir {
            self.docs_dir = Sourced::from_file(docs, path);
        }
        if let Some(program) = file.build.program {
            self.build.program = Sourced::from_file(program, path);
        }
        if let Some(timeout) = file.build.timeout_secs {
            self.build.timeout_secs = Sourced::from_file(timeout, path);
        }
        if let Some(expected) = file.expected {
            self.extensions = Sourced::from_file(expected.extensions.clone(), path);
            self.languages = Sourced::from_file(expected.languages.clone(), path);
            self.expected = expected;
        }
        self.config_file = Some(path.to_path_buf());
        Ok(())
    }

    fn apply_env(&mut self, parser: &mut EnvParser) {
        self.docs_dir.overlay(parser.get_path("DOCS_DIR", "docs", false));
        self.build
            .program
            .overlay(parser.get_string("BUILD_PROGRAM", DEFAULT_BUILD_PROGRAM));
        self.build.timeout_secs.overlay(parser.get_u64_range(
            "BUILD_TIMEOUT_SECS",
            DEFAULT_BUILD_TIMEOUT_SECS,
            1,
            86_400,
        ));
        self.extensions
            .overlay(parser.get_string_list("EXTENSIONS", Vec::new()));
        self.languages
            .overlay(parser.get_string_list("LANGUAGES", Vec::new()));
    }

    /// Absolute-or-relative path of the docs source directory.
    pub fn docs_path(&self) -> PathBuf {
        self.project_root.value.join(&self.docs_dir.value)
    }

    pub fn project_path(&self) -> &Path {
        &self.project_root.value
    }

    /// Configuration with checks enabled, rooted at `project_root`.
    pub fn for_project(project_root: impl Into<PathBuf>) -> Self {
        let mut config = Self::default();
        config.project_root = Sourced::from_cli(project_root.into(), "--project-root");
        config.enabled = Sourced::from_cli(true, "--force");
        config
    }

    /// Flat `(key, value, source)` rows for display.
    pub fn describe(&self) -> Vec<(&'static str, String, ConfigValueSource)> {
        vec![
            (
                "project_root",
                self.project_root.display(),
                self.project_root.origin.clone(),
            ),
            ("docs_dir", self.docs_dir.display(), self.docs_dir.origin.clone()),
            (
                "enabled",
                self.enabled.value.to_string(),
                self.enabled.origin.clone(),
            ),
            (
                "build.program",
                self.build.program.value.clone(),
                self.build.program.origin.clone(),
            ),
            (
                "build.timeout_secs",
                self.build.timeout_secs.value.to_string(),
                self.build.timeout_secs.origin.clone(),
            ),
            (
                "expected.extensions",
                self.extensions.value.join(", "),
                self.extensions.origin.clone(),
            ),
            (
                "expected.languages",
                self.languages.value.join(", "),
                self.languages.origin.clone(),
            ),
        ]
    }
}

#[cfg(test)]
pub(crate) fn env_test_lock() -> std::sync::MutexGuard<'static, ()> {
    use std::sync::{Mutex, OnceLock};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}
