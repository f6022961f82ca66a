//! The expectation table: what a single check asserts.

use crate::rst::RstRule;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

/// Directory a [`PathRef`] is relative to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathRoot {
    /// Repository root (README, LICENSE, ...).
    Project,
    /// Documentation source directory.
    Docs,
    /// Built output tree (e.g. `<build>/html`).
    Output,
    /// Temporary directory owned by the running process check.
    Scratch,
}

impl fmt::Display for PathRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Project => write!(f, "project"),
            Self::Docs => write!(f, "docs"),
            Self::Output => write!(f, "output"),
            Self::Scratch => write!(f, "scratch"),
        }
    }
}

/// A path relative to one of the evaluation roots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathRef {
    pub root: PathRoot,
    pub relative: PathBuf,
}

impl PathRef {
    pub fn new(root: PathRoot, relative: impl Into<PathBuf>) -> Self {
        Self {
            root,
            relative: relative.into(),
        }
    }

    pub fn project(relative: impl Into<PathBuf>) -> Self {
        Self::new(PathRoot::Project, relative)
    }

    pub fn docs(relative: impl Into<PathBuf>) -> Self {
        Self::new(PathRoot::Docs, relative)
    }

    pub fn output(relative: impl Into<PathBuf>) -> Self {
        Self::new(PathRoot::Output, relative)
    }

    pub fn scratch(relative: impl Into<PathBuf>) -> Self {
        Self::new(PathRoot::Scratch, relative)
    }
}

impl fmt::Display for PathRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>/{}", self.root, self.relative.display())
    }
}

/// Which paths a check looks at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PathSpec {
    /// Exactly this path.
    Single { path: PathRef },
    /// The first candidate that exists.
    FirstOf { candidates: Vec<PathRef> },
    /// `base/relative`; only `base` counts as the anchor.
    Within { base: PathRef, relative: PathBuf },
    /// Every match of `patterns` under `base`; `base` itself must exist.
    Glob { base: PathRef, patterns: Vec<String> },
    /// `sub/relative` for every subdirectory `sub` of `base` not in `exclude`.
    EachSubdir {
        base: PathSpecBase,
        exclude: Vec<String>,
        relative: PathBuf,
    },
}

/// Base of an [`PathSpec::EachSubdir`]: one path, or the first existing one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathSpecBase {
    pub candidates: Vec<PathRef>,
}

impl PathSpec {
    pub fn single(path: PathRef) -> Self {
        Self::Single { path }
    }

    pub fn first_of(candidates: impl IntoIterator<Item = PathRef>) -> Self {
        Self::FirstOf {
            candidates: candidates.into_iter().collect(),
        }
    }

    pub fn within(base: PathRef, relative: impl Into<PathBuf>) -> Self {
        Self::Within {
            base,
            relative: relative.into(),
        }
    }

    pub fn glob(base: PathRef, patterns: &[&str]) -> Self {
        Self::Glob {
            base,
            patterns: patterns.iter().map(|p| (*p).to_string()).collect(),
        }
    }

    pub fn each_subdir(
        bases: impl IntoIterator<Item = PathRef>,
        exclude: &[&str],
        relative: impl Into<PathBuf>,
    ) -> Self {
        Self::EachSubdir {
            base: PathSpecBase {
                candidates: bases.into_iter().collect(),
            },
            exclude: exclude.iter().map(|e| (*e).to_string()).collect(),
            relative: relative.into(),
        }
    }

    /// Every root this spec touches.
    pub fn roots(&self) -> Vec<PathRoot> {
        match self {
            Self::Single { path } => vec![path.root],
            Self::FirstOf { candidates } => candidates.iter().map(|c| c.root).collect(),
            Self::Within { base, .. } | Self::Glob { base, .. } => vec![base.root],
            Self::EachSubdir { base, .. } => base.candidates.iter().map(|c| c.root).collect(),
        }
    }
}

impl fmt::Display for PathSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single { path } => write!(f, "{path}"),
            Self::FirstOf { candidates } => {
                let list: Vec<String> = candidates.iter().map(|c| c.to_string()).collect();
                write!(f, "first of [{}]", list.join(", "))
            }
            Self::Within { base, relative } => write!(f, "{base}/{}", relative.display()),
            Self::Glob { base, patterns } => {
                write!(f, "{base}/{{{}}}", patterns.join(","))
            }
            Self::EachSubdir {
                base,
                exclude,
                relative,
            } => {
                let list: Vec<String> = base.candidates.iter().map(|c| c.to_string()).collect();
                write!(f, "[{}]/*/{}", list.join(" | "), relative.display())?;
                if !exclude.is_empty() {
                    write!(f, " (except {})", exclude.join(", "))?;
                }
                Ok(())
            }
        }
    }
}

/// Expected filesystem entry type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Any,
    File,
    Dir,
}

/// Expected amount of content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Occupancy {
    Any,
    /// Non-zero file size, or at least one directory entry.
    NonEmpty,
    /// Zero file size, or no directory entries.
    Empty,
}

/// Text pattern matched against file content or diagnostic output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Pattern {
    Literal(String),
    Regex(String),
    /// Matches when any of the literals is present.
    AnyLiteral(Vec<String>),
}

impl Pattern {
    pub fn literal(text: impl Into<String>) -> Self {
        Self::Literal(text.into())
    }

    pub fn regex(source: impl Into<String>) -> Self {
        Self::Regex(source.into())
    }

    /// Either quoting of a Python string value: `'value'` or `"value"`.
    pub fn quoted(value: &str) -> Self {
        Self::AnyLiteral(vec![format!("'{value}'"), format!("\"{value}\"")])
    }

    /// `name = 'value'` / `name = "value"` with the given spacing.
    pub fn quoted_assignment(name: &str, value: &str) -> Self {
        Self::AnyLiteral(vec![
            format!("{name} = '{value}'"),
            format!("{name} = \"{value}\""),
        ])
    }

    pub fn compile(&self) -> Result<Matcher, regex::Error> {
        Ok(match self {
            Self::Literal(text) => Matcher::Literal(text.clone()),
            Self::Regex(source) => Matcher::Regex(Regex::new(source)?),
            Self::AnyLiteral(options) => Matcher::AnyLiteral(options.clone()),
        })
    }

    /// Compile ignoring ASCII and Unicode case.
    pub fn compile_case_insensitive(&self) -> Result<Matcher, regex::Error> {
        let source = match self {
            Self::Literal(text) => regex::escape(text),
            Self::Regex(source) => source.clone(),
            Self::AnyLiteral(options) => options
                .iter()
                .map(|o| regex::escape(o))
                .collect::<Vec<_>>()
                .join("|"),
        };
        let re = RegexBuilder::new(&source).case_insensitive(true).build()?;
        Ok(Matcher::Regex(re))
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(text) => write!(f, "{text:?}"),
            Self::Regex(source) => write!(f, "/{source}/"),
            Self::AnyLiteral(options) => {
                let quoted: Vec<String> = options.iter().map(|o| format!("{o:?}")).collect();
                write!(f, "{}", quoted.join(" or "))
            }
        }
    }
}

/// A compiled [`Pattern`].
#[derive(Debug, Clone)]
pub enum Matcher {
    Literal(String),
    Regex(Regex),
    AnyLiteral(Vec<String>),
}

impl Matcher {
    pub fn is_match(&self, text: &str) -> bool {
        match self {
            Self::Literal(needle) => text.contains(needle.as_str()),
            Self::Regex(re) => re.is_match(text),
            Self::AnyLiteral(options) => options.iter().any(|o| text.contains(o.as_str())),
        }
    }
}

/// Descendant required under an HTML container element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildSelector {
    pub tag: String,
    pub attr: String,
    pub value: String,
}

/// Element or key expected in a parsed document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Structure {
    /// Top-level key of a JSON object.
    JsonKey { key: String },
    /// An entry under `key` (object key or string element) containing `needle`.
    JsonTermLike { key: String, needle: String },
    /// `<tag class="... class ...">`, optionally with a matching descendant.
    HtmlElement {
        tag: String,
        class: Option<String>,
        child: Option<ChildSelector>,
    },
    /// `name = [ ... ]` list assignment containing the quoted item.
    ListItem { name: String, item: String },
}

impl fmt::Display for Structure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::JsonKey { key } => write!(f, "key '{key}'"),
            Self::JsonTermLike { key, needle } => write!(f, "'{needle}' in '{key}'"),
            Self::HtmlElement { tag, class, child } => {
                write!(f, "<{tag}")?;
                if let Some(class) = class {
                    write!(f, " class=\"{class}\"")?;
                }
                write!(f, ">")?;
                if let Some(child) = child {
                    write!(f, " > <{} {}=\"{}\">", child.tag, child.attr, child.value)?;
                }
                Ok(())
            }
            Self::ListItem { name, item } => write!(f, "'{item}' in {name} = [...]"),
        }
    }
}

/// One argument of a process invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Arg {
    Literal(String),
    /// The documentation source directory.
    DocsDir,
    /// A path inside the check's scratch directory.
    Scratch(PathBuf),
}

/// A program and its arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessSpec {
    pub program: String,
    pub args: Vec<Arg>,
}

impl ProcessSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(Arg::Literal(arg.into()));
        self
    }

    pub fn docs_dir(mut self) -> Self {
        self.args.push(Arg::DocsDir);
        self
    }

    pub fn scratch(mut self, relative: impl Into<PathBuf>) -> Self {
        self.args.push(Arg::Scratch(relative.into()));
        self
    }

    /// Concrete arguments for a run with the given directories.
    pub fn resolve_args(&self, docs_dir: &Path, scratch: &Path) -> Vec<OsString> {
        self.args
            .iter()
            .map(|arg| match arg {
                Arg::Literal(text) => OsString::from(text),
                Arg::DocsDir => docs_dir.as_os_str().to_owned(),
                Arg::Scratch(relative) if relative.as_os_str().is_empty() => {
                    scratch.as_os_str().to_owned()
                }
                Arg::Scratch(relative) => scratch.join(relative).into_os_string(),
            })
            .collect()
    }
}

impl fmt::Display for ProcessSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            match arg {
                Arg::Literal(text) => write!(f, " {text}")?,
                Arg::DocsDir => write!(f, " <docs>")?,
                Arg::Scratch(relative) => write!(f, " <scratch>/{}", relative.display())?,
            }
        }
        Ok(())
    }
}

/// A single declarative checklist item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Expectation {
    Existence {
        target: PathSpec,
        kind: EntryKind,
        occupancy: Occupancy,
    },
    ContentContains {
        file: PathRef,
        pattern: Pattern,
    },
    StructuredPresence {
        source: PathSpec,
        structure: Structure,
    },
    ExternalProcessSuccess {
        steps: Vec<ProcessSpec>,
        /// Patterns that must not match any step's diagnostic stream.
        forbidden: Vec<Pattern>,
        /// Evaluated after all steps, with `Scratch` pointing at the run's directory.
        then: Vec<Expectation>,
    },
    ContentConvention {
        files: PathSpec,
        /// Path components that exclude a file (e.g. `_build`).
        exclude_dirs: Vec<String>,
        rule: RstRule,
    },
}

impl Expectation {
    pub fn exists(path: PathRef) -> Self {
        Self::Existence {
            target: PathSpec::single(path),
            kind: EntryKind::Any,
            occupancy: Occupancy::Any,
        }
    }

    pub fn non_empty_file(path: PathRef) -> Self {
        Self::Existence {
            target: PathSpec::single(path),
            kind: EntryKind::File,
            occupancy: Occupancy::NonEmpty,
        }
    }

    pub fn dir(path: PathRef) -> Self {
        Self::Existence {
            target: PathSpec::single(path),
            kind: EntryKind::Dir,
            occupancy: Occupancy::Any,
        }
    }

    pub fn contains(file: PathRef, pattern: Pattern) -> Self {
        Self::ContentContains { file, pattern }
    }

    pub fn structure(source: PathSpec, structure: Structure) -> Self {
        Self::StructuredPresence { source, structure }
    }

    /// Patterns in this expectation and any nested ones.
    pub fn patterns(&self) -> Vec<&Pattern> {
        match self {
            Self::ContentContains { pattern, .. } => vec![pattern],
            Self::ExternalProcessSuccess {
                forbidden, then, ..
            } => forbidden
                .iter()
                .chain(then.iter().flat_map(|e| e.patterns()))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Whether any path in this expectation needs the build output tree.
    pub fn needs_output(&self) -> bool {
        match self {
            Self::Existence { target, .. } | Self::ContentConvention { files: target, .. } => {
                target.roots().contains(&PathRoot::Output)
            }
            Self::StructuredPresence { source, .. } => source.roots().contains(&PathRoot::Output),
            Self::ContentContains { file, .. } => file.root == PathRoot::Output,
            Self::ExternalProcessSuccess { .. } => false,
        }
    }

    /// One-line description of the expected condition.
    pub fn describe(&self) -> String {
        match self {
            Self::Existence {
                target,
                kind,
                occupancy,
            } => {
                let what = match kind {
                    EntryKind::Any => "path",
                    EntryKind::File => "file",
                    EntryKind::Dir => "directory",
                };
                let how = match occupancy {
                    Occupancy::Any => "exists",
                    Occupancy::NonEmpty => "exists and is non-empty",
                    Occupancy::Empty => "exists and is empty",
                };
                format!("{what} {target} {how}")
            }
            Self::ContentContains { file, pattern } => format!("{file} contains {pattern}"),
            Self::StructuredPresence { source, structure } => {
                format!("{source} has {structure}")
            }
            Self::ExternalProcessSuccess { steps, then, .. } => {
                let commands: Vec<String> = steps.iter().map(|s| s.to_string()).collect();
                let mut text = format!("`{}` succeeds cleanly", commands.join(" && "));
                if !then.is_empty() {
                    text.push_str(&format!(" and {} output expectation(s) hold", then.len()));
                }
                text
            }
            Self::ContentConvention { files, rule, .. } => {
                format!("{files}: {}", rule.describe())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quoted_pattern_accepts_both_quote_styles() {
        let matcher = Pattern::quoted("ext.a").compile().unwrap();
        assert!(matcher.is_match("extensions = ['ext.a']"));
        assert!(matcher.is_match("extensions = [\"ext.a\"]"));
        assert!(!matcher.is_match("extensions = [ext.a]"));
    }

    #[test]
    fn test_case_insensitive_compile() {
        let matcher = Pattern::literal("traceback").compile_case_insensitive().unwrap();
        assert!(matcher.is_match("Traceback (most recent call last):"));
        let any = Pattern::AnyLiteral(vec!["a.b".into(), "warn".into()])
            .compile_case_insensitive()
            .unwrap();
        assert!(any.is_match("WARNING: x"));
        assert!(!any.is_match("axb"));
    }

    #[test]
    fn test_invalid_regex_fails_to_compile() {
        assert!(Pattern::regex("project(\\s*=").compile().is_err());
    }

    #[test]
    fn test_resolve_args() {
        let spec = ProcessSpec::new("sphinx-build")
            .arg("-b")
            .arg("html")
            .docs_dir()
            .scratch("html")
            .scratch("");
        let args = spec.resolve_args(Path::new("/src/docs"), Path::new("/tmp/x"));
        assert_eq!(
            args,
            vec![
                OsString::from("-b"),
                OsString::from("html"),
                OsString::from("/src/docs"),
                OsString::from("/tmp/x/html"),
                OsString::from("/tmp/x"),
            ]
        );
        assert_eq!(
            spec.to_string(),
            "sphinx-build -b html <docs> <scratch>/html <scratch>/"
        );
    }

    #[test]
    fn test_needs_output() {
        assert!(Expectation::exists(PathRef::output("index.html")).needs_output());
        assert!(!Expectation::exists(PathRef::docs("conf.py")).needs_output());
        assert!(
            Expectation::structure(
                PathSpec::first_of([PathRef::output("a.json"), PathRef::output("b.json")]),
                Structure::JsonKey {
                    key: "terms".into()
                }
            )
            .needs_output()
        );
    }

    #[test]
    fn test_expectation_serializes_with_type_tag() {
        let exp = Expectation::contains(PathRef::docs("conf.py"), Pattern::regex(r"project\s*="));
        let json = serde_json::to_value(&exp).unwrap();
        assert_eq!(json["type"], "content_contains");
        assert_eq!(json["pattern"]["kind"], "regex");
        let back: Expectation = serde_json::from_value(json).unwrap();
        assert_eq!(back, exp);
    }
}
