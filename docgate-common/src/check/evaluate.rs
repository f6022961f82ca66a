//! Evaluation of expectations against a documentation tree.

use super::expectation::{EntryKind, Expectation, Occupancy, PathRef, PathRoot, PathSpec, Structure};
use super::outcome::{ArtifactError, CheckFailure, CheckOutcome, DisplayPath};
use super::report::{CheckRecord, Report};
use super::{Check, Checklist, Requirement};
use crate::config::{DEFAULT_BUILD_TIMEOUT_SECS, GateConfig};
use crate::errors::ErrorCode;
use crate::html::HtmlDocument;
use crate::process::{ProcessError, run_command};
use crate::search_index;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Skip reason for output-rooted checks when no build output was provided.
pub const NO_OUTPUT_REASON: &str = "no build output available; pass --build or --output-dir";

/// Violations listed in a convention failure before truncating.
const MAX_LISTED_VIOLATIONS: usize = 20;

/// Availability of the built output tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputState {
    /// Nothing was built or supplied.
    Unavailable,
    Available(PathBuf),
    /// The shared build failed; output-rooted checks report this failure.
    BuildFailed(CheckFailure),
}

/// Roots and limits used while evaluating checks.
#[derive(Debug, Clone)]
pub struct EvalContext {
    project_root: PathBuf,
    docs_dir: PathBuf,
    output: OutputState,
    scratch: Option<PathBuf>,
    timeout: Duration,
}

impl EvalContext {
    pub fn new(project_root: impl Into<PathBuf>, docs_dir: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
            docs_dir: docs_dir.into(),
            output: OutputState::Unavailable,
            scratch: None,
            timeout: Duration::from_secs(DEFAULT_BUILD_TIMEOUT_SECS),
        }
    }

    pub fn from_config(config: &GateConfig) -> Self {
        Self::new(config.project_path(), config.docs_path()).with_timeout(config.build.timeout())
    }

    pub fn with_output_dir(self, dir: impl Into<PathBuf>) -> Self {
        self.with_output(OutputState::Available(dir.into()))
    }

    pub fn with_output(mut self, output: OutputState) -> Self {
        self.output = output;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn docs_dir(&self) -> &Path {
        &self.docs_dir
    }

    pub fn output(&self) -> &OutputState {
        &self.output
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn with_scratch(&self, dir: &Path) -> Self {
        let mut ctx = self.clone();
        ctx.scratch = Some(dir.to_path_buf());
        ctx
    }

    fn root(&self, root: PathRoot) -> Result<&Path, Halt> {
        match root {
            PathRoot::Project => Ok(&self.project_root),
            PathRoot::Docs => Ok(&self.docs_dir),
            PathRoot::Output => match &self.output {
                OutputState::Available(dir) => Ok(dir),
                OutputState::Unavailable => Err(Halt::Skip(NO_OUTPUT_REASON.to_string())),
                OutputState::BuildFailed(failure) => Err(Halt::Fail(failure.clone())),
            },
            PathRoot::Scratch => self.scratch.as_deref().ok_or_else(|| {
                Halt::Fail(CheckFailure::new(
                    ErrorCode::MissingArtifact,
                    "scratch paths only exist inside a process check",
                ))
            }),
        }
    }

    /// Absolute path for `path`, if its root is available.
    fn resolve(&self, path: &PathRef) -> Result<PathBuf, Halt> {
        let root = self.root(path.root)?;
        if path.relative.as_os_str().is_empty() {
            Ok(root.to_path_buf())
        } else {
            Ok(root.join(&path.relative))
        }
    }
}

/// Why evaluation stopped early.
#[derive(Debug)]
enum Halt {
    Skip(String),
    Fail(CheckFailure),
    /// A missing anchor path; optional and dependent checks skip.
    Missing(CheckFailure),
    /// A missing container element in an existing document; only optional
    /// checks skip.
    Absent(CheckFailure),
}

impl Halt {
    fn into_outcome(self, requirement: Requirement) -> CheckOutcome {
        match self {
            Self::Skip(reason) => CheckOutcome::Skipped { reason },
            Self::Fail(failure) => CheckOutcome::Failed(failure),
            Self::Missing(failure) => match requirement {
                Requirement::Optional => {
                    CheckOutcome::skipped(format!("optional: {}", failure.message))
                }
                Requirement::WhenPresent => {
                    CheckOutcome::skipped(format!("not evaluated: {}", failure.message))
                }
                Requirement::Required => CheckOutcome::Failed(failure),
            },
            Self::Absent(failure) => match requirement {
                Requirement::Optional => {
                    CheckOutcome::skipped(format!("optional: {}", failure.message))
                }
                Requirement::WhenPresent | Requirement::Required => CheckOutcome::Failed(failure),
            },
        }
    }

    /// Missing anchors degrade; anything else fails outright.
    fn anchor(err: ArtifactError) -> Self {
        if matches!(err, ArtifactError::Missing { .. }) {
            Self::Missing(err.into())
        } else {
            Self::Fail(err.into())
        }
    }
}

impl From<CheckFailure> for Halt {
    fn from(failure: CheckFailure) -> Self {
        Self::Fail(failure)
    }
}

impl From<ArtifactError> for Halt {
    fn from(err: ArtifactError) -> Self {
        Self::Fail(err.into())
    }
}

/// Evaluate one check.
pub fn evaluate(check: &Check, ctx: &EvalContext) -> CheckOutcome {
    if let Some(reason) = &check.disabled {
        return CheckOutcome::skipped(reason.clone());
    }
    evaluate_expectation(&check.expectation, ctx, check.requirement)
}

/// Evaluate a bare expectation with the given requirement level.
pub fn evaluate_expectation(
    expectation: &Expectation,
    ctx: &EvalContext,
    requirement: Requirement,
) -> CheckOutcome {
    match eval(expectation, ctx) {
        Ok(()) => CheckOutcome::Passed,
        Err(halt) => halt.into_outcome(requirement),
    }
}

fn eval(expectation: &Expectation, ctx: &EvalContext) -> Result<(), Halt> {
    match expectation {
        Expectation::Existence {
            target,
            kind,
            occupancy,
        } => eval_existence(target, *kind, *occupancy, ctx),
        Expectation::ContentContains { file, pattern } => {
            let matcher = pattern
                .compile()
                .map_err(|e| invalid_pattern(&pattern.to_string(), e))?;
            let path = ctx.resolve(file)?;
            let text = read_text(&path).map_err(Halt::anchor)?;
            if matcher.is_match(&text) {
                Ok(())
            } else {
                Err(CheckFailure::new(
                    ErrorCode::PatternNotFound,
                    format!("{pattern} not found in {}", path.display()),
                )
                .with_path(path)
                .with_pattern(pattern.to_string())
                .into())
            }
        }
        Expectation::StructuredPresence { source, structure } => {
            for path in resolve_spec(source, ctx)? {
                let text = read_text(&path)?;
                eval_structure(&path, &text, structure)?;
            }
            Ok(())
        }
        Expectation::ExternalProcessSuccess {
            steps,
            forbidden,
            then,
        } => eval_process(steps, forbidden, then, ctx),
        Expectation::ContentConvention {
            files,
            exclude_dirs,
            rule,
        } => {
            let mut listed = Vec::new();
            let mut total = 0;
            let mut first_file = None;
            for path in resolve_spec(files, ctx)? {
                let excluded = path.components().any(|c| {
                    exclude_dirs
                        .iter()
                        .any(|d| c.as_os_str() == std::ffi::OsStr::new(d))
                });
                if excluded || !path.is_file() {
                    continue;
                }
                let text = read_text(&path)?;
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default();
                let violations = rule.check(&name, &text);
                if violations.is_empty() {
                    continue;
                }
                first_file.get_or_insert_with(|| path.clone());
                total += violations.len();
                for v in violations {
                    if listed.len() < MAX_LISTED_VIOLATIONS {
                        listed.push(format!("{}:{}: {}", path.display(), v.line, v.message));
                    }
                }
            }
            match first_file {
                None => Ok(()),
                Some(path) => {
                    let mut message =
                        format!("{} violated:\n{}", rule.describe(), listed.join("\n"));
                    if total > listed.len() {
                        message.push_str(&format!("\n... and {} more", total - listed.len()));
                    }
                    Err(CheckFailure::new(ErrorCode::ConventionViolation, message)
                        .with_path(path)
                        .into())
                }
            }
        }
    }
}

fn invalid_pattern(pattern: &str, err: regex::Error) -> Halt {
    Halt::Fail(
        CheckFailure::new(
            ErrorCode::ConfigInvalidPattern,
            format!("invalid pattern {pattern}: {err}"),
        )
        .with_pattern(pattern),
    )
}

fn read_text(path: &Path) -> Result<String, ArtifactError> {
    fs::read_to_string(path).map_err(|e| ArtifactError::from_io(path, e))
}

/// Check that `path` exists; a missing path is an anchor miss.
fn require_anchor(path: &Path) -> Result<(), Halt> {
    fs::metadata(path)
        .map(|_| ())
        .map_err(|e| Halt::anchor(ArtifactError::from_io(path, e)))
}

/// Concrete paths named by `spec`.
///
/// The anchor (the single path, the chosen candidate, or the glob/subdir
/// base) must exist. Entries under a base are returned whether or not they
/// exist.
fn resolve_spec(spec: &PathSpec, ctx: &EvalContext) -> Result<Vec<PathBuf>, Halt> {
    match spec {
        PathSpec::Single { path } => {
            let path = ctx.resolve(path)?;
            require_anchor(&path)?;
            Ok(vec![path])
        }
        PathSpec::FirstOf { candidates } => Ok(vec![first_existing(candidates, ctx)?]),
        PathSpec::Within { base, relative } => {
            let base = ctx.resolve(base)?;
            require_anchor(&base)?;
            Ok(vec![base.join(relative)])
        }
        PathSpec::Glob { base, patterns } => {
            let base = ctx.resolve(base)?;
            require_anchor(&base)?;
            let escaped = glob::Pattern::escape(&base.to_string_lossy());
            let mut paths = Vec::new();
            for pattern in patterns {
                let full = format!("{escaped}/{pattern}");
                let matches = glob::glob(&full).map_err(|e| {
                    Halt::Fail(
                        CheckFailure::new(
                            ErrorCode::ConfigInvalidPattern,
                            format!("invalid glob {pattern}: {e}"),
                        )
                        .with_pattern(pattern.clone()),
                    )
                })?;
                for entry in matches {
                    match entry {
                        Ok(path) => paths.push(path),
                        Err(e) => {
                            let path = e.path().to_path_buf();
                            return Err(ArtifactError::from_io(&path, e.into()).into());
                        }
                    }
                }
            }
            paths.sort();
            paths.dedup();
            Ok(paths)
        }
        PathSpec::EachSubdir {
            base,
            exclude,
            relative,
        } => {
            let base = first_existing(&base.candidates, ctx)?;
            let entries = fs::read_dir(&base).map_err(|e| ArtifactError::from_io(&base, e))?;
            let mut subdirs = Vec::new();
            for entry in entries {
                let entry = entry.map_err(|e| ArtifactError::from_io(&base, e))?;
                let name = entry.file_name().to_string_lossy().to_string();
                if entry.path().is_dir() && !exclude.contains(&name) {
                    subdirs.push(entry.path());
                }
            }
            subdirs.sort();
            Ok(subdirs.into_iter().map(|dir| dir.join(relative)).collect())
        }
    }
}

fn first_existing(candidates: &[PathRef], ctx: &EvalContext) -> Result<PathBuf, Halt> {
    let mut tried = Vec::new();
    for candidate in candidates {
        let path = ctx.resolve(candidate)?;
        if path.exists() {
            return Ok(path);
        }
        tried.push(path);
    }
    let listed: Vec<String> = tried.iter().map(|p| p.display().to_string()).collect();
    let mut failure = CheckFailure::new(
        ErrorCode::MissingArtifact,
        format!("none of {} exist", listed.join(", ")),
    );
    if let Some(first) = tried.into_iter().next() {
        failure = failure.with_path(first);
    }
    Err(Halt::Missing(failure))
}

fn eval_existence(
    target: &PathSpec,
    kind: EntryKind,
    occupancy: Occupancy,
    ctx: &EvalContext,
) -> Result<(), Halt> {
    let paths = resolve_spec(target, ctx)?;
    let failures: Vec<ArtifactError> = paths
        .iter()
        .filter_map(|path| check_entry(path, kind, occupancy).err())
        .collect();

    let mut iter = failures.into_iter();
    match iter.next() {
        None => Ok(()),
        Some(first) => {
            let rest = iter.count();
            let mut failure = CheckFailure::from(first);
            if rest > 0 {
                failure.message.push_str(&format!(" (and {rest} more)"));
            }
            Err(failure.into())
        }
    }
}

/// Kind and occupancy of one filesystem entry.
pub(crate) fn check_entry(
    path: &Path,
    kind: EntryKind,
    occupancy: Occupancy,
) -> Result<(), ArtifactError> {
    let meta = fs::metadata(path).map_err(|e| ArtifactError::from_io(path, e))?;
    let display = || DisplayPath::from(path);

    match kind {
        EntryKind::File if !meta.is_file() => {
            return Err(ArtifactError::WrongKind {
                path: display(),
                expected: "file",
            });
        }
        EntryKind::Dir if !meta.is_dir() => {
            return Err(ArtifactError::WrongKind {
                path: display(),
                expected: "directory",
            });
        }
        _ => {}
    }

    if occupancy == Occupancy::Any {
        return Ok(());
    }
    let empty = if meta.is_dir() {
        fs::read_dir(path)
            .map_err(|e| ArtifactError::from_io(path, e))?
            .next()
            .is_none()
    } else {
        meta.len() == 0
    };
    match (occupancy, empty) {
        (Occupancy::NonEmpty, true) => Err(ArtifactError::Empty { path: display() }),
        (Occupancy::Empty, false) => Err(ArtifactError::Unexpected { path: display() }),
        _ => Ok(()),
    }
}

fn eval_structure(path: &Path, text: &str, structure: &Structure) -> Result<(), Halt> {
    let malformed = |message: String| {
        Halt::Fail(CheckFailure::new(ErrorCode::MalformedStructure, message).with_path(path))
    };

    match structure {
        Structure::JsonKey { key } => {
            let index = search_index::parse(text).map_err(|e| {
                malformed(format!("{} is not a valid search index: {e}", path.display()))
            })?;
            if search_index::has_key(&index, key) {
                Ok(())
            } else {
                Err(malformed(format!(
                    "key '{key}' missing from {}",
                    path.display()
                )))
            }
        }
        Structure::JsonTermLike { key, needle } => {
            let index = search_index::parse(text).map_err(|e| {
                malformed(format!("{} is not a valid search index: {e}", path.display()))
            })?;
            if !search_index::has_key(&index, key) {
                return Err(malformed(format!(
                    "key '{key}' missing from {}",
                    path.display()
                )));
            }
            if search_index::contains_term(&index, key, needle) {
                Ok(())
            } else {
                Err(CheckFailure::new(
                    ErrorCode::PatternNotFound,
                    format!("no '{key}' entry containing '{needle}' in {}", path.display()),
                )
                .with_path(path)
                .with_pattern(needle.clone())
                .into())
            }
        }
        Structure::HtmlElement { tag, class, child } => {
            let doc = HtmlDocument::parse(text).map_err(|e| ArtifactError::Unreadable {
                path: DisplayPath::from(path),
                source: e,
            })?;
            let Some(container) = doc.find(tag, class.as_deref()) else {
                let selector = match class {
                    Some(class) => format!("<{tag} class=\"{class}\">"),
                    None => format!("<{tag}>"),
                };
                return Err(Halt::Absent(
                    CheckFailure::new(
                        ErrorCode::MalformedStructure,
                        format!("no {selector} element in {}", path.display()),
                    )
                    .with_path(path),
                ));
            };
            match child {
                Some(child)
                    if container
                        .find_with_attr(&child.tag, &child.attr, &child.value)
                        .is_none() =>
                {
                    Err(malformed(format!(
                        "<{} {}=\"{}\"> missing under {structure} in {}",
                        child.tag,
                        child.attr,
                        child.value,
                        path.display()
                    )))
                }
                _ => Ok(()),
            }
        }
        Structure::ListItem { name, item } => {
            let Some(body) = list_body(text, name) else {
                return Err(malformed(format!(
                    "no `{name} = [...]` assignment in {}",
                    path.display()
                )));
            };
            let quoted = [format!("'{item}'"), format!("\"{item}\"")];
            if quoted.iter().any(|q| body.contains(q.as_str())) {
                Ok(())
            } else {
                Err(CheckFailure::new(
                    ErrorCode::PatternNotFound,
                    format!("'{item}' not listed in {name} in {}", path.display()),
                )
                .with_path(path)
                .with_pattern(item.clone())
                .into())
            }
        }
    }
}

/// Body of the first `name = [ ... ]` assignment, which may span lines.
pub(crate) fn list_body<'a>(text: &'a str, name: &str) -> Option<&'a str> {
    let re = Regex::new(&format!(r"(?s)\b{}\s*=\s*\[(.*?)\]", regex::escape(name))).ok()?;
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

fn eval_process(
    steps: &[super::ProcessSpec],
    forbidden: &[super::Pattern],
    then: &[Expectation],
    ctx: &EvalContext,
) -> Result<(), Halt> {
    let mut matchers = Vec::with_capacity(forbidden.len());
    for pattern in forbidden {
        let matcher = pattern
            .compile_case_insensitive()
            .map_err(|e| invalid_pattern(&pattern.to_string(), e))?;
        matchers.push((pattern, matcher));
    }

    let scratch = tempfile::Builder::new()
        .prefix("docgate_check_")
        .tempdir()
        .map_err(|e| {
            CheckFailure::new(
                ErrorCode::ProcessLaunchFailure,
                format!("could not create scratch directory: {e}"),
            )
        })?;
    debug!(scratch = %scratch.path().display(), "created scratch directory");

    for step in steps {
        let args = step.resolve_args(&ctx.docs_dir, scratch.path());
        let result = run_command(&step.program, &args, None, ctx.timeout).map_err(|e| {
            let code = match e {
                ProcessError::Launch { .. } => ErrorCode::ProcessLaunchFailure,
                ProcessError::Wait { .. } => ErrorCode::ExternalProcessFailure,
            };
            CheckFailure::new(code, e.to_string())
        })?;

        let stderr = result.stderr.trim();
        if result.timed_out {
            return Err(CheckFailure::new(
                ErrorCode::ProcessTimeout,
                format!(
                    "`{}` timed out after {}s",
                    result.command_line,
                    ctx.timeout.as_secs()
                ),
            )
            .with_diagnostics(result.diagnostics())
            .into());
        }
        if !result.success() {
            return Err(CheckFailure::new(
                ErrorCode::ExternalProcessFailure,
                format!(
                    "`{}` exited with status {}:\n{stderr}",
                    result.command_line, result.exit_code
                ),
            )
            .with_diagnostics(result.diagnostics())
            .into());
        }
        if let Some((pattern, _)) = matchers.iter().find(|(_, m)| m.is_match(&result.stderr)) {
            return Err(CheckFailure::new(
                ErrorCode::ExternalProcessFailure,
                format!(
                    "diagnostic output of `{}` matches forbidden pattern {pattern}:\n{stderr}",
                    result.command_line
                ),
            )
            .with_pattern(pattern.to_string())
            .with_diagnostics(stderr)
            .into());
        }
    }

    let inner = ctx.with_scratch(scratch.path());
    for expectation in then {
        match evaluate_expectation(expectation, &inner, Requirement::Required) {
            CheckOutcome::Passed => {}
            CheckOutcome::Failed(failure) => return Err(Halt::Fail(failure)),
            CheckOutcome::Skipped { reason } => return Err(Halt::Skip(reason)),
        }
    }
    Ok(())
}

/// Runs a checklist against one context.
#[derive(Debug, Clone)]
pub struct Checker {
    ctx: EvalContext,
    gate: Option<String>,
}

impl Checker {
    pub fn new(ctx: EvalContext) -> Self {
        Self { ctx, gate: None }
    }

    /// Report every check as skipped with `reason` instead of running it.
    pub fn gated(mut self, reason: impl Into<String>) -> Self {
        self.gate = Some(reason.into());
        self
    }

    pub fn context(&self) -> &EvalContext {
        &self.ctx
    }

    /// Evaluate every check in order. A failing check never stops the rest.
    pub fn run(&self, checklist: &Checklist) -> Report {
        let mut report = Report::new();
        for check in checklist {
            let start = Instant::now();
            let outcome = match &self.gate {
                Some(reason) => CheckOutcome::skipped(reason.clone()),
                None => evaluate(check, &self.ctx),
            };
            let duration = start.elapsed();
            debug!(
                check = %check.id,
                outcome = outcome.label(),
                duration_ms = duration.as_millis() as u64,
                "check evaluated"
            );
            report.push(CheckRecord::new(check, outcome, duration));
        }

        let summary = report.summary();
        info!(
            total = summary.total,
            passed = summary.passed,
            failed = summary.failed,
            skipped = summary.skipped,
            "documentation checks complete"
        );
        report
    }
}
