//! One-off documentation build shared by all output-rooted checks.

use crate::check::{CheckFailure, OutputState, ProcessSpec};
use crate::errors::ErrorCode;
use crate::process::{ProcessError, run_command};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use tracing::{info, warn};

/// Build tree owned by a session. Removed when the session is dropped.
pub struct BuildSession {
    dir: TempDir,
    output: PathBuf,
    state: OutputState,
}

impl BuildSession {
    /// Run `spec` once in a fresh temporary directory. Scratch arguments
    /// resolve inside that directory and `output_subdir` names the tree
    /// output-rooted checks look at.
    pub fn run(
        spec: &ProcessSpec,
        docs_dir: &Path,
        output_subdir: &str,
        timeout: Duration,
    ) -> io::Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("docgate_build_")
            .tempdir()?;
        let output = dir.path().join(output_subdir);
        let args = spec.resolve_args(docs_dir, dir.path());
        info!(
            program = %spec.program,
            dir = %dir.path().display(),
            "building documentation"
        );

        let state = match run_command(&spec.program, &args, None, timeout) {
            Ok(result) if result.success() => OutputState::Available(output.clone()),
            Ok(result) => {
                let code = if result.timed_out {
                    ErrorCode::ProcessTimeout
                } else {
                    ErrorCode::ExternalProcessFailure
                };
                let failure = CheckFailure::new(
                    code,
                    format!(
                        "documentation build `{}` exited with status {}:\n{}",
                        result.command_line,
                        result.exit_code,
                        result.stderr.trim()
                    ),
                )
                .with_diagnostics(result.diagnostics());
                warn!(exit_code = result.exit_code, "documentation build failed");
                OutputState::BuildFailed(failure)
            }
            Err(err) => {
                let code = match err {
                    ProcessError::Launch { .. } => ErrorCode::ProcessLaunchFailure,
                    ProcessError::Wait { .. } => ErrorCode::ExternalProcessFailure,
                };
                warn!(error = %err, "documentation build could not run");
                OutputState::BuildFailed(CheckFailure::new(code, err.to_string()))
            }
        };

        Ok(Self { dir, output, state })
    }

    /// `<program> -b html -d <tmp>/doctrees <docs> <tmp>/html`.
    pub fn html(program: &str, docs_dir: &Path, timeout: Duration) -> io::Result<Self> {
        let spec = ProcessSpec::new(program)
            .arg("-b")
            .arg("html")
            .arg("-d")
            .scratch("doctrees")
            .docs_dir()
            .scratch("html");
        Self::run(&spec, docs_dir, "html", timeout)
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn output_dir(&self) -> &Path {
        &self.output
    }

    pub fn output_state(&self) -> OutputState {
        self.state.clone()
    }

    pub fn succeeded(&self) -> bool {
        matches!(self.state, OutputState::Available(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn test_session_output_removed_on_drop() {
        let docs = tempfile::TempDir::new().unwrap();
        let spec = ProcessSpec::new("sh")
            .arg("-c")
            .arg("mkdir -p \"$1/html\" && echo ok > \"$1/html/index.html\"")
            .arg("build")
            .scratch("");
        let session =
            BuildSession::run(&spec, docs.path(), "html", Duration::from_secs(10)).unwrap();
        assert!(session.succeeded());
        let index = session.output_dir().join("index.html");
        assert!(index.is_file());

        let root = session.path().to_path_buf();
        drop(session);
        assert!(!root.exists());
        assert!(!index.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_build_becomes_output_failure() {
        let docs = tempfile::TempDir::new().unwrap();
        let spec = ProcessSpec::new("sh")
            .arg("-c")
            .arg("echo 'reading sources... [100%] broken' ; echo boom >&2; exit 2");
        let session =
            BuildSession::run(&spec, docs.path(), "html", Duration::from_secs(10)).unwrap();
        assert!(!session.succeeded());
        match session.output_state() {
            OutputState::BuildFailed(failure) => {
                assert_eq!(failure.code, ErrorCode::ExternalProcessFailure);
                assert!(failure.message.contains("boom"));
                assert!(!failure.message.contains("reading sources"));
                let diagnostics = failure.diagnostics.unwrap();
                assert!(diagnostics.starts_with("boom"));
                assert!(diagnostics.contains("[100%] broken"));
            }
            other => panic!("unexpected state: {other:?}"),
        }
    }

    #[test]
    fn test_missing_builder_is_launch_failure() {
        let docs = tempfile::TempDir::new().unwrap();
        let session = BuildSession::html(
            "docgate-no-such-sphinx-build",
            docs.path(),
            Duration::from_secs(5),
        )
        .unwrap();
        match session.output_state() {
            OutputState::BuildFailed(failure) => {
                assert_eq!(failure.code, ErrorCode::ProcessLaunchFailure);
                assert!(failure.diagnostics.is_none());
            }
            other => panic!("unexpected state: {other:?}"),
        }
    }
}
