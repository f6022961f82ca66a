//! Blocking execution of the external build command with output capture.

use std::ffi::OsStr;
use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Exit code reported when the process was killed after its timeout.
pub const TIMEOUT_EXIT_CODE: i32 = 124;

/// Trailing stdout lines kept in failure diagnostics.
const STDOUT_TAIL_LINES: usize = 20;

/// Errors that prevent a command from producing a result at all.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("Failed to start `{program}`: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed while waiting for `{program}`: {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result of a command execution
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub command_line: String,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
    pub timed_out: bool,
}

impl CommandResult {
    /// Check if the command succeeded (exit code 0)
    pub fn success(&self) -> bool {
        self.exit_code == 0 && !self.timed_out
    }

    /// Stderr, followed by the tail of stdout when there is any. Builders
    /// often print the failing document on stdout just before exiting.
    pub fn diagnostics(&self) -> String {
        let stderr = self.stderr.trim();
        let lines: Vec<&str> = self.stdout.trim_end().lines().collect();
        if lines.iter().all(|line| line.trim().is_empty()) {
            return stderr.to_string();
        }
        let tail = &lines[lines.len().saturating_sub(STDOUT_TAIL_LINES)..];
        let mut out = String::from(stderr);
        if !out.is_empty() {
            out.push_str("\n\n");
        }
        out.push_str("stdout (tail):\n");
        out.push_str(&tail.join("\n"));
        out
    }
}

/// Render a program and its arguments for messages.
pub fn command_line<S: AsRef<OsStr>>(program: &str, args: &[S]) -> String {
    let mut line = program.to_string();
    for arg in args {
        line.push(' ');
        line.push_str(&arg.as_ref().to_string_lossy());
    }
    line
}

/// Run `program` to completion, killing it after `timeout`.
///
/// Stdout and stderr are drained on helper threads so a chatty build cannot
/// fill a pipe and stall.
pub fn run_command<S: AsRef<OsStr>>(
    program: &str,
    args: &[S],
    cwd: Option<&Path>,
    timeout: Duration,
) -> Result<CommandResult, ProcessError> {
    let command_line = command_line(program, args);
    tracing::debug!(command = %command_line, "executing");

    let start = Instant::now();
    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }

    let mut child = cmd.spawn().map_err(|source| ProcessError::Launch {
        program: program.to_string(),
        source,
    })?;
    let stdout_handle = child
        .stdout
        .take()
        .map(|mut stdout| thread::spawn(move || read_to_string(&mut stdout)));
    let stderr_handle = child
        .stderr
        .take()
        .map(|mut stderr| thread::spawn(move || read_to_string(&mut stderr)));

    let wait_error = |source| ProcessError::Wait {
        program: program.to_string(),
        source,
    };
    let mut timed_out = false;
    let exit_status = loop {
        if let Some(status) = child.try_wait().map_err(wait_error)? {
            break Some(status);
        }

        if start.elapsed() >= timeout {
            timed_out = true;
            let _ = child.kill();
            break child.wait().ok();
        }

        thread::sleep(Duration::from_millis(10));
    };

    let duration = start.elapsed();
    let stdout = join_output(stdout_handle);
    let mut stderr = join_output(stderr_handle);
    if timed_out {
        if !stderr.is_empty() {
            stderr.push('\n');
        }
        stderr.push_str(&format!("Process timed out after {:?}.", timeout));
    }

    let exit_code = exit_status
        .and_then(|status| status.code())
        .unwrap_or(if timed_out { TIMEOUT_EXIT_CODE } else { -1 });

    let result = CommandResult {
        command_line,
        exit_code,
        stdout,
        stderr,
        duration,
        timed_out,
    };

    if result.success() {
        tracing::debug!(
            command = %result.command_line,
            duration_ms = duration.as_millis() as u64,
            "command completed"
        );
    } else {
        tracing::warn!(
            command = %result.command_line,
            exit_code = result.exit_code,
            timed_out,
            "command failed"
        );
    }

    Ok(result)
}

fn read_to_string<R: Read>(reader: &mut R) -> String {
    let mut buffer = Vec::new();
    if reader.read_to_end(&mut buffer).is_ok() {
        String::from_utf8_lossy(&buffer).to_string()
    } else {
        String::new()
    }
}

fn join_output(handle: Option<thread::JoinHandle<String>>) -> String {
    match handle {
        Some(handle) => handle.join().unwrap_or_default(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn test_run_command_captures_streams() {
        let result = run_command(
            "sh",
            &["-c", "echo out; echo err >&2; exit 3"],
            None,
            Duration::from_secs(10),
        )
        .unwrap();

        assert_eq!(result.exit_code, 3);
        assert!(!result.success());
        assert_eq!(result.stdout.trim(), "out");
        assert!(result.stderr.contains("err"));
        assert!(result.command_line.starts_with("sh -c"));
        assert_eq!(result.diagnostics(), "err\n\nstdout (tail):\nout");
    }

    #[cfg(unix)]
    #[test]
    fn test_run_command_timeout() {
        let result = run_command("sleep", &["5"], None, Duration::from_millis(50)).unwrap();

        assert!(result.timed_out);
        assert!(!result.success());
        assert_eq!(result.exit_code, TIMEOUT_EXIT_CODE);
        assert!(result.stderr.contains("timed out"));
    }

    #[test]
    fn test_missing_program_is_launch_error() {
        let err = run_command(
            "docgate-no-such-program-xyz",
            &["--version"],
            None,
            Duration::from_secs(1),
        )
        .unwrap_err();
        assert!(matches!(err, ProcessError::Launch { .. }));
        assert!(err.to_string().contains("docgate-no-such-program-xyz"));
    }

    #[test]
    fn test_diagnostics_keep_only_the_stdout_tail() {
        let stdout: String = (1..=30).map(|n| format!("reading doc{n}\n")).collect();
        let result = CommandResult {
            command_line: "sphinx-build".to_string(),
            exit_code: 2,
            stdout,
            stderr: String::new(),
            duration: Duration::ZERO,
            timed_out: false,
        };
        let diagnostics = result.diagnostics();
        assert!(diagnostics.starts_with("stdout (tail):\nreading doc11\n"));
        assert!(diagnostics.ends_with("reading doc30"));
        assert!(!diagnostics.contains("reading doc10\n"));

        let quiet = CommandResult {
            stdout: "\n".to_string(),
            stderr: "boom\n".to_string(),
            ..result
        };
        assert_eq!(quiet.diagnostics(), "boom");
    }

    #[test]
    fn test_command_line_rendering() {
        assert_eq!(
            command_line("sphinx-build", &["-b", "html", "docs", "out"]),
            "sphinx-build -b html docs out"
        );
    }
}
