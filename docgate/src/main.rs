//! docgate - documentation conformance gate
//!
//! Evaluates the Sphinx documentation checklist against a project and
//! exits non-zero when any check fails.

#![forbid(unsafe_code)]

mod commands;

use clap::{Parser, Subcommand};
use commands::{CheckArgs, ConfigArgs, ListArgs};
use docgate_common::{LogConfig, init_logging};
use std::io::IsTerminal;
use std::process::ExitCode;

/// Exit status for usage and configuration errors.
const EXIT_USAGE: u8 = 2;

#[derive(Parser)]
#[command(name = "docgate")]
#[command(author, version, about = "Documentation conformance gate for Sphinx projects")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the documentation checklist
    ///
    /// Checks are skipped unless TEST_DOCS is set or --force is given.
    /// Exit status is 0 when no check failed, 1 when any check failed and
    /// 2 for configuration errors.
    Check(CheckArgs),

    /// List the checks that would run
    List(ListArgs),

    /// Show the effective configuration and where each value came from
    Config(ConfigArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut log_config = LogConfig::from_env("info").with_stderr();
    if cli.verbose {
        log_config = log_config.with_level("debug");
    }
    let _logging_guards = match init_logging(&log_config) {
        Ok(guards) => Some(guards),
        Err(e) => {
            eprintln!("warning: logging disabled: {e}");
            None
        }
    };

    if !std::io::stdout().is_terminal() {
        colored::control::set_override(false);
    }

    let result = match &cli.command {
        Commands::Check(args) => commands::check::run(args),
        Commands::List(args) => commands::list::run(args),
        Commands::Config(args) => commands::config::run(args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(EXIT_USAGE)
        }
    }
}
