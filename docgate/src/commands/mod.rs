//! Subcommand implementations.

pub mod check;
pub mod config;
pub mod list;

use anyhow::Result;
use clap::Args;
use docgate_common::{GateConfig, LoadOptions};
use std::path::PathBuf;

/// Where the project lives and which config file to read.
#[derive(Args, Debug, Clone, Default)]
pub struct ProjectArgs {
    /// Project root (defaults to DOCGATE_PROJECT_ROOT or the current directory)
    #[arg(long)]
    pub project_root: Option<PathBuf>,

    /// Documentation source directory, relative to the project root
    #[arg(long)]
    pub docs_dir: Option<PathBuf>,

    /// Configuration file (defaults to docgate.toml at the project root)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct CheckArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    /// Build the HTML output once into a temporary directory for output checks
    #[arg(long, conflicts_with = "output_dir")]
    pub build: bool,

    /// Use an existing build output tree for output checks
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Only run checks in this group (repeatable)
    #[arg(long = "group", value_name = "GROUP")]
    pub groups: Vec<String>,

    /// Only run checks whose id starts with this prefix
    #[arg(long, value_name = "PREFIX")]
    pub only: Option<String>,

    /// Emit the report as JSON
    #[arg(long)]
    pub json: bool,

    /// Run even when TEST_DOCS is not set
    #[arg(long)]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    /// Only list checks in this group (repeatable)
    #[arg(long = "group", value_name = "GROUP")]
    pub groups: Vec<String>,

    /// Emit the checklist as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    /// Emit the configuration as JSON
    #[arg(long)]
    pub json: bool,
}

/// Load the layered configuration, tagging failures with their catalog code.
pub fn load_config(project: &ProjectArgs, force: bool) -> Result<GateConfig> {
    let options = LoadOptions {
        project_root: project.project_root.clone(),
        docs_dir: project.docs_dir.clone(),
        config_file: project.config.clone(),
        force,
    };
    GateConfig::load(&options).map_err(|e| {
        let code = e.code();
        anyhow::Error::new(e).context(format!("[{code}] {}", code.message()))
    })
}
