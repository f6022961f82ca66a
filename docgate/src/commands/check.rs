//! `docgate check`: run the checklist and report.

use super::{CheckArgs, load_config};
use anyhow::{Context, Result};
use docgate_common::check::OutputState;
use docgate_common::{
    BuildSession, Checker, ErrorCode, EvalContext, GATE_SKIP_REASON, sphinx_checklist,
};
use tracing::{debug, info};

pub fn run(args: &CheckArgs) -> Result<u8> {
    let config = load_config(&args.project, args.force)?;

    let mut checklist = sphinx_checklist(&config).filter_groups(&args.groups);
    if let Some(prefix) = &args.only {
        checklist = checklist.filter_ids(prefix);
    }
    checklist.validate().with_context(|| {
        let code = ErrorCode::ConfigInvalidPattern;
        format!("[{code}] {}", code.message())
    })?;
    debug!(checks = checklist.len(), "checklist ready");

    let mut ctx = EvalContext::from_config(&config);
    let mut session = None;
    let checker = if !config.enabled.value {
        info!("documentation checks disabled; set TEST_DOCS=1 or pass --force");
        Checker::new(ctx).gated(GATE_SKIP_REASON)
    } else {
        if let Some(dir) = &args.output_dir {
            ctx = ctx.with_output(OutputState::Available(dir.clone()));
        } else if args.build && checklist.iter().any(|c| c.expectation.needs_output()) {
            let built = BuildSession::html(
                &config.build.program.value,
                &config.docs_path(),
                config.build.timeout(),
            )
            .context("Failed to create build directory")?;
            ctx = ctx.with_output(built.output_state());
            session = Some(built);
        }
        Checker::new(ctx)
    };

    let report = checker.run(&checklist);
    drop(session);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report.render_human());
    }
    Ok(report.exit_code() as u8)
}
