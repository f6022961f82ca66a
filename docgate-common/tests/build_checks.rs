//! Process-driven checks and the shared build session, using a stand-in
//! `sphinx-build` script.
//!
//! Tests are serialized: the fake builder is written and then executed, and
//! a concurrent fork elsewhere in the binary could keep it busy.

#![cfg(unix)]

mod common;

use common::SphinxSite;
use docgate_common::check::{
    Checker, EvalContext, Expectation, PathRef, Requirement, evaluate_expectation,
};
use docgate_common::errors::ErrorCode;
use docgate_common::sphinx::build_checks;
use docgate_common::testing::{TestLogger, TestPhase};
use docgate_common::{BuildSession, Checklist, Report};
use serial_test::serial;
use std::time::Duration;

fn run_build_group(site: &SphinxSite, program: &str) -> Report {
    let checklist: Checklist = build_checks(program).into_iter().collect();
    Checker::new(site.context()).run(&checklist)
}

#[test]
#[serial]
fn test_build_group_passes_with_clean_builder() {
    let site = SphinxSite::new();
    let builder = site.fake_builder("");
    let report = run_build_group(&site, &builder.to_string_lossy());

    assert!(
        report.failures().next().is_none(),
        "{}",
        report.render_human()
    );
    for id in [
        "build.html",
        "build.output",
        "build.warnings_as_errors",
        "build.builder.html",
        "build.clean",
    ] {
        assert!(report.get(id).unwrap().outcome.is_passed(), "{id}");
    }
    for id in ["build.builder.latex", "build.builder.man", "build.builder.texinfo"] {
        assert!(report.get(id).unwrap().outcome.is_skipped(), "{id}");
    }
}

#[test]
#[serial]
fn test_warning_output_fails_only_the_clean_build_check() {
    let site = SphinxSite::new();
    let builder = site.fake_builder("echo 'WARNING: document not included in any toctree' >&2");
    let report = run_build_group(&site, &builder.to_string_lossy());

    let failure = report.get("build.html").unwrap().outcome.failure().unwrap();
    assert_eq!(failure.code, ErrorCode::ExternalProcessFailure);
    assert!(failure.message.contains("WARNING: document"));
    assert!(report.get("build.output").unwrap().outcome.is_passed());
}

#[test]
#[serial]
fn test_traceback_exit_fails_with_diagnostics() {
    let site = SphinxSite::new();
    let builder = site.fake_builder(
        "echo 'Traceback (most recent call last):' >&2\necho 'ValueError: bad conf' >&2\nexit 1",
    );
    let report = run_build_group(&site, &builder.to_string_lossy());

    let failure = report.get("build.html").unwrap().outcome.failure().unwrap();
    assert_eq!(failure.code, ErrorCode::ExternalProcessFailure);
    assert!(failure.message.contains("exited with status 1"));
    assert!(failure.message.contains("Traceback"));
    assert!(failure.diagnostics.as_deref().unwrap().contains("ValueError"));
    assert_eq!(report.exit_code(), 1);
}

#[test]
#[serial]
fn test_session_output_disappears_after_drop() {
    let logger = TestLogger::for_test("test_session_output_disappears_after_drop");
    let site = SphinxSite::new();
    let builder = site.fake_builder("");

    logger.log(TestPhase::Setup, "building into session directory");
    let session = BuildSession::html(
        &builder.to_string_lossy(),
        &site.docs(),
        Duration::from_secs(30),
    )
    .unwrap();
    assert!(session.succeeded());
    let session_root = session.path().to_path_buf();
    let index = session.output_dir().join("index.html");

    logger.log(TestPhase::Execute, "checking index.html inside the session");
    let ctx = EvalContext::from_config(&site.config()).with_output(session.output_state());
    let exp = Expectation::exists(PathRef::output("index.html"));
    assert!(evaluate_expectation(&exp, &ctx, Requirement::Required).is_passed());

    logger.log(TestPhase::Teardown, "dropping session");
    drop(session);
    assert!(!session_root.exists());

    logger.log(TestPhase::Verify, "same path after drop");
    let after = EvalContext::from_config(&site.config())
        .with_output_dir(index.parent().unwrap().to_path_buf());
    let outcome = evaluate_expectation(&exp, &after, Requirement::Required);
    let failure = outcome.failure().unwrap();
    assert_eq!(failure.code, ErrorCode::MissingArtifact);
    assert_eq!(failure.path.as_deref(), Some(index.as_path()));
}

#[test]
#[serial]
fn test_failed_session_fails_output_checks() {
    let site = SphinxSite::new();
    let builder = site.fake_builder("echo 'Exception occurred' >&2; exit 2");
    let session = BuildSession::html(
        &builder.to_string_lossy(),
        &site.docs(),
        Duration::from_secs(30),
    )
    .unwrap();
    assert!(!session.succeeded());

    let ctx = EvalContext::from_config(&site.config()).with_output(session.output_state());
    let checklist: Checklist = docgate_common::sphinx::search_checks(&site.config())
        .into_iter()
        .collect();
    let report = Checker::new(ctx).run(&checklist);

    let page = report.get("search.page").unwrap().outcome.failure().unwrap();
    assert_eq!(page.code, ErrorCode::ExternalProcessFailure);
    assert!(page.message.contains("Exception occurred"));
}
