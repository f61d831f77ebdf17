//! Integration tests for framework announcements and error reporting.

use serde_json::json;

use nutra_plugin::prelude::*;

use crate::helpers::{EventLog, TestProject, resolver_with};

/// A framework announcing itself to reporters when it exits.
fn announcing(id: &'static str) -> PluginExport {
    PluginExport::new().framework(move |hooks, ctx, _| {
        let ctx = ctx.clone();
        hooks.on_exit = Some(lifecycle_hook(move || {
            let ctx = ctx.clone();
            async move { ctx.on_framework_execution(id).await }
        }));
        Ok(())
    })
}

/// A reporter recording every announcement as `<name>:<framework>`.
fn listening(name: &'static str, log: &EventLog) -> PluginExport {
    let log = log.clone();
    PluginExport::new().reporter(move |hooks, _, _| {
        let log = log.clone();
        hooks.on_framework_execution = Some(framework_execution_hook(move |framework| {
            let log = log.clone();
            async move {
                log.push(format!("{name}:{framework}"));
                Ok(())
            }
        }));
        Ok(())
    })
}

#[tokio::test]
async fn test_framework_execution_reaches_every_reporter() {
    let project = TestProject::new(&[("src/a.js", "a")]);
    let log = EventLog::default();
    let orchestrator = project.orchestrator(resolver_with(vec![
        ("jasmine", announcing("jasmine")),
        ("junit", listening("junit", &log)),
        ("coverage", listening("coverage", &log)),
    ]));

    orchestrator
        .run(project.options(
            &["src/*.js"],
            json!({"frameworks": "jasmine", "reporters": ["junit", "coverage"]}),
        ))
        .await
        .unwrap();

    let mut seen = log.entries();
    seen.sort();
    assert_eq!(seen, vec!["coverage:jasmine", "junit:jasmine"]);
}

#[tokio::test]
async fn test_failing_reporter_fails_the_announcing_phase() {
    let project = TestProject::new(&[("src/a.js", "a")]);
    let log = EventLog::default();
    let broken = PluginExport::new().reporter(|hooks, _, _| {
        hooks.on_framework_execution = Some(framework_execution_hook(|_| async {
            Err(NutraError::internal("junit writer closed"))
        }));
        Ok(())
    });
    let orchestrator = project.orchestrator(resolver_with(vec![
        ("jasmine", announcing("jasmine")),
        ("junit", broken),
        ("coverage", listening("coverage", &log)),
    ]));

    let err = orchestrator
        .run(project.options(
            &["src/*.js"],
            json!({"frameworks": "jasmine", "reporters": ["junit", "coverage"]}),
        ))
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::HookExecution);
    assert!(err.diagnostic().contains("junit writer closed"));
    assert_eq!(log.entries(), vec!["coverage:jasmine"]);
    assert!(project.leftovers().is_empty());
}

/// A framework reporting `message` through the context when it loads.
fn reporting(message: &'static str, warning: bool, fatal: bool, log: &EventLog) -> PluginExport {
    let log = log.clone();
    PluginExport::new().framework(move |hooks, ctx, _| {
        let ctx = ctx.clone();
        let log = log.clone();
        hooks.on_load = Some(lifecycle_hook(move || {
            let ctx = ctx.clone();
            let log = log.clone();
            async move {
                let cause = std::io::Error::other("trace detail");
                let error = NutraError::with_source(ErrorKind::Internal, message, cause);
                let outcome = ctx.report_error(error, warning, fatal).await;
                log.push(format!("working dir present: {}", ctx.working_dir().exists()));
                outcome
            }
        }));
        Ok(())
    })
}

#[tokio::test]
async fn test_warnings_do_not_abort_the_run() {
    let project = TestProject::new(&[("src/a.js", "a")]);
    let log = EventLog::default();
    let orchestrator = project.orchestrator(resolver_with(vec![(
        "jasmine",
        reporting("slow spec", true, false, &log),
    )]));

    let summary = orchestrator
        .run(project.options(&["src/*.js"], json!({"frameworks": "jasmine"})))
        .await
        .unwrap();

    assert_eq!(summary.phases.len(), 8);
    assert_eq!(log.entries(), vec!["working dir present: true"]);
}

#[tokio::test]
async fn test_fatal_warning_is_raised_without_trace() {
    let project = TestProject::new(&[("src/a.js", "a")]);
    let log = EventLog::default();
    let orchestrator = project.orchestrator(resolver_with(vec![(
        "jasmine",
        reporting("spec timeout", true, true, &log),
    )]));

    let err = orchestrator
        .run(project.options(&["src/*.js"], json!({"frameworks": "jasmine"})))
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::HookExecution);
    assert!(err.diagnostic().contains("spec timeout"));
    assert!(!err.diagnostic().contains("trace detail"));
    assert_eq!(log.entries(), vec!["working dir present: false"]);
    assert!(project.leftovers().is_empty());
}

#[tokio::test]
async fn test_errors_remove_working_directory_before_raising() {
    let project = TestProject::new(&[("src/a.js", "a")]);
    let log = EventLog::default();
    let orchestrator = project.orchestrator(resolver_with(vec![(
        "jasmine",
        reporting("assertion failed", false, false, &log),
    )]));

    let err = orchestrator
        .run(project.options(&["src/*.js"], json!({"frameworks": "jasmine"})))
        .await
        .unwrap_err();

    assert!(err.diagnostic().contains("trace detail"));
    assert_eq!(log.entries(), vec!["working dir present: false"]);
}
