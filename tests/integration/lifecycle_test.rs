//! Integration tests for the run lifecycle.

use serde_json::json;

use nutra_plugin::hooks::DEFAULT_PHASES;

use crate::helpers::{EventLog, TestProject, recording_plugin, resolver_with};

#[tokio::test]
async fn test_phases_run_in_fixed_order() {
    let project = TestProject::new(&[("src/a.js", "a"), ("test/a.spec.js", "spec")]);
    let log = EventLog::default();
    let orchestrator =
        project.orchestrator(resolver_with(vec![("recorder", recording_plugin(&log))]));

    let summary = orchestrator
        .run(project.options(
            &["src/**/*.js", "test/**/*.js"],
            json!({
                "moduleloader": "recorder",
                "preprocessors": {"src/**": ["recorder"]},
                "frameworks": ["recorder"],
                "reporters": "nutra-recorder"
            }),
        ))
        .await
        .unwrap();

    let expected: Vec<String> = DEFAULT_PHASES.iter().map(ToString::to_string).collect();
    assert_eq!(log.entries(), expected);
    assert_eq!(summary.phases, DEFAULT_PHASES.to_vec());
    assert_eq!(summary.files, 2);
    assert_eq!(summary.plugins, 4);
    assert!(summary.finished_at >= summary.started_at);
}

#[tokio::test]
async fn test_working_directory_is_removed_after_success() {
    let project = TestProject::new(&[("src/a.js", "a")]);
    let orchestrator = project.orchestrator(resolver_with(Vec::new()));

    let summary = orchestrator
        .run(project.options(&["src/*.js"], json!({})))
        .await
        .unwrap();

    assert!(summary.working_dir.starts_with(project.temp_root.path()));
    assert!(!summary.working_dir.exists());
    assert!(project.leftovers().is_empty());
}

#[tokio::test]
async fn test_each_plugin_is_constructed_once() {
    let project = TestProject::new(&[("src/a.js", "a")]);
    let constructed = EventLog::default();
    let recorded = constructed.clone();
    let module = nutra_plugin::PluginExport::new().reporter(move |_, _, _| {
        recorded.push("reporter");
        Ok(())
    });
    let orchestrator = project.orchestrator(resolver_with(vec![("junit", module)]));

    orchestrator
        .run(project.options(&["src/*.js"], json!({"reporters": ["junit", "nutra-junit"]})))
        .await
        .unwrap();

    assert_eq!(constructed.entries(), vec!["reporter"]);
}
