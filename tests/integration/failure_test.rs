//! Integration tests for fatal paths.

use serde_json::json;

use nutra_core::error::{ErrorKind, NutraError};
use nutra_core::result::NutraResult;
use nutra_plugin::PluginExport;
use nutra_plugin::hooks::lifecycle_hook;

use crate::helpers::{EventLog, TestProject, recording_plugin, resolver_with};

#[tokio::test]
async fn test_missing_files_fails_before_any_directory() {
    let project = TestProject::new(&[("src/a.js", "a")]);
    let orchestrator = project.orchestrator(resolver_with(Vec::new()));

    let err = orchestrator
        .run(json!({"basePath": project.path().to_string_lossy()}))
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::InvalidFilesOption);
    assert!(project.leftovers().is_empty());
}

#[tokio::test]
async fn test_empty_expansion_names_the_patterns() {
    let project = TestProject::new(&[("src/a.js", "a")]);
    let orchestrator = project.orchestrator(resolver_with(Vec::new()));

    let err = orchestrator
        .run(project.options(&["lib/**/*.js", "vendor/*.js"], json!({})))
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::EmptyFilesOption);
    assert!(err.message.ends_with("lib/**/*.js, vendor/*.js"));
    assert!(project.leftovers().is_empty());
}

#[tokio::test]
async fn test_non_object_configuration() {
    let project = TestProject::new(&[]);
    let orchestrator = project.orchestrator(resolver_with(Vec::new()));

    let err = orchestrator.run(json!("nutra.config.json")).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::EmptyOptions);
}

#[tokio::test]
async fn test_unknown_plugin_is_fatal_and_cleaned_up() {
    let project = TestProject::new(&[("src/a.js", "a")]);
    let orchestrator = project.orchestrator(resolver_with(Vec::new()));

    let err = orchestrator
        .run(project.options(&["src/*.js"], json!({"frameworks": "jasmine"})))
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::PluginResolution);
    assert!(err.message.contains("nutra-jasmine"));
    assert!(project.leftovers().is_empty());
}

#[tokio::test]
async fn test_failing_hook_aborts_remaining_phases() {
    let project = TestProject::new(&[("src/a.js", "a")]);
    let log = EventLog::default();
    let failing = PluginExport::new().framework(|hooks, _, _| {
        hooks.on_load = Some(lifecycle_hook(|| async {
            Err(NutraError::internal("jasmine could not boot"))
        }));
        Ok(())
    });
    let orchestrator = project.orchestrator(resolver_with(vec![
        ("recorder", recording_plugin(&log)),
        ("jasmine", failing),
    ]));

    let err = orchestrator
        .run(project.options(
            &["src/*.js"],
            json!({
                "moduleloader": "recorder",
                "preprocessors": {"src/**": ["recorder"]},
                "frameworks": ["recorder", "jasmine"],
                "reporters": ["recorder"]
            }),
        ))
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::HookExecution);
    assert!(err.diagnostic().contains("jasmine could not boot"));
    assert_eq!(
        log.entries(),
        vec!["onLoad:preprocessors", "onLoad:frameworks"]
    );
    assert!(project.leftovers().is_empty());
}

#[tokio::test]
async fn test_failing_constructor_is_cleaned_up() {
    let project = TestProject::new(&[("src/a.js", "a")]);
    let broken = PluginExport::new()
        .reporter(|_, _, _| Err(NutraError::configuration("missing output directory")));
    let orchestrator = project.orchestrator(resolver_with(vec![("junit", broken)]));

    let err = orchestrator
        .run(project.options(&["src/*.js"], json!({"reporters": "junit"})))
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::PluginResolution);
    assert!(err.diagnostic().contains("missing output directory"));
    assert!(project.leftovers().is_empty());
}

fn refuse_to_start() -> NutraResult<()> {
    panic!("framework refused to start")
}

#[tokio::test]
async fn test_hook_panicking_before_its_future_is_cleaned_up() {
    let project = TestProject::new(&[("src/a.js", "a")]);
    let eager = PluginExport::new().framework(|hooks, _, _| {
        hooks.on_load = Some(lifecycle_hook(|| std::future::ready(refuse_to_start())));
        Ok(())
    });
    let orchestrator = project.orchestrator(resolver_with(vec![("eager", eager)]));

    let err = orchestrator
        .run(project.options(&["src/*.js"], json!({"frameworks": "eager"})))
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::HookExecution);
    assert!(err.message.contains("framework refused to start"));
    assert!(project.leftovers().is_empty());
}

#[tokio::test]
async fn test_panicking_constructor_is_cleaned_up() {
    let project = TestProject::new(&[("src/a.js", "a")]);
    let broken = PluginExport::new().reporter(|_, _, _| -> NutraResult<()> {
        panic!("reporter constructor exploded")
    });
    let orchestrator = project.orchestrator(resolver_with(vec![("junit", broken)]));

    let err = orchestrator
        .run(project.options(&["src/*.js"], json!({"reporters": "junit"})))
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::PluginResolution);
    assert!(err.diagnostic().contains("reporter constructor exploded"));
    assert!(project.leftovers().is_empty());
}

#[tokio::test]
async fn test_escaping_stage_subdir_is_rejected() {
    let project = TestProject::new(&[("src/a.js", "a")]);
    let orchestrator = project.orchestrator(resolver_with(Vec::new()));

    let err = orchestrator
        .run(project.options(
            &["src/*.js"],
            json!({"stageOptions": {"subdir": "../escaped"}}),
        ))
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::PluginResolution);
    assert!(err.diagnostic().contains("stageOptions.subdir"));
    assert!(project.leftovers().is_empty());
}
