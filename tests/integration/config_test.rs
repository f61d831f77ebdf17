//! Integration tests for configuration inputs.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use serde_json::json;

use nutra_core::config::{ConfigInput, ConfigSetter};
use nutra_core::error::ErrorKind;
use nutra_core::result::NutraResult;

use nutra_plugin::PluginExport;

use crate::helpers::{TestProject, resolver_with};

#[tokio::test]
async fn test_run_from_toml_file() {
    let project = TestProject::new(&[("src/a.js", "a"), ("src/b.js", "b")]);
    let config = project.file("nutra.config.toml");
    std::fs::write(
        &config,
        format!(
            "files = [\"src/*.js\"]\nbasePath = {:?}\n",
            project.path().to_string_lossy()
        ),
    )
    .unwrap();

    let summary = project
        .orchestrator(resolver_with(Vec::new()))
        .run(config)
        .await
        .unwrap();

    assert_eq!(summary.files, 2);
}

#[tokio::test]
async fn test_missing_file_is_an_invalid_path() {
    let project = TestProject::new(&[]);
    let missing: PathBuf = project.file("nutra.config.json");

    let err = project
        .orchestrator(resolver_with(Vec::new()))
        .run(missing)
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::InvalidOptionsPath);
    assert!(err.message.contains("nutra.config.json"));
    assert!(project.leftovers().is_empty());
}

#[tokio::test]
async fn test_run_from_producer() {
    let project = TestProject::new(&[("src/a.js", "a")]);
    let options = project.options(&["src/*.js"], json!({}));

    let producer = ConfigInput::producer(move |setter: &mut ConfigSetter| -> NutraResult<()> {
        setter.set(options.clone());
        Ok(())
    });

    let summary = project
        .orchestrator(resolver_with(Vec::new()))
        .run(producer)
        .await
        .unwrap();

    assert_eq!(summary.files, 1);
}

#[tokio::test]
async fn test_absolute_paths_use_patterns_as_written() {
    let project = TestProject::new(&[("src/a.js", "a")]);
    let pattern = format!("{}/src/*.js", project.path().to_string_lossy());

    let summary = project
        .orchestrator(resolver_with(Vec::new()))
        .run(json!({"files": [pattern], "absolutePaths": true}))
        .await
        .unwrap();

    assert_eq!(summary.files, 1);
}

#[tokio::test]
async fn test_absolute_paths_anchor_relative_patterns_to_cwd() {
    let project = TestProject::new(&[]);
    let seen: Arc<Mutex<Vec<PathBuf>>> = Arc::default();
    let files = Arc::clone(&seen);
    let loader = PluginExport::new().module_loader(move |_, ctx, _| {
        files.lock().unwrap().extend(ctx.files().iter().cloned());
        Ok(())
    });

    let summary = project
        .orchestrator(resolver_with(vec![("inspect", loader)]))
        .run(json!({
            "files": ["src/*.rs"],
            "absolutePaths": true,
            "moduleloader": "inspect"
        }))
        .await
        .unwrap();

    let cwd = std::env::current_dir().unwrap();
    let seen = seen.lock().unwrap();
    assert_eq!(summary.files, seen.len());
    assert!(seen.iter().all(|file| file.is_absolute()));
    assert!(seen.contains(&cwd.join("src/main.rs")));
}
