//! Integration tests for preprocessing through the built-in stage loader.

use std::sync::{Arc, Mutex};

use serde_json::json;

use nutra_plugin::prelude::*;

use crate::helpers::{EventLog, TestProject, resolver_with};

/// A preprocessor appending `/* <tag> */` to every source it owns.
fn tagging(tag: &'static str, log: &EventLog) -> PluginExport {
    let log = log.clone();
    PluginExport::new().preprocessor(move |hooks, _, _| {
        let log = log.clone();
        hooks.on_file_load = Some(file_load_hook(move |file: FileSource| {
            let log = log.clone();
            async move {
                log.push(format!("{tag}:{}", file.key));
                Ok(format!("{} /* {tag} */", file.source))
            }
        }));
        Ok(())
    })
}

/// A reporter snapshotting the staged tree when it loads.
fn snapshot(staged: Arc<Mutex<Vec<(String, String)>>>) -> PluginExport {
    PluginExport::new().reporter(move |hooks, ctx, _| {
        let ctx = ctx.clone();
        let staged = Arc::clone(&staged);
        hooks.on_load = Some(lifecycle_hook(move || {
            let ctx = ctx.clone();
            let staged = Arc::clone(&staged);
            async move {
                let mut files = Vec::new();
                for entry in walk(ctx.working_dir()) {
                    let key = entry
                        .strip_prefix(ctx.working_dir())
                        .unwrap()
                        .to_string_lossy()
                        .replace('\\', "/");
                    files.push((key, tokio::fs::read_to_string(&entry).await?));
                }
                files.sort();
                *staged.lock().unwrap() = files;
                Ok::<(), NutraError>(())
            }
        }));
        Ok(())
    })
}

fn walk(dir: &std::path::Path) -> Vec<std::path::PathBuf> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).unwrap() {
        let path = entry.unwrap().path();
        if path.is_dir() {
            files.extend(walk(&path));
        } else {
            files.push(path);
        }
    }
    files
}

#[tokio::test]
async fn test_stage_loader_writes_preprocessed_sources() {
    let project = TestProject::new(&[
        ("src/lib/a.js", "let a = 1;"),
        ("test/a.spec.js", "expect(a);"),
        ("docs/readme.md", "# docs"),
    ]);
    let log = EventLog::default();
    let staged = Arc::new(Mutex::new(Vec::new()));
    let orchestrator = project.orchestrator(resolver_with(vec![
        ("babel", tagging("babel", &log)),
        ("coverage", tagging("coverage", &log)),
        ("snapshot", snapshot(Arc::clone(&staged))),
    ]));

    orchestrator
        .run(project.options(
            &["src/**/*.js", "test/**/*.js", "docs/*.md"],
            json!({
                "preprocessors": {
                    "src/**/*.js": ["babel", "coverage"],
                    "test/**/*.js": ["babel"]
                },
                "reporters": ["snapshot"]
            }),
        ))
        .await
        .unwrap();

    assert_eq!(
        *staged.lock().unwrap(),
        vec![
            ("docs/readme.md".to_string(), "# docs".to_string()),
            (
                "src/lib/a.js".to_string(),
                "let a = 1; /* babel */ /* coverage */".to_string()
            ),
            (
                "test/a.spec.js".to_string(),
                "expect(a); /* babel */".to_string()
            ),
        ]
    );

    let mut calls = log.entries();
    calls.sort();
    assert_eq!(
        calls,
        vec!["babel:src/lib/a.js", "babel:test/a.spec.js", "coverage:src/lib/a.js"]
    );
}

#[tokio::test]
async fn test_rewritten_fields_reach_later_preprocessors() {
    let project = TestProject::new(&[("src/a.ts", "const a: number = 1;")]);
    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&seen);

    let typescript = PluginExport::new().preprocessor(|hooks, _, _| {
        hooks.on_file_load = Some(file_load_hook(|file: FileSource| async move {
            Ok(FileRewrite::default()
                .source(file.source.replace(": number", ""))
                .filename(file.filename.replace(".ts", ".js")))
        }));
        Ok(())
    });
    let inspector = PluginExport::new().preprocessor(move |hooks, _, _| {
        let recorded = Arc::clone(&recorded);
        hooks.on_file_load = Some(file_load_hook(move |file: FileSource| {
            let recorded = Arc::clone(&recorded);
            async move {
                recorded.lock().unwrap().push(file);
                Ok(())
            }
        }));
        Ok(())
    });
    let orchestrator = project.orchestrator(resolver_with(vec![
        ("typescript", typescript),
        ("inspector", inspector),
    ]));

    orchestrator
        .run(project.options(
            &["src/*.ts"],
            json!({"preprocessors": {"src/*.ts": ["typescript", "inspector"]}}),
        ))
        .await
        .unwrap();

    let filename = project.file("src/a.js").to_string_lossy().into_owned();
    assert_eq!(
        *seen.lock().unwrap(),
        vec![FileSource::new("const a = 1;", filename, "src/a.ts")]
    );
}

#[tokio::test]
async fn test_stage_subdir_option() {
    let project = TestProject::new(&[("src/a.js", "a")]);
    let staged = Arc::new(Mutex::new(Vec::new()));
    let orchestrator = project.orchestrator(resolver_with(vec![(
        "snapshot",
        snapshot(Arc::clone(&staged)),
    )]));

    orchestrator
        .run(project.options(
            &["src/*.js"],
            json!({"stageOptions": {"subdir": "staged"}, "reporters": "snapshot"}),
        ))
        .await
        .unwrap();

    assert_eq!(
        *staged.lock().unwrap(),
        vec![("staged/src/a.js".to_string(), "a".to_string())]
    );
}

#[tokio::test]
async fn test_failing_preprocessor_aborts_staging() {
    let project = TestProject::new(&[("src/a.js", "a")]);
    let broken = PluginExport::new().preprocessor(|hooks, _, _| {
        hooks.on_file_load = Some(file_load_hook(|_: FileSource| async {
            Err::<String, _>(NutraError::internal("syntax error"))
        }));
        Ok(())
    });
    let orchestrator = project.orchestrator(resolver_with(vec![("babel", broken)]));

    let err = orchestrator
        .run(project.options(&["src/*.js"], json!({"preprocessors": {"src/**": ["babel"]}})))
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::HookExecution);
    assert!(err.diagnostic().contains("syntax error"));
    assert!(project.leftovers().is_empty());
}
