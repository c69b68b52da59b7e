//! End-to-end bundle scenarios: resolve → materialize → render.

#![cfg(unix)]

mod common;

use std::path::{Path, PathBuf};

use common::{is_symlink, ProjectFixture};
use serde_json::json;
use stagehand::{ArtifactRule, Bundler, Processor, StagehandError};

#[test]
fn sql_template_scenario_renders_into_deploy_root() {
    let project = ProjectFixture::new();
    project.write("src/a.sql", "select <% ctx.env.X %>");
    let ctx = project.context();

    let report = Bundler::new(
        ctx.clone(),
        vec![ArtifactRule::new("src/*.sql", "./").with_processor(Processor::Templates)],
    )
    .with_template_context(json!({ "ctx": { "env": { "X": "1" } } }))
    .run()
    .unwrap();

    assert!(report.is_success());
    let rendered = ctx.deploy_root().join("a.sql");
    assert_eq!(std::fs::read_to_string(&rendered).unwrap(), "select 1");
    assert!(
        !is_symlink(&rendered),
        "a rendered file must be a plain file"
    );
}

#[test]
fn bundling_twice_yields_identical_trees() {
    let project = ProjectFixture::new();
    project
        .write("app/a.sql", "select 1")
        .write("app/sub/b.sql", "select 2")
        .write("manifest.yml", "name: demo");
    let ctx = project.context();
    let rules = vec![
        ArtifactRule::new("app", "app"),
        ArtifactRule::new("manifest.yml", "manifest.yml"),
    ];

    Bundler::new(ctx.clone(), rules.clone()).run().unwrap();
    let first = snapshot_tree(ctx.deploy_root());

    Bundler::new(ctx.clone(), rules).run().unwrap();
    let second = snapshot_tree(ctx.deploy_root());

    assert_eq!(first, second);
}

#[test]
fn rebundle_clears_stale_files() {
    let project = ProjectFixture::new();
    project.write("app/a.sql", "select 1");
    let ctx = project.context();
    let rules = vec![ArtifactRule::new("app", "app")];

    Bundler::new(ctx.clone(), rules.clone()).run().unwrap();
    std::fs::write(ctx.deploy_root().join("stale.txt"), "leftover").unwrap();

    Bundler::new(ctx.clone(), rules).run().unwrap();
    assert!(!ctx.deploy_root().join("stale.txt").exists());
}

#[test]
fn every_symlink_in_deploy_root_resolves_to_a_file() {
    let project = ProjectFixture::new();
    project
        .write("app/a.sql", "select 1")
        .write("app/sub/b.sql", "select 2");
    // A symlinked directory in the project tree must not survive as one.
    std::os::unix::fs::symlink(project.root().join("app"), project.root().join("alias")).unwrap();
    let ctx = project.context();

    Bundler::new(
        ctx.clone(),
        vec![
            ArtifactRule::new("app", "app"),
            ArtifactRule::new("alias", "aliased"),
        ],
    )
    .run()
    .unwrap();

    let mut stack = vec![ctx.deploy_root().to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in std::fs::read_dir(&dir).unwrap() {
            let path = entry.unwrap().path();
            if is_symlink(&path) {
                let resolved = std::fs::canonicalize(&path).unwrap();
                assert!(
                    resolved.is_file(),
                    "symlink {} resolves to a non-file",
                    path.display()
                );
            } else if path.is_dir() {
                stack.push(path);
            }
        }
    }
}

#[test]
fn escaping_destination_fails_before_any_filesystem_change() {
    let project = ProjectFixture::new();
    project.write("src/a.sql", "select 1");
    let ctx = project.context();

    let err = Bundler::new(
        ctx.clone(),
        vec![ArtifactRule::new("src/a.sql", "../../escape.sql")],
    )
    .run()
    .unwrap_err();

    assert!(matches!(err, StagehandError::ContainmentViolation { .. }));
    assert!(!ctx.deploy_root().exists());
    assert!(!project.root().join("escape.sql").exists());
}

#[test]
fn destination_collision_detected_before_materialization() {
    let project = ProjectFixture::new();
    project
        .write("a/out.txt", "first")
        .write("b/out.txt", "second");
    let ctx = project.context();

    let err = Bundler::new(
        ctx.clone(),
        vec![
            ArtifactRule::new("a/out.txt", "out.txt"),
            ArtifactRule::new("b/out.txt", "out.txt"),
        ],
    )
    .run()
    .unwrap_err();

    assert!(matches!(err, StagehandError::DestinationCollision { .. }));
    assert!(
        !ctx.deploy_root().exists(),
        "collisions must abort before the deploy root is touched"
    );
}

#[test]
fn mixed_syntax_file_fails_and_keeps_its_symlink() {
    let project = ProjectFixture::new();
    project.write("src/both.sql", "select <% x %> from &{ y }");
    let ctx = project.context();

    let report = Bundler::new(
        ctx.clone(),
        vec![ArtifactRule::new("src/*.sql", "./").with_processor(Processor::Templates)],
    )
    .with_template_context(json!({ "x": "1", "y": "2" }))
    .run()
    .unwrap();

    assert!(!report.is_success());
    assert_eq!(report.templates.failures.len(), 1);
    assert!(matches!(
        report.templates.failures[0].error,
        StagehandError::AmbiguousSyntax { .. }
    ));

    let dest = ctx.deploy_root().join("both.sql");
    assert!(is_symlink(&dest), "the original symlink must remain");
    assert_eq!(
        std::fs::read_to_string(&dest).unwrap(),
        "select <% x %> from &{ y }"
    );
}

#[test]
fn legacy_syntax_renders_like_current() {
    let project = ProjectFixture::new();
    project.write("src/legacy.sql", "select &{ ctx.env.X }");
    let ctx = project.context();

    let report = Bundler::new(
        ctx.clone(),
        vec![ArtifactRule::new("src/*.sql", "./").with_processor(Processor::Templates)],
    )
    .with_template_context(json!({ "ctx": { "env": { "X": "1" } } }))
    .run()
    .unwrap();

    assert!(report.is_success());
    assert_eq!(
        std::fs::read_to_string(ctx.deploy_root().join("legacy.sql")).unwrap(),
        "select 1"
    );
}

#[test]
fn undefined_variable_is_file_scoped() {
    let project = ProjectFixture::new();
    project
        .write("src/good.sql", "select <% ctx.env.X %>")
        .write("src/bad.sql", "select <% ctx.env.MISSING %>");
    let ctx = project.context();

    let report = Bundler::new(
        ctx.clone(),
        vec![ArtifactRule::new("src/*.sql", "./").with_processor(Processor::Templates)],
    )
    .with_template_context(json!({ "ctx": { "env": { "X": "1" } } }))
    .run()
    .unwrap();

    assert!(!report.is_success());
    assert_eq!(report.templates.rendered, vec![ctx.deploy_root().join("good.sql")]);
    assert_eq!(report.templates.failures.len(), 1);
    assert!(matches!(
        report.templates.failures[0].error,
        StagehandError::UndefinedVariable { .. }
    ));
    // The failed file keeps its original symlinked content.
    assert_eq!(
        std::fs::read_to_string(ctx.deploy_root().join("bad.sql")).unwrap(),
        "select <% ctx.env.MISSING %>"
    );
}

#[test]
fn directory_rule_preserves_structure() {
    let project = ProjectFixture::new();
    project
        .write("streamlit/app.py", "import streamlit")
        .write("streamlit/pages/one.py", "page = 1");
    let ctx = project.context();

    Bundler::new(ctx.clone(), vec![ArtifactRule::new("streamlit", "ui/")])
        .run()
        .unwrap();

    assert!(ctx.deploy_root().join("ui/streamlit").is_dir());
    assert!(is_symlink(&ctx.deploy_root().join("ui/streamlit/app.py")));
    assert!(is_symlink(
        &ctx.deploy_root().join("ui/streamlit/pages/one.py")
    ));
}

/// Sorted (relative path, symlink target or file marker) pairs for tree
/// comparison.
fn snapshot_tree(root: &Path) -> Vec<(PathBuf, String)> {
    let mut snapshot = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in std::fs::read_dir(&dir).unwrap() {
            let path = entry.unwrap().path();
            let rel = path.strip_prefix(root).unwrap().to_path_buf();
            if is_symlink(&path) {
                let target = std::fs::read_link(&path).unwrap();
                snapshot.push((rel, format!("-> {}", target.display())));
            } else if path.is_dir() {
                snapshot.push((rel, "dir".to_string()));
                stack.push(path);
            } else {
                snapshot.push((rel, "file".to_string()));
            }
        }
    }
    snapshot.sort();
    snapshot
}
