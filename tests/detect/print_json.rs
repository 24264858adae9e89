use crate::common::command::{kubernetes_files_with, kubernetes_repository, run_changed_objects};
use crate::common::fixture::RepoBuilder;
use assert_fs::TempDir;
use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::json;

#[rstest]
fn files_and_groups_as_json(
    kubernetes_repository: (TempDir, RepoBuilder, String),
) -> Result<(), Box<dyn std::error::Error>> {
    let (dir, mut repo, root) = kubernetes_repository;
    repo.set_remote_branch("origin/main", &root);

    let files = kubernetes_files_with(&[
        ("kubernetes/service-a/prod/deployment.yaml", ""),
        ("kubernetes/service-b/overlays/dev/patch.yaml", "env: dev2\n"),
    ]);
    let feature = repo.commit(&files, &[&root], "Retire service-a prod");
    repo.set_branch("feature", &feature);
    repo.switch("feature");
    repo.checkout_files(&files);

    let output = run_changed_objects(
        dir.path(),
        &["--group-by", "kubernetes/*", "--output", "json"],
    )
    .assert()
    .success()
    .get_output()
    .stdout
    .clone();
    let actual: serde_json::Value = serde_json::from_slice(&output)?;

    let deleted = json!({
        "name": "deployment.yaml",
        "path": "kubernetes/service-a/prod/deployment.yaml",
        "kind": "deleted",
        "parent_dir": { "path": "kubernetes/service-a/prod", "exist": false }
    });
    let modified = json!({
        "name": "patch.yaml",
        "path": "kubernetes/service-b/overlays/dev/patch.yaml",
        "kind": "modified",
        "parent_dir": { "path": "kubernetes/service-b/overlays/dev", "exist": true }
    });

    assert_eq!(
        actual,
        json!({
            "files": [deleted.clone(), modified.clone()],
            "dirs": [
                { "path": "kubernetes/service-a", "exist": true, "files": [deleted] },
                { "path": "kubernetes/service-b", "exist": true, "files": [modified] }
            ]
        })
    );

    Ok(())
}

#[rstest]
fn empty_diff_is_an_empty_document(
    kubernetes_repository: (TempDir, RepoBuilder, String),
) -> Result<(), Box<dyn std::error::Error>> {
    let (dir, mut repo, root) = kubernetes_repository;
    repo.set_remote_branch("origin/main", &root);
    let feature = repo.commit(&kubernetes_files_with(&[]), &[&root], "Empty change");
    repo.set_branch("feature", &feature);
    repo.switch("feature");

    let output = run_changed_objects(dir.path(), &["-o", "json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let actual: serde_json::Value = serde_json::from_slice(&output)?;

    assert_eq!(actual, json!({ "files": [], "dirs": [] }));

    Ok(())
}
