use crate::common::command::{kubernetes_files_with, kubernetes_repository, run_changed_objects};
use crate::common::fixture::RepoBuilder;
use assert_fs::TempDir;
use predicates::prelude::predicate;
use rstest::rstest;

#[rstest]
fn compare_feature_branch_with_remote_default(
    kubernetes_repository: (TempDir, RepoBuilder, String),
) -> Result<(), Box<dyn std::error::Error>> {
    let (dir, mut repo, root) = kubernetes_repository;
    repo.set_remote_branch("origin/main", &root);

    let feature = repo.commit(
        &kubernetes_files_with(&[
            ("kubernetes/service-a/prod/deployment.yaml", "replicas: 5\n"),
            ("kubernetes/service-b/overlays/prod/patch.yaml", ""),
        ]),
        &[&root],
        "Scale prod, drop service-b prod",
    );
    repo.set_branch("feature/scale", &feature);
    repo.switch("feature/scale");

    run_changed_objects(dir.path(), &[])
        .assert()
        .success()
        .stdout(predicate::eq(
            "kubernetes/service-a/prod/deployment.yaml\n\
             kubernetes/service-b/overlays/prod/patch.yaml\n",
        ));

    Ok(())
}

#[rstest]
fn detached_head_compares_with_remote_default(
    kubernetes_repository: (TempDir, RepoBuilder, String),
) -> Result<(), Box<dyn std::error::Error>> {
    let (dir, mut repo, root) = kubernetes_repository;
    repo.set_remote_branch("origin/main", &root);

    let detached = repo.commit(
        &kubernetes_files_with(&[("README.md", "# detached\n")]),
        &[&root],
        "Detached work",
    );
    repo.detach(&detached);

    run_changed_objects(dir.path(), &[])
        .assert()
        .success()
        .stdout(predicate::eq("README.md\n"));

    Ok(())
}

#[rstest]
fn repository_is_found_from_a_subdirectory_or_with_repo_flag(
    kubernetes_repository: (TempDir, RepoBuilder, String),
) -> Result<(), Box<dyn std::error::Error>> {
    let (dir, mut repo, root) = kubernetes_repository;

    let head = repo.commit(
        &kubernetes_files_with(&[("README.md", "# changed\n")]),
        &[&root],
        "Touch readme",
    );
    repo.set_branch("main", &head);

    run_changed_objects(&dir.path().join("kubernetes/service-a"), &[])
        .assert()
        .success()
        .stdout(predicate::eq("README.md\n"));

    let elsewhere = TempDir::new()?;
    run_changed_objects(elsewhere.path(), &["-C", &dir.path().to_string_lossy()])
        .assert()
        .success()
        .stdout(predicate::eq("README.md\n"));

    Ok(())
}
