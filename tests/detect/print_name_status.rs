use crate::common::command::{kubernetes_files_with, kubernetes_repository, run_changed_objects};
use crate::common::fixture::RepoBuilder;
use assert_fs::TempDir;
use predicates::prelude::predicate;
use rstest::rstest;

#[rstest]
fn status_letters_precede_paths(
    kubernetes_repository: (TempDir, RepoBuilder, String),
) -> Result<(), Box<dyn std::error::Error>> {
    let (dir, mut repo, root) = kubernetes_repository;
    repo.set_remote_branch("origin/main", &root);

    let files = kubernetes_files_with(&[
        ("README.md", ""),
        ("docs/index.md", "# docs\n"),
        ("kubernetes/service-a/dev/deployment.yaml", "replicas: 2\n"),
    ]);
    let feature = repo.commit(&files, &[&root], "Move the readme");
    repo.set_branch("feature", &feature);
    repo.switch("feature");
    repo.checkout_files(&files);

    run_changed_objects(dir.path(), &["--name-status"])
        .assert()
        .success()
        .stdout(predicate::eq(
            "D\tREADME.md\n\
             A\tdocs/index.md\n\
             M\tkubernetes/service-a/dev/deployment.yaml\n",
        ));

    Ok(())
}

#[rstest]
fn name_status_and_dirname_conflict(
    kubernetes_repository: (TempDir, RepoBuilder, String),
) -> Result<(), Box<dyn std::error::Error>> {
    let (dir, _repo, _root) = kubernetes_repository;

    run_changed_objects(dir.path(), &["--name-status", "--dirname"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));

    Ok(())
}
