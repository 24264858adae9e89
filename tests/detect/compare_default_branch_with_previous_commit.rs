use crate::common::command::{kubernetes_files_with, kubernetes_repository, run_changed_objects};
use crate::common::fixture::RepoBuilder;
use assert_fs::TempDir;
use predicates::prelude::predicate;
use rstest::rstest;

#[rstest]
fn compare_default_branch_with_previous_commit(
    kubernetes_repository: (TempDir, RepoBuilder, String),
) -> Result<(), Box<dyn std::error::Error>> {
    let (dir, mut repo, root) = kubernetes_repository;

    let files = kubernetes_files_with(&[
        ("docs/guide.md", "how to deploy\n"),
        ("kubernetes/service-a/dev/deployment.yaml", "replicas: 2\n"),
    ]);
    let head = repo.commit(&files, &[&root], "Scale dev and add a guide");
    repo.set_branch("main", &head);
    repo.checkout_files(&files);

    run_changed_objects(dir.path(), &[])
        .assert()
        .success()
        .stdout(predicate::eq(
            "docs/guide.md\nkubernetes/service-a/dev/deployment.yaml\n",
        ));

    Ok(())
}

#[rstest]
fn custom_default_branch_is_honoured(
    kubernetes_repository: (TempDir, RepoBuilder, String),
) -> Result<(), Box<dyn std::error::Error>> {
    let (dir, mut repo, root) = kubernetes_repository;

    let files = kubernetes_files_with(&[("CHANGELOG.md", "v2\n")]);
    let head = repo.commit(&files, &[&root], "Add changelog");
    repo.set_branch("trunk", &head);
    repo.switch("trunk");

    run_changed_objects(dir.path(), &["--default-branch", "trunk"])
        .assert()
        .success()
        .stdout(predicate::eq("CHANGELOG.md\n"));

    run_changed_objects(dir.path(), &[])
        .env("CHANGED_OBJECTS_DEFAULT_BRANCH", "trunk")
        .assert()
        .success()
        .stdout(predicate::eq("CHANGELOG.md\n"));

    Ok(())
}

#[rstest]
fn ancestor_revisions_resolve_through_first_parents(
    kubernetes_repository: (TempDir, RepoBuilder, String),
) -> Result<(), Box<dyn std::error::Error>> {
    let (dir, mut repo, root) = kubernetes_repository;

    let second = repo.commit(
        &kubernetes_files_with(&[("a.txt", "a\n")]),
        &[&root],
        "Second",
    );
    let third = repo.commit(
        &kubernetes_files_with(&[("a.txt", "a\n"), ("b.txt", "b\n")]),
        &[&second],
        "Third",
    );
    repo.set_branch("main", &third);
    repo.set_branch("feature", &third);
    repo.switch("feature");
    repo.set_remote_branch("origin/main", &third);

    // merge base of main~2 and the branch is the root commit
    run_changed_objects(dir.path(), &["--merge-base", "main~2"])
        .assert()
        .success()
        .stdout(predicate::eq("a.txt\nb.txt\n"));

    run_changed_objects(dir.path(), &["--merge-base", "HEAD^"])
        .assert()
        .success()
        .stdout(predicate::eq("b.txt\n"));

    Ok(())
}
