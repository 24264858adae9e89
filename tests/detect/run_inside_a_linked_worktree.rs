use crate::common::command::{kubernetes_files_with, kubernetes_repository, run_changed_objects};
use crate::common::fixture::RepoBuilder;
use assert_fs::TempDir;
use predicates::prelude::predicate;
use rstest::rstest;

/// Main checkout stays on `main`, a linked worktree checks out `feature`
fn feature_worktree(
    repo: &mut RepoBuilder,
    root: &str,
) -> Result<TempDir, Box<dyn std::error::Error>> {
    repo.set_remote_branch("origin/main", root);

    let files = kubernetes_files_with(&[
        ("kubernetes/service-a/dev/deployment.yaml", "replicas: 2\n"),
        ("kubernetes/service-c/dev/deployment.yaml", "replicas: 1\n"),
    ]);
    let feature = repo.commit(&files, &[root], "Add service-c");
    repo.set_branch("feature", &feature);

    let worktree = TempDir::new()?;
    repo.add_worktree(worktree.path(), "feature", "feature", &files);

    Ok(worktree)
}

#[rstest]
fn worktree_reads_objects_and_refs_from_the_shared_git_dir(
    kubernetes_repository: (TempDir, RepoBuilder, String),
) -> Result<(), Box<dyn std::error::Error>> {
    let (dir, mut repo, root) = kubernetes_repository;
    let worktree = feature_worktree(&mut repo, &root)?;

    run_changed_objects(worktree.path(), &["--name-status"])
        .assert()
        .success()
        .stdout(predicate::eq(
            "M\tkubernetes/service-a/dev/deployment.yaml\n\
             A\tkubernetes/service-c/dev/deployment.yaml\n",
        ));

    // the main checkout keeps its own HEAD
    repo.set_branch("release", &root);
    repo.switch("release");
    run_changed_objects(dir.path(), &[])
        .assert()
        .success()
        .stdout(predicate::eq(""));

    Ok(())
}

#[rstest]
fn worktree_sees_packed_refs_and_packed_objects(
    kubernetes_repository: (TempDir, RepoBuilder, String),
) -> Result<(), Box<dyn std::error::Error>> {
    let (_dir, mut repo, root) = kubernetes_repository;
    let worktree = feature_worktree(&mut repo, &root)?;
    repo.pack_refs();
    repo.pack_objects();

    run_changed_objects(worktree.path(), &["--dirname", "--merge-base", "main"])
        .assert()
        .success()
        .stdout(predicate::eq(
            "kubernetes/service-a/dev\n\
             kubernetes/service-c/dev\n",
        ));

    Ok(())
}

#[rstest]
fn worktree_checkout_is_the_work_tree_for_dir_existence(
    kubernetes_repository: (TempDir, RepoBuilder, String),
) -> Result<(), Box<dyn std::error::Error>> {
    let (dir, mut repo, root) = kubernetes_repository;
    let worktree = feature_worktree(&mut repo, &root)?;
    // the main checkout never had service-c
    assert!(!dir.path().join("kubernetes/service-c").exists());

    run_changed_objects(worktree.path(), &["--dirname", "--dir-exist", "true"])
        .assert()
        .success()
        .stdout(predicate::eq(
            "kubernetes/service-a/dev\n\
             kubernetes/service-c/dev\n",
        ));

    Ok(())
}
