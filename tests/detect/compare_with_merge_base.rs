use crate::common::command::{kubernetes_files_with, kubernetes_repository, run_changed_objects};
use crate::common::fixture::RepoBuilder;
use assert_fs::TempDir;
use predicates::prelude::predicate;
use rstest::rstest;

/// History:
///
/// ```text
///   root --- main (service-b dev)
///      \
///       feature (service-a dev)
/// ```
fn diverged(repo: &mut RepoBuilder, root: &str) -> (String, String) {
    let main = repo.commit(
        &kubernetes_files_with(&[("kubernetes/service-b/overlays/dev/patch.yaml", "env: dev2\n")]),
        &[root],
        "Tune service-b",
    );
    let feature = repo.commit(
        &kubernetes_files_with(&[("kubernetes/service-a/dev/deployment.yaml", "replicas: 4\n")]),
        &[root],
        "Scale service-a",
    );

    repo.set_branch("main", &main);
    repo.set_remote_branch("origin/main", &main);
    repo.set_branch("feature", &feature);
    repo.switch("feature");

    (main, feature)
}

#[rstest]
fn remote_default_includes_changes_made_on_main(
    kubernetes_repository: (TempDir, RepoBuilder, String),
) -> Result<(), Box<dyn std::error::Error>> {
    let (dir, mut repo, root) = kubernetes_repository;
    diverged(&mut repo, &root);

    run_changed_objects(dir.path(), &[])
        .assert()
        .success()
        .stdout(predicate::eq(
            "kubernetes/service-a/dev/deployment.yaml\n\
             kubernetes/service-b/overlays/dev/patch.yaml\n",
        ));

    Ok(())
}

#[rstest]
#[case("origin/main")]
#[case("main")]
#[case("v1")]
fn merge_base_limits_the_diff_to_the_branch(
    kubernetes_repository: (TempDir, RepoBuilder, String),
    #[case] merge_base: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let (dir, mut repo, root) = kubernetes_repository;
    let (main, _) = diverged(&mut repo, &root);
    repo.tag("v1", &main);

    run_changed_objects(dir.path(), &["--merge-base", merge_base])
        .assert()
        .success()
        .stdout(predicate::eq("kubernetes/service-a/dev/deployment.yaml\n"));

    Ok(())
}

#[rstest]
fn merge_base_accepts_abbreviated_object_ids(
    kubernetes_repository: (TempDir, RepoBuilder, String),
) -> Result<(), Box<dyn std::error::Error>> {
    let (dir, mut repo, root) = kubernetes_repository;
    let (main, _) = diverged(&mut repo, &root);

    run_changed_objects(dir.path(), &["--merge-base", &main[..8]])
        .assert()
        .success()
        .stdout(predicate::eq("kubernetes/service-a/dev/deployment.yaml\n"));

    Ok(())
}

#[rstest]
fn merge_base_after_merging_main_into_the_branch(
    kubernetes_repository: (TempDir, RepoBuilder, String),
) -> Result<(), Box<dyn std::error::Error>> {
    let (dir, mut repo, root) = kubernetes_repository;
    let (main, feature) = diverged(&mut repo, &root);

    let merged = repo.commit(
        &kubernetes_files_with(&[
            ("kubernetes/service-a/dev/deployment.yaml", "replicas: 4\n"),
            ("kubernetes/service-b/overlays/dev/patch.yaml", "env: dev2\n"),
            ("kubernetes/service-a/prod/deployment.yaml", "replicas: 6\n"),
        ]),
        &[&feature, &main],
        "Merge main and scale prod",
    );
    repo.set_branch("feature", &merged);

    // main is now an ancestor of the branch, so it is the merge base itself
    run_changed_objects(dir.path(), &["--merge-base", "main"])
        .assert()
        .success()
        .stdout(predicate::eq(
            "kubernetes/service-a/dev/deployment.yaml\n\
             kubernetes/service-a/prod/deployment.yaml\n",
        ));

    Ok(())
}

#[rstest]
#[case("config")]
#[case("description")]
fn branch_named_like_a_git_dir_file(
    kubernetes_repository: (TempDir, RepoBuilder, String),
    #[case] branch: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let (dir, mut repo, root) = kubernetes_repository;
    let (main, _) = diverged(&mut repo, &root);
    std::fs::write(repo.git_dir().join("config"), "[core]\n\tbare = false\n")?;
    std::fs::write(repo.git_dir().join("description"), "Unnamed repository\n")?;
    repo.set_branch(branch, &main);

    run_changed_objects(dir.path(), &["--merge-base", branch])
        .assert()
        .success()
        .stdout(predicate::eq("kubernetes/service-a/dev/deployment.yaml\n"));

    Ok(())
}
