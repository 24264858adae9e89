use crate::areas::database::Database;
use crate::areas::refs::Refs;
use crate::areas::workspace::Workspace;
use crate::artifacts::branch::branch_name::REMOTES_PREFIX;
use crate::artifacts::branch::revision::Revision;
use crate::artifacts::detect::snapshot::{RawChange, SnapshotId, SnapshotSource};
use crate::artifacts::merge::bca_finder::BCAFinder;
use crate::artifacts::objects::object_id::ObjectId;
use anyhow::Context;
use std::cell::{RefCell, RefMut};
use std::path::{Path, PathBuf};

const GIT_DIR_NAME: &str = ".git";
const GITDIR_PREFIX: &str = "gitdir:";
const COMMONDIR_FILE_NAME: &str = "commondir";

/// Where a work tree keeps its git data
struct GitLayout {
    work_tree: PathBuf,
    /// Per-worktree directory holding HEAD
    git_dir: PathBuf,
    /// Shared directory holding objects, refs and packed-refs
    common_dir: PathBuf,
}

pub struct Repository {
    path: Box<Path>,
    writer: RefCell<Box<dyn std::io::Write>>,
    database: Database,
    workspace: Workspace,
    refs: Refs,
}

impl Repository {
    /// Open the repository containing `path`, searching parent directories for `.git`
    pub fn open(path: &Path, writer: Box<dyn std::io::Write>) -> anyhow::Result<Self> {
        let GitLayout {
            work_tree,
            git_dir,
            common_dir,
        } = Self::discover(path)
            .with_context(|| format!("cannot open repository at {}", path.display()))?;

        tracing::debug!(
            work_tree = %work_tree.display(),
            git_dir = %git_dir.display(),
            common_dir = %common_dir.display(),
            "opened repository"
        );

        let database = Database::new(common_dir.join("objects").into_boxed_path())?;
        let workspace = Workspace::new(work_tree.clone().into_boxed_path());
        let refs = Refs::new(git_dir.into_boxed_path(), common_dir.into_boxed_path());

        Ok(Repository {
            path: work_tree.into_boxed_path(),
            writer: RefCell::new(writer),
            database,
            workspace,
            refs,
        })
    }

    fn discover(path: &Path) -> anyhow::Result<GitLayout> {
        let start = path
            .canonicalize()
            .with_context(|| format!("path {} does not exist", path.display()))?;

        for dir in start.ancestors() {
            let candidate = dir.join(GIT_DIR_NAME);

            if candidate.is_dir() {
                return Self::layout(dir, candidate);
            }

            // worktrees and submodules point at their git directory from a `.git` file
            if candidate.is_file() {
                let content = std::fs::read_to_string(&candidate)
                    .with_context(|| format!("Unable to read {}", candidate.display()))?;
                let target = content
                    .trim()
                    .strip_prefix(GITDIR_PREFIX)
                    .with_context(|| format!("{} is not a gitdir file", candidate.display()))?
                    .trim();

                return Self::layout(dir, dir.join(target));
            }
        }

        anyhow::bail!("not a git repository (or any of the parent directories)")
    }

    /// Linked worktrees name their shared git directory in `commondir`, relative to the git dir
    fn layout(work_tree: &Path, git_dir: PathBuf) -> anyhow::Result<GitLayout> {
        let commondir_file = git_dir.join(COMMONDIR_FILE_NAME);

        let common_dir = if commondir_file.is_file() {
            let content = std::fs::read_to_string(&commondir_file)
                .with_context(|| format!("Unable to read {}", commondir_file.display()))?;
            git_dir.join(content.trim())
        } else {
            git_dir.clone()
        };

        Ok(GitLayout {
            work_tree: work_tree.to_path_buf(),
            git_dir,
            common_dir,
        })
    }

    /// Root of the work tree
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn writer(&'_ self) -> RefMut<'_, Box<dyn std::io::Write>> {
        self.writer.borrow_mut()
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn refs(&self) -> &Refs {
        &self.refs
    }

    fn peel(&self, oid: &ObjectId, name: &str) -> anyhow::Result<ObjectId> {
        self.database
            .peel_to_commit(oid)?
            .with_context(|| format!("{name} does not point at a commit"))
    }

    fn commit_tree(&self, oid: &SnapshotId) -> anyhow::Result<ObjectId> {
        let commit = self
            .database
            .parse_object_as_commit(oid)?
            .with_context(|| format!("object {oid} is not a commit"))?;

        Ok(commit.tree_oid().clone())
    }
}

impl SnapshotSource for Repository {
    fn resolve_head(&self) -> anyhow::Result<SnapshotId> {
        let head = self
            .refs
            .read_head()?
            .context("cannot resolve HEAD: the current branch has no commits yet")?;

        self.peel(&head, "HEAD")
    }

    fn resolve_branch_name(&self, snapshot: &SnapshotId) -> anyhow::Result<Option<String>> {
        let current_ref = self.refs.current_ref()?;

        if let Some(branch) = current_ref.branch_name()
            && self.refs.read_ref_path(current_ref.as_ref_path())?.as_ref() == Some(snapshot)
        {
            return Ok(Some(branch.to_string()));
        }

        Ok(self
            .refs
            .list_branches()?
            .into_iter()
            .find(|(_, tip)| tip == snapshot)
            .map(|(branch, _)| branch))
    }

    fn resolve_remote_ref(&self, name: &str) -> anyhow::Result<Option<SnapshotId>> {
        let ref_path = format!("{REMOTES_PREFIX}{name}");

        self.refs
            .read_ref_path(&ref_path)?
            .map(|oid| self.peel(&oid, &ref_path))
            .transpose()
    }

    fn resolve_revision(&self, revision: &str) -> anyhow::Result<SnapshotId> {
        Revision::try_parse(revision)?
            .resolve(self)
            .with_context(|| format!("cannot resolve revision {revision}"))
    }

    fn resolve_merge_base(&self, rev_a: &str, rev_b: &str) -> anyhow::Result<Vec<SnapshotId>> {
        let a = self.resolve_revision(rev_a)?;
        let b = self.resolve_revision(rev_b)?;

        let finder = BCAFinder::new(|oid: &ObjectId| self.database.slim_commit(oid));
        finder.find_best_common_ancestors(&a, &b)
    }

    fn diff_trees(
        &self,
        base: &SnapshotId,
        current: &SnapshotId,
    ) -> anyhow::Result<Vec<RawChange>> {
        let base_tree = self.commit_tree(base)?;
        let current_tree = self.commit_tree(current)?;

        self.database
            .tree_diff(Some(&base_tree), Some(&current_tree))
    }
}
