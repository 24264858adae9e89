//! Snapshot access seam
//!
//! The detection engine never reads repository storage directly. Everything it needs
//! from version control goes through [`SnapshotSource`], which the git-backed
//! `Repository` implements and tests replace with in-memory fakes.

use crate::artifacts::objects::object_id::ObjectId;

/// Identifier of an immutable snapshot (a commit)
pub type SnapshotId = ObjectId;

/// What the underlying tree diff did to a path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Insert,
    Delete,
    Modify,
    /// Anything the tree diff reports that is none of the above
    Unknown,
}

/// One entry of a tree-level diff, before classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawChange {
    pub action: Action,
    pub old_path: Option<String>,
    pub new_path: Option<String>,
}

impl RawChange {
    pub fn insert(path: impl Into<String>) -> Self {
        RawChange {
            action: Action::Insert,
            old_path: None,
            new_path: Some(path.into()),
        }
    }

    pub fn delete(path: impl Into<String>) -> Self {
        RawChange {
            action: Action::Delete,
            old_path: Some(path.into()),
            new_path: None,
        }
    }

    pub fn modify(path: impl Into<String>) -> Self {
        let path = path.into();
        RawChange {
            action: Action::Modify,
            old_path: Some(path.clone()),
            new_path: Some(path),
        }
    }
}

/// Read-only view of the repository history used by the detector
pub trait SnapshotSource {
    /// Snapshot currently checked out
    fn resolve_head(&self) -> anyhow::Result<SnapshotId>;

    /// Name of the branch whose tip equals `snapshot`, if any
    fn resolve_branch_name(&self, snapshot: &SnapshotId) -> anyhow::Result<Option<String>>;

    /// Tip of `refs/remotes/<name>`, `None` when the ref does not exist
    fn resolve_remote_ref(&self, name: &str) -> anyhow::Result<Option<SnapshotId>>;

    /// Any revision expression (`HEAD^`, `main~2`, abbreviated ids...)
    fn resolve_revision(&self, revision: &str) -> anyhow::Result<SnapshotId>;

    /// Best common ancestors of two revisions, in a deterministic order
    fn resolve_merge_base(&self, rev_a: &str, rev_b: &str) -> anyhow::Result<Vec<SnapshotId>>;

    /// Changed paths between the root trees of two snapshots, in ascending path order
    fn diff_trees(&self, base: &SnapshotId, current: &SnapshotId)
    -> anyhow::Result<Vec<RawChange>>;
}
