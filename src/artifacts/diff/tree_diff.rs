use crate::areas::database::Database;
use crate::artifacts::database::database_entry::DatabaseEntry;
use crate::artifacts::detect::snapshot::RawChange;
use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::artifacts::objects::tree::Tree;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub enum TreeChangeType {
    Added(DatabaseEntry),
    Deleted(DatabaseEntry),
    Modified {
        old: DatabaseEntry,
        new: DatabaseEntry,
    },
}

impl TreeChangeType {
    pub fn from_entries(old: Option<DatabaseEntry>, new: Option<DatabaseEntry>) -> Option<Self> {
        match (old, new) {
            (None, Some(new)) => Some(TreeChangeType::Added(new)),
            (Some(old), None) => Some(TreeChangeType::Deleted(old)),
            (Some(old), Some(new)) if old != new => Some(TreeChangeType::Modified { old, new }),
            _ => None,
        }
    }

    fn to_raw_change(&self, path: String) -> RawChange {
        match self {
            TreeChangeType::Added(_) => RawChange::insert(path),
            TreeChangeType::Deleted(_) => RawChange::delete(path),
            TreeChangeType::Modified { .. } => RawChange::modify(path),
        }
    }
}

/// Changes keyed by slash-separated path, relative to the root tree
pub type ChangeSet = BTreeMap<String, TreeChangeType>;
pub type TreeEntryMap = BTreeMap<String, DatabaseEntry>;

/// Recursive comparison of two trees
///
/// Subtrees with identical ids are never inflated. Only leaf entries (blobs, symlinks and
/// gitlinks) end up in the change set; a file replaced by a directory shows up as a
/// deletion of the file plus additions for everything under the directory.
#[derive(Debug)]
pub struct TreeDiff<'r> {
    database: &'r Database,
    change_set: ChangeSet,
}

impl<'r> TreeDiff<'r> {
    pub fn new(database: &'r Database) -> Self {
        TreeDiff {
            database,
            change_set: BTreeMap::new(),
        }
    }

    /// Flatten the change set into ascending path order
    pub fn into_raw_changes(self) -> Vec<RawChange> {
        self.change_set
            .into_iter()
            .map(|(path, change)| change.to_raw_change(path))
            .collect()
    }

    pub fn compare_oids(
        &mut self,
        old: Option<&ObjectId>,
        new: Option<&ObjectId>,
        prefix: &str,
    ) -> anyhow::Result<()> {
        if old == new {
            return Ok(());
        }

        let old_tree_entries = self.inflate_oid_to_tree_entries(old)?;
        let new_tree_entries = self.inflate_oid_to_tree_entries(new)?;

        self.detect_deletions(&old_tree_entries, &new_tree_entries, prefix)?;
        self.detect_additions(&old_tree_entries, &new_tree_entries, prefix)?;

        Ok(())
    }

    fn inflate_oid_to_tree_entries(&self, oid: Option<&ObjectId>) -> anyhow::Result<TreeEntryMap> {
        match oid {
            None => Ok(BTreeMap::new()),
            Some(oid) => Ok(self
                .inflate_oid_to_tree(oid)?
                .into_entries()
                .collect::<BTreeMap<_, _>>()),
        }
    }

    fn inflate_oid_to_tree(&self, oid: &ObjectId) -> anyhow::Result<Tree> {
        let object = self.database.load(oid)?;

        match object.object_type {
            ObjectType::Tree => object.parse::<Tree>(),
            ObjectType::Commit => {
                let commit = object.parse::<Commit>()?;
                self.inflate_oid_to_tree(commit.tree_oid())
            }
            _ => Err(anyhow::anyhow!("Invalid tree object {oid}")),
        }
    }

    fn join(prefix: &str, name: &str) -> String {
        if prefix.is_empty() {
            name.to_string()
        } else {
            format!("{prefix}/{name}")
        }
    }

    fn detect_deletions(
        &mut self,
        old: &TreeEntryMap,
        new: &TreeEntryMap,
        prefix: &str,
    ) -> anyhow::Result<()> {
        for (name, entry) in old {
            let path = Self::join(prefix, name);
            let other = new.get(name);

            if let Some(other) = other
                && other == entry
            {
                continue;
            }

            let tree_a_oid = entry.is_tree().then_some(&entry.oid);
            let tree_b_oid = other.filter(|other| other.is_tree()).map(|other| &other.oid);

            self.compare_oids(tree_a_oid, tree_b_oid, &path)?;

            let blob_a = (!entry.is_tree()).then(|| entry.clone());
            let blob_b = other.filter(|other| !other.is_tree()).cloned();

            if let Some(change_type) = TreeChangeType::from_entries(blob_a, blob_b) {
                self.change_set.insert(path, change_type);
            }
        }

        Ok(())
    }

    fn detect_additions(
        &mut self,
        old: &TreeEntryMap,
        new: &TreeEntryMap,
        prefix: &str,
    ) -> anyhow::Result<()> {
        for (name, entry) in new {
            let path = Self::join(prefix, name);

            if old.contains_key(name) {
                continue;
            }

            if entry.is_tree() {
                self.compare_oids(None, Some(&entry.oid), &path)?;
            } else {
                self.change_set
                    .insert(path, TreeChangeType::Added(entry.clone()));
            }
        }

        Ok(())
    }
}
