//! Object database
//!
//! Read-only access to every object of the repository. Loose objects
//! (`objects/xx/yyyy...`, zlib-compressed) are consulted first, then packfiles.

use crate::areas::pack::Pack;
use crate::artifacts::detect::snapshot::RawChange;
use crate::artifacts::diff::tree_diff::TreeDiff;
use crate::artifacts::objects::commit::{Commit, SlimCommit};
use crate::artifacts::objects::object::RawObject;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::artifacts::objects::tag::Tag;
use crate::artifacts::objects::tree::Tree;
use anyhow::Context;
use bytes::Bytes;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};

/// Tags pointing at tags deeper than this are treated as corrupt
const MAX_PEEL_DEPTH: usize = 16;

#[derive(Debug)]
pub struct Database {
    path: Box<Path>,
    packs: Vec<Pack>,
}

impl Database {
    /// Open the object database at `path` (typically `.git/objects`), indexing its packs
    pub fn new(path: Box<Path>) -> anyhow::Result<Self> {
        let packs = Self::open_packs(&path.join("pack"))?;

        Ok(Database { path, packs })
    }

    fn open_packs(pack_dir: &Path) -> anyhow::Result<Vec<Pack>> {
        if !pack_dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut idx_paths = std::fs::read_dir(pack_dir)
            .with_context(|| format!("Unable to list packs in {}", pack_dir.display()))?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "idx"))
            .collect::<Vec<_>>();
        idx_paths.sort();

        idx_paths.iter().map(|idx_path| Pack::open(idx_path)).collect()
    }

    /// Changed leaf paths between two trees (or the trees of two commits), by path
    pub fn tree_diff(
        &self,
        old_oid: Option<&ObjectId>,
        new_oid: Option<&ObjectId>,
    ) -> anyhow::Result<Vec<RawChange>> {
        let mut tree_diff = TreeDiff::new(self);
        tree_diff.compare_oids(old_oid, new_oid, "")?;
        Ok(tree_diff.into_raw_changes())
    }

    /// Load an object, loose or packed, with its header stripped
    pub fn load(&self, object_id: &ObjectId) -> anyhow::Result<RawObject> {
        let object_path = self.loose_path(object_id);
        if object_path.is_file() {
            return self.read_loose_object(object_path);
        }

        for pack in &self.packs {
            if let Some(offset) = pack.find_offset(object_id)? {
                return pack.read_at(offset, &|base| self.load(base));
            }
        }

        anyhow::bail!("object {object_id} not found")
    }

    pub fn contains(&self, object_id: &ObjectId) -> anyhow::Result<bool> {
        if self.loose_path(object_id).is_file() {
            return Ok(true);
        }

        for pack in &self.packs {
            if pack.contains(object_id)? {
                return Ok(true);
            }
        }

        Ok(false)
    }

    pub fn parse_object_as_tree(&self, object_id: &ObjectId) -> anyhow::Result<Option<Tree>> {
        let object = self.load(object_id)?;

        match object.object_type {
            ObjectType::Tree => Ok(Some(object.parse()?)),
            _ => Ok(None),
        }
    }

    pub fn parse_object_as_commit(&self, object_id: &ObjectId) -> anyhow::Result<Option<Commit>> {
        let object = self.load(object_id)?;

        match object.object_type {
            ObjectType::Commit => Ok(Some(
                object
                    .parse()
                    .with_context(|| format!("Invalid commit object {object_id}"))?,
            )),
            _ => Ok(None),
        }
    }

    /// Follow annotated tags down to the commit they point at
    ///
    /// # Returns
    ///
    /// The commit id, or `None` when the chain ends at a tree or blob
    pub fn peel_to_commit(&self, object_id: &ObjectId) -> anyhow::Result<Option<ObjectId>> {
        let mut current = object_id.clone();

        for _ in 0..MAX_PEEL_DEPTH {
            let object = self.load(&current)?;

            match object.object_type {
                ObjectType::Commit => return Ok(Some(current)),
                ObjectType::Tag => current = object.parse::<Tag>()?.target().clone(),
                ObjectType::Tree | ObjectType::Blob => return Ok(None),
            }
        }

        anyhow::bail!("tag chain starting at {object_id} is too deep")
    }

    /// Parents and commit time of a commit, as the merge base search needs them
    pub fn slim_commit(&self, object_id: &ObjectId) -> anyhow::Result<SlimCommit> {
        let commit = self
            .parse_object_as_commit(object_id)?
            .with_context(|| format!("object {object_id} is not a commit"))?;

        Ok(commit.to_slim(object_id.clone()))
    }

    fn loose_path(&self, object_id: &ObjectId) -> PathBuf {
        self.path.join(object_id.to_path())
    }

    fn read_loose_object(&self, object_path: PathBuf) -> anyhow::Result<RawObject> {
        let object_content = std::fs::read(&object_path).context(format!(
            "Unable to read object file {}",
            object_path.display()
        ))?;

        let object_content = Self::decompress(object_content.into())
            .with_context(|| format!("Corrupt object file {}", object_path.display()))?;
        let mut object_reader = Cursor::new(object_content);
        let object_type = ObjectType::parse_object_type(&mut object_reader)?;

        let header_length = object_reader.position() as usize;
        let content = object_reader.into_inner().slice(header_length..);

        Ok(RawObject::new(object_type, content))
    }

    fn decompress(data: Bytes) -> anyhow::Result<Bytes> {
        let mut decoder = flate2::read::ZlibDecoder::new(&*data);
        let mut decompressed_content = Vec::new();
        decoder
            .read_to_end(&mut decompressed_content)
            .context("Unable to decompress object content")?;

        Ok(decompressed_content.into())
    }

    /// Find all objects whose OID starts with the given prefix.
    ///
    /// Used to resolve abbreviated OIDs to their full form. Both loose objects and
    /// pack indexes are searched.
    ///
    /// # Arguments
    ///
    /// * `prefix` - A hexadecimal string prefix of at least 2 characters
    ///
    /// # Returns
    ///
    /// All matching ObjectIds, sorted and without duplicates. More than one match
    /// means the prefix is ambiguous.
    pub fn find_objects_by_prefix(&self, prefix: &str) -> anyhow::Result<Vec<ObjectId>> {
        let prefix = prefix.to_ascii_lowercase();
        if prefix.len() < 2 || !prefix.chars().all(|c| c.is_ascii_hexdigit()) {
            anyhow::bail!("invalid object id prefix {prefix:?}");
        }

        let mut matches = Vec::new();

        let (dir_name, file_prefix) = prefix.split_at(2);
        let dir_path = self.path.join(dir_name);

        if dir_path.is_dir() {
            for entry in std::fs::read_dir(&dir_path)? {
                let entry = entry?;
                let file_name = entry.file_name();
                let file_name_str = file_name.to_string_lossy();

                if file_name_str.starts_with(file_prefix)
                    && let Ok(oid) = ObjectId::try_parse(format!("{dir_name}{file_name_str}"))
                {
                    matches.push(oid);
                }
            }
        }

        for pack in &self.packs {
            matches.extend(pack.find_objects_by_prefix(&prefix)?);
        }

        matches.sort();
        matches.dedup();

        Ok(matches)
    }

    /// Get the type of an object
    pub fn get_object_type(&self, object_id: &ObjectId) -> anyhow::Result<ObjectType> {
        Ok(self.load(object_id)?.object_type)
    }
}
