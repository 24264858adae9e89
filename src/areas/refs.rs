//! Git references (branches, HEAD, tags, remote-tracking refs)
//!
//! References are human-readable names pointing to commits. They can be:
//! - Direct: Containing a commit SHA-1
//! - Symbolic: Pointing to another reference (e.g., HEAD -> refs/heads/main)
//!
//! ## Storage
//!
//! - Loose refs: one text file per ref under the git directory, holding either a
//!   40-character SHA-1 or `ref: <path>`
//! - `packed-refs`: `<sha1> <refname>` lines written by `git pack-refs` and `git clone`.
//!   Lines starting with `#` are comments and lines starting with `^` carry the peeled
//!   target of the tag above them; both are skipped. Loose refs shadow packed ones.
//!
//! A linked worktree keeps `HEAD` and the other pseudo-refs in its own git directory,
//! while everything under `refs/` and `packed-refs` is shared through the common directory.

use crate::artifacts::branch::branch_name::{BranchName, HEADS_PREFIX, SymRefName};
use crate::artifacts::objects::object_id::ObjectId;
use anyhow::Context;
use derive_new::new;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Read-only view of the references of a repository
#[derive(Debug, new)]
pub struct Refs {
    /// Path to the git directory (typically `.git`, `.git/worktrees/<name>` for a worktree)
    path: Box<Path>,
    /// Directory holding the shared refs, equal to `path` outside linked worktrees
    common_path: Box<Path>,
}

/// Prefix of symbolic ref files
const SYMREF_PREFIX: &str = "ref: ";

/// Name of the HEAD reference
pub const HEAD_REF_NAME: &str = "HEAD";

/// Prefix of every ref stored in the common directory
const REFS_PREFIX: &str = "refs/";

/// Symbolic refs pointing at each other deeper than this are treated as a loop
const MAX_SYMREF_DEPTH: usize = 10;

/// Internal representation of a reference value
#[derive(Debug, Clone)]
enum SymRefOrOid {
    /// Symbolic reference pointing to another ref
    SymRef { sym_ref_name: SymRefName },
    /// Direct object ID
    Oid(ObjectId),
}

impl SymRefOrOid {
    fn read_symref_or_oid(path: &Path) -> anyhow::Result<Option<SymRefOrOid>> {
        if !path.is_file() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read ref file at {:?}", path))?;
        let content = content.trim();

        if content.is_empty() {
            return Ok(None);
        }

        if let Some(target) = content.strip_prefix(SYMREF_PREFIX) {
            Ok(Some(SymRefOrOid::SymRef {
                sym_ref_name: SymRefName::new(target.trim().to_string()),
            }))
        } else {
            let oid = ObjectId::try_parse(content.to_string())
                .with_context(|| format!("invalid ref file at {:?}", path))?;
            Ok(Some(SymRefOrOid::Oid(oid)))
        }
    }
}

impl Refs {
    /// Get the ref HEAD ultimately points to
    ///
    /// Follows symbolic references to the last name in the chain. For a checked-out
    /// branch this is `refs/heads/<branch>`, for a detached HEAD it is `HEAD` itself.
    pub fn current_ref(&self) -> anyhow::Result<SymRefName> {
        let mut current = SymRefName::new(HEAD_REF_NAME.to_string());

        for _ in 0..MAX_SYMREF_DEPTH {
            let ref_content =
                SymRefOrOid::read_symref_or_oid(&self.ref_file(current.as_ref_path()))?;

            match ref_content {
                Some(SymRefOrOid::SymRef { sym_ref_name }) => current = sym_ref_name,
                Some(SymRefOrOid::Oid(_)) | None => return Ok(current),
            }
        }

        anyhow::bail!("symbolic ref loop starting at {HEAD_REF_NAME}")
    }

    /// Object ID HEAD resolves to, `None` on an unborn branch
    pub fn read_head(&self) -> anyhow::Result<Option<ObjectId>> {
        self.read_ref_path(HEAD_REF_NAME)
    }

    /// Resolve a user-supplied ref name using git's lookup order
    ///
    /// # Returns
    ///
    /// The object ID of the first candidate that exists, `None` when no candidate does
    pub fn read_ref(&self, branch_name: &BranchName) -> anyhow::Result<Option<ObjectId>> {
        for candidate in branch_name.lookup_candidates() {
            if let Some(oid) = self.read_ref_path(&candidate)? {
                return Ok(Some(oid));
            }
        }

        Ok(None)
    }

    /// Resolve a full ref path (`refs/remotes/origin/main`), following symbolic refs
    pub fn read_ref_path(&self, ref_path: &str) -> anyhow::Result<Option<ObjectId>> {
        let packed_refs = self.packed_refs()?;
        let mut current = ref_path.to_string();

        for _ in 0..MAX_SYMREF_DEPTH {
            match SymRefOrOid::read_symref_or_oid(&self.ref_file(&current))? {
                Some(SymRefOrOid::SymRef { sym_ref_name }) => {
                    current = sym_ref_name.as_ref_path().to_string();
                }
                Some(SymRefOrOid::Oid(oid)) => return Ok(Some(oid)),
                None => return Ok(packed_refs.get(&current).cloned()),
            }
        }

        anyhow::bail!("symbolic ref loop starting at {ref_path}")
    }

    /// All local branches and their tips, sorted by branch name
    pub fn list_branches(&self) -> anyhow::Result<Vec<(String, ObjectId)>> {
        let mut branches = self
            .packed_refs()?
            .into_iter()
            .filter_map(|(name, oid)| {
                name.strip_prefix(HEADS_PREFIX)
                    .map(|branch| (branch.to_string(), oid))
            })
            .collect::<BTreeMap<_, _>>();

        for sym_ref in self.list_refs(&self.heads_path()) {
            let Some(branch) = sym_ref.branch_name() else {
                continue;
            };
            if let Some(oid) = self.read_ref_path(sym_ref.as_ref_path())? {
                branches.insert(branch.to_string(), oid);
            }
        }

        Ok(branches.into_iter().collect())
    }

    fn list_refs(&self, path: &Path) -> Vec<SymRefName> {
        WalkDir::new(path)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter_map(|entry| {
                let relative_path = entry.path().strip_prefix(self.common_path.as_ref()).ok()?;
                let components = relative_path
                    .components()
                    .map(|component| component.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>();
                Some(SymRefName::new(components.join("/")))
            })
            .collect()
    }

    /// Parse `packed-refs`, keyed by full ref name
    fn packed_refs(&self) -> anyhow::Result<BTreeMap<String, ObjectId>> {
        let path = self.packed_refs_path();
        if !path.is_file() {
            return Ok(BTreeMap::new());
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read packed refs at {:?}", path))?;

        content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with('^'))
            .map(|line| {
                let (oid, name) = line
                    .split_once(' ')
                    .with_context(|| format!("malformed packed ref line {line:?}"))?;
                Ok((name.trim().to_string(), ObjectId::try_parse(oid.to_string())?))
            })
            .collect()
    }

    /// Loose ref file for a ref name: pseudo-refs are per worktree, `refs/*` is shared
    fn ref_file(&self, ref_path: &str) -> PathBuf {
        if ref_path.starts_with(REFS_PREFIX) {
            self.common_path.join(ref_path)
        } else {
            self.path.join(ref_path)
        }
    }

    pub fn refs_path(&self) -> Box<Path> {
        self.common_path.join("refs").into_boxed_path()
    }

    pub fn heads_path(&self) -> Box<Path> {
        self.refs_path().join("heads").into_boxed_path()
    }

    pub fn packed_refs_path(&self) -> Box<Path> {
        self.common_path.join("packed-refs").into_boxed_path()
    }
}
