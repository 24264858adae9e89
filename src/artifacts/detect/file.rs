//! Result model: changed files, the directories they group into, and the diff holding both
//!
//! Paths are repository-relative with `/` separators. The repository root is `.`.

use crate::artifacts::detect::change::{Change, Kind};
use serde::Serialize;

/// Name of the repository root as a directory path
pub const ROOT_DIR: &str = ".";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParentDir {
    pub path: String,
    pub exist: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct File {
    pub name: String,
    pub path: String,
    pub kind: Kind,
    pub parent_dir: ParentDir,
}

impl File {
    pub fn from_change(change: &Change, parent_exists: bool) -> Self {
        File {
            name: basename(&change.path).to_string(),
            path: change.path.clone(),
            kind: change.kind,
            parent_dir: ParentDir {
                path: dirname(&change.path).to_string(),
                exist: parent_exists,
            },
        }
    }
}

/// A group directory and the changed files assigned to it, in discovery order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dir {
    pub path: String,
    pub exist: bool,
    pub files: Vec<File>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Diff {
    pub files: Vec<File>,
    pub dirs: Vec<Dir>,
}

/// Directory part of a path, `.` for top-level entries
pub fn dirname(path: &str) -> &str {
    match path.trim_end_matches('/').rsplit_once('/') {
        Some(("", _)) | None => ROOT_DIR,
        Some((dir, _)) => dir,
    }
}

/// Last segment of a path
pub fn basename(path: &str) -> &str {
    let path = path.trim_end_matches('/');
    path.rsplit_once('/').map_or(path, |(_, name)| name)
}

/// Number of segments in a directory path; the root has none
pub fn depth(dir: &str) -> usize {
    if dir == ROOT_DIR || dir.is_empty() {
        0
    } else {
        dir.split('/').filter(|segment| !segment.is_empty()).count()
    }
}

/// `dir` and each of its ancestors, deepest first, stopping before the root
///
/// The root itself only appears when `dir` is the root.
pub fn steps(dir: &str) -> Vec<&str> {
    if dir == ROOT_DIR || dir.is_empty() {
        return vec![ROOT_DIR];
    }

    let mut steps = vec![dir];
    let mut current = dir;
    while let Some((parent, _)) = current.rsplit_once('/') {
        if parent.is_empty() {
            break;
        }
        steps.push(parent);
        current = parent;
    }

    steps
}
