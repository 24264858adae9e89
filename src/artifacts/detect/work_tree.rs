//! Working tree seam
//!
//! Existence flags and marker lookups describe the checked-out files, not a snapshot.
//! The grouping engine reads them through [`WorkTree`] so tests can use in-memory trees.

pub trait WorkTree {
    /// Whether the repository-relative `path` exists; `.` names the root
    fn exists(&self, path: &str) -> bool;

    fn is_dir(&self, path: &str) -> bool;

    /// Names of the regular files directly inside the directory `path`
    fn list_file_names(&self, path: &str) -> anyhow::Result<Vec<String>>;
}
