//! Working tree on disk
//!
//! Grouped directories report whether they still exist after the change, which is a
//! property of the checked-out files rather than of any snapshot. Paths handed to the
//! workspace are repository-relative and use `/` separators.

use crate::artifacts::detect::work_tree::WorkTree;
use anyhow::Context;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct Workspace {
    path: Box<Path>,
}

impl Workspace {
    pub fn new(path: Box<Path>) -> Self {
        Workspace { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn resolve(&self, relative: &str) -> PathBuf {
        match relative {
            "" | "." => self.path.to_path_buf(),
            relative => relative
                .split('/')
                .filter(|segment| !segment.is_empty())
                .fold(self.path.to_path_buf(), |path, segment| path.join(segment)),
        }
    }

    /// Whether `relative` exists in the working tree; `""` and `"."` name the root
    pub fn exists(&self, relative: &str) -> bool {
        self.resolve(relative).exists()
    }

    pub fn is_dir(&self, relative: &str) -> bool {
        self.resolve(relative).is_dir()
    }

    /// Names of the regular files directly inside `relative`, sorted
    pub fn list_file_names(&self, relative: &str) -> anyhow::Result<Vec<String>> {
        let dir_path = self.resolve(relative);

        let mut names = std::fs::read_dir(&dir_path)
            .with_context(|| format!("Unable to list directory {}", dir_path.display()))?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_ok_and(|file_type| file_type.is_file()))
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect::<Vec<_>>();
        names.sort();

        Ok(names)
    }
}

impl WorkTree for Workspace {
    fn exists(&self, path: &str) -> bool {
        Workspace::exists(self, path)
    }

    fn is_dir(&self, path: &str) -> bool {
        Workspace::is_dir(self, path)
    }

    fn list_file_names(&self, path: &str) -> anyhow::Result<Vec<String>> {
        Workspace::list_file_names(self, path)
    }
}
