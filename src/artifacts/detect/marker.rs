//! Marker-file grouping
//!
//! A directory is a group when it holds a file whose name matches the marker glob
//! (`Chart.yaml`, `kustomization.{yaml,yml}`, ...). Changes group at the nearest such
//! directory at or above their parent, up to the repository root.

use crate::artifacts::detect::file::{ROOT_DIR, steps};
use crate::artifacts::detect::glob::GlobMatcher;
use crate::artifacts::detect::work_tree::WorkTree;
use std::cell::RefCell;
use std::collections::HashMap;

pub struct MarkerLocator<'a> {
    marker: &'a str,
    matcher: &'a dyn GlobMatcher,
    work_tree: &'a dyn WorkTree,
    seen: RefCell<HashMap<String, bool>>,
}

impl<'a> MarkerLocator<'a> {
    pub fn new(marker: &'a str, matcher: &'a dyn GlobMatcher, work_tree: &'a dyn WorkTree) -> Self {
        MarkerLocator {
            marker,
            matcher,
            work_tree,
            seen: RefCell::new(HashMap::new()),
        }
    }

    /// Nearest directory at or above `dir` holding a marker file
    ///
    /// Directories missing from the working tree are skipped, so a deleted directory
    /// resolves through its closest surviving ancestor.
    pub fn locate(&self, dir: &str) -> Option<String> {
        let mut candidates = steps(dir);
        if candidates.last() != Some(&ROOT_DIR) {
            candidates.push(ROOT_DIR);
        }

        candidates
            .into_iter()
            .find(|candidate| self.has_marker(candidate))
            .map(str::to_string)
    }

    fn has_marker(&self, dir: &str) -> bool {
        if let Some(found) = self.seen.borrow().get(dir) {
            return *found;
        }

        let found = self.scan(dir);
        self.seen.borrow_mut().insert(dir.to_string(), found);

        found
    }

    fn scan(&self, dir: &str) -> bool {
        if !self.work_tree.is_dir(dir) {
            return false;
        }

        let names = match self.work_tree.list_file_names(dir) {
            Ok(names) => names,
            Err(err) => {
                tracing::warn!(dir, error = %err, "cannot list directory, assuming no marker");
                return false;
            }
        };

        names
            .iter()
            .any(|name| match self.matcher.matches(self.marker, name) {
                Ok(matched) => matched,
                Err(err) => {
                    tracing::warn!(marker = self.marker, error = %err, "marker pattern never matches");
                    false
                }
            })
    }
}
