//! Grouping of changed paths into directories
//!
//! Every change yields a [`File`]. Its [`Dir`] assignment depends on the strategy:
//!
//! - [`GroupStrategy::ParentDir`]: the directory containing the file
//! - [`GroupStrategy::Patterns`]: among the ancestors of the file's directory (itself
//!   included, the root excluded) that match any pattern, the one with the fewest
//!   segments. Ties go to the first match in pattern order then ancestor order.
//! - [`GroupStrategy::Marker`]: the nearest ancestor holding a marker file
//!
//! A change nothing matches stays in the file list but joins no group. Groups are kept
//! in the order they were first discovered.

use crate::artifacts::detect::change::Change;
use crate::artifacts::detect::file::{Diff, Dir, File, depth, dirname, steps};
use crate::artifacts::detect::glob::GlobMatcher;
use crate::artifacts::detect::marker::MarkerLocator;
use crate::artifacts::detect::work_tree::WorkTree;
use indexmap::IndexMap;
use std::cell::RefCell;
use std::collections::HashMap;
use tracing::Span;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum GroupStrategy {
    #[default]
    ParentDir,
    Patterns(Vec<String>),
    Marker(String),
}

impl GroupStrategy {
    /// Pattern grouping when patterns are given, parent directories otherwise
    pub fn from_patterns(patterns: Vec<String>) -> Self {
        if patterns.is_empty() {
            GroupStrategy::ParentDir
        } else {
            GroupStrategy::Patterns(patterns)
        }
    }
}

pub struct GroupingEngine<'a> {
    matcher: &'a dyn GlobMatcher,
    work_tree: &'a dyn WorkTree,
    span: Span,
    existence: RefCell<HashMap<String, bool>>,
}

impl<'a> GroupingEngine<'a> {
    pub fn new(matcher: &'a dyn GlobMatcher, work_tree: &'a dyn WorkTree, span: Span) -> Self {
        GroupingEngine {
            matcher,
            work_tree,
            span,
            existence: RefCell::new(HashMap::new()),
        }
    }

    pub fn group(&self, changes: &[Change], strategy: &GroupStrategy) -> Diff {
        let _guard = self.span.enter();
        tracing::debug!(changes = changes.len(), ?strategy, "grouping changes");

        let marker_locator = match strategy {
            GroupStrategy::Marker(marker) => {
                Some(MarkerLocator::new(marker, self.matcher, self.work_tree))
            }
            _ => None,
        };

        let mut files = Vec::with_capacity(changes.len());
        let mut dirs = IndexMap::<String, Dir>::new();

        for change in changes {
            let parent = dirname(&change.path);
            let file = File::from_change(change, self.exists(parent));

            let group_key = match strategy {
                GroupStrategy::ParentDir => Some(parent.to_string()),
                GroupStrategy::Patterns(patterns) => self.pattern_group(parent, patterns),
                GroupStrategy::Marker(_) => marker_locator
                    .as_ref()
                    .and_then(|locator| locator.locate(parent)),
            };

            match group_key {
                Some(key) => {
                    tracing::trace!(path = %change.path, group = %key, "grouped");
                    dirs.entry(key)
                        .or_insert_with_key(|key| Dir {
                            path: key.clone(),
                            exist: self.exists(key),
                            files: Vec::new(),
                        })
                        .files
                        .push(file.clone());
                }
                None => tracing::debug!(path = %change.path, "no group matched, left ungrouped"),
            }

            files.push(file);
        }

        Diff {
            files,
            dirs: dirs.into_values().collect(),
        }
    }

    fn pattern_group(&self, dir: &str, patterns: &[String]) -> Option<String> {
        let steps = steps(dir);

        patterns
            .iter()
            .flat_map(|pattern| {
                steps
                    .iter()
                    .copied()
                    .filter(move |step| self.pattern_matches(pattern, step))
            })
            .min_by_key(|step| depth(step))
            .map(str::to_string)
    }

    fn pattern_matches(&self, pattern: &str, step: &str) -> bool {
        match self.matcher.matches(pattern, step) {
            Ok(matched) => matched,
            Err(err) => {
                tracing::warn!(pattern, step, error = %err, "group pattern treated as not matching");
                false
            }
        }
    }

    fn exists(&self, path: &str) -> bool {
        if let Some(exists) = self.existence.borrow().get(path) {
            return *exists;
        }

        let exists = self.work_tree.exists(path);
        self.existence.borrow_mut().insert(path.to_string(), exists);

        exists
    }
}
