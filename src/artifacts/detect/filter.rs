//! Filter pipeline over a grouped diff
//!
//! Stages run in a fixed order, each on the survivors of the previous one:
//!
//! 1. path prefixes (a file survives when its path starts with any prefix, a group
//!    when its path does or when it contains a prefix)
//! 2. ignore globs (a path survives when it matches none)
//! 3. change kinds (files only; groups keep their matching files)
//! 4. existence of the parent directory for files, of the group itself for groups
//!
//! Afterwards groups only keep files that survived, empty groups are dropped, and a
//! file whose group was dropped is dropped too. Files that never joined a group are
//! judged on their own.

use crate::artifacts::detect::change::Kind;
use crate::artifacts::detect::file::{Diff, Dir, File, ROOT_DIR};
use crate::artifacts::detect::glob::GlobMatcher;
use bitflags::bitflags;
use std::collections::HashSet;
use tracing::Span;

bitflags! {
    /// Change kinds to keep; empty keeps every kind
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct KindFilter: u8 {
        const ADDED = 0b001;
        const DELETED = 0b010;
        const MODIFIED = 0b100;
    }
}

impl KindFilter {
    pub fn admits(&self, kind: Kind) -> bool {
        if self.is_empty() {
            return true;
        }

        match kind {
            Kind::Added => self.contains(KindFilter::ADDED),
            Kind::Deleted => self.contains(KindFilter::DELETED),
            Kind::Modified => self.contains(KindFilter::MODIFIED),
            Kind::Unknown => false,
        }
    }
}

impl From<Kind> for KindFilter {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Added => KindFilter::ADDED,
            Kind::Deleted => KindFilter::DELETED,
            Kind::Modified => KindFilter::MODIFIED,
            Kind::Unknown => KindFilter::empty(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DirExistFilter {
    /// Keep entries whose directory exists
    Exists,
    /// Keep entries whose directory is gone
    Missing,
    #[default]
    All,
}

impl DirExistFilter {
    fn admits(&self, exist: bool) -> bool {
        match self {
            DirExistFilter::Exists => exist,
            DirExistFilter::Missing => !exist,
            DirExistFilter::All => true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FilterOptions {
    pub prefixes: Vec<String>,
    pub ignores: Vec<String>,
    pub kinds: KindFilter,
    pub dir_exist: DirExistFilter,
}

pub struct FilterPipeline<'a> {
    matcher: &'a dyn GlobMatcher,
    span: Span,
}

impl<'a> FilterPipeline<'a> {
    pub fn new(matcher: &'a dyn GlobMatcher, span: Span) -> Self {
        FilterPipeline { matcher, span }
    }

    pub fn apply(&self, diff: Diff, options: &FilterOptions) -> Diff {
        let _guard = self.span.enter();

        let grouped = diff
            .dirs
            .iter()
            .flat_map(|dir| dir.files.iter().map(|file| file.path.clone()))
            .collect::<HashSet<_>>();

        let files = diff
            .files
            .into_iter()
            .filter(|file| Self::file_in_scope(&file.path, &options.prefixes))
            .filter(|file| !self.is_ignored(&file.path, &options.ignores))
            .filter(|file| options.kinds.admits(file.kind))
            .filter(|file| options.dir_exist.admits(file.parent_dir.exist))
            .collect::<Vec<_>>();

        let dirs = diff
            .dirs
            .into_iter()
            .filter(|dir| Self::dir_in_scope(&dir.path, &options.prefixes))
            .filter(|dir| !self.is_ignored(&dir.path, &options.ignores))
            .filter_map(|dir| Self::retain_kinds(dir, options.kinds))
            .filter(|dir| options.dir_exist.admits(dir.exist))
            .collect::<Vec<_>>();

        let diff = Self::reconcile(files, dirs, &grouped);
        tracing::debug!(
            files = diff.files.len(),
            dirs = diff.dirs.len(),
            "filters applied"
        );

        diff
    }

    fn file_in_scope(path: &str, prefixes: &[String]) -> bool {
        prefixes.is_empty() || prefixes.iter().any(|prefix| path.starts_with(prefix.as_str()))
    }

    /// A group is in scope when it lies under a prefix or a prefix lies inside it
    fn dir_in_scope(path: &str, prefixes: &[String]) -> bool {
        path == ROOT_DIR
            || prefixes.is_empty()
            || prefixes.iter().any(|prefix| {
                path.starts_with(prefix.as_str())
                    || prefix
                        .strip_prefix(path)
                        .is_some_and(|rest| rest.starts_with('/'))
            })
    }

    fn is_ignored(&self, path: &str, ignores: &[String]) -> bool {
        ignores
            .iter()
            .any(|pattern| match self.matcher.matches(pattern, path) {
                Ok(matched) => matched,
                Err(err) => {
                    tracing::warn!(pattern, path, error = %err, "ignore pattern excludes path");
                    true
                }
            })
    }

    fn retain_kinds(mut dir: Dir, kinds: KindFilter) -> Option<Dir> {
        dir.files.retain(|file| kinds.admits(file.kind));
        (!dir.files.is_empty()).then_some(dir)
    }

    fn reconcile(files: Vec<File>, dirs: Vec<Dir>, grouped: &HashSet<String>) -> Diff {
        let surviving = files
            .iter()
            .map(|file| file.path.as_str())
            .collect::<HashSet<_>>();

        let dirs = dirs
            .into_iter()
            .filter_map(|mut dir| {
                dir.files
                    .retain(|file| surviving.contains(file.path.as_str()));
                (!dir.files.is_empty()).then_some(dir)
            })
            .collect::<Vec<_>>();

        let in_surviving_dir = dirs
            .iter()
            .flat_map(|dir| dir.files.iter().map(|file| file.path.as_str()))
            .collect::<HashSet<_>>();

        let files = files
            .iter()
            .filter(|file| {
                !grouped.contains(&file.path) || in_surviving_dir.contains(file.path.as_str())
            })
            .cloned()
            .collect();

        Diff { files, dirs }
    }
}
