//! Classification of raw tree-diff entries into changes
//!
//! Each raw entry becomes at most one [`Change`]. Entries that cannot be classified
//! (no usable path) are logged and skipped so one bad record never aborts detection.

use crate::artifacts::detect::snapshot::{Action, RawChange};
use indexmap::IndexMap;
use indexmap::map::Entry;
use serde::Serialize;
use tracing::Span;

/// What happened to a path between the base and the current snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    Added,
    Deleted,
    Modified,
    Unknown,
}

impl Kind {
    /// Status letter used by the name-status view
    pub fn status_letter(&self) -> &'static str {
        match self {
            Kind::Added => "A",
            Kind::Deleted => "D",
            Kind::Modified => "M",
            Kind::Unknown => "?",
        }
    }
}

impl std::fmt::Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Kind::Added => "added",
            Kind::Deleted => "deleted",
            Kind::Modified => "modified",
            Kind::Unknown => "unknown",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    pub path: String,
    pub kind: Kind,
}

impl Change {
    pub fn new(path: impl Into<String>, kind: Kind) -> Self {
        Change {
            path: path.into(),
            kind,
        }
    }
}

pub struct ChangeClassifier {
    span: Span,
}

impl ChangeClassifier {
    pub fn new(span: Span) -> Self {
        ChangeClassifier { span }
    }

    /// Classify raw entries, keeping their order
    ///
    /// A path reported twice keeps its first position and takes the last kind.
    pub fn classify(&self, raw_changes: Vec<RawChange>) -> Vec<Change> {
        let _guard = self.span.enter();
        tracing::debug!(count = raw_changes.len(), "classifying raw changes");

        let mut changes = IndexMap::<String, Kind>::new();

        for raw_change in raw_changes {
            let Some(change) = Self::classify_one(&raw_change) else {
                tracing::warn!(?raw_change, "skipping change without a usable path");
                continue;
            };

            match changes.entry(change.path) {
                Entry::Occupied(mut entry) => {
                    tracing::warn!(
                        path = %entry.key(),
                        previous = %entry.get(),
                        kind = %change.kind,
                        "path reported more than once, keeping the last kind"
                    );
                    entry.insert(change.kind);
                }
                Entry::Vacant(entry) => {
                    entry.insert(change.kind);
                }
            }
        }

        changes
            .into_iter()
            .map(|(path, kind)| Change { path, kind })
            .collect()
    }

    fn classify_one(raw_change: &RawChange) -> Option<Change> {
        let (path, kind) = match raw_change.action {
            Action::Delete => (raw_change.old_path.as_ref(), Kind::Deleted),
            Action::Insert => (raw_change.new_path.as_ref(), Kind::Added),
            Action::Modify => (raw_change.new_path.as_ref(), Kind::Modified),
            Action::Unknown => (
                raw_change
                    .new_path
                    .as_ref()
                    .or(raw_change.old_path.as_ref()),
                Kind::Unknown,
            ),
        };

        path.filter(|path| !path.is_empty())
            .map(|path| Change::new(path.clone(), kind))
    }
}
