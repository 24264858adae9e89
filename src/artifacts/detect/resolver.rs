//! Choosing the two snapshots to compare
//!
//! The current snapshot is always HEAD. The base depends on where HEAD is:
//!
//! - on the default branch: HEAD's first parent, so the latest commit is diffed
//! - elsewhere: the remote-tracking `origin/<default branch>`
//!
//! An explicit merge-base revision then replaces the base with the best common
//! ancestor of that revision and the current branch. When history has several best
//! common ancestors, the newest by committer time is used (ties by object id).

use crate::artifacts::detect::snapshot::{SnapshotId, SnapshotSource};
use anyhow::Context;
use tracing::Span;

/// Remote whose tracking branch is the base outside the default branch
const DEFAULT_REMOTE: &str = "origin";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotPair {
    pub base: SnapshotId,
    pub current: SnapshotId,
}

pub struct RevisionResolver<'a> {
    source: &'a dyn SnapshotSource,
    span: Span,
}

impl<'a> RevisionResolver<'a> {
    pub fn new(source: &'a dyn SnapshotSource, span: Span) -> Self {
        RevisionResolver { source, span }
    }

    pub fn resolve(
        &self,
        default_branch: &str,
        merge_base: Option<&str>,
    ) -> anyhow::Result<SnapshotPair> {
        let _guard = self.span.enter();

        let current = self.source.resolve_head()?;
        let branch = self.source.resolve_branch_name(&current)?;
        tracing::debug!(branch = ?branch, %current, "resolved HEAD");

        let mut base = if branch.as_deref() == Some(default_branch) {
            tracing::debug!("on the default branch, comparing with the previous commit");
            self.source
                .resolve_revision("HEAD^")
                .context("cannot resolve the previous commit of HEAD")?
        } else {
            let remote_name = format!("{DEFAULT_REMOTE}/{default_branch}");
            tracing::debug!(remote = %remote_name, "comparing with the remote-tracking branch");
            self.source
                .resolve_remote_ref(&remote_name)?
                .with_context(|| format!("remote ref refs/remotes/{remote_name} not found"))?
        };

        if let Some(merge_base) = merge_base.filter(|revision| !revision.is_empty()) {
            let current_branch = branch.as_deref().unwrap_or("HEAD");
            tracing::debug!(merge_base, current_branch, "comparing with the merge base");

            let candidates = self
                .source
                .resolve_merge_base(merge_base, current_branch)?;
            if candidates.len() > 1 {
                tracing::debug!(
                    count = candidates.len(),
                    "several best common ancestors, using the newest"
                );
            }

            base = candidates.into_iter().next().with_context(|| {
                format!("no common ancestor between {merge_base} and {current_branch}")
            })?;
        }

        tracing::debug!(%base, %current, "snapshots resolved");

        Ok(SnapshotPair { base, current })
    }
}
