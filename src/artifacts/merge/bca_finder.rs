//! Best common ancestor finder
//!
//! Finds the merge base(s) of two commits: the starting point the detector compares
//! against when a merge-base revision is requested.
//!
//! ## Algorithm Overview
//!
//! The implementation uses a two-phase algorithm:
//!
//! ### Phase 1: Find All Common Ancestors
//!
//! A bidirectional graph traversal explores the commit history of both input commits:
//! - Process commits newest first (priority queue keyed by committer timestamp)
//! - Mark commits as visited from source or target side
//! - When a commit is visited from both sides, mark it as a common ancestor
//! - Mark ancestors of common ancestors as STALE to prune the search space
//! - Stop as soon as only STALE commits are left in the queue
//!
//! ### Phase 2: Filter to Best Common Ancestors
//!
//! Apply the **Best Common Ancestor (BCA) Invariant**:
//! > A best common ancestor of commits X and Y is any common ancestor of X and Y
//! > that is not an ancestor of any other common ancestor.
//!
//! Every remaining candidate is walked against the others; any candidate reachable from
//! another one is redundant.
//!
//! ## Result Order
//!
//! Criss-cross histories have several best common ancestors. All of them are returned,
//! newest committer timestamp first and by object id on equal timestamps, so callers that
//! pick the first one always pick the same one.
//!
//! ## Debug Logging
//!
//! Building with the `debug_merge` feature traces every traversal step through `tracing`
//! at `trace` level (`LOG=changed_objects=trace`).

use crate::artifacts::objects::commit::SlimCommit;
use crate::artifacts::objects::object_id::ObjectId;
use bitflags::bitflags;
use std::cell::RefCell;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::fmt;

/// Traversal tracing, compiled in only with the debug_merge feature
macro_rules! debug_log {
    ($($arg:tt)*) => {
        #[cfg(feature = "debug_merge")]
        {
            tracing::trace!($($arg)*);
        }
    };
}

bitflags! {
    #[derive(Clone, Copy, PartialEq, Eq, Hash)]
    struct VisitState: u8 {
        const NONE = 0b00;
        const VISITED_FROM_SOURCE = 0b01;
        const VISITED_FROM_TARGET = 0b10;
        const VISITED_FROM_BOTH = Self::VISITED_FROM_SOURCE.bits() | Self::VISITED_FROM_TARGET.bits();
        const STALE = 0b100;
        const RESULT = 0b1000;
    }
}

impl fmt::Debug for VisitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut flags = Vec::new();
        if self.contains(VisitState::VISITED_FROM_SOURCE) {
            flags.push("SOURCE");
        }
        if self.contains(VisitState::VISITED_FROM_TARGET) {
            flags.push("TARGET");
        }
        if self.contains(VisitState::STALE) {
            flags.push("STALE");
        }
        if self.contains(VisitState::RESULT) {
            flags.push("RESULT");
        }
        if flags.is_empty() {
            write!(f, "NONE")
        } else {
            write!(f, "{}", flags.join("|"))
        }
    }
}

impl fmt::Display for VisitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Finds best common ancestors of two commits
///
/// Commit data comes from `commit_loader`, so the finder works against the object database
/// as well as against in-memory graphs. Loaded commits are cached for the lifetime of the
/// finder since both phases revisit the same part of the graph.
pub struct BCAFinder<CommitLoaderFn>
where
    CommitLoaderFn: Fn(&ObjectId) -> anyhow::Result<SlimCommit>,
{
    commit_loader: CommitLoaderFn,
    cache: RefCell<HashMap<ObjectId, SlimCommit>>,
}

impl<CommitLoaderFn> BCAFinder<CommitLoaderFn>
where
    CommitLoaderFn: Fn(&ObjectId) -> anyhow::Result<SlimCommit>,
{
    /// # Example
    ///
    /// ```rust,ignore
    /// let finder = BCAFinder::new(|commit_id| database.slim_commit(commit_id));
    /// let merge_bases = finder.find_best_common_ancestors(&ours, &theirs)?;
    /// ```
    pub fn new(commit_loader: CommitLoaderFn) -> Self {
        Self {
            commit_loader,
            cache: RefCell::new(HashMap::new()),
        }
    }

    fn load(&self, commit_id: &ObjectId) -> anyhow::Result<SlimCommit> {
        if let Some(commit) = self.cache.borrow().get(commit_id) {
            return Ok(commit.clone());
        }

        let commit = (self.commit_loader)(commit_id)?;
        self.cache
            .borrow_mut()
            .insert(commit_id.clone(), commit.clone());

        Ok(commit)
    }

    /// Walk the history of `source_commit_id` and every target at once
    ///
    /// Returns the visit state of every commit touched. Common ancestors carry RESULT;
    /// those that are themselves ancestors of another common ancestor also carry STALE.
    fn find_common_ancestors(
        &self,
        source_commit_id: &ObjectId,
        target_commit_ids: &HashSet<&ObjectId>,
    ) -> anyhow::Result<HashMap<ObjectId, VisitState>> {
        if target_commit_ids.contains(source_commit_id) {
            return Ok(HashMap::from([(
                source_commit_id.clone(),
                VisitState::VISITED_FROM_BOTH | VisitState::RESULT,
            )]));
        }

        let mut ancestors_states = HashMap::<ObjectId, VisitState>::new();
        let mut priority_queue = BinaryHeap::new();

        let source_commit = self.load(source_commit_id)?;
        ancestors_states.insert(source_commit.oid.clone(), VisitState::VISITED_FROM_SOURCE);
        priority_queue.push((source_commit.timestamp, source_commit.oid));

        for &target_commit_id in target_commit_ids {
            let target_commit = self.load(target_commit_id)?;
            ancestors_states.insert(target_commit_id.clone(), VisitState::VISITED_FROM_TARGET);
            priority_queue.push((target_commit.timestamp, target_commit.oid));
        }

        while Self::has_non_stale(&priority_queue, &ancestors_states) {
            let Some((_, commit_id)) = priority_queue.pop() else {
                break;
            };

            let mut current_state = ancestors_states
                .get(&commit_id)
                .copied()
                .unwrap_or(VisitState::NONE)
                & (VisitState::VISITED_FROM_BOTH | VisitState::STALE);

            debug_log!("Processing commit {}: state={}", &commit_id, current_state);

            if current_state == VisitState::VISITED_FROM_BOTH {
                ancestors_states
                    .entry(commit_id.clone())
                    .and_modify(|state| *state |= VisitState::RESULT);
                current_state |= VisitState::STALE;
            }

            let current_commit = self.load(&commit_id)?;
            for parent_id in &current_commit.parents {
                let parent_state = ancestors_states
                    .get(parent_id)
                    .copied()
                    .unwrap_or(VisitState::NONE);

                if parent_state.contains(current_state) {
                    continue;
                }

                let parent_commit = self.load(parent_id)?;
                ancestors_states.insert(parent_id.clone(), parent_state | current_state);
                priority_queue.push((parent_commit.timestamp, parent_commit.oid));
            }
        }

        debug_log!(
            "Final ancestors states: {}",
            ancestors_states
                .iter()
                .map(|(oid, state)| format!("{}: {}", oid, state))
                .collect::<Vec<_>>()
                .join(", ")
        );

        Ok(ancestors_states)
    }

    fn has_non_stale(
        queue: &BinaryHeap<(chrono::DateTime<chrono::FixedOffset>, ObjectId)>,
        states: &HashMap<ObjectId, VisitState>,
    ) -> bool {
        queue.iter().any(|(_, oid)| {
            !states
                .get(oid)
                .is_some_and(|state| state.contains(VisitState::STALE))
        })
    }

    /// Finds every best common ancestor of two commits
    ///
    /// # Returns
    ///
    /// The best common ancestors, newest first (ties by object id). Empty when the
    /// commits share no history, e.g. they descend from different root commits.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// // Criss-cross merge with two BCAs:
    /// //     A
    /// //    / \
    /// //   B   C
    /// //   |\ /|
    /// //   | X |
    /// //   |/ \|
    /// //   D   E
    /// let bcas = finder.find_best_common_ancestors(&d, &e)?;
    /// assert_eq!(bcas, vec![c, b]); // C is newer than B
    /// ```
    pub fn find_best_common_ancestors(
        &self,
        source_commit_id: &ObjectId,
        target_commit_id: &ObjectId,
    ) -> anyhow::Result<Vec<ObjectId>> {
        let target_commit_ids = HashSet::from([target_commit_id]);
        let common_ancestors = self
            .find_common_ancestors(source_commit_id, &target_commit_ids)?
            .into_iter()
            .filter(|(_, state)| {
                state.contains(VisitState::RESULT) && !state.contains(VisitState::STALE)
            })
            .map(|(oid, _)| oid)
            .collect::<HashSet<_>>();

        debug_log!(
            "Found common ancestors: {}",
            common_ancestors
                .iter()
                .map(|oid| oid.as_ref())
                .collect::<Vec<_>>()
                .join(", ")
        );

        let mut redundant_ancestors = HashSet::<ObjectId>::new();
        for commit in &common_ancestors {
            if redundant_ancestors.contains(commit) {
                continue;
            }

            let others = common_ancestors
                .iter()
                .filter(|other| *other != commit && !redundant_ancestors.contains(*other))
                .collect::<HashSet<_>>();
            if others.is_empty() {
                continue;
            }

            let states = self.find_common_ancestors(commit, &others)?;

            // reachable from another candidate
            if states
                .get(commit)
                .is_some_and(|state| state.contains(VisitState::VISITED_FROM_TARGET))
            {
                redundant_ancestors.insert(commit.clone());
            }

            // reachable from this candidate
            for other in others {
                if states
                    .get(other)
                    .is_some_and(|state| state.contains(VisitState::VISITED_FROM_SOURCE))
                {
                    redundant_ancestors.insert(other.clone());
                }
            }
        }

        debug_log!(
            "Redundant ancestors: {}",
            redundant_ancestors
                .iter()
                .map(|oid| oid.as_ref())
                .collect::<Vec<_>>()
                .join(", ")
        );

        let mut best_common_ancestors = common_ancestors
            .into_iter()
            .filter(|commit| !redundant_ancestors.contains(commit))
            .map(|commit| self.load(&commit))
            .collect::<anyhow::Result<Vec<_>>>()?;

        best_common_ancestors.sort_by(|a, b| {
            b.timestamp
                .cmp(&a.timestamp)
                .then_with(|| a.oid.cmp(&b.oid))
        });

        Ok(best_common_ancestors
            .into_iter()
            .map(|commit| commit.oid)
            .collect())
    }
}
