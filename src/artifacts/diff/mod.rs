//! Tree-level comparison of two snapshots

pub mod tree_diff;
