//! Change detection and grouping
//!
//! Data flows one way: [`resolver`] picks the snapshots, [`change`] classifies the tree
//! diff between them, [`grouping`] assigns changed files to directories and [`filter`]
//! narrows the result. Repository access goes through [`snapshot::SnapshotSource`] and
//! [`work_tree::WorkTree`].

pub mod change;
pub mod file;
pub mod filter;
pub mod glob;
pub mod grouping;
pub mod marker;
pub mod resolver;
pub mod snapshot;
pub mod work_tree;
