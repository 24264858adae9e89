//! Git data structures and the detection engine
//!
//! - `branch`: Ref names and revision parsing
//! - `database`: Tree entry types
//! - `detect`: Snapshot resolution, change classification, grouping and filtering
//! - `diff`: Tree-level diffing
//! - `merge`: Best common ancestor search
//! - `objects`: Git object types (tree, commit, tag)

pub mod branch;
pub mod database;
pub mod detect;
pub mod diff;
pub mod merge;
pub mod objects;
