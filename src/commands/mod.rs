//! User-facing operations on a [`Repository`](crate::areas::repository::Repository)
//!
//! - `detect`: compute the filtered, grouped diff
//! - `output`: render a diff as plain text or JSON

pub mod detect;
pub mod output;
