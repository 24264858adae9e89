//! Core repository components
//!
//! - `database`: Object database over loose objects and packfiles
//! - `pack`: Packfile index lookup and delta resolution
//! - `refs`: Reference lookup (HEAD, branches, remote-tracking refs, tags, packed-refs)
//! - `repository`: Repository discovery and the snapshot access the detector uses
//! - `workspace`: Existence checks against the working tree

pub(crate) mod database;
pub(crate) mod pack;
pub(crate) mod refs;
pub mod repository;
pub(crate) mod workspace;
