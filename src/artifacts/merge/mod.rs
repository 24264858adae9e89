//! Merge base computation over the commit graph

pub mod bca_finder;
