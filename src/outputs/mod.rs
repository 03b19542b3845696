//! Local outputs written during a run.
//!
//! # Submodules
//!
//! - [`photos`]: Archive of every fetched photo, keyed by date and content hash

pub mod photos;
