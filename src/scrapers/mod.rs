//! Everything that talks to, or knows the markup of, the parent portal.
//!
//! # Submodules
//!
//! | Module | Role |
//! |--------|------|
//! | [`session`] | Cookie-based login and page fetching over HTTP |
//! | [`journal`] | Turns a fetched journal page into typed data |
//!
//! Portal layout changes should only ever touch [`journal`].

pub mod journal;
pub mod session;
