//! Data models for the app shelf.
//!
//! Field names serialize in camelCase, matching the documents the site owner edits.

mod changelog;
mod listing;
mod profile;
mod seed;

pub use changelog::*;
pub use listing::*;
pub use profile::*;
pub use seed::*;
