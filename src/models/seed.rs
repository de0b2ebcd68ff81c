//! Seed document imported into an empty store at startup.

use serde::Deserialize;

use super::{DeveloperProfile, NewChangelogEntry, UpsertListingRequest};

/// The whole seed file.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedDocument {
    #[serde(default)]
    pub profile: Option<DeveloperProfile>,
    #[serde(default)]
    pub listings: Vec<SeedListing>,
}

/// One listing in the seed file, with its changelog inline.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedListing {
    pub id: String,
    #[serde(flatten)]
    pub listing: UpsertListingRequest,
    #[serde(default)]
    pub changelog: Vec<NewChangelogEntry>,
}
