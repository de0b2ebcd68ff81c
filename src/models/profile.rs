//! Developer profile model, a singleton document.

use serde::{Deserialize, Serialize};

/// The site owner's profile. Also the request body for replacing it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct DeveloperProfile {
    pub name: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub links: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub featured_listing_id: Option<String>,
}
