//! Listing model: one published application.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Semantic category of a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Productivity,
    Games,
    Tools,
    Experiments,
    Misc,
    Other,
}

/// Display name and icon glyph for a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CategoryDetails {
    pub name: &'static str,
    pub icon: &'static str,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Productivity,
        Category::Games,
        Category::Tools,
        Category::Experiments,
        Category::Misc,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Productivity => "productivity",
            Category::Games => "games",
            Category::Tools => "tools",
            Category::Experiments => "experiments",
            Category::Misc => "misc",
            Category::Other => "other",
        }
    }

    /// Parse a category id, ignoring case. Unknown ids yield `None`.
    pub fn from_id(id: &str) -> Option<Self> {
        let id = id.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|c| c.as_str() == id)
    }

    /// Parse a stored category id; anything unrecognised files under `Other`.
    pub fn from_id_lossy(id: &str) -> Self {
        Self::from_id(id).unwrap_or(Category::Other)
    }

    pub fn details(&self) -> CategoryDetails {
        let (name, icon) = match self {
            Category::Productivity => ("Productivity", "calendar-check"),
            Category::Games => ("Fun", "gamepad-2"),
            Category::Tools => ("Tools", "wrench"),
            Category::Experiments => ("Experiments", "flask-conical"),
            Category::Misc => ("Misc", "layout-grid"),
            Category::Other => ("Other", "layout-grid"),
        };
        CategoryDetails { name, icon }
    }
}

/// A published application as delivered by the listings subscription.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub id: String,
    pub name: String,
    pub tagline: String,
    pub description: String,
    pub version: String,
    pub category: Category,
    /// Derived from `category` when the snapshot is built
    #[serde(default)]
    pub category_name: String,
    #[serde(default)]
    pub category_icon: String,
    pub icon: String,
    pub screenshots: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_url: Option<String>,
    pub release_date: DateTime<Utc>,
    pub downloads: u64,
    pub rating: f64,
    pub rating_count: u64,
    pub rating_sum: u64,
}

impl Listing {
    /// Fill in the display fields derived from the raw category.
    pub fn enriched(mut self) -> Self {
        let details = self.category.details();
        self.category_name = details.name.to_string();
        self.category_icon = details.icon.to_string();
        self
    }

    /// Icon glyph, falling back to a generic package.
    pub fn icon_name(&self) -> &str {
        if self.icon.trim().is_empty() {
            "package"
        } else {
            &self.icon
        }
    }

    /// Case-insensitive substring match on name, tagline and description.
    /// `needle` must already be lowercase.
    pub fn matches_search(&self, needle: &str) -> bool {
        self.name.to_lowercase().contains(needle)
            || self.tagline.to_lowercase().contains(needle)
            || self.description.to_lowercase().contains(needle)
    }
}

/// Request body for creating or replacing a listing.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertListingRequest {
    pub name: String,
    #[serde(default)]
    pub tagline: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub screenshots: Vec<String>,
    #[serde(default)]
    pub package_url: Option<String>,
    #[serde(default)]
    pub store_url: Option<String>,
    /// Defaults to the time of the write
    #[serde(default)]
    pub release_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub downloads: u64,
    #[serde(default)]
    pub rating_count: u64,
    #[serde(default)]
    pub rating_sum: u64,
}

impl UpsertListingRequest {
    /// Check the request before it reaches the store.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Name is required".to_string());
        }
        if self.rating_sum > self.rating_count * 5 {
            return Err("ratingSum cannot exceed five stars per rating".to_string());
        }
        if self.rating_count > 0 && self.rating_sum < self.rating_count {
            return Err("ratingSum must be at least one star per rating".to_string());
        }
        Ok(())
    }

    /// Average rating implied by the aggregates.
    pub fn average_rating(&self) -> f64 {
        if self.rating_count == 0 {
            0.0
        } else {
            self.rating_sum as f64 / self.rating_count as f64
        }
    }
}
