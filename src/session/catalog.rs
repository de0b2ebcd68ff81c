//! Catalog pipeline and featured-listing selection.
//!
//! Order is fixed: category filter, then search, then sort.

use std::cmp::Reverse;

use crate::models::{DeveloperProfile, Listing};

use super::state::{CategoryFilter, SortKey};

/// Keep listings in the given category. `All` keeps everything.
pub fn filter_by_category<'a>(listings: Vec<&'a Listing>, filter: CategoryFilter) -> Vec<&'a Listing> {
    match filter {
        CategoryFilter::All => listings,
        CategoryFilter::Only(category) => listings
            .into_iter()
            .filter(|listing| listing.category == category)
            .collect(),
    }
}

/// Keep listings whose name, tagline or description contains `term`, ignoring case.
/// An empty term keeps everything; whitespace is matched as typed.
pub fn filter_by_search<'a>(listings: Vec<&'a Listing>, term: &str) -> Vec<&'a Listing> {
    let needle = term.to_lowercase();
    if needle.is_empty() {
        return listings;
    }
    listings
        .into_iter()
        .filter(|listing| listing.matches_search(&needle))
        .collect()
}

/// Stable sort, descending on the chosen key.
pub fn sort_listings(listings: &mut [&Listing], sort: SortKey) {
    match sort {
        SortKey::Newest => listings.sort_by_key(|listing| Reverse(listing.release_date)),
        SortKey::MostDownloaded => listings.sort_by_key(|listing| Reverse(listing.downloads)),
    }
}

/// The listings the catalog page shows.
pub fn catalog<'a>(
    listings: &'a [Listing],
    filter: CategoryFilter,
    sort: SortKey,
    search: &str,
) -> Vec<&'a Listing> {
    let selected = filter_by_category(listings.iter().collect(), filter);
    let mut selected = filter_by_search(selected, search);
    sort_listings(&mut selected, sort);
    selected
}

/// The profile's featured listing if it resolves, otherwise the first (newest) listing.
pub fn featured<'a>(
    listings: &'a [Listing],
    profile: Option<&DeveloperProfile>,
) -> Option<&'a Listing> {
    profile
        .and_then(|p| p.featured_listing_id.as_deref())
        .and_then(|id| listings.iter().find(|listing| listing.id == id))
        .or_else(|| listings.first())
}
