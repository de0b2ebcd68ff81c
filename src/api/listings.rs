//! Read-only listing endpoints.

use axum::extract::{Path, State};

use super::{success, ApiResult};
use crate::errors::AppError;
use crate::models::{ChangelogEntry, Listing};
use crate::AppState;

/// GET /api/listings - All listings, newest release first.
pub async fn list_listings(State(state): State<AppState>) -> ApiResult<Vec<Listing>> {
    let listings = state.repo.list_listings().await?;
    success(listings.into_iter().map(Listing::enriched).collect())
}

/// GET /api/listings/{id} - A single listing.
pub async fn get_listing(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Listing> {
    match state.repo.get_listing(&id).await? {
        Some(listing) => success(listing.enriched()),
        None => Err(AppError::NotFound(format!("Listing {} not found", id))),
    }
}

/// GET /api/listings/{id}/changelog - Changelog, newest first.
pub async fn get_changelog(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Vec<ChangelogEntry>> {
    if state.repo.get_listing(&id).await?.is_none() {
        return Err(AppError::NotFound(format!("Listing {} not found", id)));
    }
    success(state.repo.list_changelog(&id).await?)
}
