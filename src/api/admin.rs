//! Admin write endpoints. Mounted behind the PSK layer.

use axum::{
    extract::{Path, State},
    Json,
};

use super::{success, ApiResult};
use crate::models::{ChangelogEntry, DeveloperProfile, Listing, NewChangelogEntry, UpsertListingRequest};
use crate::AppState;

/// PUT /api/admin/listings/{id} - Create or replace a listing.
pub async fn upsert_listing(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpsertListingRequest>,
) -> ApiResult<Listing> {
    let listing = state.repo.upsert_listing(&id, &request).await?;
    tracing::info!("Listing {} saved", id);
    success(listing.enriched())
}

/// DELETE /api/admin/listings/{id} - Remove a listing and its changelog.
pub async fn delete_listing(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    state.repo.delete_listing(&id).await?;
    tracing::info!("Listing {} deleted", id);
    success(())
}

/// POST /api/admin/listings/{id}/changelog - Append a changelog entry.
pub async fn add_changelog_entry(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<NewChangelogEntry>,
) -> ApiResult<ChangelogEntry> {
    let entry = state.repo.add_changelog_entry(&id, &request).await?;
    tracing::info!("Changelog {} added to {}", entry.version, id);
    success(entry)
}

/// PUT /api/admin/profile - Replace the developer profile.
pub async fn put_profile(
    State(state): State<AppState>,
    Json(profile): Json<DeveloperProfile>,
) -> ApiResult<DeveloperProfile> {
    success(state.repo.put_profile(&profile).await?)
}

/// DELETE /api/admin/profile - Remove the developer profile.
pub async fn clear_profile(State(state): State<AppState>) -> ApiResult<()> {
    state.repo.clear_profile().await?;
    success(())
}
