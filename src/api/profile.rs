//! Read-only profile endpoint.

use axum::extract::State;

use super::{success, ApiResult};
use crate::errors::AppError;
use crate::models::DeveloperProfile;
use crate::AppState;

/// GET /api/profile - The developer profile.
pub async fn get_profile(State(state): State<AppState>) -> ApiResult<DeveloperProfile> {
    match state.repo.get_profile().await? {
        Some(profile) => success(profile),
        None => Err(AppError::NotFound("Developer profile not found".to_string())),
    }
}
