//! Session endpoints.

use axum::{extract::State, response::Html, Json};
use serde::Deserialize;

use super::{success, ApiResult};
use crate::session::{Frame, UiAction};
use crate::views;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct NavigateRequest {
    pub fragment: String,
}

/// GET / - The current page as a complete HTML document.
pub async fn index(State(state): State<AppState>) -> Html<String> {
    let frame = state.session.settled().await;
    Html(views::document(&frame, &state.config.site_name).into_string())
}

/// GET /api/session/frame - The most recently published frame.
pub async fn get_frame(State(state): State<AppState>) -> ApiResult<Frame> {
    success(state.session.current())
}

/// POST /api/session/navigate - Change the location fragment.
pub async fn navigate(
    State(state): State<AppState>,
    Json(request): Json<NavigateRequest>,
) -> ApiResult<Frame> {
    let frame = state
        .session
        .dispatch(UiAction::Navigate {
            fragment: request.fragment,
        })
        .await?;
    success(frame)
}

/// POST /api/session/actions - Run one UI action.
pub async fn dispatch_action(
    State(state): State<AppState>,
    Json(action): Json<UiAction>,
) -> ApiResult<Frame> {
    let frame = state.session.dispatch(action).await?;
    success(frame)
}
