//! PSK guard for the admin endpoints.
//!
//! Keys are compared in constant time. Without a configured key the admin
//! surface stays closed.

use axum::{
    extract::Request,
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};
use subtle::ConstantTimeEq;

use crate::errors::AppError;

/// Header name for the API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Middleware admitting requests that carry the expected PSK, either in
/// `x-api-key` or as a bearer token.
pub async fn admin_psk_layer(expected_psk: Option<String>, request: Request, next: Next) -> Response {
    let Some(expected) = expected_psk else {
        return AppError::Unauthorized("Admin endpoints are disabled".to_string()).into_response();
    };

    let provided = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .or_else(|| {
            request
                .headers()
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.strip_prefix("Bearer "))
        });

    match provided.map(|key| constant_time_compare(key, &expected)) {
        Some(true) => next.run(request).await,
        Some(false) => AppError::Unauthorized("Invalid API key".to_string()).into_response(),
        None => AppError::Unauthorized("Missing API key".to_string()).into_response(),
    }
}

fn constant_time_compare(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}
