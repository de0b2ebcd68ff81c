//! App Shelf
//!
//! A developer's personal app store: a SQLite document store with live change
//! feeds, one browsing session rendered server-side with maud, and a REST API.

mod api;
mod auth;
mod config;
mod db;
mod errors;
mod format;
mod gateway;
mod models;
mod session;
mod views;

use std::path::Path;
use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::Config;
use db::Repository;
use errors::AppError;
use gateway::Gateway;
use models::SeedDocument;
use session::{RatingMemory, SessionHandle, SessionSettings};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub session: SessionHandle,
    pub config: Arc<Config>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting App Shelf");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Rating memory: {:?}", config.ratings_path);
    tracing::info!("Bind address: {}", config.bind_addr);

    if config.admin_psk.is_none() {
        tracing::warn!("No admin PSK configured (APPSHELF_ADMIN_PSK). Admin endpoints are closed.");
    }

    // Initialize database
    let pool = db::init_database(&config.db_path).await?;
    let repo = Arc::new(Repository::new(pool));

    if let Some(seed_path) = &config.seed_path {
        import_seed(&repo, seed_path).await?;
    }

    // Start the browsing session
    let ratings = RatingMemory::load(&config.ratings_path).await?;
    let session = session::spawn(
        Gateway::new(repo.clone()),
        ratings,
        SessionSettings::from_config(&config),
    );

    let state = AppState {
        repo: repo.clone(),
        session,
        config: Arc::new(config.clone()),
    };

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    repo.close().await;
    tracing::info!("Shut down cleanly");

    Ok(())
}

/// Apply the seed document when the store has no listings yet.
async fn import_seed(repo: &Repository, path: &Path) -> Result<(), AppError> {
    let raw = tokio::fs::read_to_string(path).await?;
    let seed: SeedDocument = serde_json::from_str(&raw)?;

    if repo.import_seed(&seed).await? {
        tracing::info!("Seeded store with {} listings from {:?}", seed.listings.len(), path);
    } else {
        tracing::info!("Store already has listings, skipping seed {:?}", path);
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let psk = state.config.admin_psk.clone();

    let admin_routes = Router::new()
        .route(
            "/listings/{id}",
            put(api::upsert_listing).delete(api::delete_listing),
        )
        .route("/listings/{id}/changelog", post(api::add_changelog_entry))
        .route("/profile", put(api::put_profile).delete(api::clear_profile))
        .layer(middleware::from_fn(move |req, next| {
            auth::admin_psk_layer(psk.clone(), req, next)
        }));

    let api_routes = Router::new()
        // Session
        .route("/session/frame", get(api::get_frame))
        .route("/session/navigate", post(api::navigate))
        .route("/session/actions", post(api::dispatch_action))
        // Store reads
        .route("/listings", get(api::list_listings))
        .route("/listings/{id}", get(api::get_listing))
        .route("/listings/{id}/changelog", get(api::get_changelog))
        .route("/profile", get(api::get_profile))
        .nest("/admin", admin_routes);

    Router::new()
        .route("/", get(api::index))
        .route("/health", get(health_check))
        .nest("/api", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests;
