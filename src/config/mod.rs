//! Configuration module for the app shelf.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::errors::AppError;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Pre-shared key for the admin endpoints (admin is closed when unset)
    pub admin_psk: Option<String>,
    /// Path to SQLite document store
    pub db_path: PathBuf,
    /// Path to the JSON file holding the local rating memory
    pub ratings_path: PathBuf,
    /// Optional seed document imported into an empty store
    pub seed_path: Option<PathBuf>,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Public base URL used when building share links
    pub public_url: String,
    /// Brand name shown in the hero and share text
    pub site_name: String,
    /// How long a notice stays on screen
    pub notice_ttl: Duration,
    /// Upper bound on waiting for in-flight fetches before answering a request
    pub settle_timeout: Duration,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let admin_psk = env::var("APPSHELF_ADMIN_PSK")
            .ok()
            .filter(|psk| !psk.is_empty());

        let db_path = env::var("APPSHELF_DB_PATH")
            .unwrap_or_else(|_| "./data/appshelf.sqlite".to_string())
            .into();

        let ratings_path = env::var("APPSHELF_RATINGS_PATH")
            .unwrap_or_else(|_| "./data/rated-listings.json".to_string())
            .into();

        let seed_path = env::var("APPSHELF_SEED_PATH").ok().map(PathBuf::from);

        let bind_addr = env::var("APPSHELF_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
            .parse()
            .map_err(|e| AppError::Validation(format!("Invalid APPSHELF_BIND_ADDR: {}", e)))?;

        let public_url = env::var("APPSHELF_PUBLIC_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:8080".to_string())
            .trim_end_matches('/')
            .to_string();

        let site_name = env::var("APPSHELF_SITE_NAME").unwrap_or_else(|_| "App Shelf".to_string());

        let notice_ttl = Duration::from_secs(parse_number("APPSHELF_NOTICE_TTL_SECS", 5)?);
        let settle_timeout =
            Duration::from_millis(parse_number("APPSHELF_SETTLE_TIMEOUT_MS", 2000)?);

        let log_level = env::var("APPSHELF_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            admin_psk,
            db_path,
            ratings_path,
            seed_path,
            bind_addr,
            public_url,
            site_name,
            notice_ttl,
            settle_timeout,
            log_level,
        })
    }
}

fn parse_number(key: &str, default: u64) -> Result<u64, AppError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::Validation(format!("{} must be a whole number, got {:?}", key, raw))),
        Err(_) => Ok(default),
    }
}
