//! Integration tests for the app shelf server.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde_json::{json, Value};
use tempfile::TempDir;

use crate::config::Config;
use crate::db::{init_database, Repository};
use crate::gateway::Gateway;
use crate::models::SeedDocument;
use crate::session::{self, RatingMemory, SessionSettings};
use crate::{create_router, AppState};

const ADMIN_KEY: &str = "test-admin-key";

/// Test fixture for integration tests.
struct TestFixture {
    client: Client,
    base_url: String,
    repo: Arc<Repository>,
    _temp_dir: TempDir,
}

impl TestFixture {
    async fn new() -> Self {
        Self::with_psk(Some(ADMIN_KEY.to_string())).await
    }

    async fn with_psk(psk: Option<String>) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.sqlite");
        let ratings_path = temp_dir.path().join("rated.json");

        let pool = init_database(&db_path).await.expect("Failed to init DB");
        let repo = Arc::new(Repository::new(pool));
        repo.import_seed(&seed()).await.expect("Failed to seed");

        let config = Config {
            admin_psk: psk.clone(),
            db_path,
            ratings_path: ratings_path.clone(),
            seed_path: None,
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            public_url: "http://shelf.test".to_string(),
            site_name: "Test Shelf".to_string(),
            notice_ttl: Duration::from_secs(60),
            settle_timeout: Duration::from_secs(5),
            log_level: "warn".to_string(),
        };

        let ratings = RatingMemory::load(&ratings_path)
            .await
            .expect("Failed to load ratings");
        let session = session::spawn(
            Gateway::new(repo.clone()),
            ratings,
            SessionSettings::from_config(&config),
        );

        let state = AppState {
            repo: repo.clone(),
            session,
            config: Arc::new(config),
        };

        let app = create_router(state);

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to get addr");
        let base_url = format!("http://{}", addr);

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait for server to start
        tokio::time::sleep(Duration::from_millis(100)).await;

        let mut client_builder = Client::builder();
        if let Some(key) = psk {
            let mut headers = reqwest::header::HeaderMap::new();
            headers.insert("x-api-key", key.parse().unwrap());
            client_builder = client_builder.default_headers(headers);
        }

        let fixture = TestFixture {
            client: client_builder.build().unwrap(),
            base_url,
            repo,
            _temp_dir: temp_dir,
        };
        fixture.wait_for_frame(|frame| frame["ready"] == true).await;
        fixture
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn frame(&self) -> Value {
        let body: Value = self
            .client
            .get(self.url("/api/session/frame"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        body["data"].clone()
    }

    /// Poll the published frame until `done` holds.
    async fn wait_for_frame(&self, done: impl Fn(&Value) -> bool) -> Value {
        for _ in 0..100 {
            let frame = self.frame().await;
            if done(&frame) {
                return frame;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("frame never reached the expected state");
    }

    async fn navigate(&self, fragment: &str) -> Value {
        let resp = self
            .client
            .post(self.url("/api/session/navigate"))
            .json(&json!({ "fragment": fragment }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        body["data"].clone()
    }

    async fn action(&self, action: Value) -> reqwest::Response {
        self.client
            .post(self.url("/api/session/actions"))
            .json(&action)
            .send()
            .await
            .unwrap()
    }
}

fn seed() -> SeedDocument {
    serde_json::from_value(json!({
        "profile": {
            "name": "Kim Lee",
            "city": "Oslo",
            "bio": "Builds small useful things.",
            "skills": ["Rust", "Kotlin"],
            "links": ["https://github.com/kimlee"],
            "featuredListingId": "pixel-quest"
        },
        "listings": [
            {
                "id": "focus-timer",
                "name": "Focus Timer",
                "tagline": "Stay on task",
                "description": "A pomodoro timer.",
                "version": "2.1.0",
                "category": "productivity",
                "packageUrl": "https://example.com/focus.apk",
                "releaseDate": "2024-03-01T00:00:00Z",
                "downloads": 1200,
                "changelog": [
                    { "version": "2.1.0", "date": "2024-03-01T00:00:00Z", "notes": "Dark mode" },
                    { "version": "2.0.0", "date": "2024-01-01T00:00:00Z", "notes": "Rewrite" }
                ]
            },
            {
                "id": "pixel-quest",
                "name": "Pixel Quest",
                "tagline": "A tiny adventure",
                "description": "Retro platformer.",
                "version": "1.0.0",
                "category": "games",
                "releaseDate": "2024-02-01T00:00:00Z",
                "downloads": 40
            },
            {
                "id": "json-lens",
                "name": "JSON Lens",
                "tagline": "Inspect payloads",
                "description": "Pretty printer for JSON.",
                "version": "0.3.0",
                "category": "tools",
                "releaseDate": "2024-01-15T00:00:00Z",
                "downloads": 300
            }
        ]
    }))
    .unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_home_page_document() {
    let fixture = TestFixture::new().await;

    let resp = fixture.client.get(fixture.url("/")).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    let html = resp.text().await.unwrap();
    assert!(html.contains("<title>Test Shelf</title>"));
    assert!(html.contains("Welcome to"));
    assert!(html.contains("built by Kim Lee"));
    // The declared featured listing wins over the newest one.
    assert!(html.contains("Featured App"));
    assert!(html.contains("Retro platformer."));
}

#[tokio::test]
async fn test_filter_route_shows_only_category() {
    let fixture = TestFixture::new().await;

    let frame = fixture.navigate("#apps/filter/tools").await;
    assert_eq!(frame["page"], "catalog");
    assert_eq!(frame["activeNav"], "apps");
    assert_eq!(frame["location"], "#apps/filter/tools");
    let html = frame["html"].as_str().unwrap();
    assert!(html.contains("JSON Lens"));
    assert!(!html.contains(r##"href="#app/focus-timer""##));
    assert!(!html.contains(r##"href="#app/pixel-quest""##));
}

#[tokio::test]
async fn test_filter_action_sorts_and_searches() {
    let fixture = TestFixture::new().await;
    fixture.navigate("#apps").await;

    let resp = fixture
        .action(json!({ "type": "filter", "category": "all", "sort": "mostDownloaded", "search": "" }))
        .await;
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let html = body["data"]["html"].as_str().unwrap().to_string();
    let focus = html.find("#app/focus-timer").unwrap();
    let lens = html.find("#app/json-lens").unwrap();
    let quest = html.find("#app/pixel-quest").unwrap();
    assert!(focus < lens && lens < quest);
    assert_eq!(body["data"]["scrollToTop"], false);

    let resp = fixture
        .action(json!({ "type": "filter", "category": "all", "sort": "newest", "search": "RETRO" }))
        .await;
    let body: Value = resp.json().await.unwrap();
    let html = body["data"]["html"].as_str().unwrap();
    assert!(html.contains("#app/pixel-quest"));
    assert!(!html.contains("#app/json-lens"));
}

#[tokio::test]
async fn test_unknown_listing_redirects_to_catalog() {
    let fixture = TestFixture::new().await;

    let frame = fixture.navigate("#app/does-not-exist").await;
    assert_eq!(frame["page"], "catalog");
    assert_eq!(frame["location"], "#apps");

    let frame = fixture.navigate("#nowhere").await;
    assert_eq!(frame["page"], "home");
}

#[tokio::test]
async fn test_detail_page_loads_changelog() {
    let fixture = TestFixture::new().await;

    let frame = fixture.navigate("#app/focus-timer").await;
    assert_eq!(frame["page"], "detail");
    assert_eq!(frame["pending"], false);
    assert_eq!(frame["title"], "Focus Timer | Test Shelf");
    let html = frame["html"].as_str().unwrap();
    let newer = html.find("Dark mode").unwrap();
    let older = html.find("Rewrite").unwrap();
    assert!(newer < older);
    assert!(html.contains(r#"data-action="download""#));
}

#[tokio::test]
async fn test_rating_once_per_device() {
    let fixture = TestFixture::new().await;
    fixture.navigate("#app/focus-timer").await;

    let resp = fixture
        .action(json!({ "type": "submitRating", "listingId": "focus-timer", "stars": 5 }))
        .await;
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["notices"][0]["severity"], "success");
    assert_eq!(body["data"]["notices"][0]["message"], "Thank you for rating 5 stars!");

    let resp = fixture
        .action(json!({ "type": "submitRating", "listingId": "focus-timer", "stars": 1 }))
        .await;
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["notices"][0]["severity"], "error");
    assert_eq!(body["data"]["notices"][0]["message"], "You have already rated this app.");

    let listing = fixture.repo.get_listing("focus-timer").await.unwrap().unwrap();
    assert_eq!(listing.rating_count, 1);
    assert_eq!(listing.rating_sum, 5);
    assert!((listing.rating - 5.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_invalid_stars_rejected() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .action(json!({ "type": "submitRating", "listingId": "focus-timer", "stars": 0 }))
        .await;
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_download_counts_in_background() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .action(json!({ "type": "download", "listingId": "pixel-quest" }))
        .await;
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["notices"][0]["severity"], "info");

    let mut downloads = 0;
    for _ in 0..100 {
        downloads = fixture
            .repo
            .get_listing("pixel-quest")
            .await
            .unwrap()
            .unwrap()
            .downloads;
        if downloads == 41 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(downloads, 41);
}

#[tokio::test]
async fn test_share_payload() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .action(json!({ "type": "share", "listingId": "json-lens" }))
        .await;
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["share"]["url"], "http://shelf.test/#app/json-lens");
    assert_eq!(body["data"]["notices"][0]["message"], "Link copied to clipboard!");

    let resp = fixture
        .action(json!({ "type": "share", "listingId": "missing" }))
        .await;
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_store_reads() {
    let fixture = TestFixture::new().await;

    let body: Value = fixture
        .client
        .get(fixture.url("/api/listings"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let ids: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["focus-timer", "pixel-quest", "json-lens"]);
    assert_eq!(body["data"][1]["categoryName"], "Fun");

    let resp = fixture
        .client
        .get(fixture.url("/api/listings/missing"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    let body: Value = fixture
        .client
        .get(fixture.url("/api/listings/focus-timer/changelog"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"][0]["version"], "2.1.0");

    let body: Value = fixture
        .client
        .get(fixture.url("/api/profile"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["name"], "Kim Lee");
}

#[tokio::test]
async fn test_admin_requires_psk() {
    let fixture = TestFixture::new().await;
    let anonymous = Client::new();

    let resp = anonymous
        .put(fixture.url("/api/admin/listings/new-app"))
        .json(&json!({ "name": "New App" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    let resp = anonymous
        .delete(fixture.url("/api/admin/profile"))
        .header("Authorization", format!("Bearer {}", ADMIN_KEY))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn test_admin_disabled_without_psk() {
    let fixture = TestFixture::with_psk(None).await;

    let resp = fixture
        .client
        .delete(fixture.url("/api/admin/listings/json-lens"))
        .header("x-api-key", "anything")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn test_admin_write_reaches_session_live() {
    let fixture = TestFixture::new().await;
    fixture.navigate("#updates").await;

    let resp = fixture
        .client
        .put(fixture.url("/api/admin/listings/note-pad"))
        .json(&json!({
            "name": "Note Pad",
            "tagline": "Write it down",
            "version": "0.1.0",
            "category": "misc"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["categoryName"], "Misc");

    let frame = fixture
        .wait_for_frame(|frame| {
            frame["html"]
                .as_str()
                .is_some_and(|html| html.contains("Note Pad updated to Version 0.1.0"))
        })
        .await;
    assert_eq!(frame["page"], "updates");
    assert_eq!(frame["scrollToTop"], false);
}

#[tokio::test]
async fn test_profile_removal_shows_missing_message() {
    let fixture = TestFixture::new().await;
    fixture.navigate("#about").await;

    let resp = fixture
        .client
        .delete(fixture.url("/api/admin/profile"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    fixture
        .wait_for_frame(|frame| {
            frame["html"]
                .as_str()
                .is_some_and(|html| html.contains("Developer Profile Missing"))
        })
        .await;
}
