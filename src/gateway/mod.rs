//! Gateway to the document store.
//!
//! Two live subscriptions run as producer tasks, each pushing snapshots into
//! its own channel. One-shot reads and the atomic counters go straight to the
//! repository.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{broadcast::error::RecvError, mpsc};

use crate::db::{Collection, RatingAggregate, Repository};
use crate::errors::AppError;
use crate::models::{ChangelogEntry, DeveloperProfile, Listing};

/// Snapshots a subscriber may fall behind by before the producer waits.
const SNAPSHOT_BUFFER: usize = 16;

/// One delivery from a live subscription.
pub type Snapshot<T> = Result<T, AppError>;

#[derive(Clone)]
pub struct Gateway {
    repo: Arc<Repository>,
}

impl Gateway {
    pub fn new(repo: Arc<Repository>) -> Self {
        Self { repo }
    }

    /// Live listings, newest release first, with category display details resolved.
    pub fn subscribe_listings(&self) -> mpsc::Receiver<Snapshot<Vec<Listing>>> {
        self.subscribe(Collection::Listings, |repo| async move {
            let listings = repo.list_listings().await?;
            Ok(listings.into_iter().map(Listing::enriched).collect())
        })
    }

    /// Live profile. `Ok(None)` means the document does not exist.
    pub fn subscribe_profile(&self) -> mpsc::Receiver<Snapshot<Option<DeveloperProfile>>> {
        self.subscribe(Collection::Profile, |repo| async move { repo.get_profile().await })
    }

    fn subscribe<T, F, Fut>(&self, collection: Collection, read: F) -> mpsc::Receiver<Snapshot<T>>
    where
        T: Send + 'static,
        F: Fn(Arc<Repository>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, AppError>> + Send,
    {
        let (tx, rx) = mpsc::channel(SNAPSHOT_BUFFER);
        let repo = self.repo.clone();
        // Subscribe before the first read so no write can slip between them.
        let mut feed = repo.watch();

        tokio::spawn(async move {
            loop {
                let snapshot = read(repo.clone()).await.map_err(|e| {
                    tracing::error!("Subscription to {:?} failed: {}", collection, e);
                    AppError::Subscription(format!("{:?} subscription failed: {}", collection, e.message()))
                });

                if tx.send(snapshot).await.is_err() {
                    tracing::debug!("{:?} subscriber dropped, stopping producer", collection);
                    return;
                }

                loop {
                    match feed.recv().await {
                        Ok(changed) if changed == collection => break,
                        Ok(_) => continue,
                        Err(RecvError::Lagged(missed)) => {
                            tracing::debug!("{:?} feed lagged by {}, re-reading", collection, missed);
                            break;
                        }
                        Err(RecvError::Closed) => return,
                    }
                }
            }
        });

        rx
    }

    /// Changelog of one listing, newest first. A failed read yields an empty list.
    pub async fn fetch_changelog(&self, listing_id: &str) -> Vec<ChangelogEntry> {
        match self.repo.list_changelog(listing_id).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("Error fetching changelog for {}: {}", listing_id, e);
                Vec::new()
            }
        }
    }

    /// Record one rating and recompute the average in a single transaction.
    pub async fn increment_rating_and_recompute(
        &self,
        listing_id: &str,
        stars: u8,
    ) -> Result<RatingAggregate, AppError> {
        if !(1..=5).contains(&stars) {
            return Err(AppError::Validation(format!(
                "Rating must be between 1 and 5 stars, got {}",
                stars
            )));
        }
        self.repo.increment_rating(listing_id, stars).await
    }

    /// Add one download to the counter in a single transaction.
    pub async fn increment_download_count(&self, listing_id: &str) -> Result<u64, AppError> {
        self.repo.increment_downloads(listing_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use tempfile::TempDir;

    use crate::db::init_database;
    use crate::models::{Category, UpsertListingRequest};

    async fn gateway() -> (Gateway, Arc<Repository>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let pool = init_database(&temp_dir.path().join("store.sqlite"))
            .await
            .unwrap();
        let repo = Arc::new(Repository::new(pool));
        (Gateway::new(repo.clone()), repo, temp_dir)
    }

    fn request(name: &str, category: &str) -> UpsertListingRequest {
        serde_json::from_value(serde_json::json!({ "name": name, "category": category })).unwrap()
    }

    async fn next<T>(rx: &mut mpsc::Receiver<Snapshot<T>>) -> Snapshot<T> {
        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("snapshot did not arrive")
            .expect("producer stopped")
    }

    #[tokio::test]
    async fn test_listings_subscription_delivers_initial_and_updates() {
        let (gateway, repo, _dir) = gateway().await;
        let mut rx = gateway.subscribe_listings();

        assert!(next(&mut rx).await.unwrap().is_empty());

        repo.upsert_listing("a", &request("Alpha", "experiments"))
            .await
            .unwrap();
        let listings = next(&mut rx).await.unwrap();
        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].category, Category::Experiments);
        assert_eq!(listings[0].category_name, "Experiments");
        assert_eq!(listings[0].category_icon, "flask-conical");

        gateway.increment_download_count("a").await.unwrap();
        assert_eq!(next(&mut rx).await.unwrap()[0].downloads, 1);
    }

    #[tokio::test]
    async fn test_missing_profile_is_loaded_but_absent() {
        let (gateway, repo, _dir) = gateway().await;
        let mut rx = gateway.subscribe_profile();

        assert_eq!(next(&mut rx).await.unwrap(), None);

        repo.put_profile(&DeveloperProfile {
            name: "Kim".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();
        assert_eq!(next(&mut rx).await.unwrap().unwrap().name, "Kim");
    }

    #[tokio::test]
    async fn test_failed_read_surfaces_subscription_error() {
        let (gateway, repo, _dir) = gateway().await;
        let mut rx = gateway.subscribe_listings();
        assert!(next(&mut rx).await.is_ok());

        repo.close().await;
        repo.announce(Collection::Listings);

        let err = next(&mut rx).await.unwrap_err();
        assert_eq!(err.error_code(), "SUBSCRIPTION_ERROR");
    }

    #[tokio::test]
    async fn test_changelog_failure_yields_empty() {
        let (gateway, repo, _dir) = gateway().await;
        repo.close().await;
        assert!(gateway.fetch_changelog("a").await.is_empty());
    }

    #[tokio::test]
    async fn test_rating_rejects_out_of_range_stars() {
        let (gateway, repo, _dir) = gateway().await;
        repo.upsert_listing("a", &request("Alpha", "tools")).await.unwrap();

        for stars in [0, 6] {
            let err = gateway
                .increment_rating_and_recompute("a", stars)
                .await
                .unwrap_err();
            assert_eq!(err.error_code(), "VALIDATION_ERROR");
        }

        let aggregate = gateway.increment_rating_and_recompute("a", 4).await.unwrap();
        assert_eq!(aggregate.rating_count, 1);
        assert!((aggregate.rating - 4.0).abs() < 1e-9);
    }
}
