//! Database repository for the document store.
//!
//! Every committed write is announced on a broadcast channel so live
//! subscriptions can re-read the collection it touched.

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::{Row, SqlitePool};
use tokio::sync::broadcast;

use crate::errors::AppError;
use crate::models::{
    Category, ChangelogEntry, DeveloperProfile, Listing, NewChangelogEntry, SeedDocument,
    UpsertListingRequest,
};

/// Capacity of the change feed. Slow subscribers lag and re-read.
const CHANGE_FEED_CAPACITY: usize = 64;

const LISTING_COLUMNS: &str = "id, name, tagline, description, version, category, icon, screenshots, package_url, store_url, release_date, downloads, rating, rating_count, rating_sum";

/// A collection whose contents changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Listings,
    Profile,
}

/// Rating aggregates as committed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatingAggregate {
    pub rating: f64,
    pub rating_count: u64,
    pub rating_sum: u64,
}

/// Database repository for all document operations.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
    changes: broadcast::Sender<Collection>,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Self { pool, changes }
    }

    /// Subscribe to the change feed.
    pub fn watch(&self) -> broadcast::Receiver<Collection> {
        self.changes.subscribe()
    }

    /// Announce a change to every subscriber.
    pub(crate) fn announce(&self, collection: Collection) {
        // No receivers is fine: nobody is listening yet.
        let _ = self.changes.send(collection);
    }

    /// Close the pool. Later queries fail.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    // ==================== LISTING OPERATIONS ====================

    /// List all listings, newest release first.
    pub async fn list_listings(&self) -> Result<Vec<Listing>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM listings ORDER BY release_date DESC",
            LISTING_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(listing_from_row).collect())
    }

    /// Get a listing by ID.
    pub async fn get_listing(&self, id: &str) -> Result<Option<Listing>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM listings WHERE id = ?",
            LISTING_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(listing_from_row))
    }

    pub async fn count_listings(&self) -> Result<i64, AppError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM listings")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("n"))
    }

    /// Create or replace a listing under the given ID.
    pub async fn upsert_listing(
        &self,
        id: &str,
        request: &UpsertListingRequest,
    ) -> Result<Listing, AppError> {
        request.validate().map_err(AppError::Validation)?;

        let now = to_stored(&Utc::now());
        let release_date = to_stored(&request.release_date.unwrap_or_else(Utc::now));
        let category = request
            .category
            .as_deref()
            .map(Category::from_id_lossy)
            .unwrap_or(Category::Misc);
        let screenshots_json = serde_json::to_string(&request.screenshots)?;

        sqlx::query(
            r#"INSERT INTO listings (
                id, name, tagline, description, version, category, icon, screenshots,
                package_url, store_url, release_date, downloads, rating, rating_count,
                rating_sum, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name, tagline = excluded.tagline,
                description = excluded.description, version = excluded.version,
                category = excluded.category, icon = excluded.icon,
                screenshots = excluded.screenshots, package_url = excluded.package_url,
                store_url = excluded.store_url, release_date = excluded.release_date,
                downloads = excluded.downloads, rating = excluded.rating,
                rating_count = excluded.rating_count, rating_sum = excluded.rating_sum,
                updated_at = excluded.updated_at"#,
        )
        .bind(id)
        .bind(&request.name)
        .bind(&request.tagline)
        .bind(&request.description)
        .bind(&request.version)
        .bind(category.as_str())
        .bind(&request.icon)
        .bind(&screenshots_json)
        .bind(&request.package_url)
        .bind(&request.store_url)
        .bind(&release_date)
        .bind(request.downloads as i64)
        .bind(request.average_rating())
        .bind(request.rating_count as i64)
        .bind(request.rating_sum as i64)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        self.announce(Collection::Listings);

        self.get_listing(id)
            .await?
            .ok_or_else(|| AppError::Internal(format!("Listing {} vanished after write", id)))
    }

    /// Delete a listing and its changelog.
    pub async fn delete_listing(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM listings WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Listing {} not found", id)));
        }

        self.announce(Collection::Listings);
        Ok(())
    }

    /// Add one rating of `stars` and recompute the average, atomically.
    ///
    /// The UPDATE runs first inside the transaction so the write lock is
    /// held before anything is read back.
    pub async fn increment_rating(
        &self,
        id: &str,
        stars: u8,
    ) -> Result<RatingAggregate, AppError> {
        let now = to_stored(&Utc::now());
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"UPDATE listings SET
                rating_count = rating_count + 1,
                rating_sum = rating_sum + ?,
                rating = CAST(rating_sum + ? AS REAL) / (rating_count + 1),
                updated_at = ?
            WHERE id = ?"#,
        )
        .bind(stars as i64)
        .bind(stars as i64)
        .bind(&now)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Listing {} not found", id)));
        }

        let row = sqlx::query("SELECT rating, rating_count, rating_sum FROM listings WHERE id = ?")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        self.announce(Collection::Listings);

        Ok(RatingAggregate {
            rating: row.get("rating"),
            rating_count: non_negative(row.get("rating_count")),
            rating_sum: non_negative(row.get("rating_sum")),
        })
    }

    /// Add one to the download counter, atomically. Returns the new count.
    pub async fn increment_downloads(&self, id: &str) -> Result<u64, AppError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("UPDATE listings SET downloads = downloads + 1 WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Listing {} not found", id)));
        }

        let row = sqlx::query("SELECT downloads FROM listings WHERE id = ?")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        self.announce(Collection::Listings);

        Ok(non_negative(row.get("downloads")))
    }

    // ==================== CHANGELOG OPERATIONS ====================

    /// List a listing's changelog, newest entry first.
    pub async fn list_changelog(&self, listing_id: &str) -> Result<Vec<ChangelogEntry>, AppError> {
        let rows = sqlx::query(
            "SELECT version, date, notes FROM changelog WHERE listing_id = ? ORDER BY date DESC",
        )
        .bind(listing_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| ChangelogEntry {
                version: row.get("version"),
                date: from_stored(row.get("date")),
                notes: row.get("notes"),
            })
            .collect())
    }

    /// Append a changelog entry to an existing listing.
    pub async fn add_changelog_entry(
        &self,
        listing_id: &str,
        entry: &NewChangelogEntry,
    ) -> Result<ChangelogEntry, AppError> {
        if entry.version.trim().is_empty() {
            return Err(AppError::Validation("Version is required".to_string()));
        }
        if self.get_listing(listing_id).await?.is_none() {
            return Err(AppError::NotFound(format!("Listing {} not found", listing_id)));
        }

        let id = uuid::Uuid::new_v4().to_string();
        let date = entry.date.unwrap_or_else(Utc::now);

        sqlx::query("INSERT INTO changelog (id, listing_id, version, date, notes) VALUES (?, ?, ?, ?, ?)")
            .bind(&id)
            .bind(listing_id)
            .bind(&entry.version)
            .bind(to_stored(&date))
            .bind(&entry.notes)
            .execute(&self.pool)
            .await?;

        Ok(ChangelogEntry {
            version: entry.version.clone(),
            date: from_stored(&to_stored(&date)),
            notes: entry.notes.clone(),
        })
    }

    // ==================== PROFILE OPERATIONS ====================

    /// Get the developer profile, if one has been published.
    pub async fn get_profile(&self) -> Result<Option<DeveloperProfile>, AppError> {
        let row = sqlx::query(
            "SELECT name, city, bio, skills, image_url, links, featured_listing_id FROM profile WHERE id = 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(|row| DeveloperProfile {
            name: row.get("name"),
            city: row.get("city"),
            bio: row.get("bio"),
            skills: parse_json_array(row.get("skills")),
            image_url: row.get("image_url"),
            links: parse_json_array(row.get("links")),
            featured_listing_id: row.get("featured_listing_id"),
        }))
    }

    /// Replace the developer profile.
    pub async fn put_profile(
        &self,
        profile: &DeveloperProfile,
    ) -> Result<DeveloperProfile, AppError> {
        if profile.name.trim().is_empty() {
            return Err(AppError::Validation("Name is required".to_string()));
        }

        let now = to_stored(&Utc::now());
        sqlx::query(
            r#"INSERT INTO profile (id, name, city, bio, skills, image_url, links, featured_listing_id, updated_at)
            VALUES (1, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name, city = excluded.city, bio = excluded.bio,
                skills = excluded.skills, image_url = excluded.image_url,
                links = excluded.links, featured_listing_id = excluded.featured_listing_id,
                updated_at = excluded.updated_at"#,
        )
        .bind(&profile.name)
        .bind(&profile.city)
        .bind(&profile.bio)
        .bind(serde_json::to_string(&profile.skills)?)
        .bind(&profile.image_url)
        .bind(serde_json::to_string(&profile.links)?)
        .bind(&profile.featured_listing_id)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        self.announce(Collection::Profile);
        Ok(profile.clone())
    }

    /// Remove the developer profile.
    pub async fn clear_profile(&self) -> Result<(), AppError> {
        sqlx::query("DELETE FROM profile WHERE id = 1")
            .execute(&self.pool)
            .await?;
        self.announce(Collection::Profile);
        Ok(())
    }

    // ==================== SEEDING ====================

    /// Import a seed document. Does nothing unless the store has no listings.
    /// Returns whether anything was imported.
    pub async fn import_seed(&self, seed: &SeedDocument) -> Result<bool, AppError> {
        if self.count_listings().await? > 0 {
            return Ok(false);
        }

        for item in &seed.listings {
            self.upsert_listing(&item.id, &item.listing).await?;
            for entry in &item.changelog {
                self.add_changelog_entry(&item.id, entry).await?;
            }
        }

        if let Some(profile) = &seed.profile {
            self.put_profile(profile).await?;
        }

        tracing::info!("Imported seed with {} listings", seed.listings.len());
        Ok(true)
    }
}

// Helper functions for row conversion

fn listing_from_row(row: &sqlx::sqlite::SqliteRow) -> Listing {
    let category: String = row.get("category");
    Listing {
        id: row.get("id"),
        name: row.get("name"),
        tagline: row.get("tagline"),
        description: row.get("description"),
        version: row.get("version"),
        category: Category::from_id_lossy(&category),
        category_name: String::new(),
        category_icon: String::new(),
        icon: row.get("icon"),
        screenshots: parse_json_array(row.get("screenshots")),
        package_url: row.get("package_url"),
        store_url: row.get("store_url"),
        release_date: from_stored(row.get("release_date")),
        downloads: non_negative(row.get("downloads")),
        rating: row.get("rating"),
        rating_count: non_negative(row.get("rating_count")),
        rating_sum: non_negative(row.get("rating_sum")),
    }
}

/// Timestamps are stored as fixed-width RFC 3339 UTC so text order is time order.
fn to_stored(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn from_stored(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|ts| ts.with_timezone(&Utc))
        .unwrap_or_else(|e| {
            tracing::warn!("Unreadable timestamp {:?}: {}", s, e);
            DateTime::<Utc>::UNIX_EPOCH
        })
}

fn non_negative(value: i64) -> u64 {
    value.max(0) as u64
}

fn parse_json_array(s: &str) -> Vec<String> {
    serde_json::from_str(s).unwrap_or_default()
}
