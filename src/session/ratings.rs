//! Device-local memory of which listings were already rated.
//!
//! Stored as a JSON object of `{ "<listing id>": true }`. Advisory only: the
//! store accepts ratings from anyone.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::errors::AppError;

#[derive(Debug)]
pub struct RatingMemory {
    path: PathBuf,
    rated: BTreeMap<String, bool>,
}

impl RatingMemory {
    /// Load the memory file. A missing file is an empty memory; an unreadable
    /// one is logged and started over.
    pub async fn load(path: &Path) -> Result<Self, AppError> {
        let rated = match tokio::fs::read_to_string(path).await {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                tracing::warn!("Ignoring unreadable rating memory {:?}: {}", path, e);
                BTreeMap::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path: path.to_path_buf(),
            rated,
        })
    }

    pub fn has_rated(&self, listing_id: &str) -> bool {
        self.rated.get(listing_id).copied().unwrap_or(false)
    }

    /// Record a rating and write the file through.
    pub async fn remember(&mut self, listing_id: &str) -> Result<(), AppError> {
        self.rated.insert(listing_id.to_string(), true);

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serde_json::to_vec_pretty(&self.rated)?).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}
