//! On-disk snapshot of the tracked listings.
//!
//! The live set is written as `{"upcoming_listings": [...]}` after every
//! cycle and read back once at startup. Writes go to a sibling temp file
//! that is then renamed over the snapshot.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, info, warn};

use crate::error::SnapshotError;
use crate::models::Listing;

#[derive(Debug, Default, Serialize, Deserialize)]
struct SnapshotDocument {
    #[serde(default)]
    upcoming_listings: Vec<Listing>,
}

#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Previously saved listings; a missing or unreadable snapshot is empty.
    pub async fn load(&self) -> Vec<Listing> {
        match self.try_load().await {
            Ok(listings) => {
                info!(
                    "Restored {} listings from {}",
                    listings.len(),
                    self.path.display()
                );
                listings
            }
            Err(SnapshotError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No snapshot at {}, starting empty", self.path.display());
                Vec::new()
            }
            Err(e) => {
                warn!("Ignoring snapshot {}: {}", self.path.display(), e);
                Vec::new()
            }
        }
    }

    async fn try_load(&self) -> Result<Vec<Listing>, SnapshotError> {
        let raw = fs::read_to_string(&self.path).await?;
        let document: SnapshotDocument = serde_json::from_str(&raw)?;
        Ok(document.upcoming_listings)
    }

    pub async fn save(&self, listings: &[Listing]) -> Result<(), SnapshotError> {
        let document = SnapshotDocument {
            upcoming_listings: listings.to_vec(),
        };
        let body = serde_json::to_string_pretty(&document)?;

        let tmp = self.tmp_path();
        fs::write(&tmp, body).await?;
        fs::rename(&tmp, &self.path).await?;

        debug!("Saved {} listings to {}", listings.len(), self.path.display());
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}
