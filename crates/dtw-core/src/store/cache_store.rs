//! Durable single-slot tweet cache.
//!
//! Holds the last tweet list known to be valid as a JSON array in
//! `<data_dir>/<slot>.json`, with identifiers in their string projection.
//! It is read once when the feed mounts to give an immediate first paint and
//! overwritten after every successful non-empty fetch.
//!
//! # Load policy
//! - Missing file: nothing cached.
//! - Unreadable file or a document that is not a JSON array: discarded with a
//!   warning, treated as nothing cached.
//! - Individual records that fail to parse or carry malformed identifiers are
//!   dropped; the remaining records are returned in order.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{CoreError, Result};
use crate::models::{normalize_tweets, RawTweet, Tweet};

pub struct CacheStore {
    slot: String,
    path: PathBuf,
}

impl CacheStore {
    pub fn new<P: AsRef<Path>>(data_dir: P, slot: &str) -> Self {
        Self {
            slot: slot.to_string(),
            path: data_dir.as_ref().join(format!("{}.json", slot)),
        }
    }

    pub fn slot(&self) -> &str {
        &self.slot
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the slot. Returns `None` when there is nothing usable.
    pub fn load(&self) -> Option<Vec<Tweet>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!("cache: failed to read slot {}: {}", self.slot, e);
                return None;
            }
        };

        let values: Vec<serde_json::Value> = match serde_json::from_str(&contents) {
            Ok(values) => values,
            Err(e) => {
                tracing::warn!("cache: discarding corrupt slot {}: {}", self.slot, e);
                return None;
            }
        };

        let total = values.len();
        let raw: Vec<RawTweet> = values
            .into_iter()
            .filter_map(|value| match serde_json::from_value::<RawTweet>(value) {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::warn!("cache: dropping unparsable record: {}", e);
                    None
                }
            })
            .collect();

        let tweets = normalize_tweets(raw, "cache");
        tracing::debug!(
            "cache: loaded {} of {} records from slot {}",
            tweets.len(),
            total,
            self.slot
        );
        Some(tweets)
    }

    /// Overwrite the slot with `tweets`.
    ///
    /// Writes to a temp file and renames it over the slot so a crash mid-write
    /// never leaves a truncated document behind.
    pub fn save(&self, tweets: &[Tweet]) -> Result<()> {
        let write_err = |e: std::io::Error| CoreError::Cache(format!("slot {}: {}", self.slot, e));

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }

        let json = serde_json::to_string(tweets)?;
        let temp_file = self.path.with_extension("json.tmp");

        fs::write(&temp_file, json).map_err(write_err)?;
        fs::rename(&temp_file, &self.path).map_err(write_err)?;

        tracing::info!("cache: persisted {} records to slot {}", tweets.len(), self.slot);
        Ok(())
    }
}
