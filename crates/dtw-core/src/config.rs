use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants::{
    CACHE_SLOT, DEFAULT_MAX_FOLLOWUP_FETCHES, DEFAULT_MODERATION_API_VERSION,
    DEFAULT_MODERATION_TIMEOUT_SECS,
};
use crate::error::{CoreError, Result};
use crate::store::CacheStore;

/// Overrides the moderation API key from the config file.
pub const MODERATION_API_KEY_ENV: &str = "DTW_MODERATION_API_KEY";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CoreConfig {
    pub data_dir: PathBuf,
    pub cache_slot: String,
    pub max_followup_fetches: u32,
    pub moderation: Option<ModerationConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModerationConfig {
    pub base_url: String,
    pub api_version: String,
    pub api_key: String,
    pub timeout_secs: u64,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_version: DEFAULT_MODERATION_API_VERSION.to_string(),
            api_key: String::new(),
            timeout_secs: DEFAULT_MODERATION_TIMEOUT_SECS,
        }
    }
}

impl CoreConfig {
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            cache_slot: CACHE_SLOT.to_string(),
            max_followup_fetches: DEFAULT_MAX_FOLLOWUP_FETCHES,
            moderation: None,
        }
    }

    /// Read a JSON config file, then apply environment overrides.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            CoreError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        let mut config: CoreConfig = serde_json::from_str(&content).map_err(|e| {
            CoreError::Config(format!("failed to parse {}: {}", path.display(), e))
        })?;
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env(&mut self) {
        if let Ok(key) = std::env::var(MODERATION_API_KEY_ENV) {
            self.override_api_key(key);
        }
    }

    /// Blank keys are ignored. Has no effect without a moderation section.
    pub fn override_api_key(&mut self, key: impl Into<String>) {
        let key = key.into();
        if key.trim().is_empty() {
            return;
        }
        if let Some(moderation) = self.moderation.as_mut() {
            moderation.api_key = key;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.cache_slot.trim().is_empty() {
            return Err(CoreError::Config("cacheSlot must not be empty".into()));
        }
        if self
            .cache_slot
            .chars()
            .any(|c| std::path::is_separator(c) || c == '.')
        {
            return Err(CoreError::Config(format!(
                "cacheSlot {:?} must be a plain name",
                self.cache_slot
            )));
        }
        if let Some(moderation) = &self.moderation {
            if moderation.base_url.trim().is_empty() {
                return Err(CoreError::Config("moderation.baseUrl is required".into()));
            }
        }
        Ok(())
    }

    pub fn cache_store(&self) -> CacheStore {
        CacheStore::new(&self.data_dir, &self.cache_slot)
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .map(|dir| dir.join("dtw"))
            .unwrap_or_else(|| PathBuf::from("dtw_data"));
        Self::new(data_dir)
    }
}
