use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use dtw_core::{CoreConfig, ModerationConfig};
use serde::{Deserialize, Serialize};

/// CLI configuration that can be loaded from a JSON file.
///
/// Every field is optional; anything missing falls back to the core defaults.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CliConfig {
    /// Directory holding the tweet cache slot
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_slot: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_followup_fetches: Option<u32>,

    /// Moderation service; without it messages are never flagged
    #[serde(skip_serializing_if = "Option::is_none")]
    pub moderation: Option<ModerationConfig>,
}

impl CliConfig {
    /// Load config from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: CliConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Resolve into a core config. `--data-dir` wins over the file.
    pub fn into_core(self, data_dir: Option<PathBuf>) -> Result<CoreConfig> {
        let mut core = match data_dir.or(self.data_dir) {
            Some(dir) => CoreConfig::new(dir),
            None => CoreConfig::default(),
        };
        if let Some(slot) = self.cache_slot {
            core.cache_slot = slot;
        }
        if let Some(max) = self.max_followup_fetches {
            core.max_followup_fetches = max;
        }
        core.moderation = self.moderation;
        core.apply_env();
        core.validate().context("Invalid configuration")?;
        Ok(core)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config_minimal() {
        let config: CliConfig = serde_json::from_str("{}").unwrap();
        assert!(config.data_dir.is_none());
        assert!(config.moderation.is_none());

        let core = config.into_core(Some(PathBuf::from("/tmp/dtw"))).unwrap();
        assert_eq!(core.data_dir, PathBuf::from("/tmp/dtw"));
        assert_eq!(core.cache_slot, "tweetsCache");
    }

    #[test]
    fn test_flag_overrides_file() {
        let json = r#"{
            "dataDir": "/var/lib/dtw",
            "cacheSlot": "feed",
            "maxFollowupFetches": 1
        }"#;
        let config: CliConfig = serde_json::from_str(json).unwrap();

        let from_file = config.clone().into_core(None).unwrap();
        assert_eq!(from_file.data_dir, PathBuf::from("/var/lib/dtw"));
        assert_eq!(from_file.cache_slot, "feed");
        assert_eq!(from_file.max_followup_fetches, 1);

        let from_flag = config.into_core(Some(PathBuf::from("/tmp/other"))).unwrap();
        assert_eq!(from_flag.data_dir, PathBuf::from("/tmp/other"));
    }

    #[test]
    fn test_parse_config_with_moderation() {
        let json = r#"{
            "moderation": {
                "baseUrl": "https://mod.example",
                "apiKey": "secret",
                "timeoutSecs": 3
            }
        }"#;
        let config: CliConfig = serde_json::from_str(json).unwrap();
        let moderation = config.moderation.unwrap();
        assert_eq!(moderation.base_url, "https://mod.example");
        assert_eq!(moderation.timeout_secs, 3);
        assert_eq!(moderation.api_version, "2023-06-01-preview");
    }

    #[test]
    fn test_invalid_slot_is_rejected() {
        let config: CliConfig = serde_json::from_str(r#"{"cacheSlot": "a/b"}"#).unwrap();
        assert!(config.into_core(Some(PathBuf::from("/tmp/dtw"))).is_err());
    }
}
