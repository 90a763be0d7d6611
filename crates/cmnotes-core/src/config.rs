use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::constants::{self, app_names};

/// Namespace tag values for the three record families.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct AppNames {
    pub unified: String,
    pub individual: String,
    pub permission: String,
}

impl Default for AppNames {
    fn default() -> Self {
        Self {
            unified: app_names::UNIFIED.to_string(),
            individual: app_names::INDIVIDUAL.to_string(),
            permission: app_names::PERMISSION.to_string(),
        }
    }
}

/// Core configuration, loadable from a camelCase JSON file.
/// Every field is optional in the file and falls back to `constants`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CoreConfig {
    /// Directory holding `cache-<project>.json` snapshots and the session marker
    pub data_dir: PathBuf,
    pub graphql_url: String,
    pub gateway_url: String,
    pub page_size: u32,
    pub batch_size: usize,
    pub batch_delay_ms: u64,
    pub request_timeout_secs: u64,
    pub cache_ttl_secs: u64,
    pub refresh_interval_secs: u64,
    pub recent_limit: usize,
    /// Handles classified as dApps rather than people
    pub dapp_handles: Vec<String>,
    pub app_names: AppNames,
}

impl CoreConfig {
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            graphql_url: constants::GRAPHQL_URL.to_string(),
            gateway_url: constants::GATEWAY_URL.to_string(),
            page_size: constants::QUERY_PAGE_SIZE,
            batch_size: constants::BLOB_BATCH_SIZE,
            batch_delay_ms: constants::BLOB_BATCH_DELAY_MS,
            request_timeout_secs: constants::REQUEST_TIMEOUT_SECS,
            cache_ttl_secs: constants::CACHE_TTL_SECS,
            refresh_interval_secs: constants::REFRESH_INTERVAL_SECS,
            recent_limit: constants::RECENT_LIMIT,
            dapp_handles: Vec::new(),
            app_names: AppNames::default(),
        }
    }

    /// Load config from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: CoreConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .map(|d| d.join("cmnotes"))
            .unwrap_or_else(|| PathBuf::from("cmnotes_data"));
        Self::new(data_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config_minimal() {
        let config: CoreConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.cache_ttl_secs, 300);
        assert_eq!(config.refresh_interval_secs, 60);
        assert_eq!(config.recent_limit, 10);
        assert_eq!(config.app_names, AppNames::default());
    }

    #[test]
    fn test_parse_config_overrides() {
        let json = r#"{
            "dataDir": "/tmp/cmnotes-test",
            "batchSize": 5,
            "dappHandles": ["@SomeDapp"],
            "appNames": { "unified": "Custom-Unified" }
        }"#;
        let config: CoreConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/tmp/cmnotes-test"));
        assert_eq!(config.batch_size, 5);
        assert_eq!(config.dapp_handles, vec!["@SomeDapp".to_string()]);
        assert_eq!(config.app_names.unified, "Custom-Unified");
        assert_eq!(config.app_names.permission, app_names::PERMISSION);
    }

    #[test]
    fn test_load_missing_file_has_context() {
        let err = CoreConfig::load(Path::new("/nonexistent/cmnotes.json")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
