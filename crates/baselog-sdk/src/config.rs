use std::fmt;
use std::path::Path;
use std::time::Duration;

use baselog_pipeline::PipelineConfig;
use baselog_registry::RegistryConfig;
use baselog_store::StoreConfig;
use serde::{Deserialize, Serialize};

use crate::error::{SdkError, SdkResult};

/// Complete client configuration, one TOML table per component.
///
/// ```toml
/// [store]
/// credential = "..."
/// gateways = ["https://gateway.pinata.cloud/ipfs"]
///
/// [registry]
/// rpc_url = "https://mainnet.base.org"
/// contract = "0x..."
///
/// [pipeline]
/// confirmation_timeout_ms = 120000
///
/// [indexer]
/// api_key = "..."
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JournalConfig {
    pub store: StoreConfig,
    pub registry: RegistryConfig,
    pub pipeline: PipelineConfig,
    pub indexer: IndexerConfig,
}

/// Default transaction indexer API base URL.
pub const DEFAULT_INDEXER_URL: &str = "https://api.covalenthq.com/v1";

/// Chain id of Base mainnet.
pub const BASE_CHAIN_ID: u64 = 8453;

/// Configuration for the HTTP transaction indexer.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexerConfig {
    pub api_url: String,
    pub api_key: Option<String>,
    pub chain_id: u64,
    /// Transactions requested per listing.
    pub page_size: u32,
    pub timeout_secs: u64,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_INDEXER_URL.to_string(),
            api_key: None,
            chain_id: BASE_CHAIN_ID,
            page_size: 100,
            timeout_secs: 15,
        }
    }
}

impl IndexerConfig {
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// The API key, if present and non-blank.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl fmt::Debug for IndexerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexerConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &self.api_key().map(|_| "<redacted>"))
            .field("chain_id", &self.chain_id)
            .field("page_size", &self.page_size)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl JournalConfig {
    pub fn from_toml_str(s: &str) -> SdkResult<Self> {
        toml::from_str(s).map_err(|e| SdkError::Config(e.to_string()))
    }

    pub fn load(path: impl AsRef<Path>) -> SdkResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| SdkError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&text)
    }

    /// Like [`Self::load`], but a missing file yields the defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> SdkResult<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn to_toml_string(&self) -> SdkResult<String> {
        toml::to_string_pretty(self).map_err(|e| SdkError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::time::Duration;

    use baselog_types::Address;

    use super::*;

    #[test]
    fn empty_document_is_default() {
        assert_eq!(JournalConfig::from_toml_str("").unwrap(), JournalConfig::default());
    }

    #[test]
    fn partial_tables_keep_other_defaults() {
        let config = JournalConfig::from_toml_str(
            r#"
            [store]
            credential = "jwt"
            gateways = ["https://a.example/ipfs"]

            [registry]
            contract = "0x00000000000000000000000000000000000000cc"
            poll_interval_ms = 500

            [pipeline]
            confirmation_timeout_ms = 60000
            "#,
        )
        .unwrap();

        assert_eq!(config.store.credential(), Some("jwt"));
        assert_eq!(config.store.gateways, vec!["https://a.example/ipfs".to_string()]);
        assert_eq!(config.store.upload_timeout(), Duration::from_secs(30));

        let mut contract = [0u8; 20];
        contract[19] = 0xcc;
        assert_eq!(config.registry.contract, Some(Address::from_bytes(contract)));
        assert_eq!(config.registry.poll_interval(), Duration::from_millis(500));
        assert_eq!(
            config.pipeline.confirmation_timeout(),
            Some(Duration::from_secs(60))
        );
    }

    #[test]
    fn indexer_defaults_to_base_mainnet() {
        let config = JournalConfig::from_toml_str("[indexer]\napi_key = \"ckey\"").unwrap();
        assert_eq!(config.indexer.chain_id, BASE_CHAIN_ID);
        assert_eq!(config.indexer.api_url, DEFAULT_INDEXER_URL);
        assert_eq!(config.indexer.api_key(), Some("ckey"));
        assert_eq!(config.indexer.timeout(), Duration::from_secs(15));
        assert!(!format!("{:?}", config.indexer).contains("ckey"));
    }

    #[test]
    fn bad_values_are_config_errors() {
        let err = JournalConfig::from_toml_str("[registry]\ncontract = \"0x12\"").unwrap_err();
        assert!(matches!(err, SdkError::Config(_)));
    }

    #[test]
    fn load_from_file_and_missing_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[pipeline]\nconfirmation_timeout_ms = 1000").unwrap();
        let config = JournalConfig::load(file.path()).unwrap();
        assert_eq!(config.pipeline.confirmation_timeout_ms, Some(1000));

        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("baselog.toml");
        assert!(matches!(JournalConfig::load(&missing), Err(SdkError::Io { .. })));
        assert_eq!(
            JournalConfig::load_or_default(&missing).unwrap(),
            JournalConfig::default()
        );
    }

    #[test]
    fn toml_output_parses_back() {
        let mut config = JournalConfig::default();
        config.store.credential = Some("jwt".into());
        let text = config.to_toml_string().unwrap();
        assert_eq!(JournalConfig::from_toml_str(&text).unwrap(), config);
    }
}
