use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default pinning-service API base URL.
pub const DEFAULT_API_URL: &str = "https://api.pinata.cloud";

/// Default read gateways, tried in order.
pub const DEFAULT_GATEWAYS: &[&str] = &[
    "https://gateway.pinata.cloud/ipfs",
    "https://ipfs.io/ipfs",
    "https://dweb.link/ipfs",
];

/// Configuration for the content store client.
///
/// Read-only after the client is constructed.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Base URL of the pinning API (write endpoint).
    pub api_url: String,
    /// Bearer credential for the write endpoint. Uploads fail fast
    /// without it; reads never need it.
    pub credential: Option<String>,
    /// Ordered gateway base URLs; the content id is appended as a path
    /// segment.
    pub gateways: Vec<String>,
    /// Timeout for a single upload or pin request.
    pub upload_timeout_secs: u64,
    /// Timeout for a single gateway read.
    pub fetch_timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            credential: None,
            gateways: DEFAULT_GATEWAYS.iter().map(|g| g.to_string()).collect(),
            upload_timeout_secs: 30,
            fetch_timeout_secs: 10,
        }
    }
}

impl StoreConfig {
    pub fn with_credential(mut self, credential: impl Into<String>) -> Self {
        self.credential = Some(credential.into());
        self
    }

    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    pub fn with_gateways<I, S>(mut self, gateways: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.gateways = gateways.into_iter().map(Into::into).collect();
        self
    }

    /// The credential, if present and non-blank.
    pub fn credential(&self) -> Option<&str> {
        self.credential
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }

    pub fn upload_timeout(&self) -> Duration {
        Duration::from_secs(self.upload_timeout_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

impl fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConfig")
            .field("api_url", &self.api_url)
            .field("credential", &self.credential().map(|_| "<redacted>"))
            .field("gateways", &self.gateways)
            .field("upload_timeout_secs", &self.upload_timeout_secs)
            .field("fetch_timeout_secs", &self.fetch_timeout_secs)
            .finish()
    }
}
