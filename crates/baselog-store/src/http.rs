use async_trait::async_trait;
use baselog_types::{ContentId, JournalMetadata, StoredNote};
use chrono::Utc;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::StoreConfig;
use crate::envelope::{PinByHashRequest, PinMetadata, PinRequest};
use crate::error::{GatewayFailure, GatewayReason, StoreError, StoreResult};
use crate::traits::ContentStore;

/// Content store backed by a pinning-service HTTP API and public gateways.
///
/// # Example
///
/// ```rust,no_run
/// use baselog_store::{ContentStore, HttpContentStore, StoreConfig};
/// use baselog_types::ContentId;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = HttpContentStore::new(StoreConfig::default().with_credential("jwt"))?;
/// let note = store.fetch(&ContentId::new("bafy...")).await?;
/// println!("{}", note.title);
/// # Ok(())
/// # }
/// ```
pub struct HttpContentStore {
    config: StoreConfig,
    client: Client,
}

#[derive(Deserialize)]
struct PinResponse {
    #[serde(rename = "IpfsHash")]
    ipfs_hash: Option<String>,
}

impl HttpContentStore {
    pub fn new(config: StoreConfig) -> StoreResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| StoreError::NotConfigured(format!("cannot build HTTP client: {e}")))?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    fn credential(&self) -> StoreResult<&str> {
        self.config
            .credential()
            .ok_or_else(|| StoreError::NotConfigured("no store credential configured".into()))
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_url.trim_end_matches('/'), path)
    }

    /// Send an authenticated write and map every failure into the store
    /// taxonomy.
    async fn post_json<T: serde::Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> StoreResult<reqwest::Response> {
        let credential = self.credential()?;
        let url = self.api_url(path);
        debug!(%url, "content store write");

        let response = self
            .client
            .post(&url)
            .bearer_auth(credential)
            .timeout(self.config.upload_timeout())
            .json(body)
            .send()
            .await
            .map_err(|e| network_error(&e, self.config.upload_timeout_secs))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let text = response.text().await.unwrap_or_default();
        Err(map_status(status, &text))
    }

    async fn fetch_from(
        &self,
        gateway: &str,
        content_id: &ContentId,
    ) -> Result<JournalMetadata, GatewayReason> {
        let url = gateway_url(gateway, content_id);
        let response = self
            .client
            .get(&url)
            .timeout(self.config.fetch_timeout())
            .send()
            .await
            .map_err(|e| gateway_reason(&e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayReason::Status(status.as_u16()));
        }

        let body = response.bytes().await.map_err(|e| gateway_reason(&e))?;
        let note: StoredNote =
            serde_json::from_slice(&body).map_err(|e| GatewayReason::Malformed(e.to_string()))?;
        if !note.is_enveloped() {
            debug!(%content_id, "gateway returned un-enveloped note");
        }
        Ok(note.into_metadata())
    }
}

#[async_trait]
impl ContentStore for HttpContentStore {
    async fn upload(&self, metadata: &JournalMetadata) -> StoreResult<ContentId> {
        let body = PinRequest::new(metadata, Utc::now());
        let response = self.post_json("/pinning/pinJSONToIPFS", &body).await?;

        let pinned: PinResponse = response
            .json()
            .await
            .map_err(|e| StoreError::UploadFailed(format!("unreadable store response: {e}")))?;
        let content_id = pinned
            .ipfs_hash
            .filter(|h| !h.trim().is_empty())
            .map(ContentId::new)
            .ok_or_else(|| StoreError::UploadFailed("store response carried no IpfsHash".into()))?;

        info!(tx_hash = %metadata.tx_hash, %content_id, "note pinned");
        Ok(content_id)
    }

    async fn fetch(&self, content_id: &ContentId) -> StoreResult<JournalMetadata> {
        if content_id.is_blank() {
            return Err(StoreError::InvalidContentId(content_id.to_string()));
        }
        if self.config.gateways.is_empty() {
            return Err(StoreError::NotConfigured("no read gateways configured".into()));
        }

        let mut last_failure = None;
        for (index, gateway) in self.config.gateways.iter().enumerate() {
            match self.fetch_from(gateway, content_id).await {
                Ok(metadata) => {
                    debug!(%content_id, gateway = %gateway, attempt = index + 1, "note fetched");
                    return Ok(metadata);
                }
                Err(reason) => {
                    warn!(%content_id, gateway = %gateway, %reason, "gateway read failed");
                    last_failure = Some(GatewayFailure {
                        gateway: gateway.clone(),
                        reason,
                    });
                }
            }
        }

        match last_failure {
            Some(last) => Err(StoreError::AllGatewaysFailed {
                attempts: self.config.gateways.len(),
                last,
            }),
            None => Err(StoreError::NotConfigured("no read gateways configured".into())),
        }
    }

    async fn pin(&self, content_id: &ContentId, name: Option<&str>) -> StoreResult<()> {
        if content_id.is_blank() {
            return Err(StoreError::InvalidContentId(content_id.to_string()));
        }
        let body = PinByHashRequest {
            hash_to_pin: content_id.to_string(),
            pinata_metadata: PinMetadata {
                name: name
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("BaseLog-{content_id}")),
                keyvalues: Default::default(),
            },
        };
        self.post_json("/pinning/pinByHash", &body).await?;
        info!(%content_id, "pin by hash requested");
        Ok(())
    }
}

impl std::fmt::Debug for HttpContentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpContentStore")
            .field("config", &self.config)
            .finish()
    }
}

fn gateway_url(gateway: &str, content_id: &ContentId) -> String {
    format!("{}/{}", gateway.trim_end_matches('/'), content_id)
}

fn network_error(e: &reqwest::Error, timeout_secs: u64) -> StoreError {
    if e.is_timeout() {
        StoreError::NetworkError(format!("no response within {timeout_secs}s"))
    } else {
        StoreError::NetworkError(e.to_string())
    }
}

fn gateway_reason(e: &reqwest::Error) -> GatewayReason {
    if e.is_timeout() {
        GatewayReason::Timeout
    } else {
        GatewayReason::Transport(e.to_string())
    }
}

fn map_status(status: StatusCode, body: &str) -> StoreError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => StoreError::AuthFailed {
            status: status.as_u16(),
        },
        StatusCode::TOO_MANY_REQUESTS => StoreError::RateLimited,
        _ => StoreError::UploadFailed(store_message(status, body)),
    }
}

/// Pull a human-readable message out of a store error body.
fn store_message(status: StatusCode, body: &str) -> String {
    if let Ok(json) = serde_json::from_str::<serde_json::Value>(body) {
        let error = &json["error"];
        let candidates = [
            error.as_str(),
            error["details"].as_str(),
            error["reason"].as_str(),
            json["message"].as_str(),
        ];
        if let Some(message) = candidates.into_iter().flatten().find(|m| !m.is_empty()) {
            return message.to_string();
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        trimmed.to_string()
    }
}
