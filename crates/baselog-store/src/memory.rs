use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, RwLock};

use async_trait::async_trait;
use baselog_types::{ContentId, JournalMetadata, StoredNote};
use chrono::Utc;
use tracing::debug;

use crate::envelope::envelope;
use crate::error::{GatewayFailure, GatewayReason, StoreError, StoreResult};
use crate::traits::ContentStore;

const MEMORY_GATEWAY: &str = "memory";

/// In-memory, HashMap-based content store.
///
/// Intended for tests and embedding. Payloads are kept as JSON exactly as
/// an HTTP store would hold them, so the envelope round trip is exercised.
/// Identifiers are derived from a BLAKE3 hash of the payload unless one is
/// queued with [`Self::queue_id`]; failures can be queued with
/// [`Self::fail_next_upload`].
pub struct InMemoryContentStore {
    objects: RwLock<HashMap<ContentId, serde_json::Value>>,
    uploads: AtomicUsize,
    queued_ids: Mutex<VecDeque<ContentId>>,
    queued_failures: Mutex<VecDeque<StoreError>>,
    pins: Mutex<Vec<(ContentId, String)>>,
}

impl InMemoryContentStore {
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
            uploads: AtomicUsize::new(0),
            queued_ids: Mutex::new(VecDeque::new()),
            queued_failures: Mutex::new(VecDeque::new()),
            pins: Mutex::new(Vec::new()),
        }
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.objects.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.read().expect("lock poisoned").is_empty()
    }

    /// Number of `upload` calls received, successful or not.
    pub fn upload_count(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }

    /// Make the next successful upload return `id`.
    pub fn queue_id(&self, id: impl Into<ContentId>) {
        self.queued_ids
            .lock()
            .expect("lock poisoned")
            .push_back(id.into());
    }

    /// Make the next upload fail with `error`.
    pub fn fail_next_upload(&self, error: StoreError) {
        self.queued_failures
            .lock()
            .expect("lock poisoned")
            .push_back(error);
    }

    /// Store a raw payload under `id`, bypassing the envelope.
    pub fn insert_raw(&self, id: impl Into<ContentId>, payload: serde_json::Value) {
        self.objects
            .write()
            .expect("lock poisoned")
            .insert(id.into(), payload);
    }

    /// The raw stored payload for `id`.
    pub fn payload(&self, id: &ContentId) -> Option<serde_json::Value> {
        self.objects.read().expect("lock poisoned").get(id).cloned()
    }

    /// Pin requests received so far, in order.
    pub fn pins(&self) -> Vec<(ContentId, String)> {
        self.pins.lock().expect("lock poisoned").clone()
    }

    fn derive_id(payload: &serde_json::Value) -> ContentId {
        let bytes = serde_json::to_vec(payload).unwrap_or_default();
        let digest = blake3::hash(&bytes);
        ContentId::new(format!("bafk{}", &hex::encode(digest.as_bytes())[..52]))
    }

    fn missing(reason: GatewayReason) -> StoreError {
        StoreError::AllGatewaysFailed {
            attempts: 1,
            last: GatewayFailure {
                gateway: MEMORY_GATEWAY.into(),
                reason,
            },
        }
    }
}

impl Default for InMemoryContentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentStore for InMemoryContentStore {
    async fn upload(&self, metadata: &JournalMetadata) -> StoreResult<ContentId> {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self
            .queued_failures
            .lock()
            .expect("lock poisoned")
            .pop_front()
        {
            return Err(error);
        }

        let payload = serde_json::to_value(envelope(metadata, Utc::now()))
            .map_err(|e| StoreError::UploadFailed(e.to_string()))?;
        let id = self
            .queued_ids
            .lock()
            .expect("lock poisoned")
            .pop_front()
            .unwrap_or_else(|| Self::derive_id(&payload));

        debug!(tx_hash = %metadata.tx_hash, content_id = %id, "stored note in memory");
        self.objects
            .write()
            .expect("lock poisoned")
            .insert(id.clone(), payload);
        Ok(id)
    }

    async fn fetch(&self, content_id: &ContentId) -> StoreResult<JournalMetadata> {
        if content_id.is_blank() {
            return Err(StoreError::InvalidContentId(content_id.to_string()));
        }
        let payload = self
            .payload(content_id)
            .ok_or_else(|| Self::missing(GatewayReason::Status(404)))?;
        let note: StoredNote = serde_json::from_value(payload)
            .map_err(|e| Self::missing(GatewayReason::Malformed(e.to_string())))?;
        Ok(note.into_metadata())
    }

    async fn pin(&self, content_id: &ContentId, name: Option<&str>) -> StoreResult<()> {
        if content_id.is_blank() {
            return Err(StoreError::InvalidContentId(content_id.to_string()));
        }
        let name = name
            .map(str::to_string)
            .unwrap_or_else(|| format!("BaseLog-{content_id}"));
        self.pins
            .lock()
            .expect("lock poisoned")
            .push((content_id.clone(), name));
        Ok(())
    }
}

impl std::fmt::Debug for InMemoryContentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryContentStore")
            .field("object_count", &self.len())
            .field("upload_count", &self.upload_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use baselog_types::TxHash;
    use serde_json::json;

    use super::*;

    fn sample() -> JournalMetadata {
        JournalMetadata::new("Coffee", TxHash::from_bytes([7; 32]), 1_700_000_000_000)
    }

    #[tokio::test]
    async fn upload_then_fetch() {
        let store = InMemoryContentStore::new();
        let id = store.upload(&sample()).await.unwrap();
        assert!(id.as_str().starts_with("bafk"));
        assert_eq!(store.fetch(&id).await.unwrap(), sample());
        assert_eq!(store.upload_count(), 1);
    }

    #[tokio::test]
    async fn stored_payload_is_enveloped() {
        let store = InMemoryContentStore::new();
        let id = store.upload(&sample()).await.unwrap();
        let payload = store.payload(&id).unwrap();
        assert_eq!(payload["version"], "1.0");
        assert!(payload["createdAt"].as_str().unwrap().ends_with('Z'));
        assert_eq!(payload["metadata"]["title"], "Coffee");
    }

    #[tokio::test]
    async fn queued_id_is_used_once() {
        let store = InMemoryContentStore::new();
        store.queue_id("bafy123");
        assert_eq!(store.upload(&sample()).await.unwrap().as_str(), "bafy123");
        assert_ne!(store.upload(&sample()).await.unwrap().as_str(), "bafy123");
    }

    #[tokio::test]
    async fn queued_failure_is_returned_and_nothing_stored() {
        let store = InMemoryContentStore::new();
        store.fail_next_upload(StoreError::RateLimited);
        assert_eq!(store.upload(&sample()).await.unwrap_err(), StoreError::RateLimited);
        assert!(store.is_empty());
        assert_eq!(store.upload_count(), 1);
    }

    #[tokio::test]
    async fn fetch_missing_and_malformed() {
        let store = InMemoryContentStore::new();
        let err = store.fetch(&ContentId::new("nope")).await.unwrap_err();
        assert!(matches!(err, StoreError::AllGatewaysFailed { attempts: 1, .. }));

        store.insert_raw("junk", json!({ "not": "a note" }));
        let err = store.fetch(&ContentId::new("junk")).await.unwrap_err();
        match err {
            StoreError::AllGatewaysFailed { last, .. } => {
                assert!(matches!(last.reason, GatewayReason::Malformed(_)))
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn pin_records_default_name() {
        let store = InMemoryContentStore::new();
        store.pin(&ContentId::new("bafy9"), None).await.unwrap();
        store.pin(&ContentId::new("bafy10"), Some("mine")).await.unwrap();
        assert_eq!(
            store.pins(),
            vec![
                (ContentId::new("bafy9"), "BaseLog-bafy9".to_string()),
                (ContentId::new("bafy10"), "mine".to_string()),
            ]
        );
    }
}
