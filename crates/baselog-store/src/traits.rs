use async_trait::async_trait;
use baselog_types::{ContentId, JournalMetadata};

use crate::error::StoreResult;

/// Content-addressed store for journal notes.
///
/// Implementations must satisfy these invariants:
/// - `upload` stores the versioned envelope, never the bare metadata, and
///   performs at most one write per call.
/// - `fetch` is side-effect free and safe to call concurrently with
///   anything else, including an in-flight upload.
/// - Errors are surfaced as-is; nothing is retried internally.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Upload `metadata` and return the identifier the store assigned.
    async fn upload(&self, metadata: &JournalMetadata) -> StoreResult<ContentId>;

    /// Retrieve the note stored under `content_id`, unwrapping the envelope
    /// when present.
    async fn fetch(&self, content_id: &ContentId) -> StoreResult<JournalMetadata>;

    /// Pin content that already exists on the network under `content_id`.
    async fn pin(&self, content_id: &ContentId, name: Option<&str>) -> StoreResult<()>;
}
