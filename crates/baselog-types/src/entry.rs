use serde::{Deserialize, Serialize};

use crate::content::ContentId;

/// What the registry holds for one `(account, tx hash)` pair.
///
/// Existence is binary. The registry treats entries as write-once; the
/// commit pipeline does not enforce that itself.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryEntry {
    pub content_id: ContentId,
    /// Timestamp recorded by the registry at write time.
    pub timestamp: u64,
}

impl RegistryEntry {
    pub fn new(content_id: impl Into<ContentId>, timestamp: u64) -> Self {
        Self {
            content_id: content_id.into(),
            timestamp,
        }
    }
}
