use std::collections::BTreeMap;

use baselog_types::{EnrichedMetadata, JournalMetadata};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Wrap caller metadata in the versioned envelope, stamped at `now`.
pub fn envelope(metadata: &JournalMetadata, now: DateTime<Utc>) -> EnrichedMetadata {
    EnrichedMetadata::new(
        metadata.clone(),
        now.to_rfc3339_opts(SecondsFormat::Millis, true),
    )
}

/// Store-side indexing tags attached to every upload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexTags {
    pub tx_hash: String,
    pub timestamp: String,
    pub category: String,
}

impl IndexTags {
    pub fn for_metadata(metadata: &JournalMetadata) -> Self {
        Self {
            tx_hash: metadata.tx_hash.to_hex(),
            timestamp: metadata.timestamp.to_string(),
            category: metadata.effective_category().to_string(),
        }
    }

    fn into_keyvalues(self) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("txHash".to_string(), self.tx_hash),
            ("timestamp".to_string(), self.timestamp),
            ("category".to_string(), self.category),
        ])
    }
}

/// Pin-level metadata understood by the pinning service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinMetadata {
    pub name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub keyvalues: BTreeMap<String, String>,
}

/// JSON body of a pin-JSON upload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PinRequest {
    pub pinata_content: EnrichedMetadata,
    pub pinata_metadata: PinMetadata,
}

impl PinRequest {
    /// Build the upload body for `metadata`: envelope plus indexing tags.
    pub fn new(metadata: &JournalMetadata, now: DateTime<Utc>) -> Self {
        Self {
            pinata_content: envelope(metadata, now),
            pinata_metadata: PinMetadata {
                name: format!("baselog-{}", metadata.tx_hash),
                keyvalues: IndexTags::for_metadata(metadata).into_keyvalues(),
            },
        }
    }
}

/// JSON body of a pin-by-hash request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PinByHashRequest {
    pub hash_to_pin: String,
    pub pinata_metadata: PinMetadata,
}
