use serde::{Deserialize, Serialize};

use crate::hash::{Address, TxHash};

/// Schema version stamped on every envelope written by BaseLog.
pub const SCHEMA_VERSION: &str = "1.0";

/// The note a wallet owner attaches to a transaction.
///
/// Produced by the caller, consumed by the commit pipeline. Field names
/// serialize in camelCase (`txHash`) to stay readable by other clients of
/// the same store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalMetadata {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Epoch milliseconds.
    pub timestamp: u64,
    pub tx_hash: TxHash,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<Address>,
}

impl JournalMetadata {
    pub fn new(title: impl Into<String>, tx_hash: TxHash, timestamp: u64) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            category: None,
            tags: Vec::new(),
            timestamp,
            tx_hash,
            amount: None,
            from: None,
            to: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn with_amount(mut self, amount: impl Into<String>) -> Self {
        self.amount = Some(amount.into());
        self
    }

    pub fn with_counterparties(mut self, from: Address, to: Option<Address>) -> Self {
        self.from = Some(from);
        self.to = to;
        self
    }

    /// Returns `true` if the title is empty or whitespace only.
    pub fn title_is_blank(&self) -> bool {
        self.title.trim().is_empty()
    }

    /// Category used for store-side indexing.
    pub fn effective_category(&self) -> &str {
        self.category.as_deref().unwrap_or("uncategorized")
    }
}

/// Versioned envelope written to the content store.
///
/// The stored payload is never the bare caller object: the store client
/// wraps it with the schema version and the creation time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedMetadata {
    pub version: String,
    /// RFC 3339 creation time, UTC.
    pub created_at: String,
    pub metadata: JournalMetadata,
}

impl EnrichedMetadata {
    pub fn new(metadata: JournalMetadata, created_at: impl Into<String>) -> Self {
        Self {
            version: SCHEMA_VERSION.to_string(),
            created_at: created_at.into(),
            metadata,
        }
    }
}

/// A note body as read back from a gateway.
///
/// Older notes were stored without the envelope, so both shapes are
/// accepted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoredNote {
    Enveloped(EnrichedMetadata),
    Bare(JournalMetadata),
}

impl StoredNote {
    pub fn into_metadata(self) -> JournalMetadata {
        match self {
            Self::Enveloped(envelope) => envelope.metadata,
            Self::Bare(metadata) => metadata,
        }
    }

    pub fn is_enveloped(&self) -> bool {
        matches!(self, Self::Enveloped(_))
    }
}
