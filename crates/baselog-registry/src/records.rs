use baselog_types::{Address, ContentId, TxHash};
use serde::{Deserialize, Serialize};

/// Tracking handle for a submitted registry write.
///
/// Returned as soon as the write is accepted for inclusion; it does not
/// imply confirmation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionHandle {
    /// Hash of the registry write itself.
    pub hash: TxHash,
    /// Account the write was signed for.
    pub account: Address,
    /// The transaction being annotated.
    pub target_tx: TxHash,
    pub content_id: ContentId,
}

/// Proof that a submitted write was included successfully.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Inclusion {
    pub block_number: u64,
}
