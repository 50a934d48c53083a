use async_trait::async_trait;
use baselog_types::{Address, ContentId, RegistryEntry, TxHash};

use crate::error::RegistryResult;
use crate::records::{Inclusion, TransactionHandle};

/// Read boundary for registry lookups.
///
/// Reads are side-effect free and may run concurrently with writes and
/// with each other. An absent entry is never an error.
#[async_trait]
pub trait RegistryReader: Send + Sync {
    async fn has_entry(&self, account: &Address, tx_hash: &TxHash) -> RegistryResult<bool>;

    async fn get_entry(
        &self,
        account: &Address,
        tx_hash: &TxHash,
    ) -> RegistryResult<Option<RegistryEntry>>;

    /// Existence check for many hashes of one account, index-aligned with
    /// the input.
    ///
    /// Default implementation calls `has_entry()` for each hash. Backends
    /// should override it with a single batched round trip.
    async fn has_entries(
        &self,
        account: &Address,
        tx_hashes: &[TxHash],
    ) -> RegistryResult<Vec<bool>> {
        let mut found = Vec::with_capacity(tx_hashes.len());
        for tx_hash in tx_hashes {
            found.push(self.has_entry(account, tx_hash).await?);
        }
        Ok(found)
    }
}

/// Write boundary for registry appends.
#[async_trait]
pub trait RegistryWriter: Send + Sync {
    /// Submit `logEntry(tx_hash, content_id)` from the bound signer.
    ///
    /// Returns once the write is submitted; use
    /// [`Self::wait_for_inclusion`] to follow it.
    async fn log_entry(
        &self,
        tx_hash: &TxHash,
        content_id: &ContentId,
    ) -> RegistryResult<TransactionHandle>;

    /// Resolve once the write is included. Waits without a bound of its
    /// own; callers wanting a deadline wrap it in a timeout.
    async fn wait_for_inclusion(&self, handle: &TransactionHandle) -> RegistryResult<Inclusion>;
}

/// A registry backend that can both read and write.
///
/// Blanket-implemented, so `dyn Registry` can stand in for any backend.
pub trait Registry: RegistryReader + RegistryWriter {}

impl<T: RegistryReader + RegistryWriter + ?Sized> Registry for T {}
