use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use baselog_types::{Address, ContentId, RegistryEntry, TxHash};
use chrono::Utc;
use tokio::sync::watch;
use tracing::debug;

use crate::error::{RegistryError, RegistryResult};
use crate::records::{Inclusion, TransactionHandle};
use crate::traits::{RegistryReader, RegistryWriter};

#[derive(Clone, Copy, Debug)]
enum Receipt {
    Included(u64),
    Reverted(u64),
}

#[derive(Debug)]
struct ChainState {
    signer: Option<Address>,
    reject_signatures: bool,
    auto_mine: bool,
    fail_reads: bool,
    block_number: u64,
    block_timestamp: Option<u64>,
    nonce: u64,
    entries: HashMap<(Address, TxHash), RegistryEntry>,
    pending: Vec<TransactionHandle>,
    receipts: HashMap<TxHash, Receipt>,
    submissions: Vec<TransactionHandle>,
    read_calls: usize,
}

/// Simulated registry chain held in memory.
///
/// Writes are queued as pending and included by [`Self::mine`], which
/// `log_entry` calls itself unless auto-mining is switched off. Entries are
/// keyed by `(signer, tx hash)` and stamped with the block timestamp; a
/// second write for the same key reverts, mirroring the contract's
/// one-note-per-transaction rule.
pub struct InMemoryRegistry {
    state: Mutex<ChainState>,
    blocks: watch::Sender<u64>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        let (blocks, _) = watch::channel(0);
        Self {
            state: Mutex::new(ChainState {
                signer: None,
                reject_signatures: false,
                auto_mine: true,
                fail_reads: false,
                block_number: 0,
                block_timestamp: None,
                nonce: 0,
                entries: HashMap::new(),
                pending: Vec::new(),
                receipts: HashMap::new(),
                submissions: Vec::new(),
                read_calls: 0,
            }),
            blocks,
        }
    }

    /// Bind a signer. Writes are recorded under this account.
    pub fn connect(&self, account: Address) {
        self.state.lock().expect("lock poisoned").signer = Some(account);
    }

    pub fn disconnect(&self) {
        self.state.lock().expect("lock poisoned").signer = None;
    }

    /// While set, every `log_entry` is refused by the signer.
    pub fn reject_signatures(&self, reject: bool) {
        self.state.lock().expect("lock poisoned").reject_signatures = reject;
    }

    /// Turn automatic inclusion of submitted writes on or off.
    pub fn set_auto_mine(&self, auto_mine: bool) {
        self.state.lock().expect("lock poisoned").auto_mine = auto_mine;
    }

    /// Fix the timestamp (epoch ms) stamped on entries by later blocks.
    /// Defaults to the wall clock.
    pub fn set_block_timestamp(&self, timestamp: u64) {
        self.state.lock().expect("lock poisoned").block_timestamp = Some(timestamp);
    }

    /// While set, every read fails with `ReadFailed`.
    pub fn fail_reads(&self, fail: bool) {
        self.state.lock().expect("lock poisoned").fail_reads = fail;
    }

    /// Include all pending writes in a new block and return its number.
    pub fn mine(&self) -> u64 {
        let block = {
            let mut state = self.state.lock().expect("lock poisoned");
            state.block_number += 1;
            let block = state.block_number;
            let timestamp = state
                .block_timestamp
                .unwrap_or_else(|| Utc::now().timestamp_millis().max(0) as u64);

            for handle in std::mem::take(&mut state.pending) {
                let key = (handle.account, handle.target_tx);
                let receipt = if state.entries.contains_key(&key) {
                    Receipt::Reverted(block)
                } else {
                    state.entries.insert(
                        key,
                        RegistryEntry::new(handle.content_id.clone(), timestamp),
                    );
                    Receipt::Included(block)
                };
                debug!(tx = %handle.hash, block, ?receipt, "mined registry write");
                state.receipts.insert(handle.hash, receipt);
            }
            block
        };
        self.blocks.send_replace(block);
        block
    }

    /// Every write submitted so far, in order.
    pub fn submissions(&self) -> Vec<TransactionHandle> {
        self.state.lock().expect("lock poisoned").submissions.clone()
    }

    pub fn pending_count(&self) -> usize {
        self.state.lock().expect("lock poisoned").pending.len()
    }

    /// Number of read round trips served. A batched existence check counts
    /// as one.
    pub fn read_calls(&self) -> usize {
        self.state.lock().expect("lock poisoned").read_calls
    }

    fn begin_read(&self) -> RegistryResult<std::sync::MutexGuard<'_, ChainState>> {
        let mut state = self.state.lock().expect("lock poisoned");
        state.read_calls += 1;
        if state.fail_reads {
            return Err(RegistryError::ReadFailed("simulated read failure".into()));
        }
        Ok(state)
    }
}

impl Default for InMemoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RegistryReader for InMemoryRegistry {
    async fn has_entry(&self, account: &Address, tx_hash: &TxHash) -> RegistryResult<bool> {
        let state = self.begin_read()?;
        Ok(state.entries.contains_key(&(*account, *tx_hash)))
    }

    async fn get_entry(
        &self,
        account: &Address,
        tx_hash: &TxHash,
    ) -> RegistryResult<Option<RegistryEntry>> {
        let state = self.begin_read()?;
        Ok(state.entries.get(&(*account, *tx_hash)).cloned())
    }

    async fn has_entries(
        &self,
        account: &Address,
        tx_hashes: &[TxHash],
    ) -> RegistryResult<Vec<bool>> {
        let state = self.begin_read()?;
        Ok(tx_hashes
            .iter()
            .map(|tx| state.entries.contains_key(&(*account, *tx)))
            .collect())
    }
}

#[async_trait]
impl RegistryWriter for InMemoryRegistry {
    async fn log_entry(
        &self,
        tx_hash: &TxHash,
        content_id: &ContentId,
    ) -> RegistryResult<TransactionHandle> {
        let (handle, auto_mine) = {
            let mut state = self.state.lock().expect("lock poisoned");
            let account = state.signer.ok_or(RegistryError::NotConnected)?;
            if state.reject_signatures {
                return Err(RegistryError::SigningRejected(
                    "user rejected the request".into(),
                ));
            }

            state.nonce += 1;
            let mut hasher = blake3::Hasher::new();
            hasher.update(account.as_bytes());
            hasher.update(tx_hash.as_bytes());
            hasher.update(content_id.as_str().as_bytes());
            hasher.update(&state.nonce.to_le_bytes());
            let hash = TxHash::from_bytes(*hasher.finalize().as_bytes());

            let handle = TransactionHandle {
                hash,
                account,
                target_tx: *tx_hash,
                content_id: content_id.clone(),
            };
            state.pending.push(handle.clone());
            state.submissions.push(handle.clone());
            (handle, state.auto_mine)
        };

        debug!(hash = %handle.hash, target_tx = %tx_hash, %content_id, "submitted registry write");
        if auto_mine {
            self.mine();
        }
        Ok(handle)
    }

    async fn wait_for_inclusion(&self, handle: &TransactionHandle) -> RegistryResult<Inclusion> {
        let mut blocks = self.blocks.subscribe();
        loop {
            {
                let state = self.state.lock().expect("lock poisoned");
                match state.receipts.get(&handle.hash) {
                    Some(Receipt::Included(block_number)) => {
                        return Ok(Inclusion {
                            block_number: *block_number,
                        })
                    }
                    Some(Receipt::Reverted(block_number)) => {
                        return Err(RegistryError::ConfirmationReverted {
                            tx: handle.hash,
                            block_number: *block_number,
                        })
                    }
                    None if !state.pending.iter().any(|p| p.hash == handle.hash) => {
                        return Err(RegistryError::SubmitFailed(format!(
                            "unknown transaction {}",
                            handle.hash
                        )))
                    }
                    None => {}
                }
            }
            // The sender lives as long as `self`, so this cannot close.
            if blocks.changed().await.is_err() {
                return Err(RegistryError::SubmitFailed("chain stopped".into()));
            }
        }
    }
}

impl std::fmt::Debug for InMemoryRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock().expect("lock poisoned");
        f.debug_struct("InMemoryRegistry")
            .field("signer", &state.signer)
            .field("block_number", &state.block_number)
            .field("entries", &state.entries.len())
            .field("pending", &state.pending.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    fn account() -> Address {
        Address::from_bytes([0xaa; 20])
    }

    fn tx(byte: u8) -> TxHash {
        TxHash::from_bytes([byte; 32])
    }

    fn connected() -> InMemoryRegistry {
        let registry = InMemoryRegistry::new();
        registry.connect(account());
        registry.set_block_timestamp(1_700_000_000_000);
        registry
    }

    #[tokio::test]
    async fn write_then_read() {
        let registry = connected();
        let handle = registry
            .log_entry(&tx(1), &ContentId::new("bafy123"))
            .await
            .unwrap();
        let inclusion = registry.wait_for_inclusion(&handle).await.unwrap();
        assert_eq!(inclusion.block_number, 1);

        assert!(registry.has_entry(&account(), &tx(1)).await.unwrap());
        assert_eq!(
            registry.get_entry(&account(), &tx(1)).await.unwrap(),
            Some(RegistryEntry::new("bafy123", 1_700_000_000_000))
        );
    }

    #[tokio::test]
    async fn absent_entries_are_not_errors() {
        let registry = connected();
        assert!(!registry.has_entry(&account(), &tx(1)).await.unwrap());
        assert_eq!(registry.get_entry(&account(), &tx(1)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn entries_are_scoped_to_the_signer() {
        let registry = connected();
        registry
            .log_entry(&tx(1), &ContentId::new("bafy123"))
            .await
            .unwrap();
        let other = Address::from_bytes([0xbb; 20]);
        assert!(!registry.has_entry(&other, &tx(1)).await.unwrap());
    }

    #[tokio::test]
    async fn write_requires_signer() {
        let registry = InMemoryRegistry::new();
        let err = registry
            .log_entry(&tx(1), &ContentId::new("bafy123"))
            .await
            .unwrap_err();
        assert_eq!(err, RegistryError::NotConnected);
        assert!(registry.submissions().is_empty());
    }

    #[tokio::test]
    async fn rejected_signature_submits_nothing() {
        let registry = connected();
        registry.reject_signatures(true);
        let err = registry
            .log_entry(&tx(1), &ContentId::new("bafy123"))
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::SigningRejected(_)));
        assert!(registry.submissions().is_empty());
    }

    #[tokio::test]
    async fn duplicate_write_reverts() {
        let registry = connected();
        let first = registry
            .log_entry(&tx(1), &ContentId::new("bafy1"))
            .await
            .unwrap();
        let second = registry
            .log_entry(&tx(1), &ContentId::new("bafy2"))
            .await
            .unwrap();
        assert!(registry.wait_for_inclusion(&first).await.is_ok());
        assert!(matches!(
            registry.wait_for_inclusion(&second).await,
            Err(RegistryError::ConfirmationReverted { block_number: 2, .. })
        ));
        assert_eq!(
            registry.get_entry(&account(), &tx(1)).await.unwrap().unwrap().content_id,
            ContentId::new("bafy1")
        );
    }

    #[tokio::test]
    async fn waiting_resolves_when_block_is_mined() {
        let registry = Arc::new(connected());
        registry.set_auto_mine(false);
        let handle = registry
            .log_entry(&tx(1), &ContentId::new("bafy123"))
            .await
            .unwrap();
        assert_eq!(registry.pending_count(), 1);

        let waiter = {
            let registry = registry.clone();
            let handle = handle.clone();
            tokio::spawn(async move { registry.wait_for_inclusion(&handle).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        registry.mine();
        let inclusion = waiter.await.unwrap().unwrap();
        assert_eq!(inclusion.block_number, 1);
        assert_eq!(registry.pending_count(), 0);
    }

    #[tokio::test]
    async fn unknown_handle_fails() {
        let registry = connected();
        let handle = TransactionHandle {
            hash: tx(9),
            account: account(),
            target_tx: tx(1),
            content_id: ContentId::new("bafy123"),
        };
        assert!(matches!(
            registry.wait_for_inclusion(&handle).await,
            Err(RegistryError::SubmitFailed(_))
        ));
    }

    #[tokio::test]
    async fn batched_check_is_one_read() {
        let registry = connected();
        registry
            .log_entry(&tx(2), &ContentId::new("bafy123"))
            .await
            .unwrap();
        let found = registry
            .has_entries(&account(), &[tx(1), tx(2), tx(3)])
            .await
            .unwrap();
        assert_eq!(found, vec![false, true, false]);
        assert_eq!(registry.read_calls(), 1);
    }

    #[tokio::test]
    async fn failing_reads() {
        let registry = connected();
        registry.fail_reads(true);
        assert!(matches!(
            registry.has_entries(&account(), &[tx(1)]).await,
            Err(RegistryError::ReadFailed(_))
        ));
    }
}
