use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use baselog_types::{Address, Transaction};

use crate::error::SdkResult;

/// Supplier of an account's past transactions.
#[async_trait]
pub trait TransactionSource: Send + Sync {
    /// Transactions touching `account`, newest first.
    async fn transactions(&self, account: &Address) -> SdkResult<Vec<Transaction>>;
}

/// In-memory transaction source.
///
/// Transactions are indexed under both counterparties, so a transfer shows
/// up for the sender and for the recipient.
#[derive(Debug, Default)]
pub struct StaticTransactionSource {
    by_account: RwLock<HashMap<Address, Vec<Transaction>>>,
}

impl StaticTransactionSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_transactions(transactions: impl IntoIterator<Item = Transaction>) -> Self {
        let source = Self::new();
        for tx in transactions {
            source.insert(tx);
        }
        source
    }

    pub fn insert(&self, tx: Transaction) {
        let mut map = self.by_account.write().expect("lock poisoned");
        if let Some(to) = tx.to.filter(|to| *to != tx.from) {
            map.entry(to).or_default().push(tx.clone());
        }
        map.entry(tx.from).or_default().push(tx);
    }
}

#[async_trait]
impl TransactionSource for StaticTransactionSource {
    async fn transactions(&self, account: &Address) -> SdkResult<Vec<Transaction>> {
        let map = self.by_account.read().expect("lock poisoned");
        let mut txs = map.get(account).cloned().unwrap_or_default();
        txs.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(txs)
    }
}
