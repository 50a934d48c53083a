use baselog_registry::RegistryReader;
use baselog_types::{Address, EnrichedTransaction, Transaction, TxHash};
use tracing::{debug, warn};

/// Annotate `transactions` with whether `account` has a note for each.
///
/// Uses one batched existence read. Order is preserved. If the read fails
/// or returns the wrong number of results, every transaction is reported
/// without a note; enrichment never fails.
pub async fn enrich_transactions<R>(
    registry: &R,
    account: &Address,
    transactions: Vec<Transaction>,
) -> Vec<EnrichedTransaction>
where
    R: RegistryReader + ?Sized,
{
    if transactions.is_empty() {
        return Vec::new();
    }

    let hashes: Vec<TxHash> = transactions.iter().map(|tx| tx.hash).collect();
    let flags = match registry.has_entries(account, &hashes).await {
        Ok(flags) if flags.len() == hashes.len() => flags,
        Ok(flags) => {
            warn!(
                %account,
                expected = hashes.len(),
                got = flags.len(),
                "note lookup returned the wrong number of results, assuming no notes"
            );
            vec![false; hashes.len()]
        }
        Err(error) => {
            warn!(%account, %error, "note lookup failed, assuming no notes");
            vec![false; hashes.len()]
        }
    };

    debug!(
        %account,
        total = flags.len(),
        noted = flags.iter().filter(|f| **f).count(),
        "enriched transactions"
    );
    transactions
        .into_iter()
        .zip(flags)
        .map(|(tx, has_note)| EnrichedTransaction::new(tx, has_note))
        .collect()
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use baselog_registry::{InMemoryRegistry, RegistryResult, RegistryWriter};
    use baselog_types::{ContentId, RegistryEntry};

    use super::*;

    fn account() -> Address {
        Address::from_bytes([0xaa; 20])
    }

    fn tx(byte: u8) -> Transaction {
        Transaction {
            hash: TxHash::from_bytes([byte; 32]),
            timestamp: byte as u64,
            from: account(),
            to: None,
            value_wei: 0,
        }
    }

    #[tokio::test]
    async fn only_noted_transaction_is_flagged() {
        let registry = InMemoryRegistry::new();
        registry.connect(account());
        registry
            .log_entry(&tx(2).hash, &ContentId::new("bafy123"))
            .await
            .unwrap();

        let enriched = enrich_transactions(&registry, &account(), vec![tx(1), tx(2), tx(3)]).await;
        let flags: Vec<bool> = enriched.iter().map(|e| e.has_note).collect();
        assert_eq!(flags, vec![false, true, false]);
        let hashes: Vec<TxHash> = enriched.iter().map(|e| *e.hash()).collect();
        assert_eq!(hashes, vec![tx(1).hash, tx(2).hash, tx(3).hash]);
        assert_eq!(registry.read_calls(), 1);
    }

    #[tokio::test]
    async fn empty_input_makes_no_call() {
        let registry = InMemoryRegistry::new();
        assert!(enrich_transactions(&registry, &account(), Vec::new())
            .await
            .is_empty());
        assert_eq!(registry.read_calls(), 0);
    }

    #[tokio::test]
    async fn failed_read_degrades_to_no_notes() {
        let registry = InMemoryRegistry::new();
        registry.fail_reads(true);
        let enriched = enrich_transactions(&registry, &account(), vec![tx(1), tx(2)]).await;
        assert_eq!(enriched.len(), 2);
        assert!(enriched.iter().all(|e| !e.has_note));
    }

    /// Reader that answers every batch with a single `true`.
    struct ShortReader;

    #[async_trait]
    impl RegistryReader for ShortReader {
        async fn has_entry(&self, _: &Address, _: &TxHash) -> RegistryResult<bool> {
            Ok(true)
        }

        async fn get_entry(&self, _: &Address, _: &TxHash) -> RegistryResult<Option<RegistryEntry>> {
            Ok(None)
        }

        async fn has_entries(&self, _: &Address, _: &[TxHash]) -> RegistryResult<Vec<bool>> {
            Ok(vec![true])
        }
    }

    #[tokio::test]
    async fn length_mismatch_degrades_to_no_notes() {
        let enriched = enrich_transactions(&ShortReader, &account(), vec![tx(1), tx(2)]).await;
        assert!(enriched.iter().all(|e| !e.has_note));
    }
}
