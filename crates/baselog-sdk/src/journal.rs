use std::sync::Arc;

use baselog_pipeline::{CommitOutcome, CommitPipeline, PipelineConfig, PipelineState};
use baselog_registry::{JsonRpcRegistry, Registry};
use baselog_store::{ContentStore, HttpContentStore};
use baselog_types::{Address, EnrichedTransaction, JournalMetadata, RegistryEntry, Transaction, TxHash};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info};

use crate::config::JournalConfig;
use crate::enrich::enrich_transactions;
use crate::error::{SdkError, SdkResult};
use crate::source::TransactionSource;

/// A registered note together with its content.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalNote {
    pub entry: RegistryEntry,
    pub metadata: JournalMetadata,
}

/// Journal wired to the HTTP content store and the JSON-RPC registry.
pub type RemoteJournal = Journal<dyn ContentStore, dyn Registry>;

/// High-level BaseLog API.
///
/// Owns one content store, one registry and the commit pipeline that
/// drives both. The bound account scopes transaction listings.
pub struct Journal<S: ?Sized, R: ?Sized> {
    store: Arc<S>,
    registry: Arc<R>,
    pipeline: CommitPipeline<S, R>,
    account: Option<Address>,
}

impl RemoteJournal {
    /// Build the remote clients from configuration. The registry account,
    /// if configured, becomes the bound account.
    pub fn connect(config: JournalConfig) -> SdkResult<Self> {
        let account = config.registry.account;
        let store: Arc<dyn ContentStore> = Arc::new(HttpContentStore::new(config.store)?);
        let registry: Arc<dyn Registry> = Arc::new(
            JsonRpcRegistry::new(config.registry).map_err(|e| SdkError::Config(e.to_string()))?,
        );
        let mut journal = Journal::new(store, registry, config.pipeline);
        journal.account = account;
        Ok(journal)
    }
}

impl<S, R> Journal<S, R>
where
    S: ContentStore + ?Sized,
    R: Registry + ?Sized,
{
    pub fn new(store: Arc<S>, registry: Arc<R>, config: PipelineConfig) -> Self {
        let pipeline = CommitPipeline::new(store.clone(), registry.clone(), config);
        Self {
            store,
            registry,
            pipeline,
            account: None,
        }
    }

    pub fn with_account(mut self, account: Address) -> Self {
        self.account = Some(account);
        self
    }

    pub fn account(&self) -> Option<Address> {
        self.account
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    // ---- Commit ----

    pub async fn commit(&self, metadata: JournalMetadata) -> SdkResult<CommitOutcome> {
        Ok(self.pipeline.commit(metadata).await?)
    }

    pub fn snapshot(&self) -> PipelineState {
        self.pipeline.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<PipelineState> {
        self.pipeline.subscribe()
    }

    // ---- Reads ----

    /// The bound account's transactions, annotated with note presence.
    pub async fn transactions<T>(&self, source: &T) -> SdkResult<Vec<EnrichedTransaction>>
    where
        T: TransactionSource + ?Sized,
    {
        let account = self.account.ok_or(SdkError::NotConnected)?;
        let transactions = source.transactions(&account).await?;
        debug!(%account, count = transactions.len(), "loaded transactions");
        Ok(enrich_transactions(&*self.registry, &account, transactions).await)
    }

    /// Look up the note `account` recorded for `tx_hash` and fetch its
    /// content. `None` when no note is registered.
    pub async fn note(&self, account: &Address, tx_hash: &TxHash) -> SdkResult<Option<JournalNote>> {
        let Some(entry) = self.registry.get_entry(account, tx_hash).await? else {
            return Ok(None);
        };
        let metadata = self
            .store
            .fetch(&entry.content_id)
            .await
            .map_err(|source| SdkError::NoteUnavailable {
                content_id: entry.content_id.clone(),
                source,
            })?;
        info!(%account, %tx_hash, content_id = %entry.content_id, "loaded note");
        Ok(Some(JournalNote { entry, metadata }))
    }
}

/// A note pre-filled from `transaction`, stamped with the current time.
pub fn draft_note(transaction: &Transaction, title: impl Into<String>) -> JournalMetadata {
    let now = Utc::now().timestamp_millis().max(0) as u64;
    JournalMetadata::new(title, transaction.hash, now)
        .with_amount(transaction.amount_eth())
        .with_counterparties(transaction.from, transaction.to)
}

impl<S: ?Sized, R: ?Sized> std::fmt::Debug for Journal<S, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Journal")
            .field("account", &self.account)
            .field("pipeline", &self.pipeline)
            .finish()
    }
}
