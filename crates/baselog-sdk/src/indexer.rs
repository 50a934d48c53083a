use std::collections::HashSet;

use async_trait::async_trait;
use baselog_types::{Address, Transaction};
use chrono::DateTime;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::IndexerConfig;
use crate::error::{SdkError, SdkResult};
use crate::source::TransactionSource;

/// Transaction source backed by a Covalent-style indexer
/// (`GET {api_url}/{chain_id}/address/{account}/transactions_v2/`).
///
/// Items the indexer returns in an unexpected shape are skipped with a
/// warning; transport failures, error statuses and error envelopes fail
/// the whole listing with [`SdkError::Source`].
pub struct HttpTransactionSource {
    config: IndexerConfig,
    client: Client,
}

#[derive(Deserialize)]
struct Envelope {
    data: Option<Page>,
    #[serde(default)]
    error: bool,
    error_message: Option<String>,
}

#[derive(Deserialize)]
struct Page {
    #[serde(default)]
    items: Vec<Item>,
}

#[derive(Deserialize)]
struct Item {
    tx_hash: String,
    block_signed_at: String,
    from_address: String,
    to_address: Option<String>,
    value: Option<String>,
}

impl Item {
    fn into_transaction(self) -> Result<Transaction, String> {
        let hash = self
            .tx_hash
            .parse()
            .map_err(|e| format!("tx_hash {}: {e}", self.tx_hash))?;
        let signed_at = DateTime::parse_from_rfc3339(&self.block_signed_at)
            .map_err(|e| format!("block_signed_at {}: {e}", self.block_signed_at))?;
        let timestamp = u64::try_from(signed_at.timestamp_millis())
            .map_err(|_| format!("block_signed_at {} precedes the epoch", self.block_signed_at))?;
        let from = self
            .from_address
            .parse()
            .map_err(|e| format!("from_address {}: {e}", self.from_address))?;
        let to = match self.to_address.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(to) => Some(to.parse().map_err(|e| format!("to_address {to}: {e}"))?),
        };
        let value_wei = match self.value.as_deref().map(str::trim) {
            None | Some("") => 0,
            Some(value) => value
                .parse()
                .map_err(|e| format!("value {value}: {e}"))?,
        };
        Ok(Transaction {
            hash,
            timestamp,
            from,
            to,
            value_wei,
        })
    }
}

impl HttpTransactionSource {
    pub fn new(config: IndexerConfig) -> SdkResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| SdkError::Config(format!("cannot build HTTP client: {e}")))?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &IndexerConfig {
        &self.config
    }

    fn listing_url(&self, account: &Address) -> String {
        format!(
            "{}/{}/address/{}/transactions_v2/",
            self.config.api_url.trim_end_matches('/'),
            self.config.chain_id,
            account
        )
    }
}

#[async_trait]
impl TransactionSource for HttpTransactionSource {
    async fn transactions(&self, account: &Address) -> SdkResult<Vec<Transaction>> {
        let key = self
            .config
            .api_key()
            .ok_or_else(|| SdkError::Config("no indexer api_key configured".into()))?;
        let url = self.listing_url(account);
        debug!(%url, "listing transactions");

        let page_size = self.config.page_size.to_string();
        let response = self
            .client
            .get(&url)
            .query(&[
                ("quote-currency", "USD"),
                ("page-size", page_size.as_str()),
                ("key", key),
            ])
            .timeout(self.config.timeout())
            .send()
            .await
            .map_err(|e| SdkError::Source(format!("indexer request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(SdkError::Source(format!("indexer returned {status}: {text}")));
        }
        let envelope: Envelope = response
            .json()
            .await
            .map_err(|e| SdkError::Source(format!("malformed indexer response: {e}")))?;
        if envelope.error {
            return Err(SdkError::Source(
                envelope
                    .error_message
                    .unwrap_or_else(|| "indexer reported an error".into()),
            ));
        }

        let items = envelope.data.map(|page| page.items).unwrap_or_default();
        let mut seen = HashSet::with_capacity(items.len());
        let mut transactions = Vec::with_capacity(items.len());
        for item in items {
            match item.into_transaction() {
                Ok(tx) if seen.insert(tx.hash) => transactions.push(tx),
                Ok(tx) => debug!(hash = %tx.hash, "duplicate transaction skipped"),
                Err(reason) => warn!(%account, %reason, "skipping unreadable indexer item"),
            }
        }
        transactions.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(transactions)
    }
}

impl std::fmt::Debug for HttpTransactionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransactionSource")
            .field("config", &self.config)
            .finish()
    }
}
