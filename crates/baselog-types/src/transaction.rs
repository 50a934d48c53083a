use serde::{Deserialize, Serialize};

use crate::hash::{Address, TxHash};

const WEI_PER_ETH: u128 = 1_000_000_000_000_000_000;

/// A past transaction as supplied by a transaction source.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub hash: TxHash,
    /// Epoch milliseconds of the block that included the transaction.
    pub timestamp: u64,
    pub from: Address,
    /// `None` for contract creation.
    pub to: Option<Address>,
    /// Serialized as a decimal string; JSON numbers cannot carry u128.
    #[serde(with = "wei_string")]
    pub value_wei: u128,
}

mod wei_string {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Direction of a transaction relative to the viewing account.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Sent,
    Received,
}

impl Transaction {
    pub fn direction(&self, account: &Address) -> Direction {
        if &self.from == account {
            Direction::Sent
        } else {
            Direction::Received
        }
    }

    /// Value in ETH with four decimals.
    pub fn amount_eth(&self) -> String {
        format_eth(self.value_wei, 4)
    }
}

/// A transaction annotated with whether a journal note exists for it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedTransaction {
    #[serde(flatten)]
    pub transaction: Transaction,
    pub has_note: bool,
}

impl EnrichedTransaction {
    pub fn new(transaction: Transaction, has_note: bool) -> Self {
        Self {
            transaction,
            has_note,
        }
    }

    pub fn hash(&self) -> &TxHash {
        &self.transaction.hash
    }
}

/// Format a wei amount as ETH, rounded half-up to `decimals` places
/// (at most 18).
pub fn format_eth(wei: u128, decimals: usize) -> String {
    let decimals = decimals.min(18);
    let mut whole = wei / WEI_PER_ETH;
    let frac = wei % WEI_PER_ETH;
    if decimals == 0 {
        if frac >= WEI_PER_ETH / 2 {
            whole += 1;
        }
        return whole.to_string();
    }

    let scale = 10u128.pow(decimals as u32);
    let mut scaled = (frac * scale + WEI_PER_ETH / 2) / WEI_PER_ETH;
    if scaled == scale {
        whole += 1;
        scaled = 0;
    }
    format!("{whole}.{scaled:0width$}", width = decimals)
}
