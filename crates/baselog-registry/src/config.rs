use std::time::Duration;

use baselog_types::Address;
use serde::{Deserialize, Serialize};

/// Default JSON-RPC endpoint (Base mainnet).
pub const DEFAULT_RPC_URL: &str = "https://mainnet.base.org";

/// Configuration for the JSON-RPC registry client.
///
/// Read-only after the client is constructed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub rpc_url: String,
    /// Address of the deployed registry contract.
    pub contract: Option<Address>,
    /// Account the endpoint signs writes for. Reads work without it.
    pub account: Option<Address>,
    /// Timeout for a single JSON-RPC round trip.
    pub request_timeout_secs: u64,
    /// Interval between receipt polls while waiting for inclusion.
    pub poll_interval_ms: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL.to_string(),
            contract: None,
            account: None,
            request_timeout_secs: 15,
            poll_interval_ms: 2_000,
        }
    }
}

impl RegistryConfig {
    pub fn new(rpc_url: impl Into<String>, contract: Address) -> Self {
        Self {
            rpc_url: rpc_url.into(),
            contract: Some(contract),
            ..Default::default()
        }
    }

    pub fn with_account(mut self, account: Address) -> Self {
        self.account = Some(account);
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = RegistryConfig::default();
        assert_eq!(c.rpc_url, DEFAULT_RPC_URL);
        assert!(c.contract.is_none());
        assert!(c.account.is_none());
        assert_eq!(c.poll_interval(), Duration::from_secs(2));
    }

    #[test]
    fn builder_sets_contract_and_account() {
        let contract = Address::from_bytes([1; 20]);
        let account = Address::from_bytes([2; 20]);
        let c = RegistryConfig::new("http://localhost:8545", contract).with_account(account);
        assert_eq!(c.contract, Some(contract));
        assert_eq!(c.account, Some(account));
    }
}
