use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use baselog_types::{Address, ContentId, RegistryEntry, TxHash};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::abi;
use crate::config::RegistryConfig;
use crate::error::{RegistryError, RegistryResult};
use crate::records::{Inclusion, TransactionHandle};
use crate::traits::{RegistryReader, RegistryWriter};

/// EIP-1193 "user rejected request".
const USER_REJECTED: i64 = 4001;

#[derive(Debug, Serialize)]
struct RpcRequest {
    jsonrpc: &'static str,
    id: u64,
    method: &'static str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    id: Value,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Clone, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

/// Failure of a single JSON-RPC exchange, before it is mapped onto the
/// registry taxonomy by the calling operation.
#[derive(Debug, Clone)]
enum RpcFailure {
    Transport(String),
    Rpc { code: i64, message: String },
    Malformed(String),
}

impl std::fmt::Display for RpcFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport(msg) => write!(f, "transport: {msg}"),
            Self::Rpc { code, message } => write!(f, "rpc error {code}: {message}"),
            Self::Malformed(msg) => write!(f, "malformed response: {msg}"),
        }
    }
}

impl RpcResponse {
    fn into_result(self) -> Result<Value, RpcFailure> {
        if let Some(error) = self.error {
            return Err(RpcFailure::Rpc {
                code: error.code,
                message: error.message,
            });
        }
        // `null` is a legitimate result (e.g. a pending receipt).
        Ok(self.result.unwrap_or(Value::Null))
    }
}

/// Registry client speaking Ethereum JSON-RPC to the registry contract.
///
/// Reads go through `eth_call`; the write goes through
/// `eth_sendTransaction`, so signing is delegated to whatever wallet or
/// node sits behind the endpoint.
pub struct JsonRpcRegistry {
    config: RegistryConfig,
    contract: Address,
    client: Client,
    next_id: AtomicU64,
}

impl JsonRpcRegistry {
    pub fn new(config: RegistryConfig) -> RegistryResult<Self> {
        let contract = config
            .contract
            .ok_or_else(|| RegistryError::Config("registry contract address not set".into()))?;
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| RegistryError::Config(format!("cannot build HTTP client: {e}")))?;
        Ok(Self {
            config,
            contract,
            client,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    fn request(&self, method: &'static str, params: Value) -> RpcRequest {
        RpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        }
    }

    async fn post<T: Serialize + ?Sized>(&self, body: &T) -> Result<Value, RpcFailure> {
        let response = self
            .client
            .post(&self.config.rpc_url)
            .json(body)
            .send()
            .await
            .map_err(|e| RpcFailure::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RpcFailure::Transport(format!("HTTP {}", status.as_u16())));
        }
        response
            .json::<Value>()
            .await
            .map_err(|e| RpcFailure::Malformed(e.to_string()))
    }

    async fn call(&self, method: &'static str, params: Value) -> Result<Value, RpcFailure> {
        let request = self.request(method, params);
        debug!(method, id = request.id, "json-rpc call");
        let body = self.post(&request).await?;
        let response: RpcResponse =
            serde_json::from_value(body).map_err(|e| RpcFailure::Malformed(e.to_string()))?;
        response.into_result()
    }

    /// Send all requests as one JSON-RPC batch and return the results in
    /// request order.
    async fn batch(
        &self,
        requests: Vec<RpcRequest>,
    ) -> Result<Vec<Result<Value, RpcFailure>>, RpcFailure> {
        debug!(size = requests.len(), "json-rpc batch");
        let body = self.post(&requests).await?;
        let responses: Vec<RpcResponse> =
            serde_json::from_value(body).map_err(|e| RpcFailure::Malformed(e.to_string()))?;

        let mut by_id: HashMap<u64, RpcResponse> = responses
            .into_iter()
            .filter_map(|r| r.id.as_u64().map(|id| (id, r)))
            .collect();

        Ok(requests
            .iter()
            .map(|req| match by_id.remove(&req.id) {
                Some(response) => response.into_result(),
                None => Err(RpcFailure::Malformed(format!("no response for id {}", req.id))),
            })
            .collect())
    }

    fn eth_call_params(&self, data: &[u8]) -> Value {
        json!([
            { "to": self.contract.to_hex(), "data": abi::to_hex(data) },
            "latest"
        ])
    }

    fn return_data(value: &Value) -> RegistryResult<Vec<u8>> {
        let hex = value
            .as_str()
            .ok_or_else(|| RegistryError::ReadFailed("eth_call result is not a string".into()))?;
        Ok(abi::from_hex(hex)?)
    }

    async fn eth_call(&self, data: &[u8]) -> RegistryResult<Vec<u8>> {
        let result = self
            .call("eth_call", self.eth_call_params(data))
            .await
            .map_err(|e| RegistryError::ReadFailed(e.to_string()))?;
        Self::return_data(&result)
    }

    /// One receipt poll: `None` while the write is still pending.
    async fn poll_receipt(&self, handle: &TransactionHandle) -> RegistryResult<Option<Inclusion>> {
        let receipt = match self
            .call("eth_getTransactionReceipt", json!([handle.hash.to_hex()]))
            .await
        {
            Ok(Value::Null) => return Ok(None),
            Ok(receipt) => receipt,
            Err(e) => {
                warn!(tx = %handle.hash, error = %e, "receipt poll failed");
                return Ok(None);
            }
        };

        let Some(block_number) = receipt["blockNumber"].as_str().and_then(parse_quantity) else {
            warn!(
                tx = %handle.hash,
                block_number = %receipt["blockNumber"],
                "receipt without a readable block number, still pending"
            );
            return Ok(None);
        };
        match receipt["status"].as_str().and_then(parse_quantity) {
            Some(0) => Err(RegistryError::ConfirmationReverted {
                tx: handle.hash,
                block_number,
            }),
            _ => Ok(Some(Inclusion { block_number })),
        }
    }
}

#[async_trait]
impl RegistryReader for JsonRpcRegistry {
    async fn has_entry(&self, account: &Address, tx_hash: &TxHash) -> RegistryResult<bool> {
        let data = self.eth_call(&abi::encode_has_entry(account, tx_hash)).await?;
        Ok(abi::decode_bool(&data)?)
    }

    async fn get_entry(
        &self,
        account: &Address,
        tx_hash: &TxHash,
    ) -> RegistryResult<Option<RegistryEntry>> {
        let data = self.eth_call(&abi::encode_get_entry(account, tx_hash)).await?;
        if data.is_empty() {
            return Ok(None);
        }
        Ok(abi::decode_entry(&data)?)
    }

    async fn has_entries(
        &self,
        account: &Address,
        tx_hashes: &[TxHash],
    ) -> RegistryResult<Vec<bool>> {
        if tx_hashes.is_empty() {
            return Ok(Vec::new());
        }
        let requests = tx_hashes
            .iter()
            .map(|tx| {
                let params = self.eth_call_params(&abi::encode_has_entry(account, tx));
                self.request("eth_call", params)
            })
            .collect();

        let results = self
            .batch(requests)
            .await
            .map_err(|e| RegistryError::ReadFailed(e.to_string()))?;
        results
            .into_iter()
            .map(|result| -> RegistryResult<bool> {
                let value = result.map_err(|e| RegistryError::ReadFailed(e.to_string()))?;
                Ok(abi::decode_bool(&Self::return_data(&value)?)?)
            })
            .collect()
    }
}

#[async_trait]
impl RegistryWriter for JsonRpcRegistry {
    async fn log_entry(
        &self,
        tx_hash: &TxHash,
        content_id: &ContentId,
    ) -> RegistryResult<TransactionHandle> {
        let account = self.config.account.ok_or(RegistryError::NotConnected)?;
        let params = json!([{
            "from": account.to_hex(),
            "to": self.contract.to_hex(),
            "data": abi::to_hex(&abi::encode_log_entry(tx_hash, content_id)),
        }]);

        let result = self
            .call("eth_sendTransaction", params)
            .await
            .map_err(|e| match e {
                RpcFailure::Rpc { code, message } if code == USER_REJECTED => {
                    RegistryError::SigningRejected(message)
                }
                other => RegistryError::SubmitFailed(other.to_string()),
            })?;

        let hash = result
            .as_str()
            .ok_or_else(|| RegistryError::SubmitFailed("no transaction hash returned".into()))
            .and_then(|s| {
                TxHash::from_hex(s).map_err(|e| RegistryError::SubmitFailed(e.to_string()))
            })?;

        info!(%hash, target_tx = %tx_hash, %content_id, "registry write submitted");
        Ok(TransactionHandle {
            hash,
            account,
            target_tx: *tx_hash,
            content_id: content_id.clone(),
        })
    }

    async fn wait_for_inclusion(&self, handle: &TransactionHandle) -> RegistryResult<Inclusion> {
        loop {
            if let Some(inclusion) = self.poll_receipt(handle).await? {
                info!(tx = %handle.hash, block = inclusion.block_number, "registry write included");
                return Ok(inclusion);
            }
            tokio::time::sleep(self.config.poll_interval()).await;
        }
    }
}

impl std::fmt::Debug for JsonRpcRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonRpcRegistry")
            .field("rpc_url", &self.config.rpc_url)
            .field("contract", &self.contract)
            .field("account", &self.config.account)
            .finish()
    }
}

/// Parse a hex JSON-RPC quantity such as `0x1b4`.
fn parse_quantity(s: &str) -> Option<u64> {
    let digits = s.strip_prefix("0x")?;
    if digits.is_empty() {
        return None;
    }
    u64::from_str_radix(digits, 16).ok()
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    use wiremock::matchers::{body_partial_json, method};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    use super::*;

    fn account() -> Address {
        Address::from_bytes([0xaa; 20])
    }

    fn contract() -> Address {
        Address::from_bytes([0xcc; 20])
    }

    fn tx(byte: u8) -> TxHash {
        TxHash::from_bytes([byte; 32])
    }

    fn registry_for(server: &MockServer, signer: Option<Address>) -> JsonRpcRegistry {
        let mut config = RegistryConfig::new(server.uri(), contract());
        config.account = signer;
        config.poll_interval_ms = 10;
        JsonRpcRegistry::new(config).unwrap()
    }

    fn rpc_result(result: Value) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({ "jsonrpc": "2.0", "id": 1, "result": result }))
    }

    fn rpc_error(code: i64, message: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0", "id": 1, "error": { "code": code, "message": message }
        }))
    }

    fn bool_word(value: bool) -> String {
        let mut word = [0u8; 32];
        word[31] = value as u8;
        abi::to_hex(&word)
    }

    #[test]
    fn new_requires_contract() {
        let err = JsonRpcRegistry::new(RegistryConfig::default()).unwrap_err();
        assert!(matches!(err, RegistryError::Config(_)));
    }

    #[tokio::test]
    async fn has_entry_calls_contract() {
        let server = MockServer::start().await;
        let data = abi::to_hex(&abi::encode_has_entry(&account(), &tx(1)));
        Mock::given(method("POST"))
            .and(body_partial_json(json!({
                "method": "eth_call",
                "params": [{ "to": contract().to_hex(), "data": data }, "latest"]
            })))
            .respond_with(rpc_result(json!(bool_word(true))))
            .expect(1)
            .mount(&server)
            .await;

        let registry = registry_for(&server, None);
        assert!(registry.has_entry(&account(), &tx(1)).await.unwrap());
    }

    #[tokio::test]
    async fn get_entry_decodes_and_reports_absence() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(rpc_result(json!(abi::to_hex(&abi::encode_entry_return(
                "bafy123",
                1_700_000_000_000
            )))))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(rpc_result(json!(abi::to_hex(&abi::encode_entry_return("", 0)))))
            .mount(&server)
            .await;

        let registry = registry_for(&server, None);
        let entry = registry.get_entry(&account(), &tx(1)).await.unwrap();
        assert_eq!(entry, Some(RegistryEntry::new("bafy123", 1_700_000_000_000)));
        assert_eq!(registry.get_entry(&account(), &tx(2)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn read_errors_surface_as_read_failed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(rpc_error(-32000, "execution reverted"))
            .mount(&server)
            .await;

        let err = registry_for(&server, None)
            .has_entry(&account(), &tx(1))
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::ReadFailed(_)));
    }

    #[tokio::test]
    async fn has_entries_is_one_batch_matched_by_id() {
        let server = MockServer::start().await;
        let noted = abi::to_hex(&abi::encode_has_entry(&account(), &tx(2)));
        Mock::given(method("POST"))
            .respond_with(move |req: &Request| {
                let calls: Vec<Value> = serde_json::from_slice(&req.body).unwrap();
                // Answer in reverse order to exercise id matching.
                let answers: Vec<Value> = calls
                    .iter()
                    .rev()
                    .map(|call| {
                        let hit = call["params"][0]["data"] == json!(noted);
                        json!({ "jsonrpc": "2.0", "id": call["id"], "result": bool_word(hit) })
                    })
                    .collect();
                ResponseTemplate::new(200).set_body_json(answers)
            })
            .expect(1)
            .mount(&server)
            .await;

        let registry = registry_for(&server, None);
        let found = registry
            .has_entries(&account(), &[tx(1), tx(2), tx(3)])
            .await
            .unwrap();
        assert_eq!(found, vec![false, true, false]);
    }

    #[tokio::test]
    async fn has_entries_on_empty_input_makes_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let found = registry_for(&server, None)
            .has_entries(&account(), &[])
            .await
            .unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn log_entry_without_signer_is_not_connected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = registry_for(&server, None)
            .log_entry(&tx(1), &ContentId::new("bafy123"))
            .await
            .unwrap_err();
        assert_eq!(err, RegistryError::NotConnected);
    }

    #[tokio::test]
    async fn log_entry_sends_encoded_call() {
        let server = MockServer::start().await;
        let data = abi::to_hex(&abi::encode_log_entry(&tx(1), &ContentId::new("bafy123")));
        Mock::given(method("POST"))
            .and(body_partial_json(json!({
                "method": "eth_sendTransaction",
                "params": [{ "from": account().to_hex(), "to": contract().to_hex(), "data": data }]
            })))
            .respond_with(rpc_result(json!(tx(9).to_hex())))
            .expect(1)
            .mount(&server)
            .await;

        let handle = registry_for(&server, Some(account()))
            .log_entry(&tx(1), &ContentId::new("bafy123"))
            .await
            .unwrap();
        assert_eq!(handle.hash, tx(9));
        assert_eq!(handle.target_tx, tx(1));
        assert_eq!(handle.account, account());
        assert_eq!(handle.content_id.as_str(), "bafy123");
    }

    #[tokio::test]
    async fn user_rejection_maps_to_signing_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(rpc_error(4001, "User rejected the request."))
            .mount(&server)
            .await;

        let err = registry_for(&server, Some(account()))
            .log_entry(&tx(1), &ContentId::new("bafy123"))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            RegistryError::SigningRejected("User rejected the request.".into())
        );
    }

    #[tokio::test]
    async fn other_send_errors_map_to_submit_failed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(rpc_error(-32000, "insufficient funds for gas"))
            .mount(&server)
            .await;

        let err = registry_for(&server, Some(account()))
            .log_entry(&tx(1), &ContentId::new("bafy123"))
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::SubmitFailed(msg) if msg.contains("insufficient funds")));
    }

    fn handle() -> TransactionHandle {
        TransactionHandle {
            hash: tx(9),
            account: account(),
            target_tx: tx(1),
            content_id: ContentId::new("bafy123"),
        }
    }

    #[tokio::test]
    async fn wait_for_inclusion_polls_until_receipt() {
        let server = MockServer::start().await;
        let polls = Arc::new(AtomicUsize::new(0));
        let counter = polls.clone();
        Mock::given(method("POST"))
            .respond_with(move |_: &Request| {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                let result = match n {
                    0 | 1 => Value::Null,
                    _ => json!({ "status": "0x1", "blockNumber": "0x1b4" }),
                };
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "jsonrpc": "2.0", "id": 1, "result": result }))
            })
            .mount(&server)
            .await;

        let inclusion = registry_for(&server, Some(account()))
            .wait_for_inclusion(&handle())
            .await
            .unwrap();
        assert_eq!(inclusion, Inclusion { block_number: 436 });
        assert_eq!(polls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn receipt_without_block_number_is_still_pending() {
        let server = MockServer::start().await;
        let polls = Arc::new(AtomicUsize::new(0));
        let counter = polls.clone();
        Mock::given(method("POST"))
            .respond_with(move |_: &Request| {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                let result = match n {
                    0 => json!({ "status": "0x1" }),
                    1 => json!({ "status": "0x1", "blockNumber": "pending" }),
                    _ => json!({ "status": "0x1", "blockNumber": "0x2a" }),
                };
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "jsonrpc": "2.0", "id": 1, "result": result }))
            })
            .mount(&server)
            .await;

        let inclusion = registry_for(&server, Some(account()))
            .wait_for_inclusion(&handle())
            .await
            .unwrap();
        assert_eq!(inclusion, Inclusion { block_number: 42 });
        assert_eq!(polls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn wait_for_inclusion_reports_revert() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(rpc_result(json!({ "status": "0x0", "blockNumber": "0x10" })))
            .mount(&server)
            .await;

        let err = registry_for(&server, Some(account()))
            .wait_for_inclusion(&handle())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            RegistryError::ConfirmationReverted {
                tx: tx(9),
                block_number: 16
            }
        );
    }

    #[test]
    fn quantities() {
        assert_eq!(parse_quantity("0x0"), Some(0));
        assert_eq!(parse_quantity("0x1b4"), Some(436));
        assert_eq!(parse_quantity("0x"), None);
        assert_eq!(parse_quantity("12"), None);
    }
}
