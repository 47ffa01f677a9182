// SPDX-License-Identifier: Apache-2.0

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use fundchain_core::{ClientError, ErrorCode, ResultExt};
use fundchain_model::{Address, TxHash};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::watch;
use tracing::{debug, instrument};

use crate::abi::{decode_revert_reason, from_hex, to_hex};
use crate::provider::{AccountFeed, ChainProvider, SignedTransaction, TxReceipt, TxRequest};

const USER_REJECTED: i64 = 4001;
const UNAUTHORIZED: i64 = 4100;
const DISCONNECTED: i64 = 4900;
const CHAIN_DISCONNECTED: i64 = 4901;
const EXECUTION_REVERTED: i64 = 3;

/// Default wait for a call that blocks on the wallet user.
pub const DEFAULT_PROMPT_TIMEOUT: Duration = Duration::from_secs(300);

/// Methods answered only after the user acts on a wallet prompt.
fn waits_on_user(method: &str) -> bool {
    matches!(method, "eth_requestAccounts" | "eth_signTransaction")
}

/// An unanswered prompt counts as declined. Nothing was signed or submitted.
fn prompt_expired(method: &str, timeout: Duration) -> ClientError {
    let err = if method == "eth_requestAccounts" {
        ClientError::access_denied("wallet access prompt was not answered in time")
    } else {
        ClientError::user_rejected("signature prompt was not answered in time")
    };
    err.with_detail("method", method)
        .with_detail("timeout_ms", timeout.as_millis().to_string())
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SignResult {
    Raw(String),
    Envelope { raw: String },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcReceipt {
    transaction_hash: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    block_number: Option<String>,
}

fn parse_quantity(raw: &str) -> Result<u64, ClientError> {
    let body = raw.trim().trim_start_matches("0x");
    if body.is_empty() {
        return Ok(0);
    }
    u64::from_str_radix(body, 16)
        .map_err(|e| ClientError::decode(format!("invalid hex quantity `{raw}`: {e}")))
}

fn map_rpc_error(method: &str, err: RpcErrorObject) -> ClientError {
    let revert_data = err
        .data
        .as_ref()
        .and_then(Value::as_str)
        .and_then(|d| from_hex(d).ok())
        .and_then(|bytes| decode_revert_reason(&bytes));
    match err.code {
        USER_REJECTED if method == "eth_requestAccounts" => {
            ClientError::access_denied("wallet access was declined")
        }
        USER_REJECTED => ClientError::user_rejected(format!("request declined: {}", err.message)),
        UNAUTHORIZED => ClientError::access_denied(format!("wallet refused {method}: {}", err.message)),
        DISCONNECTED | CHAIN_DISCONNECTED => ClientError::new(
            ErrorCode::ProviderUnavailable,
            format!("wallet disconnected: {}", err.message),
        ),
        code if code == EXECUTION_REVERTED
            || revert_data.is_some()
            || err.message.to_ascii_lowercase().contains("revert") =>
        {
            ClientError::reverted(revert_data.unwrap_or(err.message))
        }
        code => ClientError::new(
            ErrorCode::ProviderUnavailable,
            format!("{method} failed: {}", err.message),
        )
        .with_detail("rpc_code", code.to_string()),
    }
}

/// Wallet or node reachable over HTTP JSON-RPC. Account changes are pushed in by the
/// host through [`JsonRpcProvider::announce_accounts`].
pub struct JsonRpcProvider {
    client: reqwest::Client,
    endpoint: String,
    request_timeout: Duration,
    prompt_timeout: Duration,
    next_id: AtomicU64,
    feed: AccountFeed,
}

impl JsonRpcProvider {
    /// `timeout` bounds plain node calls. Prompt-bound calls use
    /// [`DEFAULT_PROMPT_TIMEOUT`] unless overridden.
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .internal_context("rpc client build failed")?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            request_timeout: timeout,
            prompt_timeout: DEFAULT_PROMPT_TIMEOUT,
            next_id: AtomicU64::new(1),
            feed: AccountFeed::default(),
        })
    }

    #[must_use]
    pub fn with_prompt_timeout(mut self, timeout: Duration) -> Self {
        self.prompt_timeout = timeout;
        self
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Host-side `accountsChanged` hook.
    pub fn announce_accounts(&self, accounts: &[Address]) {
        self.feed.announce(accounts);
    }

    #[instrument(name = "rpc_request", skip(self, params), fields(endpoint = %self.endpoint))]
    async fn request<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, ClientError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params});
        let prompt = waits_on_user(method);
        let timeout = if prompt {
            self.prompt_timeout
        } else {
            self.request_timeout
        };
        let response = self
            .client
            .post(&self.endpoint)
            .timeout(timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if prompt && e.is_timeout() {
                    return prompt_expired(method, timeout);
                }
                ClientError::new(
                    ErrorCode::ProviderUnavailable,
                    format!("wallet provider unreachable: {e}"),
                )
                .with_detail("endpoint", self.endpoint.as_str())
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::new(
                ErrorCode::ProviderUnavailable,
                format!("wallet provider answered {method} with http {status}"),
            ));
        }
        let envelope: RpcResponse = response.json().await.map_err(|e| {
            if prompt && e.is_timeout() {
                return prompt_expired(method, timeout);
            }
            ClientError::decode(format!("{method} response is not json-rpc: {e}"))
        })?;
        if let Some(err) = envelope.error {
            debug!(method, code = err.code, "rpc error");
            return Err(map_rpc_error(method, err));
        }
        serde_json::from_value(envelope.result.unwrap_or(Value::Null))
            .map_err(|e| ClientError::decode(format!("{method} result has unexpected shape: {e}")))
    }
}

#[async_trait]
impl ChainProvider for JsonRpcProvider {
    fn provider_tag(&self) -> &'static str {
        "json-rpc"
    }

    async fn request_accounts(&self) -> Result<Vec<Address>, ClientError> {
        let raw: Vec<String> = self.request("eth_requestAccounts", json!([])).await?;
        let accounts = raw
            .iter()
            .map(|a| Address::parse(a).map_err(|e| ClientError::decode(format!("bad account: {e}"))))
            .collect::<Result<Vec<_>, _>>()?;
        self.feed.announce(&accounts);
        Ok(accounts)
    }

    fn account_changes(&self) -> watch::Receiver<Option<Address>> {
        self.feed.subscribe()
    }

    async fn chain_id(&self) -> Result<u64, ClientError> {
        let raw: String = self.request("eth_chainId", json!([])).await?;
        parse_quantity(&raw)
    }

    async fn call(&self, to: &Address, data: &[u8]) -> Result<Vec<u8>, ClientError> {
        let raw: String = self
            .request(
                "eth_call",
                json!([{"to": to.as_str(), "data": to_hex(data)}, "latest"]),
            )
            .await?;
        from_hex(&raw)
    }

    async fn sign_transaction(&self, tx: &TxRequest) -> Result<SignedTransaction, ClientError> {
        let params = json!([{
            "from": tx.from.as_str(),
            "to": tx.to.as_str(),
            "data": to_hex(&tx.data),
            "value": format!("0x{:x}", tx.value.get()),
        }]);
        let raw = match self.request::<SignResult>("eth_signTransaction", params).await? {
            SignResult::Raw(raw) | SignResult::Envelope { raw } => raw,
        };
        Ok(SignedTransaction {
            raw: from_hex(&raw)?,
        })
    }

    async fn send_raw_transaction(
        &self,
        signed: &SignedTransaction,
    ) -> Result<TxHash, ClientError> {
        let raw: String = self
            .request("eth_sendRawTransaction", json!([to_hex(&signed.raw)]))
            .await?;
        TxHash::parse(&raw).map_err(|e| ClientError::decode(format!("bad tx hash: {e}")))
    }

    async fn transaction_receipt(&self, hash: &TxHash) -> Result<Option<TxReceipt>, ClientError> {
        let receipt: Option<RpcReceipt> = self
            .request("eth_getTransactionReceipt", json!([hash.as_str()]))
            .await?;
        receipt
            .map(|r| {
                Ok::<_, ClientError>(TxReceipt {
                    tx_hash: TxHash::parse(&r.transaction_hash)
                        .map_err(|e| ClientError::decode(format!("bad receipt hash: {e}")))?,
                    success: r.status.as_deref().map_or(true, |s| parse_quantity(s).unwrap_or(0) == 1),
                    block_number: r.block_number.as_deref().map(parse_quantity).transpose()?,
                })
            })
            .transpose()
    }
}
