// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

use fundchain_core::{ClientError, ResultExt};
use fundchain_model::{ExplorerTransaction, TransactionSearch};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument, warn};

pub const DEFAULT_EXPLORER_URL: &str = "https://api-sepolia.etherscan.io/api";
pub const DEFAULT_ADDRESS_LIMIT: usize = 4;

const NO_TRANSACTIONS: &str = "No transactions found";

#[derive(Debug, Deserialize)]
struct AccountListing {
    #[serde(default)]
    status: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    result: Value,
}

#[derive(Debug, Deserialize)]
struct ProxyLookup {
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<Value>,
}

/// Etherscan-compatible transaction lookups. An empty answer is `Ok(vec![])`.
#[derive(Debug, Clone)]
pub struct ExplorerClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    address_limit: usize,
}

impl ExplorerClient {
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .internal_context("explorer client build failed")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            address_limit: DEFAULT_ADDRESS_LIMIT,
        })
    }

    /// Number of rows an address search keeps, newest first. Zero is treated as one.
    #[must_use]
    pub fn with_address_limit(mut self, limit: usize) -> Self {
        self.address_limit = limit.max(1);
        self
    }

    #[instrument(name = "explorer_lookup", skip(self))]
    pub async fn lookup(
        &self,
        search: &TransactionSearch,
    ) -> Result<Vec<ExplorerTransaction>, ClientError> {
        match search {
            TransactionSearch::Address(address) => self.by_address(address.as_str()).await,
            TransactionSearch::Hash(hash) => self.by_hash(hash.as_str()).await,
        }
    }

    async fn get(&self, params: &[(&str, &str)]) -> Result<Vec<u8>, ClientError> {
        let mut query: Vec<(&str, &str)> = params.to_vec();
        if let Some(key) = self.api_key.as_deref() {
            query.push(("apikey", key));
        }
        let response = self
            .client
            .get(&self.base_url)
            .query(&query)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "explorer unreachable");
                ClientError::backend(format!("explorer request failed: {e}"))
                    .with_detail("endpoint", self.base_url.clone())
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::backend(format!("explorer answered {status}"))
                .with_detail("status", status.as_u16().to_string()));
        }
        response
            .bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|e| ClientError::backend(format!("read explorer body failed: {e}")))
    }

    async fn by_address(&self, address: &str) -> Result<Vec<ExplorerTransaction>, ClientError> {
        let body = self
            .get(&[
                ("module", "account"),
                ("action", "txlist"),
                ("address", address),
                ("startblock", "0"),
                ("endblock", "99999999"),
                ("sort", "desc"),
            ])
            .await?;
        let listing: AccountListing = serde_json::from_slice(&body)
            .map_err(|e| ClientError::decode(format!("unexpected txlist payload: {e}")))?;
        if listing.status != "1" {
            if listing.message.starts_with(NO_TRANSACTIONS) || listing.result.as_array().is_some() {
                debug!(address, "no transactions");
                return Ok(Vec::new());
            }
            let reason = listing
                .result
                .as_str()
                .map(str::to_string)
                .unwrap_or(listing.message);
            return Err(ClientError::backend(format!("explorer refused lookup: {reason}")));
        }
        let mut rows: Vec<ExplorerTransaction> = serde_json::from_value(listing.result)
            .map_err(|e| ClientError::decode(format!("unexpected txlist rows: {e}")))?;
        rows.sort_by_key(|tx| std::cmp::Reverse(tx.block().ok().flatten().unwrap_or(0)));
        rows.truncate(self.address_limit);
        debug!(address, rows = rows.len(), "transactions listed");
        Ok(rows)
    }

    async fn by_hash(&self, hash: &str) -> Result<Vec<ExplorerTransaction>, ClientError> {
        let body = self
            .get(&[
                ("module", "proxy"),
                ("action", "eth_getTransactionByHash"),
                ("txhash", hash),
            ])
            .await?;
        let lookup: ProxyLookup = serde_json::from_slice(&body)
            .map_err(|e| ClientError::decode(format!("unexpected proxy payload: {e}")))?;
        if let Some(error) = lookup.error {
            let reason = error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("proxy lookup failed")
                .to_string();
            return Err(ClientError::backend(reason));
        }
        match lookup.result {
            Value::Null => Ok(Vec::new()),
            Value::String(reason) => Err(ClientError::backend(format!(
                "explorer refused lookup: {reason}"
            ))),
            found => serde_json::from_value(found)
                .map(|tx| vec![tx])
                .map_err(|e| ClientError::decode(format!("unexpected transaction: {e}"))),
        }
    }
}

/// First 12 characters of a hash, as the tracker table shows it.
#[must_use]
pub fn truncate_hash(hash: &str) -> String {
    hash.chars().take(12).collect()
}

/// `first10...last10`; short inputs are returned whole.
#[must_use]
pub fn truncate_address(address: &str) -> String {
    let chars: Vec<char> = address.chars().collect();
    if chars.len() <= 20 {
        return address.to_string();
    }
    let head: String = chars[..10].iter().collect();
    let tail: String = chars[chars.len() - 10..].iter().collect();
    format!("{head}...{tail}")
}
