// SPDX-License-Identifier: Apache-2.0

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use fundchain_backend::{DEFAULT_ADDRESS_LIMIT, DEFAULT_BACKEND_URL, DEFAULT_EXPLORER_URL};
use fundchain_chain::{ConfirmationPolicy, ContractAddresses, DEFAULT_PROMPT_TIMEOUT};
use fundchain_core::{resolve_fundchain_cache_dir, ClientError, ENV_FUNDCHAIN_CACHE_DIR};
use fundchain_model::Address;
use fundchain_policies::{DerivationPolicy, DEFAULT_STALE_UPDATE_SECS};
use serde::Serialize;

pub const ENV_BACKEND_URL: &str = "FUNDCHAIN_BACKEND_URL";
pub const ENV_RPC_URL: &str = "FUNDCHAIN_RPC_URL";
pub const ENV_CONTRACT_ADDRESS: &str = "FUNDCHAIN_CONTRACT_ADDRESS";
pub const ENV_NFT_ADDRESS: &str = "FUNDCHAIN_NFT_ADDRESS";
pub const ENV_EXPLORER_URL: &str = "FUNDCHAIN_EXPLORER_URL";
pub const ENV_EXPLORER_API_KEY: &str = "FUNDCHAIN_EXPLORER_API_KEY";
pub const ENV_EXPLORER_LIMIT: &str = "FUNDCHAIN_EXPLORER_LIMIT";
pub const ENV_REQUEST_TIMEOUT_MS: &str = "FUNDCHAIN_REQUEST_TIMEOUT_MS";
pub const ENV_PROMPT_TIMEOUT_MS: &str = "FUNDCHAIN_PROMPT_TIMEOUT_MS";
pub const ENV_CONFIRMATION_TIMEOUT_MS: &str = "FUNDCHAIN_CONFIRMATION_TIMEOUT_MS";
pub const ENV_RECEIPT_POLL_MS: &str = "FUNDCHAIN_RECEIPT_POLL_MS";
pub const ENV_STALE_UPDATE_DAYS: &str = "FUNDCHAIN_STALE_UPDATE_DAYS";
pub const ENV_LOG_JSON: &str = "FUNDCHAIN_LOG_JSON";

pub const DEFAULT_RPC_URL: &str = "http://localhost:8545";

fn env_string(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub(crate) fn env_bool(name: &str, default: bool) -> bool {
    env::var(name)
        .ok()
        .and_then(|v| match v.as_str() {
            "1" | "true" | "TRUE" | "yes" | "YES" => Some(true),
            "0" | "false" | "FALSE" | "no" | "NO" => Some(false),
            _ => None,
        })
        .unwrap_or(default)
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

fn env_usize(name: &str, default: usize) -> usize {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(default)
}

fn env_duration_ms(name: &str, default_ms: u64) -> Duration {
    Duration::from_millis(env_u64(name, default_ms))
}

/// Every knob the client reads, resolved once at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientConfig {
    pub backend_url: String,
    pub rpc_url: String,
    pub contract_address: Option<String>,
    pub nft_address: Option<String>,
    pub explorer_url: String,
    #[serde(skip_serializing)]
    pub explorer_api_key: Option<String>,
    pub explorer_limit: usize,
    pub request_timeout: Duration,
    /// Wallet calls that wait on the user: account access and signing.
    pub prompt_timeout: Duration,
    pub confirmation_timeout: Duration,
    pub receipt_poll_interval: Duration,
    pub stale_update_days: u64,
    pub log_json: bool,
    pub cache_dir: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            rpc_url: DEFAULT_RPC_URL.to_string(),
            contract_address: None,
            nft_address: None,
            explorer_url: DEFAULT_EXPLORER_URL.to_string(),
            explorer_api_key: None,
            explorer_limit: DEFAULT_ADDRESS_LIMIT,
            request_timeout: Duration::from_millis(15_000),
            prompt_timeout: DEFAULT_PROMPT_TIMEOUT,
            confirmation_timeout: Duration::from_millis(120_000),
            receipt_poll_interval: Duration::from_millis(1_000),
            stale_update_days: DEFAULT_STALE_UPDATE_SECS / fundchain_core::SECONDS_PER_DAY,
            log_json: false,
            cache_dir: resolve_fundchain_cache_dir(),
        }
    }
}

impl ClientConfig {
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            backend_url: env_string(ENV_BACKEND_URL).unwrap_or(defaults.backend_url),
            rpc_url: env_string(ENV_RPC_URL).unwrap_or(defaults.rpc_url),
            contract_address: env_string(ENV_CONTRACT_ADDRESS),
            nft_address: env_string(ENV_NFT_ADDRESS),
            explorer_url: env_string(ENV_EXPLORER_URL).unwrap_or(defaults.explorer_url),
            explorer_api_key: env_string(ENV_EXPLORER_API_KEY),
            explorer_limit: env_usize(ENV_EXPLORER_LIMIT, defaults.explorer_limit),
            request_timeout: env_duration_ms(ENV_REQUEST_TIMEOUT_MS, 15_000),
            prompt_timeout: env_duration_ms(
                ENV_PROMPT_TIMEOUT_MS,
                u64::try_from(DEFAULT_PROMPT_TIMEOUT.as_millis()).unwrap_or(u64::MAX),
            ),
            confirmation_timeout: env_duration_ms(ENV_CONFIRMATION_TIMEOUT_MS, 120_000),
            receipt_poll_interval: env_duration_ms(ENV_RECEIPT_POLL_MS, 1_000),
            stale_update_days: env_u64(ENV_STALE_UPDATE_DAYS, defaults.stale_update_days),
            log_json: env_bool(ENV_LOG_JSON, false),
            cache_dir: defaults.cache_dir,
        }
    }

    /// Catches settings that would make every later call fail.
    pub fn validate(&self) -> Result<(), ClientError> {
        for (name, url) in [
            (ENV_BACKEND_URL, &self.backend_url),
            (ENV_RPC_URL, &self.rpc_url),
            (ENV_EXPLORER_URL, &self.explorer_url),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ClientError::invalid_field(
                    name,
                    format!("`{url}` must be an http(s) URL"),
                ));
            }
        }
        if self.request_timeout.is_zero() {
            return Err(ClientError::invalid_field(
                ENV_REQUEST_TIMEOUT_MS,
                "timeout must be greater than zero",
            ));
        }
        if self.prompt_timeout < self.request_timeout {
            return Err(ClientError::invalid_field(
                ENV_PROMPT_TIMEOUT_MS,
                "prompt timeout must not be shorter than the request timeout",
            ));
        }
        if self.confirmation_timeout.is_zero() {
            return Err(ClientError::invalid_field(
                ENV_CONFIRMATION_TIMEOUT_MS,
                "timeout must be greater than zero",
            ));
        }
        if self.receipt_poll_interval.is_zero() {
            return Err(ClientError::invalid_field(
                ENV_RECEIPT_POLL_MS,
                "poll interval must be greater than zero",
            ));
        }
        Ok(())
    }

    /// Chain commands need the crowdfunding contract; the NFT contract stays optional.
    pub fn contract_addresses(&self) -> Result<ContractAddresses, ClientError> {
        let raw = self.contract_address.as_deref().ok_or_else(|| {
            ClientError::invalid_field(ENV_CONTRACT_ADDRESS, "contract address is not configured")
        })?;
        let crowdfunding =
            Address::parse(raw).map_err(|e| e.into_field_error(ENV_CONTRACT_ADDRESS))?;
        let reward_nft = self
            .nft_address
            .as_deref()
            .map(|raw| Address::parse(raw).map_err(|e| e.into_field_error(ENV_NFT_ADDRESS)))
            .transpose()?;
        Ok(ContractAddresses {
            crowdfunding,
            reward_nft,
        })
    }

    #[must_use]
    pub fn confirmation_policy(&self) -> ConfirmationPolicy {
        ConfirmationPolicy {
            timeout: self.confirmation_timeout,
            poll_interval: self.receipt_poll_interval,
        }
    }

    #[must_use]
    pub fn derivation_policy(&self) -> DerivationPolicy {
        DerivationPolicy {
            stale_update_secs: self
                .stale_update_days
                .saturating_mul(fundchain_core::SECONDS_PER_DAY),
        }
    }

    /// Names of the variables this config reads, for `--help` and `config` output.
    #[must_use]
    pub fn env_names() -> [&'static str; 15] {
        [
            ENV_BACKEND_URL,
            ENV_RPC_URL,
            ENV_CONTRACT_ADDRESS,
            ENV_NFT_ADDRESS,
            ENV_EXPLORER_URL,
            ENV_EXPLORER_API_KEY,
            ENV_EXPLORER_LIMIT,
            ENV_REQUEST_TIMEOUT_MS,
            ENV_PROMPT_TIMEOUT_MS,
            ENV_CONFIRMATION_TIMEOUT_MS,
            ENV_RECEIPT_POLL_MS,
            ENV_STALE_UPDATE_DAYS,
            ENV_LOG_JSON,
            ENV_FUNDCHAIN_CACHE_DIR,
            fundchain_core::ENV_FUNDCHAIN_LOG_LEVEL,
        ]
    }
}
