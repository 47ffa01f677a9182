// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use fundchain_core::{ClientError, ErrorCode};
use fundchain_model::Address;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{info, instrument};

use crate::provider::ChainProvider;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractAddresses {
    pub crowdfunding: Address,
    /// Reward token contract; only redemption goes here.
    pub reward_nft: Option<Address>,
}

/// Connected wallet plus the contracts it talks to. Built once per connection and
/// passed to every consumer; dropping it is the teardown.
pub struct ProviderSession {
    provider: Arc<dyn ChainProvider>,
    contracts: ContractAddresses,
    chain_id: u64,
    accounts: watch::Receiver<Option<Address>>,
}

impl std::fmt::Debug for ProviderSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderSession")
            .field("provider", &self.provider.provider_tag())
            .field("contracts", &self.contracts)
            .field("chain_id", &self.chain_id)
            .field("account", &*self.accounts.borrow())
            .finish()
    }
}

impl ProviderSession {
    /// Fails with `ProviderUnavailable` when nothing answers and `AccessDenied` when the
    /// user declines or the wallet exposes no account.
    #[instrument(name = "provider_connect", skip(provider), fields(provider = provider.provider_tag()))]
    pub async fn connect(
        provider: Arc<dyn ChainProvider>,
        contracts: ContractAddresses,
    ) -> Result<Self, ClientError> {
        let accounts = provider.request_accounts().await?;
        if accounts.is_empty() {
            return Err(ClientError::access_denied(
                "wallet granted access but exposed no account",
            ));
        }
        let chain_id = provider.chain_id().await?;
        let accounts_rx = provider.account_changes();
        let active = accounts_rx.borrow().clone();
        info!(
            chain_id,
            account = active.as_ref().map(Address::as_str).unwrap_or("none"),
            contract = contracts.crowdfunding.as_str(),
            "wallet session connected"
        );
        Ok(Self {
            provider,
            contracts,
            chain_id,
            accounts: accounts_rx,
        })
    }

    #[must_use]
    pub fn provider(&self) -> &Arc<dyn ChainProvider> {
        &self.provider
    }

    #[must_use]
    pub fn contracts(&self) -> &ContractAddresses {
        &self.contracts
    }

    #[must_use]
    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    #[must_use]
    pub fn active_account(&self) -> Option<Address> {
        self.accounts.borrow().clone()
    }

    pub fn require_account(&self) -> Result<Address, ClientError> {
        self.active_account().ok_or_else(|| {
            ClientError::new(ErrorCode::AccessDenied, "wallet has no active account")
        })
    }

    /// New receiver that observes every later account change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<Address>> {
        self.accounts.clone()
    }

    pub fn reward_nft_address(&self) -> Result<&Address, ClientError> {
        self.contracts.reward_nft.as_ref().ok_or_else(|| {
            ClientError::invalid_field("reward_nft_address", "reward NFT contract address is not configured")
        })
    }
}
