// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use fundchain_core::ClientError;
use fundchain_model::{Address, TxHash, Wei};
use tokio::sync::watch;

/// Unsigned transaction handed to the wallet for signing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxRequest {
    pub from: Address,
    pub to: Address,
    pub data: Vec<u8>,
    pub value: Wei,
}

/// Opaque wallet-signed transaction bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    pub raw: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    pub tx_hash: TxHash,
    pub success: bool,
    pub block_number: Option<u64>,
}

/// Wallet/node seam. Every step may fail or be declined by the user; implementations map
/// those outcomes onto the client error taxonomy and never retry.
#[async_trait]
pub trait ChainProvider: Send + Sync {
    fn provider_tag(&self) -> &'static str;

    /// Permission prompt. Also refreshes the account feed.
    async fn request_accounts(&self) -> Result<Vec<Address>, ClientError>;

    /// Active account as pushed by the wallet. Dependents hold a receiver and observe
    /// changes as they happen.
    fn account_changes(&self) -> watch::Receiver<Option<Address>>;

    async fn chain_id(&self) -> Result<u64, ClientError>;

    async fn call(&self, to: &Address, data: &[u8]) -> Result<Vec<u8>, ClientError>;

    async fn sign_transaction(&self, tx: &TxRequest) -> Result<SignedTransaction, ClientError>;

    async fn send_raw_transaction(&self, signed: &SignedTransaction)
        -> Result<TxHash, ClientError>;

    async fn transaction_receipt(&self, hash: &TxHash) -> Result<Option<TxReceipt>, ClientError>;
}

/// Single-account broadcast shared by provider implementations.
#[derive(Debug)]
pub struct AccountFeed {
    tx: watch::Sender<Option<Address>>,
}

impl Default for AccountFeed {
    fn default() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }
}

impl AccountFeed {
    /// Only the first account is tracked.
    pub fn announce(&self, accounts: &[Address]) {
        let next = accounts.first().cloned();
        self.tx.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<Address>> {
        self.tx.subscribe()
    }

    #[must_use]
    pub fn current(&self) -> Option<Address> {
        self.tx.borrow().clone()
    }
}
