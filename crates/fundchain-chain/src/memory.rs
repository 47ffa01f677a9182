// SPDX-License-Identifier: Apache-2.0

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use fundchain_core::{sha256_hex, ClientError};
use fundchain_model::{Address, Campaign, CampaignId, NftReward, TokenId, TxHash, Wei};
use tokio::sync::{watch, Mutex};

use crate::contract::{encode_campaign, encode_id_list, encode_nft_details, encode_string, ContractCall};
use crate::provider::{AccountFeed, ChainProvider, SignedTransaction, TxReceipt, TxRequest};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedTx {
    pub tx_hash: TxHash,
    pub from: Address,
    pub to: Address,
    pub value: Wei,
    pub call: ContractCall,
}

/// Scriptable provider backed by plain maps. Submissions are recorded, not executed:
/// tests edit the maps to stand in for contract effects.
pub struct InMemoryProvider {
    pub accounts: Mutex<Vec<Address>>,
    pub unavailable: AtomicBool,
    pub deny_access: AtomicBool,
    pub reject_signatures: AtomicBool,
    pub revert_reason: Mutex<Option<String>>,
    pub mined_failure: AtomicBool,
    pub withhold_receipts: AtomicBool,
    pub switch_account_on_sign: Mutex<Option<Address>>,
    pub campaigns: Mutex<HashMap<CampaignId, Campaign>>,
    pub owned: Mutex<HashMap<Address, Vec<CampaignId>>>,
    pub funded: Mutex<HashMap<Address, Vec<CampaignId>>>,
    pub reward_descriptions: Mutex<HashMap<Address, String>>,
    pub nfts: Mutex<HashMap<TokenId, NftReward>>,
    pub submitted: Mutex<Vec<SubmittedTx>>,
    pub sign_calls: AtomicU64,
    pub receipt_polls: AtomicU64,
    chain_id: u64,
    feed: AccountFeed,
}

impl InMemoryProvider {
    #[must_use]
    pub fn new(chain_id: u64, accounts: Vec<Address>) -> Self {
        Self {
            accounts: Mutex::new(accounts),
            unavailable: AtomicBool::new(false),
            deny_access: AtomicBool::new(false),
            reject_signatures: AtomicBool::new(false),
            revert_reason: Mutex::new(None),
            mined_failure: AtomicBool::new(false),
            withhold_receipts: AtomicBool::new(false),
            switch_account_on_sign: Mutex::new(None),
            campaigns: Mutex::new(HashMap::new()),
            owned: Mutex::new(HashMap::new()),
            funded: Mutex::new(HashMap::new()),
            reward_descriptions: Mutex::new(HashMap::new()),
            nfts: Mutex::new(HashMap::new()),
            submitted: Mutex::new(Vec::new()),
            sign_calls: AtomicU64::new(0),
            receipt_polls: AtomicU64::new(0),
            chain_id,
            feed: AccountFeed::default(),
        }
    }

    /// Simulates the wallet's `accountsChanged` event.
    pub async fn switch_account(&self, account: Option<Address>) {
        let accounts = account.into_iter().collect::<Vec<_>>();
        self.feed.announce(&accounts);
        *self.accounts.lock().await = accounts;
    }

    fn ensure_available(&self) -> Result<(), ClientError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(ClientError::provider_unavailable());
        }
        Ok(())
    }

    fn zero_campaign(id: &CampaignId) -> Campaign {
        Campaign {
            id: id.clone(),
            owner: Address::zero(),
            target: Wei::ZERO,
            deadline: 0,
            amount_collected: Wei::ZERO,
            target_met: false,
            refunded: false,
            last_update_date: 0,
            initial_funds_released: false,
            total_funds_released: Wei::ZERO,
            votes_in_favor: 0,
            total_investors: 0,
        }
    }
}

fn pack(tx: &TxRequest) -> Vec<u8> {
    let mut raw = Vec::with_capacity(56 + tx.data.len());
    raw.extend_from_slice(&tx.from.to_bytes());
    raw.extend_from_slice(&tx.to.to_bytes());
    raw.extend_from_slice(&tx.value.get().to_be_bytes());
    raw.extend_from_slice(&tx.data);
    raw
}

fn unpack(raw: &[u8]) -> Result<(Address, Address, Wei, &[u8]), ClientError> {
    if raw.len() < 56 {
        return Err(ClientError::decode("signed transaction is truncated"));
    }
    let mut from = [0_u8; 20];
    from.copy_from_slice(&raw[..20]);
    let mut to = [0_u8; 20];
    to.copy_from_slice(&raw[20..40]);
    let mut value = [0_u8; 16];
    value.copy_from_slice(&raw[40..56]);
    Ok((
        Address::from_bytes(from),
        Address::from_bytes(to),
        Wei::new(u128::from_be_bytes(value)),
        &raw[56..],
    ))
}

#[async_trait]
impl ChainProvider for InMemoryProvider {
    fn provider_tag(&self) -> &'static str {
        "memory"
    }

    async fn request_accounts(&self) -> Result<Vec<Address>, ClientError> {
        self.ensure_available()?;
        if self.deny_access.load(Ordering::SeqCst) {
            return Err(ClientError::access_denied("wallet access was declined"));
        }
        let accounts = self.accounts.lock().await.clone();
        self.feed.announce(&accounts);
        Ok(accounts)
    }

    fn account_changes(&self) -> watch::Receiver<Option<Address>> {
        self.feed.subscribe()
    }

    async fn chain_id(&self) -> Result<u64, ClientError> {
        self.ensure_available()?;
        Ok(self.chain_id)
    }

    async fn call(&self, _to: &Address, data: &[u8]) -> Result<Vec<u8>, ClientError> {
        self.ensure_available()?;
        let out = match ContractCall::decode(data)? {
            ContractCall::Campaigns { id } => {
                let campaigns = self.campaigns.lock().await;
                let campaign = campaigns
                    .get(&id)
                    .cloned()
                    .unwrap_or_else(|| Self::zero_campaign(&id));
                encode_campaign(&campaign)
            }
            ContractCall::GetOwnedCampaigns { owner } => encode_id_list(
                self.owned
                    .lock()
                    .await
                    .get(&owner)
                    .map(Vec::as_slice)
                    .unwrap_or_default(),
            ),
            ContractCall::GetFundedCampaigns { investor } => encode_id_list(
                self.funded
                    .lock()
                    .await
                    .get(&investor)
                    .map(Vec::as_slice)
                    .unwrap_or_default(),
            ),
            ContractCall::GetRewardDescription { account } => encode_string(
                self.reward_descriptions
                    .lock()
                    .await
                    .get(&account)
                    .map(String::as_str)
                    .unwrap_or_default(),
            ),
            ContractCall::GetNftDetails { token_id } => {
                let nfts = self.nfts.lock().await;
                let reward = nfts.get(&token_id).cloned().unwrap_or(NftReward {
                    token_id,
                    campaign_id: String::new(),
                    reward_description: String::new(),
                    redeemed: false,
                });
                encode_nft_details(&reward)
            }
            other => {
                return Err(ClientError::internal(format!(
                    "{} is a transaction, not a read",
                    other.method_name()
                )))
            }
        };
        Ok(out)
    }

    async fn sign_transaction(&self, tx: &TxRequest) -> Result<SignedTransaction, ClientError> {
        self.ensure_available()?;
        self.sign_calls.fetch_add(1, Ordering::SeqCst);
        if self.reject_signatures.load(Ordering::SeqCst) {
            return Err(ClientError::user_rejected("signature request declined"));
        }
        if let Some(reason) = self.revert_reason.lock().await.clone() {
            return Err(ClientError::reverted(reason));
        }
        if let Some(next) = self.switch_account_on_sign.lock().await.take() {
            self.switch_account(Some(next)).await;
        }
        Ok(SignedTransaction { raw: pack(tx) })
    }

    async fn send_raw_transaction(&self, signed: &SignedTransaction) -> Result<TxHash, ClientError> {
        self.ensure_available()?;
        let (from, to, value, data) = unpack(&signed.raw)?;
        let call = ContractCall::decode(data)?;
        let mut submitted = self.submitted.lock().await;
        let mut preimage = signed.raw.clone();
        preimage.extend_from_slice(&(submitted.len() as u64).to_be_bytes());
        let tx_hash = TxHash::parse(&format!("0x{}", sha256_hex(&preimage)))
            .map_err(|e| ClientError::internal(e.to_string()))?;
        submitted.push(SubmittedTx {
            tx_hash: tx_hash.clone(),
            from,
            to,
            value,
            call,
        });
        Ok(tx_hash)
    }

    async fn transaction_receipt(&self, hash: &TxHash) -> Result<Option<TxReceipt>, ClientError> {
        self.ensure_available()?;
        self.receipt_polls.fetch_add(1, Ordering::SeqCst);
        if self.withhold_receipts.load(Ordering::SeqCst) {
            return Ok(None);
        }
        let submitted = self.submitted.lock().await;
        Ok(submitted
            .iter()
            .position(|tx| &tx.tx_hash == hash)
            .map(|index| TxReceipt {
                tx_hash: hash.clone(),
                success: !self.mined_failure.load(Ordering::SeqCst),
                block_number: Some(index as u64 + 1),
            }))
    }
}
