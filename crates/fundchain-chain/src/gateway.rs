// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;
use std::time::Duration;

use fundchain_core::{ClientError, ClockPort, ErrorCode, UnixSeconds};
use fundchain_model::{Address, Campaign, CampaignId, NftReward, TokenId, TxHash, Wei};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::contract::{decode_campaign, decode_id_list, decode_nft_details, decode_string, ContractCall};
use crate::provider::{TxReceipt, TxRequest};
use crate::session::ProviderSession;
use crate::state::{ActionGate, ActionState, ActionTicket, ContractAction};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmationPolicy {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for ConfirmationPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(120_000),
            poll_interval: Duration::from_millis(1_000),
        }
    }
}

/// Proof that a transaction was mined successfully. Reads that must observe the write
/// are issued only once this exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TxConfirmation {
    pub action: ContractAction,
    pub subject: String,
    pub tx_hash: TxHash,
    pub block_number: Option<u64>,
    pub account: Address,
}

struct Submission {
    action: ContractAction,
    subject: String,
    to: Address,
    call: ContractCall,
    value: Wei,
    /// Account the caller already acted on; signing from any other account is stale.
    signer: Option<Address>,
}

/// Typed access to the crowdfunding contract. Mutations are never retried.
pub struct ContractGateway {
    session: Arc<ProviderSession>,
    gate: Arc<ActionGate>,
    confirmation: ConfirmationPolicy,
    clock: Arc<dyn ClockPort>,
}

impl ContractGateway {
    #[must_use]
    pub fn new(
        session: Arc<ProviderSession>,
        confirmation: ConfirmationPolicy,
        clock: Arc<dyn ClockPort>,
    ) -> Self {
        Self {
            session,
            gate: Arc::new(ActionGate::new()),
            confirmation,
            clock,
        }
    }

    #[must_use]
    pub fn session(&self) -> &Arc<ProviderSession> {
        &self.session
    }

    #[must_use]
    pub fn gate(&self) -> &Arc<ActionGate> {
        &self.gate
    }

    #[must_use]
    pub fn action_state(&self, action: ContractAction, subject: &str) -> ActionState {
        self.gate.state_of(action, subject)
    }

    fn crowdfunding(&self) -> Address {
        self.session.contracts().crowdfunding.clone()
    }

    async fn read(&self, call: ContractCall) -> Result<Vec<u8>, ClientError> {
        let to = self.crowdfunding();
        self.session.provider().call(&to, &call.encode()).await
    }

    /// Zero-owner records are how the contract reports an unknown id.
    #[instrument(skip(self), fields(campaign = id.as_str()))]
    pub async fn get_campaign(&self, id: &CampaignId) -> Result<Campaign, ClientError> {
        let data = self.read(ContractCall::Campaigns { id: id.clone() }).await?;
        let campaign = decode_campaign(id, &data)?;
        if !campaign.exists_on_chain() {
            return Err(ClientError::new(
                ErrorCode::NotFound,
                format!("campaign `{id}` has no on-chain record"),
            )
            .with_detail("campaign_id", id.as_str()));
        }
        Ok(campaign)
    }

    #[instrument(skip(self), fields(owner = owner.as_str()))]
    pub async fn get_owned_campaigns(&self, owner: &Address) -> Result<Vec<CampaignId>, ClientError> {
        let data = self
            .read(ContractCall::GetOwnedCampaigns {
                owner: owner.clone(),
            })
            .await?;
        decode_id_list(&data)
    }

    #[instrument(skip(self), fields(investor = investor.as_str()))]
    pub async fn get_funded_campaigns(
        &self,
        investor: &Address,
    ) -> Result<Vec<CampaignId>, ClientError> {
        let data = self
            .read(ContractCall::GetFundedCampaigns {
                investor: investor.clone(),
            })
            .await?;
        decode_id_list(&data)
    }

    pub async fn get_reward_description(&self, account: &Address) -> Result<String, ClientError> {
        let data = self
            .read(ContractCall::GetRewardDescription {
                account: account.clone(),
            })
            .await?;
        decode_string(&data)
    }

    pub async fn get_nft_details(&self, token_id: TokenId) -> Result<NftReward, ClientError> {
        let data = self.read(ContractCall::GetNftDetails { token_id }).await?;
        decode_nft_details(token_id, &data)
    }

    pub async fn create_campaign(
        &self,
        id: &CampaignId,
        owner: &Address,
        target: Wei,
        deadline: UnixSeconds,
    ) -> Result<TxConfirmation, ClientError> {
        self.submit_create_campaign(id, owner, target, deadline, None)
            .await
    }

    /// Like [`Self::create_campaign`], but refuses to sign unless `signer` is still the
    /// active account.
    pub async fn create_campaign_as(
        &self,
        id: &CampaignId,
        owner: &Address,
        target: Wei,
        deadline: UnixSeconds,
        signer: &Address,
    ) -> Result<TxConfirmation, ClientError> {
        self.submit_create_campaign(id, owner, target, deadline, Some(signer.clone()))
            .await
    }

    async fn submit_create_campaign(
        &self,
        id: &CampaignId,
        owner: &Address,
        target: Wei,
        deadline: UnixSeconds,
        signer: Option<Address>,
    ) -> Result<TxConfirmation, ClientError> {
        let now = self.clock.now_unix();
        let submission = Submission {
            action: ContractAction::CreateCampaign,
            subject: id.to_string(),
            to: self.crowdfunding(),
            call: ContractCall::CreateCampaign {
                id: id.clone(),
                owner: owner.clone(),
                target,
                deadline,
            },
            value: Wei::ZERO,
            signer,
        };
        self.execute(submission, || {
            if owner.is_zero() {
                return Err(ClientError::invalid_field("owner", "owner must not be the zero address"));
            }
            if target.is_zero() {
                return Err(ClientError::invalid_field("target", "target must be greater than zero"));
            }
            if deadline <= now {
                return Err(ClientError::invalid_field("deadline", "deadline must be in the future"));
            }
            Ok(())
        })
        .await
    }

    pub async fn invest(&self, id: &CampaignId, amount: Wei) -> Result<TxConfirmation, ClientError> {
        let submission = Submission {
            action: ContractAction::Invest,
            subject: id.to_string(),
            to: self.crowdfunding(),
            call: ContractCall::InvestInCampaign { id: id.clone() },
            value: amount,
            signer: None,
        };
        self.execute(submission, || {
            if amount.is_zero() {
                return Err(ClientError::invalid_field("amount", "amount must be greater than zero"));
            }
            Ok(())
        })
        .await
    }

    pub async fn refund(&self, id: &CampaignId) -> Result<TxConfirmation, ClientError> {
        self.execute_simple(
            ContractAction::Refund,
            ContractCall::Refund { id: id.clone() },
            None,
        )
        .await
    }

    pub async fn vote(&self, id: &CampaignId, in_favor: bool) -> Result<TxConfirmation, ClientError> {
        self.execute_simple(
            ContractAction::Vote,
            ContractCall::Vote {
                id: id.clone(),
                in_favor,
            },
            None,
        )
        .await
    }

    pub async fn claim_reward(&self, id: &CampaignId) -> Result<TxConfirmation, ClientError> {
        self.execute_simple(
            ContractAction::ClaimReward,
            ContractCall::ClaimReward { id: id.clone() },
            None,
        )
        .await
    }

    pub async fn add_update_date(&self, id: &CampaignId) -> Result<TxConfirmation, ClientError> {
        self.execute_simple(
            ContractAction::AddUpdateDate,
            ContractCall::AddUpdateDate { id: id.clone() },
            None,
        )
        .await
    }

    /// Stamps the update only if `signer`, the owner the caller checked, is still active.
    pub async fn add_update_date_as(
        &self,
        id: &CampaignId,
        signer: &Address,
    ) -> Result<TxConfirmation, ClientError> {
        self.execute_simple(
            ContractAction::AddUpdateDate,
            ContractCall::AddUpdateDate { id: id.clone() },
            Some(signer.clone()),
        )
        .await
    }

    /// Sent to the reward NFT contract rather than the crowdfunding contract.
    pub async fn redeem_reward(&self, token_id: TokenId) -> Result<TxConfirmation, ClientError> {
        let to = self.session.reward_nft_address()?.clone();
        let submission = Submission {
            action: ContractAction::RedeemReward,
            subject: token_id.to_string(),
            to,
            call: ContractCall::RedeemReward { token_id },
            value: Wei::ZERO,
            signer: None,
        };
        self.execute(submission, || Ok(())).await
    }

    async fn execute_simple(
        &self,
        action: ContractAction,
        call: ContractCall,
        signer: Option<Address>,
    ) -> Result<TxConfirmation, ClientError> {
        let subject = match &call {
            ContractCall::Refund { id }
            | ContractCall::Vote { id, .. }
            | ContractCall::ClaimReward { id }
            | ContractCall::AddUpdateDate { id } => id.to_string(),
            other => other.method_name().to_string(),
        };
        let submission = Submission {
            action,
            subject,
            to: self.crowdfunding(),
            call,
            value: Wei::ZERO,
            signer,
        };
        self.execute(submission, || Ok(())).await
    }

    #[instrument(
        name = "contract_submit",
        skip(self, submission, validate),
        fields(action = submission.action.as_str(), subject = %submission.subject)
    )]
    async fn execute<F>(&self, submission: Submission, validate: F) -> Result<TxConfirmation, ClientError>
    where
        F: FnOnce() -> Result<(), ClientError>,
    {
        let mut ticket = self.gate.begin(submission.action, &submission.subject)?;
        let result = self.drive(&mut ticket, submission, validate).await;
        match &result {
            Ok(confirmation) => {
                info!(tx_hash = confirmation.tx_hash.as_str(), "transaction confirmed");
            }
            Err(err) => {
                ticket.fail();
                warn!(code = err.code.as_str(), error = %err.message, "transaction not confirmed");
            }
        }
        result
    }

    async fn drive<F>(
        &self,
        ticket: &mut ActionTicket,
        submission: Submission,
        validate: F,
    ) -> Result<TxConfirmation, ClientError>
    where
        F: FnOnce() -> Result<(), ClientError>,
    {
        validate()?;
        let account = self.session.require_account()?;
        let expected = submission.signer.unwrap_or_else(|| account.clone());
        if account != expected {
            return Err(stale_account(&expected, Some(&account)));
        }

        ticket.advance(ActionState::AwaitingSignature)?;
        let request = TxRequest {
            from: account.clone(),
            to: submission.to,
            data: submission.call.encode(),
            value: submission.value,
        };
        let provider = self.session.provider();
        let signed = provider.sign_transaction(&request).await?;

        let active = self.session.active_account();
        if active.as_ref() != Some(&expected) {
            return Err(stale_account(&expected, active.as_ref()));
        }

        let tx_hash = provider.send_raw_transaction(&signed).await?;
        ticket.advance(ActionState::Submitted)?;
        info!(tx_hash = tx_hash.as_str(), "transaction submitted");

        let receipt = self.await_receipt(&tx_hash).await?;
        if !receipt.success {
            return Err(ClientError::reverted("transaction failed on chain")
                .with_detail("tx_hash", tx_hash.as_str()));
        }
        ticket.advance(ActionState::Confirmed)?;
        Ok(TxConfirmation {
            action: submission.action,
            subject: submission.subject,
            tx_hash,
            block_number: receipt.block_number,
            account,
        })
    }

    /// Bounded wait. Expiry stops the wait only; the transaction may still be mined.
    async fn await_receipt(&self, tx_hash: &TxHash) -> Result<TxReceipt, ClientError> {
        let provider = self.session.provider();
        let poll = async {
            loop {
                if let Some(receipt) = provider.transaction_receipt(tx_hash).await? {
                    return Ok::<_, ClientError>(receipt);
                }
                tokio::time::sleep(self.confirmation.poll_interval).await;
            }
        };
        match tokio::time::timeout(self.confirmation.timeout, poll).await {
            Ok(result) => result,
            Err(_) => Err(ClientError::new(
                ErrorCode::ConfirmationTimeout,
                format!(
                    "no receipt after {} ms; the transaction may still confirm",
                    self.confirmation.timeout.as_millis()
                ),
            )
            .with_detail("tx_hash", tx_hash.as_str())),
        }
    }
}

fn stale_account(expected: &Address, active: Option<&Address>) -> ClientError {
    ClientError::new(
        ErrorCode::StaleAccount,
        "wallet account changed while the action was pending; nothing was submitted",
    )
    .with_detail("expected_account", expected.as_str())
    .with_detail("active_account", active.map(Address::as_str).unwrap_or("none"))
}
