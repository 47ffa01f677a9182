// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;
use std::sync::Arc;

use fundchain_backend::{Attachment, BackendClient, CampaignSubmission};
use fundchain_chain::{ContractGateway, TxConfirmation};
use fundchain_core::{ClientError, ClockPort, ErrorCode, ExitCode};
use fundchain_model::{ApprovalStatus, Campaign, CampaignId, Wei};
use fundchain_policies::{
    can_claim_reward, can_refund, can_select_for_update, can_vote, is_expired,
    validate_campaign_form, validate_update_form, CampaignForm, DerivationPolicy, UpdateForm,
};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{info, instrument, warn};

/// One external effect inside a multi-system workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStep {
    Validate,
    CheckApproval,
    BackendCreateCampaign,
    ChainCreateCampaign,
    ChainInvest,
    BackendRecordInvestment,
    BackendPostUpdate,
    ChainMarkUpdate,
}

/// Result of a workflow that writes to both the backend and the chain.
///
/// `Partial` means at least one external write landed and a later one did not; the
/// completed writes are not rolled back.
#[derive(Debug)]
pub enum Outcome<T> {
    Complete(T),
    Partial {
        completed: Vec<WorkflowStep>,
        failed: WorkflowStep,
        error: ClientError,
        details: BTreeMap<String, String>,
    },
    Failed {
        failed: WorkflowStep,
        error: ClientError,
    },
}

impl<T: Serialize> Outcome<T> {
    #[must_use]
    pub fn status(&self) -> &'static str {
        match self {
            Self::Complete(_) => "complete",
            Self::Partial { .. } => "partial",
            Self::Failed { .. } => "failed",
        }
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete(_))
    }

    #[must_use]
    pub fn error(&self) -> Option<&ClientError> {
        match self {
            Self::Complete(_) => None,
            Self::Partial { error, .. } | Self::Failed { error, .. } => Some(error),
        }
    }

    /// A partial write is a dependency failure even when the failing step was a validation.
    #[must_use]
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::Complete(_) => ExitCode::Success,
            Self::Partial { .. } => ExitCode::DependencyFailure,
            Self::Failed { error, .. } => error.code.exit_code(),
        }
    }

    #[must_use]
    pub fn to_payload(&self, command: &str) -> Value {
        match self {
            Self::Complete(value) => json!({
                "command": command,
                "status": self.status(),
                "result": value,
            }),
            Self::Partial {
                completed,
                failed,
                error,
                details,
            } => json!({
                "command": command,
                "status": self.status(),
                "completed": completed,
                "failed": failed,
                "error": error.to_machine(),
                "details": details,
            }),
            Self::Failed { failed, error } => json!({
                "command": command,
                "status": self.status(),
                "completed": [],
                "failed": failed,
                "error": error.to_machine(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CampaignCreated {
    pub campaign_id: CampaignId,
    pub confirmation: TxConfirmation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdatePosted {
    pub campaign_id: CampaignId,
    pub update_date: String,
    pub confirmation: TxConfirmation,
}

macro_rules! step {
    ($step:expr, $result:expr) => {
        match $result {
            Ok(value) => value,
            Err(error) => {
                return Outcome::Failed {
                    failed: $step,
                    error,
                }
            }
        }
    };
}

/// User actions that span the backend and the contract, plus the single-system
/// actions whose eligibility depends on a fresh campaign read.
pub struct Workflows {
    backend: BackendClient,
    gateway: Arc<ContractGateway>,
    clock: Arc<dyn ClockPort>,
    policy: DerivationPolicy,
}

impl Workflows {
    #[must_use]
    pub fn new(
        backend: BackendClient,
        gateway: Arc<ContractGateway>,
        clock: Arc<dyn ClockPort>,
        policy: DerivationPolicy,
    ) -> Self {
        Self {
            backend,
            gateway,
            clock,
            policy,
        }
    }

    #[must_use]
    pub fn backend(&self) -> &BackendClient {
        &self.backend
    }

    #[must_use]
    pub fn gateway(&self) -> &Arc<ContractGateway> {
        &self.gateway
    }

    #[must_use]
    pub fn now(&self) -> u64 {
        self.clock.now_unix()
    }

    #[must_use]
    pub fn policy(&self) -> DerivationPolicy {
        self.policy
    }

    /// Backend record first, since it assigns the id; then the chain record under that id.
    #[instrument(name = "workflow_create_campaign", skip_all, fields(fundraiser_id = fundraiser_id))]
    pub async fn create_campaign(
        &self,
        fundraiser_id: &str,
        form: &CampaignForm,
        image: Attachment,
    ) -> Outcome<CampaignCreated> {
        let validated = step!(
            WorkflowStep::Validate,
            validate_campaign_form(form, self.now())
        );
        let owner = step!(
            WorkflowStep::Validate,
            self.gateway.session().require_account()
        );
        let profile = step!(WorkflowStep::CheckApproval, self.backend.current_user().await);
        if profile.approval_status() != ApprovalStatus::Approved {
            return Outcome::Failed {
                failed: WorkflowStep::CheckApproval,
                error: ClientError::access_denied("fundraiser account is not approved yet")
                    .with_detail("approval", profile.approval.unwrap_or_default()),
            };
        }

        let target = validated.target;
        let deadline = validated.deadline;
        let campaign_id = step!(
            WorkflowStep::BackendCreateCampaign,
            self.backend
                .create_campaign(CampaignSubmission {
                    fundraiser_id: fundraiser_id.to_string(),
                    wallet: owner.clone(),
                    campaign: validated,
                    image,
                })
                .await
        );

        match self
            .gateway
            .create_campaign_as(&campaign_id, &owner, target, deadline, &owner)
            .await
        {
            Ok(confirmation) => {
                info!(campaign_id = %campaign_id, tx = %confirmation.tx_hash, "campaign created");
                Outcome::Complete(CampaignCreated {
                    campaign_id,
                    confirmation,
                })
            }
            Err(error) => {
                warn!(campaign_id = %campaign_id, code = %error.code, "campaign stored off-chain only");
                Outcome::Partial {
                    completed: vec![WorkflowStep::BackendCreateCampaign],
                    failed: WorkflowStep::ChainCreateCampaign,
                    error,
                    details: BTreeMap::from([(
                        "campaign_id".to_string(),
                        campaign_id.to_string(),
                    )]),
                }
            }
        }
    }

    /// Chain payment first; the backend tally follows only a confirmed payment.
    #[instrument(name = "workflow_invest", skip(self), fields(campaign = %id))]
    pub async fn invest(&self, id: &CampaignId, amount_ether: &str) -> Outcome<TxConfirmation> {
        let amount = step!(
            WorkflowStep::Validate,
            Wei::parse_ether(amount_ether).map_err(|e| e.into_field_error("amount"))
        );
        if amount.is_zero() {
            return Outcome::Failed {
                failed: WorkflowStep::Validate,
                error: ClientError::invalid_field("amount", "amount must be greater than zero"),
            };
        }
        let campaign = step!(WorkflowStep::Validate, self.gateway.get_campaign(id).await);
        if is_expired(&campaign, self.now()) {
            return Outcome::Failed {
                failed: WorkflowStep::Validate,
                error: ClientError::invalid_field("campaign_id", "campaign deadline has passed"),
            };
        }

        let confirmation = step!(
            WorkflowStep::ChainInvest,
            self.gateway.invest(id, amount).await
        );
        match self.backend.fund_campaign(id, amount).await {
            Ok(()) => Outcome::Complete(confirmation),
            Err(error) => {
                warn!(tx = %confirmation.tx_hash, code = %error.code, "investment not recorded by backend");
                Outcome::Partial {
                    completed: vec![WorkflowStep::ChainInvest],
                    failed: WorkflowStep::BackendRecordInvestment,
                    error,
                    details: BTreeMap::from([
                        ("campaign_id".to_string(), id.to_string()),
                        ("tx_hash".to_string(), confirmation.tx_hash.to_string()),
                        ("amount_wei".to_string(), amount.to_string()),
                    ]),
                }
            }
        }
    }

    /// Backend log entry first, then the on-chain update stamp that refund eligibility reads.
    #[instrument(name = "workflow_post_update", skip(self, form), fields(campaign = %id))]
    pub async fn post_update(&self, id: &CampaignId, form: &UpdateForm) -> Outcome<UpdatePosted> {
        let update = step!(WorkflowStep::Validate, validate_update_form(form));
        let campaign = step!(WorkflowStep::Validate, self.gateway.get_campaign(id).await);
        let account = step!(
            WorkflowStep::Validate,
            self.gateway.session().require_account()
        );
        if campaign.owner != account {
            return Outcome::Failed {
                failed: WorkflowStep::Validate,
                error: ClientError::access_denied("only the campaign owner can post updates")
                    .with_detail("owner", campaign.owner.as_str())
                    .with_detail("account", account.as_str()),
            };
        }
        if !can_select_for_update(&campaign, self.now()) {
            return Outcome::Failed {
                failed: WorkflowStep::Validate,
                error: ClientError::invalid_field(
                    "campaign_id",
                    "campaign missed its target before the deadline",
                ),
            };
        }

        step!(
            WorkflowStep::BackendPostUpdate,
            self.backend
                .update_campaign(id, &update.update_date, &update.description)
                .await
        );
        match self.gateway.add_update_date_as(id, &account).await {
            Ok(confirmation) => Outcome::Complete(UpdatePosted {
                campaign_id: id.clone(),
                update_date: update.update_date,
                confirmation,
            }),
            Err(error) => {
                warn!(code = %error.code, "update logged off-chain only");
                Outcome::Partial {
                    completed: vec![WorkflowStep::BackendPostUpdate],
                    failed: WorkflowStep::ChainMarkUpdate,
                    error,
                    details: BTreeMap::from([
                        ("campaign_id".to_string(), id.to_string()),
                        ("update_date".to_string(), update.update_date),
                    ]),
                }
            }
        }
    }

    async fn fresh(&self, id: &CampaignId) -> Result<Campaign, ClientError> {
        self.gateway.get_campaign(id).await
    }

    pub async fn vote(&self, id: &CampaignId, in_favor: bool) -> Result<TxConfirmation, ClientError> {
        let campaign = self.fresh(id).await?;
        if !can_vote(&campaign, self.now()) {
            return Err(ineligible("vote", "voting is not open for this campaign"));
        }
        self.gateway.vote(id, in_favor).await
    }

    pub async fn refund(&self, id: &CampaignId) -> Result<TxConfirmation, ClientError> {
        let campaign = self.fresh(id).await?;
        if !can_refund(&campaign, self.now(), self.policy) {
            return Err(ineligible("refund", "refunds are not available for this campaign"));
        }
        self.gateway.refund(id).await
    }

    pub async fn claim_reward(&self, id: &CampaignId) -> Result<TxConfirmation, ClientError> {
        let campaign = self.fresh(id).await?;
        if !can_claim_reward(&campaign) {
            return Err(ineligible(
                "claim_reward",
                "rewards unlock once every collected fund is released",
            ));
        }
        self.gateway.claim_reward(id).await
    }
}

fn ineligible(action: &str, reason: &str) -> ClientError {
    ClientError::new(ErrorCode::ValidationError, reason).with_detail("action", action)
}
