// SPDX-License-Identifier: Apache-2.0

use fundchain_core::{ClientError, ErrorCode};
use fundchain_model::Role;
use serde::{Deserialize, Serialize};

/// Actions a view may offer. Gating here is advisory; the contract and backend enforce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum UserAction {
    Invest,
    Vote,
    Refund,
    ClaimReward,
    RedeemReward,
    CreateCampaign,
    UpdateCampaign,
    ListFundraisers,
    ApproveFundraiser,
}

impl UserAction {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Invest => "invest",
            Self::Vote => "vote",
            Self::Refund => "refund",
            Self::ClaimReward => "claim_reward",
            Self::RedeemReward => "redeem_reward",
            Self::CreateCampaign => "create_campaign",
            Self::UpdateCampaign => "update_campaign",
            Self::ListFundraisers => "list_fundraisers",
            Self::ApproveFundraiser => "approve_fundraiser",
        }
    }
}

const INVESTOR_ACTIONS: &[UserAction] = &[
    UserAction::Invest,
    UserAction::Vote,
    UserAction::Refund,
    UserAction::ClaimReward,
    UserAction::RedeemReward,
];
const FUNDRAISER_ACTIONS: &[UserAction] = &[UserAction::CreateCampaign, UserAction::UpdateCampaign];
const ADMIN_ACTIONS: &[UserAction] = &[UserAction::ListFundraisers, UserAction::ApproveFundraiser];

#[must_use]
pub fn allowed_actions(role: Role) -> &'static [UserAction] {
    match role {
        Role::Investor => INVESTOR_ACTIONS,
        Role::Fundraiser => FUNDRAISER_ACTIONS,
        Role::Admin => ADMIN_ACTIONS,
    }
}

#[must_use]
pub fn role_allows(role: Role, action: UserAction) -> bool {
    allowed_actions(role).contains(&action)
}

pub fn require_role(role: Option<Role>, action: UserAction) -> Result<(), ClientError> {
    match role {
        None => Err(ClientError::access_denied(format!(
            "sign in to {}",
            action.as_str().replace('_', " ")
        ))
        .with_detail("action", action.as_str())),
        Some(role) if role_allows(role, action) => Ok(()),
        Some(role) => Err(ClientError::new(
            ErrorCode::AccessDenied,
            format!("role `{role}` cannot {}", action.as_str().replace('_', " ")),
        )
        .with_detail("action", action.as_str())
        .with_detail("role", role.as_str())),
    }
}
