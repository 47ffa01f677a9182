// SPDX-License-Identifier: Apache-2.0

use fundchain_core::UnixSeconds;
use fundchain_model::{format_unix, Campaign, Role};
use serde::{Deserialize, Serialize};

use crate::derivation::is_expired;

pub const NOT_UPDATED_LABEL: &str = "Fundraiser has not updated yet";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    InProgress,
    TargetMet,
    DeadlinePassed,
    TargetMissed,
}

impl CampaignStatus {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::InProgress => "In Progress",
            Self::TargetMet => "Target Met",
            Self::DeadlinePassed => "Deadline Passed",
            Self::TargetMissed => "Target not hit before deadline",
        }
    }
}

/// Fundraisers see a missed target called out; everyone else sees the deadline.
#[must_use]
pub fn status_label(campaign: &Campaign, now: UnixSeconds, viewer: Option<Role>) -> CampaignStatus {
    let expired = is_expired(campaign, now);
    if viewer == Some(Role::Fundraiser) && expired && !campaign.target_met {
        CampaignStatus::TargetMissed
    } else if campaign.target_met {
        CampaignStatus::TargetMet
    } else if !expired {
        CampaignStatus::InProgress
    } else {
        CampaignStatus::DeadlinePassed
    }
}

/// An update stamped before the deadline is the creation stamp, not a real update.
#[must_use]
pub fn last_update_label(campaign: &Campaign) -> String {
    if campaign.last_update_date < campaign.deadline {
        NOT_UPDATED_LABEL.to_string()
    } else {
        format_unix(campaign.last_update_date)
    }
}
