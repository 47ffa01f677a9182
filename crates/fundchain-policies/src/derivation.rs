// SPDX-License-Identifier: Apache-2.0

use fundchain_core::{UnixSeconds, SECONDS_PER_DAY};
use fundchain_model::Campaign;
use serde::{Deserialize, Serialize};

/// Refunds reopen on a met target once the fundraiser has been silent this long.
pub const DEFAULT_STALE_UPDATE_SECS: u64 = 180 * SECONDS_PER_DAY;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivationPolicy {
    pub stale_update_secs: u64,
}

impl Default for DerivationPolicy {
    fn default() -> Self {
        Self {
            stale_update_secs: DEFAULT_STALE_UPDATE_SECS,
        }
    }
}

/// `now == deadline` is still open.
#[must_use]
pub fn is_expired(campaign: &Campaign, now: UnixSeconds) -> bool {
    now > campaign.deadline
}

#[must_use]
pub fn can_refund(campaign: &Campaign, now: UnixSeconds, policy: DerivationPolicy) -> bool {
    let silent_for = now.saturating_sub(campaign.last_update_date);
    is_expired(campaign, now) && (!campaign.target_met || silent_for > policy.stale_update_secs)
}

#[must_use]
pub fn can_claim_reward(campaign: &Campaign) -> bool {
    campaign.target_met && campaign.total_funds_released == campaign.amount_collected
}

#[must_use]
pub fn can_vote(campaign: &Campaign, now: UnixSeconds) -> bool {
    !is_expired(campaign, now)
        && campaign.target_met
        && campaign.total_funds_released < campaign.amount_collected
}

#[must_use]
pub fn can_select_for_update(campaign: &Campaign, now: UnixSeconds) -> bool {
    !(is_expired(campaign, now) && !campaign.target_met)
}

/// Whole days until the deadline, rounded up; zero once expired.
#[must_use]
pub fn days_left(campaign: &Campaign, now: UnixSeconds) -> u64 {
    if now >= campaign.deadline {
        return 0;
    }
    (campaign.deadline - now).div_ceil(SECONDS_PER_DAY)
}

/// Every predicate for one snapshot at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignFlags {
    pub is_expired: bool,
    pub target_met: bool,
    pub can_refund: bool,
    pub can_claim_reward: bool,
    pub can_vote: bool,
    pub can_select_for_update: bool,
    pub days_left: u64,
}

#[must_use]
pub fn derive_flags(campaign: &Campaign, now: UnixSeconds, policy: DerivationPolicy) -> CampaignFlags {
    CampaignFlags {
        is_expired: is_expired(campaign, now),
        target_met: campaign.target_met,
        can_refund: can_refund(campaign, now, policy),
        can_claim_reward: can_claim_reward(campaign),
        can_vote: can_vote(campaign, now),
        can_select_for_update: can_select_for_update(campaign, now),
        days_left: days_left(campaign, now),
    }
}
