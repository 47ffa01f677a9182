// SPDX-License-Identifier: Apache-2.0

use fundchain_core::UnixSeconds;
use serde::{Deserialize, Serialize};

use crate::amount::Wei;
use crate::ids::{Address, CampaignId};
use crate::serde_helpers::{opt_string_or_number, string_or_number};

/// Contract-side campaign record as returned by `campaigns(id)`.
///
/// `amount_collected` may exceed `target`; nothing here asserts otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Campaign {
    pub id: CampaignId,
    pub owner: Address,
    pub target: Wei,
    pub deadline: UnixSeconds,
    pub amount_collected: Wei,
    pub target_met: bool,
    pub refunded: bool,
    pub last_update_date: UnixSeconds,
    pub initial_funds_released: bool,
    pub total_funds_released: Wei,
    pub votes_in_favor: u64,
    pub total_investors: u64,
}

impl Campaign {
    /// A getter on an unknown key yields the zero-filled struct.
    #[must_use]
    pub fn exists_on_chain(&self) -> bool {
        !self.owner.is_zero()
    }

    /// Percentage of target collected, capped for display at 100.
    #[must_use]
    pub fn progress_percent(&self) -> u8 {
        if self.target.is_zero() {
            return 0;
        }
        let pct = self.amount_collected.get().saturating_mul(100) / self.target.get();
        u8::try_from(pct.min(100)).unwrap_or(100)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reward {
    #[serde(deserialize_with = "string_or_number::deserialize", default)]
    pub amount: String,
    #[serde(default)]
    pub perk: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignUpdate {
    pub date: String,
    pub description: String,
}

/// Free-text update history stored by the backend as a serialised JSON list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateLog {
    entries: Vec<CampaignUpdate>,
}

impl UpdateLog {
    /// Unparseable or absent text is an empty log.
    #[must_use]
    pub fn parse(raw: Option<&str>) -> Self {
        let entries = raw
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .and_then(|s| serde_json::from_str::<Vec<CampaignUpdate>>(s).ok())
            .unwrap_or_default();
        Self { entries }
    }

    #[must_use]
    pub fn entries(&self) -> &[CampaignUpdate] {
        &self.entries
    }

    pub fn push(&mut self, update: CampaignUpdate) {
        self.entries.push(update);
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.entries)
    }
}

/// Off-chain campaign record served by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignMetadata {
    #[serde(alias = "campaign_id", deserialize_with = "string_or_number::deserialize")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, alias = "campaign_description")]
    pub description: String,
    #[serde(default)]
    pub risk: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub location: String,
    #[serde(default, deserialize_with = "string_or_number::deserialize")]
    pub target: String,
    #[serde(default, deserialize_with = "string_or_number::deserialize")]
    pub collected: String,
    #[serde(default)]
    pub deadline: String,
    #[serde(default)]
    pub rewards: Vec<Reward>,
    #[serde(default)]
    pub updates: Option<String>,
    #[serde(
        default,
        rename = "numberOfInvestors",
        deserialize_with = "opt_string_or_number::deserialize"
    )]
    pub number_of_investors: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub profile_picture: Option<String>,
}

impl CampaignMetadata {
    #[must_use]
    pub fn update_log(&self) -> UpdateLog {
        UpdateLog::parse(self.updates.as_deref())
    }
}

/// Which half of the two-step creation is visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignPresence {
    Complete,
    BackendOnly,
    ChainOnly,
}

/// Backend record and on-chain record joined by id; either half may be missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CampaignView {
    pub id: CampaignId,
    pub metadata: Option<CampaignMetadata>,
    pub onchain: Option<Campaign>,
}

impl CampaignView {
    /// `None` only when neither half exists.
    #[must_use]
    pub fn presence(&self) -> Option<CampaignPresence> {
        match (&self.metadata, &self.onchain) {
            (Some(_), Some(_)) => Some(CampaignPresence::Complete),
            (Some(_), None) => Some(CampaignPresence::BackendOnly),
            (None, Some(_)) => Some(CampaignPresence::ChainOnly),
            (None, None) => None,
        }
    }
}
