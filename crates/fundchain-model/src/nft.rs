// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

use crate::ids::TokenId;

/// Reward token minted by the contract once a campaign's funds are fully released.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NftReward {
    pub token_id: TokenId,
    pub campaign_id: String,
    pub reward_description: String,
    pub redeemed: bool,
}
