// SPDX-License-Identifier: Apache-2.0

use fundchain_core::{ClientError, UnixSeconds};
use fundchain_model::{Address, Campaign, CampaignId, NftReward, TokenId, Wei};

use crate::abi::{decode_values, encode_call, encode_values, selector, split_selector, AbiType, AbiValue};

#[derive(Debug, Clone, Copy)]
struct MethodSpec {
    signature: &'static str,
    inputs: &'static [AbiType],
    mutating: bool,
}

const CREATE_CAMPAIGN: MethodSpec = MethodSpec {
    signature: "createCampaign(string,address,uint256,uint256)",
    inputs: &[AbiType::String, AbiType::Address, AbiType::Uint, AbiType::Uint],
    mutating: true,
};
const INVEST_IN_CAMPAIGN: MethodSpec = MethodSpec {
    signature: "investInCampaign(string)",
    inputs: &[AbiType::String],
    mutating: true,
};
const REFUND: MethodSpec = MethodSpec {
    signature: "refund(string)",
    inputs: &[AbiType::String],
    mutating: true,
};
const VOTE: MethodSpec = MethodSpec {
    signature: "vote(string,bool)",
    inputs: &[AbiType::String, AbiType::Bool],
    mutating: true,
};
const CLAIM_REWARD: MethodSpec = MethodSpec {
    signature: "claimReward(string)",
    inputs: &[AbiType::String],
    mutating: true,
};
const ADD_UPDATE_DATE: MethodSpec = MethodSpec {
    signature: "addUpdateDate(string)",
    inputs: &[AbiType::String],
    mutating: true,
};
const REDEEM_REWARD: MethodSpec = MethodSpec {
    signature: "redeemReward(uint256)",
    inputs: &[AbiType::Uint],
    mutating: true,
};
const CAMPAIGNS: MethodSpec = MethodSpec {
    signature: "campaigns(string)",
    inputs: &[AbiType::String],
    mutating: false,
};
const GET_OWNED_CAMPAIGNS: MethodSpec = MethodSpec {
    signature: "getOwnedCampaigns(address)",
    inputs: &[AbiType::Address],
    mutating: false,
};
const GET_FUNDED_CAMPAIGNS: MethodSpec = MethodSpec {
    signature: "getFundedCampaigns(address)",
    inputs: &[AbiType::Address],
    mutating: false,
};
const GET_REWARD_DESCRIPTION: MethodSpec = MethodSpec {
    signature: "getRewardDescription(address)",
    inputs: &[AbiType::Address],
    mutating: false,
};
const GET_NFT_DETAILS: MethodSpec = MethodSpec {
    signature: "getNFTDetails(uint256)",
    inputs: &[AbiType::Uint],
    mutating: false,
};

const METHODS: &[MethodSpec] = &[
    CREATE_CAMPAIGN,
    INVEST_IN_CAMPAIGN,
    REFUND,
    VOTE,
    CLAIM_REWARD,
    ADD_UPDATE_DATE,
    REDEEM_REWARD,
    CAMPAIGNS,
    GET_OWNED_CAMPAIGNS,
    GET_FUNDED_CAMPAIGNS,
    GET_REWARD_DESCRIPTION,
    GET_NFT_DETAILS,
];

/// Output layout of `campaigns(string)`.
const CAMPAIGN_FIELDS: &[AbiType] = &[
    AbiType::Address,
    AbiType::Uint,
    AbiType::Uint,
    AbiType::Uint,
    AbiType::Bool,
    AbiType::Bool,
    AbiType::Uint,
    AbiType::Bool,
    AbiType::Uint,
    AbiType::Uint,
    AbiType::Uint,
];

/// Output layout of `getNFTDetails(uint256)`: campaign id, description, redeemed.
const NFT_FIELDS: &[AbiType] = &[AbiType::String, AbiType::String, AbiType::Bool];

/// One invocation of the contract surface, arguments already in contract units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContractCall {
    CreateCampaign {
        id: CampaignId,
        owner: Address,
        target: Wei,
        deadline: UnixSeconds,
    },
    InvestInCampaign { id: CampaignId },
    Refund { id: CampaignId },
    Vote { id: CampaignId, in_favor: bool },
    ClaimReward { id: CampaignId },
    AddUpdateDate { id: CampaignId },
    RedeemReward { token_id: TokenId },
    Campaigns { id: CampaignId },
    GetOwnedCampaigns { owner: Address },
    GetFundedCampaigns { investor: Address },
    GetRewardDescription { account: Address },
    GetNftDetails { token_id: TokenId },
}

impl ContractCall {
    fn method(&self) -> MethodSpec {
        match self {
            Self::CreateCampaign { .. } => CREATE_CAMPAIGN,
            Self::InvestInCampaign { .. } => INVEST_IN_CAMPAIGN,
            Self::Refund { .. } => REFUND,
            Self::Vote { .. } => VOTE,
            Self::ClaimReward { .. } => CLAIM_REWARD,
            Self::AddUpdateDate { .. } => ADD_UPDATE_DATE,
            Self::RedeemReward { .. } => REDEEM_REWARD,
            Self::Campaigns { .. } => CAMPAIGNS,
            Self::GetOwnedCampaigns { .. } => GET_OWNED_CAMPAIGNS,
            Self::GetFundedCampaigns { .. } => GET_FUNDED_CAMPAIGNS,
            Self::GetRewardDescription { .. } => GET_REWARD_DESCRIPTION,
            Self::GetNftDetails { .. } => GET_NFT_DETAILS,
        }
    }

    #[must_use]
    pub fn signature(&self) -> &'static str {
        self.method().signature
    }

    #[must_use]
    pub fn method_name(&self) -> &'static str {
        let sig = self.signature();
        sig.split_once('(').map_or(sig, |(name, _)| name)
    }

    #[must_use]
    pub fn is_mutating(&self) -> bool {
        self.method().mutating
    }

    fn args(&self) -> Vec<AbiValue> {
        let id_arg = |id: &CampaignId| AbiValue::String(id.as_str().to_string());
        match self {
            Self::CreateCampaign {
                id,
                owner,
                target,
                deadline,
            } => vec![
                id_arg(id),
                AbiValue::Address(owner.clone()),
                AbiValue::Uint(target.get()),
                AbiValue::Uint(u128::from(*deadline)),
            ],
            Self::InvestInCampaign { id }
            | Self::Refund { id }
            | Self::ClaimReward { id }
            | Self::AddUpdateDate { id }
            | Self::Campaigns { id } => vec![id_arg(id)],
            Self::Vote { id, in_favor } => vec![id_arg(id), AbiValue::Bool(*in_favor)],
            Self::RedeemReward { token_id } | Self::GetNftDetails { token_id } => {
                vec![AbiValue::Uint(token_id.0)]
            }
            Self::GetOwnedCampaigns { owner: account }
            | Self::GetFundedCampaigns { investor: account }
            | Self::GetRewardDescription { account } => vec![AbiValue::Address(account.clone())],
        }
    }

    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        encode_call(self.signature(), &self.args())
    }

    /// Inverse of [`ContractCall::encode`].
    pub fn decode(calldata: &[u8]) -> Result<Self, ClientError> {
        let (sel, body) = split_selector(calldata)?;
        let method = METHODS
            .iter()
            .find(|m| selector(m.signature) == sel)
            .ok_or_else(|| ClientError::decode("calldata selector matches no contract method"))?;
        let mut values = decode_values(method.inputs, body)?.into_iter();
        let mut next = || {
            values
                .next()
                .ok_or_else(|| ClientError::decode("calldata is missing arguments"))
        };
        let call = match method.signature {
            s if s == CREATE_CAMPAIGN.signature => Self::CreateCampaign {
                id: as_campaign_id(next()?)?,
                owner: as_address(next()?)?,
                target: Wei::new(as_uint(next()?)?),
                deadline: as_u64(next()?)?,
            },
            s if s == INVEST_IN_CAMPAIGN.signature => Self::InvestInCampaign {
                id: as_campaign_id(next()?)?,
            },
            s if s == REFUND.signature => Self::Refund {
                id: as_campaign_id(next()?)?,
            },
            s if s == VOTE.signature => Self::Vote {
                id: as_campaign_id(next()?)?,
                in_favor: as_bool(next()?)?,
            },
            s if s == CLAIM_REWARD.signature => Self::ClaimReward {
                id: as_campaign_id(next()?)?,
            },
            s if s == ADD_UPDATE_DATE.signature => Self::AddUpdateDate {
                id: as_campaign_id(next()?)?,
            },
            s if s == REDEEM_REWARD.signature => Self::RedeemReward {
                token_id: TokenId(as_uint(next()?)?),
            },
            s if s == CAMPAIGNS.signature => Self::Campaigns {
                id: as_campaign_id(next()?)?,
            },
            s if s == GET_OWNED_CAMPAIGNS.signature => Self::GetOwnedCampaigns {
                owner: as_address(next()?)?,
            },
            s if s == GET_FUNDED_CAMPAIGNS.signature => Self::GetFundedCampaigns {
                investor: as_address(next()?)?,
            },
            s if s == GET_REWARD_DESCRIPTION.signature => Self::GetRewardDescription {
                account: as_address(next()?)?,
            },
            _ => Self::GetNftDetails {
                token_id: TokenId(as_uint(next()?)?),
            },
        };
        Ok(call)
    }
}

fn as_uint(value: AbiValue) -> Result<u128, ClientError> {
    match value {
        AbiValue::Uint(v) => Ok(v),
        other => Err(ClientError::decode(format!("expected uint256, got {other:?}"))),
    }
}

fn as_u64(value: AbiValue) -> Result<u64, ClientError> {
    let v = as_uint(value)?;
    u64::try_from(v).map_err(|_| ClientError::decode(format!("timestamp {v} out of range")))
}

fn as_bool(value: AbiValue) -> Result<bool, ClientError> {
    match value {
        AbiValue::Bool(v) => Ok(v),
        other => Err(ClientError::decode(format!("expected bool, got {other:?}"))),
    }
}

fn as_address(value: AbiValue) -> Result<Address, ClientError> {
    match value {
        AbiValue::Address(v) => Ok(v),
        other => Err(ClientError::decode(format!("expected address, got {other:?}"))),
    }
}

fn as_string(value: AbiValue) -> Result<String, ClientError> {
    match value {
        AbiValue::String(v) => Ok(v),
        other => Err(ClientError::decode(format!("expected string, got {other:?}"))),
    }
}

fn as_campaign_id(value: AbiValue) -> Result<CampaignId, ClientError> {
    let raw = as_string(value)?;
    CampaignId::parse(&raw).map_err(|e| ClientError::decode(format!("bad campaign id: {e}")))
}

/// Decodes `campaigns(id)` output. A zero-filled result decodes fine; callers decide
/// what a zero owner means.
pub fn decode_campaign(id: &CampaignId, data: &[u8]) -> Result<Campaign, ClientError> {
    let mut v = decode_values(CAMPAIGN_FIELDS, data)?.into_iter();
    let mut next = || {
        v.next()
            .ok_or_else(|| ClientError::decode("campaign tuple is short"))
    };
    Ok(Campaign {
        id: id.clone(),
        owner: as_address(next()?)?,
        target: Wei::new(as_uint(next()?)?),
        deadline: as_u64(next()?)?,
        amount_collected: Wei::new(as_uint(next()?)?),
        target_met: as_bool(next()?)?,
        refunded: as_bool(next()?)?,
        last_update_date: as_u64(next()?)?,
        initial_funds_released: as_bool(next()?)?,
        total_funds_released: Wei::new(as_uint(next()?)?),
        votes_in_favor: as_u64(next()?)?,
        total_investors: as_u64(next()?)?,
    })
}

#[must_use]
pub fn encode_campaign(campaign: &Campaign) -> Vec<u8> {
    encode_values(&[
        AbiValue::Address(campaign.owner.clone()),
        AbiValue::Uint(campaign.target.get()),
        AbiValue::Uint(u128::from(campaign.deadline)),
        AbiValue::Uint(campaign.amount_collected.get()),
        AbiValue::Bool(campaign.target_met),
        AbiValue::Bool(campaign.refunded),
        AbiValue::Uint(u128::from(campaign.last_update_date)),
        AbiValue::Bool(campaign.initial_funds_released),
        AbiValue::Uint(campaign.total_funds_released.get()),
        AbiValue::Uint(u128::from(campaign.votes_in_favor)),
        AbiValue::Uint(u128::from(campaign.total_investors)),
    ])
}

pub fn decode_id_list(data: &[u8]) -> Result<Vec<CampaignId>, ClientError> {
    match decode_values(&[AbiType::StringArray], data)?.pop() {
        Some(AbiValue::StringArray(items)) => items
            .iter()
            .map(|s| {
                CampaignId::parse(s).map_err(|e| ClientError::decode(format!("bad campaign id: {e}")))
            })
            .collect(),
        _ => Err(ClientError::decode("expected string[]")),
    }
}

#[must_use]
pub fn encode_id_list(ids: &[CampaignId]) -> Vec<u8> {
    encode_values(&[AbiValue::StringArray(
        ids.iter().map(|id| id.as_str().to_string()).collect(),
    )])
}

pub fn decode_string(data: &[u8]) -> Result<String, ClientError> {
    match decode_values(&[AbiType::String], data)?.pop() {
        Some(value) => as_string(value),
        None => Err(ClientError::decode("expected string")),
    }
}

#[must_use]
pub fn encode_string(value: &str) -> Vec<u8> {
    encode_values(&[AbiValue::String(value.to_string())])
}

pub fn decode_nft_details(token_id: TokenId, data: &[u8]) -> Result<NftReward, ClientError> {
    let mut v = decode_values(NFT_FIELDS, data)?.into_iter();
    let mut next = || v.next().ok_or_else(|| ClientError::decode("nft tuple is short"));
    Ok(NftReward {
        token_id,
        campaign_id: as_string(next()?)?,
        reward_description: as_string(next()?)?,
        redeemed: as_bool(next()?)?,
    })
}

#[must_use]
pub fn encode_nft_details(reward: &NftReward) -> Vec<u8> {
    encode_values(&[
        AbiValue::String(reward.campaign_id.clone()),
        AbiValue::String(reward.reward_description.clone()),
        AbiValue::Bool(reward.redeemed),
    ])
}
