// SPDX-License-Identifier: Apache-2.0

use fundchain_backend::BackendClient;
use fundchain_chain::ContractGateway;
use fundchain_core::{ClientError, ErrorCode, UnixSeconds};
use fundchain_model::{
    Address, Campaign, CampaignId, CampaignMetadata, CampaignPresence, CampaignView, Role,
};
use fundchain_policies::{
    apply_browse, derive_flags, last_update_label, status_label, BrowseQuery, CampaignFlags,
    CampaignStatus, DerivationPolicy,
};
use serde::Serialize;
use tracing::warn;

/// A campaign as a view renders it: both halves plus everything derived from the chain half.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CampaignDetail {
    pub id: CampaignId,
    pub presence: CampaignPresence,
    pub metadata: Option<CampaignMetadata>,
    pub onchain: Option<Campaign>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<CampaignStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_label: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flags: Option<CampaignFlags>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_update: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress_percent: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_ether: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collected_ether: Option<String>,
}

/// Clock, policy and viewer role shared by every derived field.
#[derive(Debug, Clone, Copy)]
pub struct ViewContext {
    pub now: UnixSeconds,
    pub policy: DerivationPolicy,
    pub viewer: Option<Role>,
}

impl CampaignDetail {
    /// `None` when neither half exists.
    #[must_use]
    pub fn join(view: CampaignView, ctx: ViewContext) -> Option<Self> {
        let presence = view.presence()?;
        let derived = view.onchain.as_ref().map(|c| {
            let status = status_label(c, ctx.now, ctx.viewer);
            (
                status,
                derive_flags(c, ctx.now, ctx.policy),
                last_update_label(c),
                c.progress_percent(),
            )
        });
        let (status, flags, last_update, progress) = match derived {
            Some((s, f, l, p)) => (Some(s), Some(f), Some(l), Some(p)),
            None => (None, None, None, None),
        };
        Some(Self {
            presence,
            status,
            status_label: status.map(CampaignStatus::label),
            flags,
            last_update,
            progress_percent: progress,
            target_ether: view.onchain.as_ref().map(|c| c.target.to_ether_string()),
            collected_ether: view
                .onchain
                .as_ref()
                .map(|c| c.amount_collected.to_ether_string()),
            id: view.id,
            metadata: view.metadata,
            onchain: view.onchain,
        })
    }
}

fn missing_is_none<T>(result: Result<T, ClientError>) -> Result<Option<T>, ClientError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.code == ErrorCode::NotFound => Ok(None),
        Err(err) => Err(err),
    }
}

/// Joins the backend record with the on-chain record. Without a gateway only the
/// backend half is shown.
pub async fn campaign_detail(
    backend: &BackendClient,
    gateway: Option<&ContractGateway>,
    id: &CampaignId,
    ctx: ViewContext,
) -> Result<CampaignDetail, ClientError> {
    let metadata = missing_is_none(backend.campaign(id).await)?;
    let onchain = match gateway {
        Some(gateway) => missing_is_none(gateway.get_campaign(id).await)?,
        None => None,
    };
    let view = CampaignView {
        id: id.clone(),
        metadata,
        onchain,
    };
    CampaignDetail::join(view, ctx).ok_or_else(|| {
        ClientError::new(ErrorCode::NotFound, "campaign not found").with_detail("campaign_id", id.as_str())
    })
}

/// Fundraisers see what they own, investors what they funded. Backend metadata is
/// best-effort here: the chain list is authoritative.
pub async fn my_campaigns(
    backend: &BackendClient,
    gateway: &ContractGateway,
    account: &Address,
    ctx: ViewContext,
) -> Result<Vec<CampaignDetail>, ClientError> {
    let ids = match ctx.viewer {
        Some(Role::Fundraiser) => gateway.get_owned_campaigns(account).await?,
        Some(Role::Investor) => gateway.get_funded_campaigns(account).await?,
        _ => {
            return Err(ClientError::access_denied(
                "only investors and fundraisers have campaigns",
            ))
        }
    };
    let mut out = Vec::with_capacity(ids.len());
    for id in ids {
        let onchain = missing_is_none(gateway.get_campaign(&id).await)?;
        let metadata = match backend.campaign(&id).await {
            Ok(meta) => Some(meta),
            Err(err) => {
                warn!(campaign_id = %id, code = %err.code, "campaign metadata unavailable");
                None
            }
        };
        if let Some(detail) = CampaignDetail::join(
            CampaignView {
                id,
                metadata,
                onchain,
            },
            ctx,
        ) {
            out.push(detail);
        }
    }
    Ok(out)
}

pub async fn browse(
    backend: &BackendClient,
    query: &BrowseQuery,
    now: UnixSeconds,
) -> Result<Vec<CampaignMetadata>, ClientError> {
    let all = backend.campaigns().await?;
    Ok(apply_browse(&all, query, now))
}
