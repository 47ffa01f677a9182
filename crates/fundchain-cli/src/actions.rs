// SPDX-License-Identifier: Apache-2.0

use std::path::{Path, PathBuf};
use std::sync::Arc;

use fundchain_backend::{
    truncate_address, truncate_hash, Attachment, BackendClient, ExplorerClient, SessionState,
    TokenStore,
};
use fundchain_chain::{ContractGateway, JsonRpcProvider, ProviderSession};
use fundchain_core::{ClientError, ClockPort, ExitCode, SystemClock};
use fundchain_model::{
    ApprovalDecision, CampaignId, ExplorerTransaction, Role, TokenId, TransactionSearch,
};
use fundchain_policies::{
    validate_fundraiser_signup, validate_login, validate_profile_update, validate_signup,
    BrowseQuery, BrowseSort, CampaignForm, LoginForm, ProfileUpdateForm, RewardInput, SignupForm,
    UpdateForm, UserAction,
};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::info;

use crate::commands::{SignupArgs, SortCli, TrackBy};
use crate::config::ClientConfig;
use crate::output::{emit_ok, CliError, OutputMode};
use crate::views::{self, ViewContext};
use crate::workflows::{Outcome, Workflows};

/// Everything one invocation needs, built from the resolved config.
pub(crate) struct AppContext {
    config: ClientConfig,
    store: TokenStore,
    clock: Arc<dyn ClockPort>,
    output_mode: OutputMode,
}

impl AppContext {
    pub fn new(config: ClientConfig, output_mode: OutputMode) -> Self {
        let store = TokenStore::in_dir(&config.cache_dir);
        Self {
            config,
            store,
            clock: Arc::new(SystemClock),
            output_mode,
        }
    }

    fn now(&self) -> u64 {
        self.clock.now_unix()
    }

    fn session(&self) -> Result<SessionState, ClientError> {
        let token = self.store.load()?;
        Ok(SessionState::from_token(token.as_deref(), self.now()))
    }

    fn backend(&self) -> Result<BackendClient, ClientError> {
        Ok(
            BackendClient::new(&self.config.backend_url, self.config.request_timeout)?
                .with_token(self.store.load()?),
        )
    }

    async fn gateway(&self) -> Result<Arc<ContractGateway>, ClientError> {
        let contracts = self.config.contract_addresses()?;
        let provider = JsonRpcProvider::new(&self.config.rpc_url, self.config.request_timeout)?
            .with_prompt_timeout(self.config.prompt_timeout);
        let session = ProviderSession::connect(Arc::new(provider), contracts).await?;
        Ok(Arc::new(ContractGateway::new(
            Arc::new(session),
            self.config.confirmation_policy(),
            self.clock.clone(),
        )))
    }

    async fn workflows(&self) -> Result<Workflows, ClientError> {
        Ok(Workflows::new(
            self.backend()?,
            self.gateway().await?,
            self.clock.clone(),
            self.config.derivation_policy(),
        ))
    }

    fn view_context(&self, viewer: Option<Role>) -> ViewContext {
        ViewContext {
            now: self.now(),
            policy: self.config.derivation_policy(),
            viewer,
        }
    }

    fn emit(&self, payload: &Value) -> Result<(), CliError> {
        emit_ok(self.output_mode, payload)
    }

    fn emit_result<T: Serialize>(&self, command: &str, result: &T) -> Result<(), CliError> {
        let result = serde_json::to_value(result).map_err(|e| CliError::internal(e.to_string()))?;
        self.emit(&json!({"command": command, "status": "complete", "result": result}))
    }

    /// The outcome always reaches stdout; anything short of complete also fails the process.
    fn emit_outcome<T: Serialize>(&self, command: &str, outcome: &Outcome<T>) -> Result<(), CliError> {
        self.emit(&outcome.to_payload(command))?;
        match (outcome.exit_code(), outcome.error()) {
            (ExitCode::Success, _) | (_, None) => Ok(()),
            (exit_code, Some(error)) => Err(CliError {
                exit_code,
                machine: error.to_machine(),
            }),
        }
    }
}

fn read_attachment(field: &str, path: &Path) -> Result<Attachment, ClientError> {
    let bytes = std::fs::read(path).map_err(|e| {
        ClientError::invalid_field(field, format!("cannot read {}: {e}", path.display()))
    })?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| field.to_string());
    Ok(Attachment::new(name, bytes))
}

fn parse_campaign_id(raw: &str) -> Result<CampaignId, ClientError> {
    CampaignId::parse(raw).map_err(|e| e.into_field_error("campaign_id"))
}

fn signup_form(args: SignupArgs) -> SignupForm {
    SignupForm {
        username: args.username,
        email: args.email,
        password: args.password,
        confirm_password: args.confirm_password,
        full_name: args.full_name,
        phone_number: args.phone_number,
        ethereum_wallet_address: args.wallet,
    }
}

/// `amount:perk`; the perk may itself contain colons.
fn parse_reward(raw: &str) -> Result<RewardInput, ClientError> {
    let (amount, perk) = raw.split_once(':').ok_or_else(|| {
        ClientError::invalid_field("rewards", format!("`{raw}` must look like amount:perk"))
    })?;
    Ok(RewardInput {
        amount: amount.trim().to_string(),
        perk: perk.trim().to_string(),
    })
}

fn session_payload(session: &SessionState) -> Value {
    let (state, identity) = match session {
        SessionState::Anonymous => ("anonymous", None),
        SessionState::Authenticated(identity) => ("authenticated", Some(identity)),
        SessionState::Expired(identity) => ("expired", Some(identity)),
    };
    json!({
        "state": state,
        "identity": identity,
        "offered_actions": session.offered_actions(),
    })
}

pub(crate) async fn login(ctx: &AppContext, email: String, password: String) -> Result<(), CliError> {
    let form = LoginForm { email, password };
    validate_login(&form)?;
    let token = ctx.backend()?.login(&form).await?;
    ctx.store.save(&token)?;
    let session = SessionState::from_token(Some(&token), ctx.now());
    ctx.emit(&json!({"command": "login", "session": session_payload(&session)}))
}

pub(crate) fn logout(ctx: &AppContext) -> Result<(), CliError> {
    ctx.store.clear()?;
    info!("signed out");
    ctx.emit(&json!({"command": "logout", "signed_out": true}))
}

pub(crate) fn whoami(ctx: &AppContext) -> Result<(), CliError> {
    let session = ctx.session()?;
    ctx.emit(&json!({"command": "whoami", "session": session_payload(&session)}))
}

pub(crate) async fn signup_investor(ctx: &AppContext, args: SignupArgs) -> Result<(), CliError> {
    let form = signup_form(args);
    validate_signup(&form)?;
    ctx.backend()?.signup_investor(&form).await?;
    ctx.emit(&json!({"command": "signup", "role": "investor", "created": true}))
}

pub(crate) async fn signup_fundraiser(
    ctx: &AppContext,
    args: SignupArgs,
    documents: Vec<PathBuf>,
) -> Result<(), CliError> {
    let form = signup_form(args);
    let names = documents
        .iter()
        .map(|p| p.to_string_lossy().into_owned())
        .collect::<Vec<_>>();
    validate_fundraiser_signup(&form, &names)?;
    let attachments = documents
        .iter()
        .map(|p| read_attachment("files", p))
        .collect::<Result<Vec<_>, _>>()?;
    ctx.backend()?.signup_fundraiser(&form, attachments).await?;
    ctx.emit(&json!({
        "command": "signup",
        "role": "fundraiser",
        "created": true,
        "approval": "pending",
    }))
}

pub(crate) async fn profile_show(ctx: &AppContext) -> Result<(), CliError> {
    ctx.session()?.require_signed_in()?;
    let profile = ctx.backend()?.current_user().await?;
    ctx.emit(&json!({
        "command": "profile",
        "profile": profile,
        "approval": profile.approval_status(),
    }))
}

pub(crate) async fn profile_update(
    ctx: &AppContext,
    form: ProfileUpdateForm,
    picture: Option<String>,
) -> Result<(), CliError> {
    let session = ctx.session()?;
    let identity = session.require_signed_in()?;
    validate_profile_update(&form)?;
    ctx.backend()?
        .update_profile(&form, picture.as_deref(), Some(identity.role))
        .await?;
    ctx.emit(&json!({"command": "profile update", "updated": true}))
}

pub(crate) async fn browse(
    ctx: &AppContext,
    search: Option<String>,
    active: bool,
    sort: Option<SortCli>,
) -> Result<(), CliError> {
    let query = BrowseQuery {
        text: search,
        active_only: active,
        sort: sort.map(|s| match s {
            SortCli::Deadline => BrowseSort::Deadline,
            SortCli::Target => BrowseSort::Target,
        }),
    };
    let rows = views::browse(&ctx.backend()?, &query, ctx.now()).await?;
    ctx.emit(&json!({"command": "campaigns browse", "count": rows.len(), "campaigns": rows}))
}

/// Without a configured contract the backend half is shown alone.
pub(crate) async fn show_campaign(ctx: &AppContext, raw_id: &str) -> Result<(), CliError> {
    let id = parse_campaign_id(raw_id)?;
    let viewer = ctx.session()?.role();
    let gateway = if ctx.config.contract_address.is_some() {
        Some(ctx.gateway().await?)
    } else {
        None
    };
    let detail = views::campaign_detail(
        &ctx.backend()?,
        gateway.as_deref(),
        &id,
        ctx.view_context(viewer),
    )
    .await?;
    ctx.emit(&json!({"command": "campaigns show", "campaign": detail}))
}

pub(crate) async fn my_campaigns(ctx: &AppContext) -> Result<(), CliError> {
    let session = ctx.session()?;
    let role = session.require_signed_in()?.role;
    let gateway = ctx.gateway().await?;
    let account = gateway.session().require_account()?;
    let rows = views::my_campaigns(&ctx.backend()?, &gateway, &account, ctx.view_context(Some(role)))
        .await?;
    ctx.emit(&json!({
        "command": "campaigns mine",
        "account": account,
        "count": rows.len(),
        "campaigns": rows,
    }))
}

pub(crate) struct CreateCampaignArgs {
    pub title: String,
    pub description: String,
    pub risk: String,
    pub location: String,
    pub target: String,
    pub deadline: String,
    pub rewards: Vec<String>,
    pub image: PathBuf,
}

pub(crate) async fn create_campaign(ctx: &AppContext, args: CreateCampaignArgs) -> Result<(), CliError> {
    let session = ctx.session()?;
    let fundraiser_id = session.require(UserAction::CreateCampaign)?.id.clone();
    let rewards = args
        .rewards
        .iter()
        .map(|r| parse_reward(r))
        .collect::<Result<Vec<_>, _>>()?;
    let image = read_attachment("image", &args.image)?;
    let form = CampaignForm {
        title: args.title,
        description: args.description,
        risk: args.risk,
        location: args.location,
        image: Some(image.file_name.clone()),
        target: args.target,
        deadline: args.deadline,
        rewards,
    };
    let workflows = ctx.workflows().await?;
    let outcome = workflows.create_campaign(&fundraiser_id, &form, image).await;
    ctx.emit_outcome("campaigns create", &outcome)
}

pub(crate) async fn invest(ctx: &AppContext, raw_id: &str, amount: &str) -> Result<(), CliError> {
    ctx.session()?.require(UserAction::Invest)?;
    let id = parse_campaign_id(raw_id)?;
    let outcome = ctx.workflows().await?.invest(&id, amount).await;
    ctx.emit_outcome("invest", &outcome)
}

pub(crate) async fn post_update(
    ctx: &AppContext,
    raw_id: &str,
    update_date: String,
    description: String,
) -> Result<(), CliError> {
    ctx.session()?.require(UserAction::UpdateCampaign)?;
    let id = parse_campaign_id(raw_id)?;
    let form = UpdateForm {
        update_date,
        description,
    };
    let outcome = ctx.workflows().await?.post_update(&id, &form).await;
    ctx.emit_outcome("update", &outcome)
}

pub(crate) async fn vote(ctx: &AppContext, raw_id: &str, in_favor: bool) -> Result<(), CliError> {
    ctx.session()?.require(UserAction::Vote)?;
    let id = parse_campaign_id(raw_id)?;
    let confirmation = ctx.workflows().await?.vote(&id, in_favor).await?;
    ctx.emit_result("vote", &confirmation)
}

pub(crate) async fn refund(ctx: &AppContext, raw_id: &str) -> Result<(), CliError> {
    ctx.session()?.require(UserAction::Refund)?;
    let id = parse_campaign_id(raw_id)?;
    let confirmation = ctx.workflows().await?.refund(&id).await?;
    ctx.emit_result("refund", &confirmation)
}

pub(crate) async fn claim_reward(ctx: &AppContext, raw_id: &str) -> Result<(), CliError> {
    ctx.session()?.require(UserAction::ClaimReward)?;
    let id = parse_campaign_id(raw_id)?;
    let confirmation = ctx.workflows().await?.claim_reward(&id).await?;
    ctx.emit_result("claim-reward", &confirmation)
}

pub(crate) async fn reward_description(ctx: &AppContext) -> Result<(), CliError> {
    ctx.session()?.require(UserAction::RedeemReward)?;
    let gateway = ctx.gateway().await?;
    let account = gateway.session().require_account()?;
    let description = gateway.get_reward_description(&account).await?;
    ctx.emit(&json!({
        "command": "rewards description",
        "account": account,
        "description": description,
    }))
}

pub(crate) async fn reward_show(ctx: &AppContext, raw_token: &str) -> Result<(), CliError> {
    let token_id = TokenId::parse(raw_token).map_err(|e| e.into_field_error("token_id"))?;
    let reward = ctx.gateway().await?.get_nft_details(token_id).await?;
    ctx.emit(&json!({"command": "rewards show", "reward": reward}))
}

pub(crate) async fn reward_redeem(ctx: &AppContext, raw_token: &str) -> Result<(), CliError> {
    ctx.session()?.require(UserAction::RedeemReward)?;
    let token_id = TokenId::parse(raw_token).map_err(|e| e.into_field_error("token_id"))?;
    let confirmation = ctx.gateway().await?.redeem_reward(token_id).await?;
    ctx.emit_result("rewards redeem", &confirmation)
}

pub(crate) async fn list_fundraisers(ctx: &AppContext) -> Result<(), CliError> {
    ctx.session()?.require(UserAction::ListFundraisers)?;
    let rows = ctx.backend()?.fundraisers().await?;
    let rows = rows
        .iter()
        .map(|r| {
            json!({
                "id": r.id,
                "full_name": r.full_name,
                "email": r.email,
                "wallet": r.ethereum_wallet_address,
                "approval": r.approval_status(),
                "documents": r.ver_document,
            })
        })
        .collect::<Vec<_>>();
    ctx.emit(&json!({"command": "fundraisers list", "count": rows.len(), "fundraisers": rows}))
}

pub(crate) async fn decide_fundraiser(
    ctx: &AppContext,
    fundraiser_id: &str,
    decision: ApprovalDecision,
) -> Result<(), CliError> {
    ctx.session()?.require(UserAction::ApproveFundraiser)?;
    ctx.backend()?
        .set_fundraiser_approval(fundraiser_id, decision)
        .await?;
    ctx.emit(&json!({
        "command": "fundraisers decide",
        "fundraiser_id": fundraiser_id.trim(),
        "decision": decision,
    }))
}

fn tracker_row(tx: &ExplorerTransaction) -> Value {
    json!({
        "hash": tx.hash,
        "hash_short": truncate_hash(&tx.hash),
        "from": truncate_address(&tx.from),
        "to": tx.to.as_deref().map(truncate_address),
        "value_ether": tx.value_wei().ok().map(|w| w.to_ether_string()),
        "block": tx.block().ok().flatten(),
        "timestamp": tx.time_stamp,
    })
}

pub(crate) async fn track(ctx: &AppContext, by: TrackBy, query: &str) -> Result<(), CliError> {
    let search =
        TransactionSearch::parse(by.as_str(), query).map_err(|e| e.into_field_error("query"))?;
    let explorer = ExplorerClient::new(
        &ctx.config.explorer_url,
        ctx.config.explorer_api_key.clone(),
        ctx.config.request_timeout,
    )?
    .with_address_limit(ctx.config.explorer_limit);
    let rows = explorer.lookup(&search).await?;
    let rendered = rows.iter().map(tracker_row).collect::<Vec<_>>();
    ctx.emit(&json!({
        "command": "track",
        "by": by.as_str(),
        "count": rendered.len(),
        "transactions": rendered,
    }))
}
