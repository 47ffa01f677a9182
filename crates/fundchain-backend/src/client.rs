// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;
use std::time::Duration;

use fundchain_core::{token_fingerprint, ClientError, ErrorCode, ResultExt};
use fundchain_model::{
    format_deadline_input, Address, ApprovalDecision, CampaignId, CampaignMetadata,
    FundraiserRecord, Role, UserProfile, Wei,
};
use fundchain_policies::{LoginForm, ProfileUpdateForm, SignupForm, ValidatedCampaign};
use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::multipart::{Form, Part};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, instrument, warn};

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8081";

const USERNAME_TAKEN: &str = "Username already exists";
const EMAIL_TAKEN: &str = "Email already exists";
const BOTH_TAKEN: &str = "Both username and email already exist";

/// File uploaded through a multipart form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl Attachment {
    /// Mime type guessed from the extension; unknown extensions upload as octet-stream.
    #[must_use]
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let lower = file_name.to_ascii_lowercase();
        let mime = match lower.rsplit_once('.').map(|(_, ext)| ext) {
            Some("pdf") => "application/pdf",
            Some("png") => "image/png",
            Some("jpg" | "jpeg") => "image/jpeg",
            Some("gif") => "image/gif",
            Some("webp") => "image/webp",
            _ => "application/octet-stream",
        };
        Self {
            file_name,
            mime: mime.to_string(),
            bytes,
        }
    }

    fn into_part(self) -> Result<Part, ClientError> {
        Part::bytes(self.bytes)
            .file_name(self.file_name)
            .mime_str(&self.mime)
            .internal_context("invalid attachment mime")
    }
}

/// Everything the backend stores for a new campaign before it goes on chain.
#[derive(Debug, Clone)]
pub struct CampaignSubmission {
    pub fundraiser_id: String,
    pub wallet: Address,
    pub campaign: ValidatedCampaign,
    pub image: Attachment,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    #[serde(default)]
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreatedCampaign {
    #[serde(deserialize_with = "fundchain_model::serde_helpers::string_or_number::deserialize")]
    campaign_id: String,
}

#[derive(Debug, Serialize)]
struct InvestorSignup<'a> {
    username: &'a str,
    email: &'a str,
    password: &'a str,
    ethereum_wallet_address: &'a str,
    full_name: &'a str,
    phone_number: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CampaignUpdateRequest<'a> {
    campaign_id: &'a str,
    update_date: &'a str,
    description: &'a str,
}

/// Client for the campaign backend. Requests are never retried.
#[derive(Debug, Clone)]
pub struct BackendClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl BackendClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .internal_context("backend client build failed")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        })
    }

    #[must_use]
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.trim().is_empty());
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client.request(method, format!("{}{path}", self.base_url))
    }

    /// The backend expects the bare token, without a `Bearer` prefix.
    fn authorized(&self, method: Method, path: &str) -> Result<RequestBuilder, ClientError> {
        let token = self
            .token
            .as_deref()
            .ok_or_else(|| ClientError::access_denied("sign in required"))?;
        let value = HeaderValue::from_str(token)
            .map_err(|_| ClientError::new(ErrorCode::AuthExpired, "stored token is not a valid header"))?;
        debug!(token = %token_fingerprint(token), path, "authorized backend request");
        Ok(self.request(method, path).header(AUTHORIZATION, value))
    }

    async fn dispatch(&self, endpoint: &str, request: RequestBuilder) -> Result<Vec<u8>, ClientError> {
        let response = request.send().await.map_err(|e| {
            warn!(endpoint, error = %e, "backend unreachable");
            ClientError::backend(format!("backend request failed: {e}"))
                .with_detail("endpoint", endpoint)
        })?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|e| {
                ClientError::backend(format!("read backend body failed: {e}"))
                    .with_detail("endpoint", endpoint)
            })?;
        if status.is_success() {
            debug!(endpoint, status = status.as_u16(), "backend request ok");
            return Ok(body);
        }
        warn!(endpoint, status = status.as_u16(), "backend request failed");
        Err(map_status(endpoint, status, &body))
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        request: RequestBuilder,
    ) -> Result<T, ClientError> {
        let body = self.dispatch(endpoint, request).await?;
        serde_json::from_slice(&body).map_err(|e| {
            ClientError::decode(format!("unexpected {endpoint} payload: {e}"))
                .with_detail("endpoint", endpoint)
        })
    }

    /// Returns the bearer token on success. Bad credentials surface as `AccessDenied`.
    #[instrument(name = "backend_login", skip_all)]
    pub async fn login(&self, form: &LoginForm) -> Result<String, ClientError> {
        let request = self
            .request(Method::POST, "/login")
            .json(&json!({"email": form.email.trim(), "password": form.password}));
        let response: LoginResponse = self.fetch("/login", request).await.map_err(|err| {
            if matches!(err.code, ErrorCode::AuthExpired | ErrorCode::NotFound) {
                ClientError::access_denied("invalid email or password")
            } else {
                err
            }
        })?;
        let token = response
            .token
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| ClientError::decode("login response carried no token"))?;
        info!(token = %token_fingerprint(&token), "signed in");
        Ok(token)
    }

    #[instrument(name = "backend_investor_signup", skip_all, fields(username = %form.username))]
    pub async fn signup_investor(&self, form: &SignupForm) -> Result<(), ClientError> {
        let body = InvestorSignup {
            username: form.username.trim(),
            email: form.email.trim(),
            password: &form.password,
            ethereum_wallet_address: form.ethereum_wallet_address.trim(),
            full_name: form.full_name.trim(),
            phone_number: form.phone_number.trim(),
        };
        let request = self.request(Method::POST, "/isignup").json(&body);
        self.dispatch("/isignup", request)
            .await
            .map(drop)
            .map_err(signup_conflict)
    }

    /// Fundraiser signup carries verification documents as `files` parts.
    #[instrument(name = "backend_fundraiser_signup", skip_all, fields(username = %form.username, documents = documents.len()))]
    pub async fn signup_fundraiser(
        &self,
        form: &SignupForm,
        documents: Vec<Attachment>,
    ) -> Result<(), ClientError> {
        let mut multipart = Form::new()
            .text("username", form.username.trim().to_string())
            .text("email", form.email.trim().to_string())
            .text("password", form.password.clone())
            .text("confirm_password", form.confirm_password.clone())
            .text("full_name", form.full_name.trim().to_string())
            .text("phone_number", form.phone_number.trim().to_string())
            .text(
                "ethereum_wallet_address",
                form.ethereum_wallet_address.trim().to_string(),
            );
        for document in documents {
            multipart = multipart.part("files", document.into_part()?);
        }
        let request = self.request(Method::POST, "/fsignup").multipart(multipart);
        self.dispatch("/fsignup", request)
            .await
            .map(drop)
            .map_err(signup_conflict)
    }

    #[instrument(name = "backend_current_user", skip(self))]
    pub async fn current_user(&self) -> Result<UserProfile, ClientError> {
        let request = self.authorized(Method::GET, "/user")?;
        self.fetch("/user", request).await
    }

    #[instrument(name = "backend_update_profile", skip_all)]
    pub async fn update_profile(
        &self,
        form: &ProfileUpdateForm,
        profile_picture: Option<&str>,
        user_type: Option<Role>,
    ) -> Result<(), ClientError> {
        let body = json!({
            "username": form.username.trim(),
            "email": form.email.trim(),
            "phone_number": form.phone_number.trim(),
            "profile_picture": profile_picture,
            "user_type": user_type.map(Role::as_str),
        });
        let request = self.authorized(Method::PUT, "/update")?.json(&body);
        self.dispatch("/update", request).await.map(drop)
    }

    #[instrument(name = "backend_campaign", skip(self), fields(campaign_id = %id))]
    pub async fn campaign(&self, id: &CampaignId) -> Result<CampaignMetadata, ClientError> {
        let path = format!("/campaigns/{}", id.as_str());
        let request = self.request(Method::GET, &path);
        self.fetch(&path, request).await
    }

    #[instrument(name = "backend_campaigns", skip(self))]
    pub async fn campaigns(&self) -> Result<Vec<CampaignMetadata>, ClientError> {
        let request = self.request(Method::GET, "/getCampaigns");
        let listed: Option<Vec<CampaignMetadata>> = self.fetch("/getCampaigns", request).await?;
        Ok(listed.unwrap_or_default())
    }

    /// Stores the off-chain half of a campaign and returns the id the chain record must use.
    #[instrument(name = "backend_create_campaign", skip_all, fields(fundraiser_id = %submission.fundraiser_id))]
    pub async fn create_campaign(
        &self,
        submission: CampaignSubmission,
    ) -> Result<CampaignId, ClientError> {
        let CampaignSubmission {
            fundraiser_id,
            wallet,
            campaign,
            image,
        } = submission;
        let rewards = serde_json::to_string(&campaign.rewards)
            .internal_context("encode rewards failed")?;
        let multipart = Form::new()
            .text("fundraiserid", fundraiser_id)
            .text("walletAddress", wallet.as_str().to_string())
            .text("title", campaign.title)
            .text("description", campaign.description)
            .text("risk", campaign.risk)
            .text("target", campaign.target.to_ether_string())
            .text("deadline", format_deadline_input(campaign.deadline))
            .text("numberOfInvestors", "0")
            .text("rewards", rewards)
            .text("updates", "[]")
            .text("location", campaign.location)
            .part("image", image.into_part()?);
        let request = self
            .request(Method::POST, "/createCampaign")
            .multipart(multipart);
        let created: CreatedCampaign = self.fetch("/createCampaign", request).await?;
        let id = CampaignId::parse(&created.campaign_id)
            .map_err(|e| ClientError::decode(format!("backend returned bad campaign id: {e}")))?;
        info!(campaign_id = %id, "campaign stored by backend");
        Ok(id)
    }

    /// Records a confirmed investment. The backend stores the amount as an ether decimal.
    #[instrument(name = "backend_fund_campaign", skip(self), fields(campaign_id = %id))]
    pub async fn fund_campaign(&self, id: &CampaignId, amount: Wei) -> Result<(), ClientError> {
        let request = self.request(Method::POST, "/fundCampaign").json(&json!({
            "campaign_id": id.as_str(),
            "amount": amount.to_ether_string(),
        }));
        self.dispatch("/fundCampaign", request).await.map(drop)
    }

    #[instrument(name = "backend_update_campaign", skip(self, description), fields(campaign_id = %id))]
    pub async fn update_campaign(
        &self,
        id: &CampaignId,
        update_date: &str,
        description: &str,
    ) -> Result<(), ClientError> {
        let body = CampaignUpdateRequest {
            campaign_id: id.as_str(),
            update_date,
            description,
        };
        let request = self.request(Method::POST, "/updateCampaign").json(&body);
        self.dispatch("/updateCampaign", request).await.map(drop)
    }

    #[instrument(name = "backend_fundraisers", skip(self))]
    pub async fn fundraisers(&self) -> Result<Vec<FundraiserRecord>, ClientError> {
        let request = self.authorized(Method::GET, "/fundraisers")?;
        let listed: Option<Vec<FundraiserRecord>> = self.fetch("/fundraisers", request).await?;
        Ok(listed.unwrap_or_default())
    }

    #[instrument(name = "backend_approve_fundraiser", skip(self))]
    pub async fn set_fundraiser_approval(
        &self,
        fundraiser_id: &str,
        decision: ApprovalDecision,
    ) -> Result<(), ClientError> {
        let path = format!("/fundraisers/{}/approve", fundraiser_id.trim());
        let request = self
            .authorized(Method::PUT, &path)?
            .json(&json!({"approved": decision}));
        self.dispatch(&path, request).await.map(drop)
    }
}

fn backend_message(body: &[u8]) -> Option<String> {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => ["error", "message"]
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_str))
            .map(str::to_string),
        Ok(Value::String(s)) => Some(s),
        _ => {
            let text = String::from_utf8_lossy(body).trim().to_string();
            (!text.is_empty()).then_some(text)
        }
    }
}

fn map_status(endpoint: &str, status: StatusCode, body: &[u8]) -> ClientError {
    let message = backend_message(body).unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    });
    let err = match status {
        StatusCode::UNAUTHORIZED => ClientError::new(ErrorCode::AuthExpired, message),
        StatusCode::FORBIDDEN => ClientError::access_denied(message),
        StatusCode::NOT_FOUND => ClientError::new(ErrorCode::NotFound, message),
        _ => ClientError::backend(message),
    };
    err.with_detail("endpoint", endpoint)
        .with_detail("status", status.as_u16().to_string())
}

/// Known duplicate-account messages become inline field errors.
fn signup_conflict(err: ClientError) -> ClientError {
    if err.code != ErrorCode::BackendError {
        return err;
    }
    let fields: &[&str] = match err.message.as_str() {
        BOTH_TAKEN => &["username", "email"],
        USERNAME_TAKEN => &["username"],
        EMAIL_TAKEN => &["email"],
        _ => return err,
    };
    let mut errors = BTreeMap::new();
    for field in fields {
        let reason = if *field == "username" {
            USERNAME_TAKEN
        } else {
            EMAIL_TAKEN
        };
        errors.insert((*field).to_string(), reason.to_string());
    }
    ClientError::invalid_fields(errors)
}
