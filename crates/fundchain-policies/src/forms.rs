// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;

use fundchain_core::{ClientError, UnixSeconds, SECONDS_PER_DAY};
use fundchain_model::{parse_date_input, parse_deadline_input, Address, Reward, Wei};
use serde::{Deserialize, Serialize};

/// New campaigns must close at least this far in the future.
pub const MIN_DEADLINE_LEAD_SECS: u64 = 5 * SECONDS_PER_DAY;

const PASSWORD_SPECIALS: &str = "@$!%*#?&";

/// Collects every failing field before reporting, so a form shows all errors at once.
#[derive(Debug, Default)]
struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    fn add(&mut self, field: &str, reason: &str) {
        self.0
            .entry(field.to_string())
            .or_insert_with(|| reason.to_string());
    }

    fn require(&mut self, field: &str, value: &str, reason: &str) -> bool {
        if value.trim().is_empty() {
            self.add(field, reason);
            false
        } else {
            true
        }
    }

    fn finish(self) -> Result<(), ClientError> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(ClientError::invalid_fields(self.0))
        }
    }
}

#[must_use]
pub fn is_email(input: &str) -> bool {
    if input.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = input.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    domain
        .char_indices()
        .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len())
}

fn is_strong_password(input: &str) -> bool {
    input.chars().count() >= 8
        && input
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || PASSWORD_SPECIALS.contains(c))
        && input.chars().any(|c| c.is_ascii_alphabetic())
        && input.chars().any(|c| c.is_ascii_digit())
        && input.chars().any(|c| PASSWORD_SPECIALS.contains(c))
}

fn is_phone_number(input: &str) -> bool {
    (10..=15).contains(&input.len()) && input.chars().all(|c| c.is_ascii_digit())
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardInput {
    pub amount: String,
    pub perk: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignForm {
    pub title: String,
    pub description: String,
    pub risk: String,
    pub location: String,
    /// Path or URL of the cover image.
    pub image: Option<String>,
    /// Human-decimal ether.
    pub target: String,
    pub deadline: String,
    pub rewards: Vec<RewardInput>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatedCampaign {
    pub title: String,
    pub description: String,
    pub risk: String,
    pub location: String,
    pub image: String,
    pub target: Wei,
    pub deadline: UnixSeconds,
    pub rewards: Vec<Reward>,
}

pub fn validate_campaign_form(
    form: &CampaignForm,
    now: UnixSeconds,
) -> Result<ValidatedCampaign, ClientError> {
    let mut errors = FieldErrors::default();
    errors.require("title", &form.title, "Title is required");
    errors.require("description", &form.description, "Description is required");
    errors.require("risk", &form.risk, "Risk assessment is required");
    errors.require("location", &form.location, "Location is required");
    errors.require(
        "image",
        form.image.as_deref().unwrap_or_default(),
        "Image is required",
    );

    let target = match Wei::parse_ether(&form.target) {
        Ok(wei) if !wei.is_zero() => Some(wei),
        _ => {
            errors.add("target", "Valid target amount is required");
            None
        }
    };

    let deadline = if errors.require("deadline", &form.deadline, "Deadline is required") {
        match parse_deadline_input(&form.deadline) {
            Ok(ts) if ts >= now.saturating_add(MIN_DEADLINE_LEAD_SECS) => Some(ts),
            Ok(_) => {
                errors.add("deadline", "Deadline must be at least 5 days from now");
                None
            }
            Err(err) => {
                errors.add("deadline", &err.0);
                None
            }
        }
    } else {
        None
    };

    if form
        .rewards
        .iter()
        .any(|r| r.amount.trim().is_empty() || r.perk.trim().is_empty())
    {
        errors.add("rewards", "All reward fields must be filled");
    }

    errors.finish()?;
    match (target, deadline) {
        (Some(target), Some(deadline)) => Ok(ValidatedCampaign {
            title: form.title.trim().to_string(),
            description: form.description.trim().to_string(),
            risk: form.risk.trim().to_string(),
            location: form.location.trim().to_string(),
            image: form.image.clone().unwrap_or_default(),
            target,
            deadline,
            rewards: form
                .rewards
                .iter()
                .map(|r| Reward {
                    amount: r.amount.trim().to_string(),
                    perk: r.perk.trim().to_string(),
                })
                .collect(),
        }),
        _ => Err(ClientError::internal("campaign form passed validation without values")),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignupForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub full_name: String,
    pub phone_number: String,
    pub ethereum_wallet_address: String,
}

fn check_signup(form: &SignupForm, errors: &mut FieldErrors) {
    errors.require("username", &form.username, "Username is required");
    if errors.require("email", &form.email, "Email is required") && !is_email(form.email.trim())
    {
        errors.add("email", "Email is invalid");
    }
    if errors.require("password", &form.password, "Password is required")
        && !is_strong_password(&form.password)
    {
        errors.add(
            "password",
            "Password must be at least 8 characters long and include a letter, number, and special character",
        );
    }
    if form.password != form.confirm_password {
        errors.add("confirm_password", "Passwords do not match");
    }
    if errors.require("full_name", &form.full_name, "Full Name is required")
        && !form
            .full_name
            .chars()
            .all(|c| c.is_ascii_alphabetic() || c == ' ')
    {
        errors.add(
            "full_name",
            "Full Name must contain only alphabetic characters and spaces",
        );
    }
    if errors.require("phone_number", &form.phone_number, "Phone Number is required")
        && !is_phone_number(form.phone_number.trim())
    {
        errors.add(
            "phone_number",
            "Phone Number must be between 10 and 15 digits",
        );
    }
    if errors.require(
        "ethereum_wallet_address",
        &form.ethereum_wallet_address,
        "Wallet address is required",
    ) {
        if let Err(err) = Address::parse(&form.ethereum_wallet_address) {
            errors.add("ethereum_wallet_address", &err.0);
        }
    }
}

pub fn validate_signup(form: &SignupForm) -> Result<(), ClientError> {
    let mut errors = FieldErrors::default();
    check_signup(form, &mut errors);
    errors.finish()
}

/// Fundraisers additionally attach at least one PDF verification document.
pub fn validate_fundraiser_signup(form: &SignupForm, documents: &[String]) -> Result<(), ClientError> {
    let mut errors = FieldErrors::default();
    check_signup(form, &mut errors);
    if documents.is_empty() {
        errors.add("files", "At least one verification document is required");
    } else if documents
        .iter()
        .any(|d| !d.to_ascii_lowercase().ends_with(".pdf"))
    {
        errors.add("files", "Verification documents must be PDF files");
    }
    errors.finish()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

pub fn validate_login(form: &LoginForm) -> Result<(), ClientError> {
    let mut errors = FieldErrors::default();
    if !is_email(form.email.trim()) {
        errors.add("email", "Please enter a valid email address");
    }
    errors.require("password", &form.password, "Password is required");
    errors.finish()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpdateForm {
    pub username: String,
    pub email: String,
    pub phone_number: String,
}

pub fn validate_profile_update(form: &ProfileUpdateForm) -> Result<(), ClientError> {
    let mut errors = FieldErrors::default();
    errors.require("username", &form.username, "Username is required");
    if errors.require("email", &form.email, "Email is required") && !is_email(form.email.trim())
    {
        errors.add("email", "Email is invalid");
    }
    if errors.require("phone_number", &form.phone_number, "Phone number is required")
        && !is_phone_number(form.phone_number.trim())
    {
        errors.add(
            "phone_number",
            "Phone number must be between 10 and 15 digits",
        );
    }
    errors.finish()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateForm {
    pub update_date: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatedUpdate {
    /// As entered, `YYYY-MM-DD`.
    pub update_date: String,
    pub update_unix: UnixSeconds,
    pub description: String,
}

pub fn validate_update_form(form: &UpdateForm) -> Result<ValidatedUpdate, ClientError> {
    let mut errors = FieldErrors::default();
    errors.require("description", &form.description, "Description is required");
    let update_unix = if errors.require("update_date", &form.update_date, "Date is required") {
        match parse_date_input(&form.update_date) {
            Ok(ts) => Some(ts),
            Err(err) => {
                errors.add("update_date", &err.0);
                None
            }
        }
    } else {
        None
    };
    errors.finish()?;
    let update_unix =
        update_unix.ok_or_else(|| ClientError::internal("update form passed validation without a date"))?;
    Ok(ValidatedUpdate {
        update_date: form.update_date.trim().to_string(),
        update_unix,
        description: form.description.trim().to_string(),
    })
}
