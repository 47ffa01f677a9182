// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

use crate::serde_helpers::string_or_number;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Disapproved,
}

impl ApprovalStatus {
    #[must_use]
    pub fn from_backend(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("approved") => Self::Approved,
            Some("disapproved") => Self::Disapproved,
            _ => Self::Pending,
        }
    }
}

/// Admin verdict sent to `PUT /fundraisers/:id/approve`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApprovalDecision {
    Approved,
    Disapproved,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub ethereum_wallet_address: Option<String>,
    #[serde(default)]
    pub profile_picture: Option<String>,
    #[serde(default)]
    pub approval: Option<String>,
    #[serde(default)]
    pub user_type: Option<String>,
}

impl UserProfile {
    #[must_use]
    pub fn approval_status(&self) -> ApprovalStatus {
        ApprovalStatus::from_backend(self.approval.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationDocument {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundraiserRecord {
    #[serde(alias = "fundraiser_id", deserialize_with = "string_or_number::deserialize")]
    pub id: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub ethereum_wallet_address: Option<String>,
    #[serde(default)]
    pub approval: Option<String>,
    #[serde(default)]
    pub ver_document: Vec<VerificationDocument>,
}

impl FundraiserRecord {
    #[must_use]
    pub fn approval_status(&self) -> ApprovalStatus {
        ApprovalStatus::from_backend(self.approval.as_deref())
    }
}
