// SPDX-License-Identifier: Apache-2.0

use std::fmt;
use std::str::FromStr;

use fundchain_core::UnixSeconds;
use serde::{Deserialize, Serialize};

use crate::serde_helpers::string_or_number;
use crate::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Investor,
    Fundraiser,
    Admin,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Investor => "investor",
            Self::Fundraiser => "fundraiser",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "investor" => Ok(Self::Investor),
            "fundraiser" => Ok(Self::Fundraiser),
            "admin" => Ok(Self::Admin),
            other => Err(ValidationError(format!("unknown role `{other}`"))),
        }
    }
}

/// Claims carried by the backend-issued bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    #[serde(deserialize_with = "string_or_number::deserialize")]
    pub id: String,
    #[serde(default)]
    pub username: String,
    pub role: Role,
    #[serde(default)]
    pub exp: Option<UnixSeconds>,
}

impl Identity {
    /// Tokens without `exp` never expire on the client; the backend still decides.
    #[must_use]
    pub fn is_expired_at(&self, now: UnixSeconds) -> bool {
        self.exp.is_some_and(|exp| now >= exp)
    }
}
