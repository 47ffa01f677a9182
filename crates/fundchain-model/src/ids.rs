// SPDX-License-Identifier: Apache-2.0

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

pub const CAMPAIGN_ID_MAX_LEN: usize = 64;

fn is_hex(s: &str) -> bool {
    s.chars().all(|c| c.is_ascii_hexdigit())
}

/// 20-byte account or contract address, held in lowercase `0x` form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    pub const ZERO: &'static str = "0x0000000000000000000000000000000000000000";

    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let s = input.trim();
        let body = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .ok_or_else(|| ValidationError("address must start with 0x".to_string()))?;
        if body.len() != 40 {
            return Err(ValidationError(format!(
                "address must have 40 hex digits, got {}",
                body.len()
            )));
        }
        if !is_hex(body) {
            return Err(ValidationError(
                "address contains non-hex characters".to_string(),
            ));
        }
        Ok(Self(format!("0x{}", body.to_ascii_lowercase())))
    }

    #[must_use]
    pub fn zero() -> Self {
        Self(Self::ZERO.to_string())
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0 == Self::ZERO
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Raw 20 bytes, for ABI encoding.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; 20] {
        let mut out = [0_u8; 20];
        let body = &self.0.as_bytes()[2..];
        for (i, byte) in out.iter_mut().enumerate() {
            let pair = std::str::from_utf8(&body[i * 2..i * 2 + 2]).unwrap_or("00");
            *byte = u8::from_str_radix(pair, 16).unwrap_or(0);
        }
        out
    }

    #[must_use]
    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        let mut out = String::with_capacity(42);
        out.push_str("0x");
        for b in bytes {
            use std::fmt::Write as _;
            let _ = write!(&mut out, "{b:02x}");
        }
        Self(out)
    }

    /// `0x1234567890...abcdef1234` style shortening used in transaction listings.
    #[must_use]
    pub fn truncated(&self) -> String {
        format!("{}...{}", &self.0[..10], &self.0[self.0.len() - 10..])
    }
}

/// Campaign key shared by the backend record and the on-chain record.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CampaignId(String);

impl CampaignId {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let s = input.trim();
        if s.is_empty() {
            return Err(ValidationError("campaign id must not be empty".to_string()));
        }
        if s.len() > CAMPAIGN_ID_MAX_LEN {
            return Err(ValidationError(format!(
                "campaign id exceeds max length {CAMPAIGN_ID_MAX_LEN}"
            )));
        }
        if s.chars().any(char::is_control) {
            return Err(ValidationError(
                "campaign id must not contain control characters".to_string(),
            ));
        }
        Ok(Self(s.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Reward NFT token identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenId(pub u128);

impl TokenId {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        input
            .trim()
            .parse::<u128>()
            .map(Self)
            .map_err(|e| ValidationError(format!("token id must be a non-negative integer: {e}")))
    }
}

/// 32-byte transaction hash in lowercase `0x` form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TxHash(String);

impl TxHash {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let s = input.trim();
        let body = s
            .strip_prefix("0x")
            .ok_or_else(|| ValidationError("transaction hash must start with 0x".to_string()))?;
        if body.len() != 64 || !is_hex(body) {
            return Err(ValidationError(
                "transaction hash must have 64 hex digits".to_string(),
            ));
        }
        Ok(Self(format!("0x{}", body.to_ascii_lowercase())))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn truncated(&self) -> &str {
        &self.0[..12]
    }
}

macro_rules! impl_string_id_traits {
    ($name:ident) => {
        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, ValidationError> {
                Self::parse(&value)
            }
        }

        impl FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, ValidationError> {
                Self::parse(s)
            }
        }
    };
}

impl_string_id_traits!(Address);
impl_string_id_traits!(CampaignId);
impl_string_id_traits!(TxHash);

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
