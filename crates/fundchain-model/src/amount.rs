// SPDX-License-Identifier: Apache-2.0

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

pub const ETHER_DECIMALS: usize = 18;
pub const WEI_PER_ETHER: u128 = 1_000_000_000_000_000_000;

/// Native currency amount in the contract's smallest unit.
///
/// Serialised as a decimal string because JSON numbers cannot carry the full range.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct Wei(pub u128);

impl Wei {
    pub const ZERO: Self = Self(0);

    #[must_use]
    pub const fn new(value: u128) -> Self {
        Self(value)
    }

    #[must_use]
    pub const fn get(self) -> u128 {
        self.0
    }

    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    #[must_use]
    pub fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    /// Integer wei from its decimal representation.
    pub fn parse_wei(input: &str) -> Result<Self, ValidationError> {
        let s = input.trim();
        if s.is_empty() || !s.chars().all(|c| c.is_ascii_digit()) {
            return Err(ValidationError(format!(
                "wei amount must be a non-negative integer, got `{s}`"
            )));
        }
        s.parse::<u128>()
            .map(Self)
            .map_err(|_| ValidationError("wei amount overflows 128 bits".to_string()))
    }

    /// Human-decimal ether (`"1.5"`) to wei. More than 18 fractional digits is rejected
    /// rather than rounded.
    pub fn parse_ether(input: &str) -> Result<Self, ValidationError> {
        let s = input.trim();
        if s.is_empty() {
            return Err(ValidationError("amount must not be empty".to_string()));
        }
        if s.starts_with('-') {
            return Err(ValidationError("amount must not be negative".to_string()));
        }
        let (whole, frac) = match s.split_once('.') {
            Some((w, f)) => (w, f),
            None => (s, ""),
        };
        if whole.is_empty() && frac.is_empty() {
            return Err(ValidationError(format!("`{s}` is not a decimal amount")));
        }
        if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit())
        {
            return Err(ValidationError(format!("`{s}` is not a decimal amount")));
        }
        if frac.len() > ETHER_DECIMALS {
            return Err(ValidationError(format!(
                "amount has more than {ETHER_DECIMALS} decimal places"
            )));
        }
        let whole_value = if whole.is_empty() {
            0
        } else {
            whole
                .parse::<u128>()
                .map_err(|_| ValidationError("amount is too large".to_string()))?
        };
        let mut frac_padded = frac.to_string();
        while frac_padded.len() < ETHER_DECIMALS {
            frac_padded.push('0');
        }
        let frac_value = frac_padded
            .parse::<u128>()
            .map_err(|_| ValidationError(format!("`{s}` is not a decimal amount")))?;
        whole_value
            .checked_mul(WEI_PER_ETHER)
            .and_then(|v| v.checked_add(frac_value))
            .map(Self)
            .ok_or_else(|| ValidationError("amount is too large".to_string()))
    }

    /// Shortest exact decimal ether representation.
    #[must_use]
    pub fn to_ether_string(self) -> String {
        let whole = self.0 / WEI_PER_ETHER;
        let frac = self.0 % WEI_PER_ETHER;
        if frac == 0 {
            return whole.to_string();
        }
        let frac_text = format!("{frac:0width$}", width = ETHER_DECIMALS);
        format!("{whole}.{}", frac_text.trim_end_matches('0'))
    }
}

impl fmt::Display for Wei {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Wei> for String {
    fn from(value: Wei) -> Self {
        value.0.to_string()
    }
}

impl TryFrom<String> for Wei {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, ValidationError> {
        Self::parse_wei(&value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_whole_and_fractional_ether() {
        assert_eq!(Wei::parse_ether("1").expect("one"), Wei(WEI_PER_ETHER));
        assert_eq!(
            Wei::parse_ether("0.1").expect("tenth"),
            Wei(100_000_000_000_000_000)
        );
        assert_eq!(Wei::parse_ether(".5").expect("half"), Wei(WEI_PER_ETHER / 2));
        assert_eq!(Wei::parse_ether("2.").expect("two"), Wei(2 * WEI_PER_ETHER));
        assert_eq!(
            Wei::parse_ether("0.000000000000000001").expect("one wei"),
            Wei(1)
        );
    }

    #[test]
    fn rejects_precision_beyond_one_wei() {
        assert!(Wei::parse_ether("0.0000000000000000001").is_err());
    }

    #[test]
    fn rejects_garbage() {
        for raw in ["", "-1", "abc", "1.2.3", ".", "1e18", " . "] {
            assert!(Wei::parse_ether(raw).is_err(), "{raw} must be rejected");
        }
    }

    #[test]
    fn formats_shortest_exact_decimal() {
        assert_eq!(Wei(0).to_ether_string(), "0");
        assert_eq!(Wei(WEI_PER_ETHER * 3).to_ether_string(), "3");
        assert_eq!(Wei(1_500_000_000_000_000_000).to_ether_string(), "1.5");
        assert_eq!(Wei(1).to_ether_string(), "0.000000000000000001");
    }

    #[test]
    fn serialises_as_decimal_string() {
        let json = serde_json::to_string(&Wei(WEI_PER_ETHER)).expect("encode");
        assert_eq!(json, "\"1000000000000000000\"");
        let back: Wei = serde_json::from_str(&json).expect("decode");
        assert_eq!(back, Wei(WEI_PER_ETHER));
    }
}
