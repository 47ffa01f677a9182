// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

use crate::amount::Wei;
use crate::ids::{Address, TxHash};
use crate::ValidationError;

/// What the tracker view searches by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionSearch {
    Address(Address),
    Hash(TxHash),
}

impl TransactionSearch {
    pub fn parse(kind: &str, query: &str) -> Result<Self, ValidationError> {
        match kind.trim().to_ascii_lowercase().as_str() {
            "address" => Address::parse(query).map(Self::Address),
            "hash" => TxHash::parse(query).map(Self::Hash),
            other => Err(ValidationError(format!(
                "search type must be `address` or `hash`, got `{other}`"
            ))),
        }
    }
}

/// Block-explorer transaction row. Numeric fields stay textual because the explorer
/// mixes decimal (account listing) and `0x` hex (proxy lookup) encodings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplorerTransaction {
    pub hash: String,
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub block_number: Option<String>,
    #[serde(default)]
    pub time_stamp: Option<String>,
    #[serde(default)]
    pub gas_used: Option<String>,
    #[serde(default)]
    pub gas_price: Option<String>,
    #[serde(default)]
    pub function_name: Option<String>,
}

fn parse_quantity(raw: &str) -> Result<u128, ValidationError> {
    let s = raw.trim();
    if let Some(hex) = s.strip_prefix("0x") {
        if hex.is_empty() {
            return Ok(0);
        }
        return u128::from_str_radix(hex, 16)
            .map_err(|e| ValidationError(format!("invalid hex quantity `{s}`: {e}")));
    }
    if s.is_empty() {
        return Ok(0);
    }
    s.parse::<u128>()
        .map_err(|e| ValidationError(format!("invalid quantity `{s}`: {e}")))
}

impl ExplorerTransaction {
    pub fn value_wei(&self) -> Result<Wei, ValidationError> {
        parse_quantity(&self.value).map(Wei::new)
    }

    pub fn block(&self) -> Result<Option<u64>, ValidationError> {
        self.block_number
            .as_deref()
            .map(|b| {
                parse_quantity(b).and_then(|v| {
                    u64::try_from(v).map_err(|_| ValidationError("block out of range".into()))
                })
            })
            .transpose()
    }
}
