// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Backend amounts arrive as JSON numbers or strings depending on the endpoint.
pub mod string_or_number {
    use super::*;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Value::deserialize(deserializer)? {
            Value::Null => Ok(String::new()),
            Value::String(s) => Ok(s),
            Value::Number(n) => Ok(n.to_string()),
            other => Err(serde::de::Error::custom(format!(
                "expected string or number, got {other}"
            ))),
        }
    }
}

/// Optional counterpart of [`string_or_number`]; null and missing both map to `None`.
pub mod opt_string_or_number {
    use super::*;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<Value>::deserialize(deserializer)? {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(Value::Number(n)) => Ok(Some(n.to_string())),
            Some(other) => Err(serde::de::Error::custom(format!(
                "expected string or number, got {other}"
            ))),
        }
    }
}
