// SPDX-License-Identifier: Apache-2.0

//! Solidity ABI encoding for the handful of types the crowdfunding contract exposes.
//!
//! `uint256` values are carried as `u128`; a word with any of its upper 16 bytes set
//! fails to decode instead of being truncated.

use fundchain_core::ClientError;
use fundchain_model::Address;
use sha3::{Digest, Keccak256};

const WORD: usize = 32;
const ERROR_STRING_SELECTOR: [u8; 4] = [0x08, 0xc3, 0x79, 0xa0];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbiType {
    Address,
    Uint,
    Bool,
    String,
    StringArray,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbiValue {
    Address(Address),
    Uint(u128),
    Bool(bool),
    String(String),
    StringArray(Vec<String>),
}

impl AbiValue {
    fn is_dynamic(&self) -> bool {
        matches!(self, Self::String(_) | Self::StringArray(_))
    }
}

#[must_use]
pub fn selector(signature: &str) -> [u8; 4] {
    let digest = Keccak256::digest(signature.as_bytes());
    [digest[0], digest[1], digest[2], digest[3]]
}

fn uint_word(value: u128) -> [u8; WORD] {
    let mut word = [0_u8; WORD];
    word[16..].copy_from_slice(&value.to_be_bytes());
    word
}

fn usize_word(value: usize) -> [u8; WORD] {
    uint_word(value as u128)
}

fn padded_bytes(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(WORD + bytes.len().div_ceil(WORD) * WORD);
    out.extend_from_slice(&usize_word(bytes.len()));
    out.extend_from_slice(bytes);
    let rem = bytes.len() % WORD;
    if rem != 0 {
        out.extend(std::iter::repeat(0_u8).take(WORD - rem));
    }
    out
}

fn static_word(value: &AbiValue) -> [u8; WORD] {
    match value {
        AbiValue::Address(addr) => {
            let mut word = [0_u8; WORD];
            word[12..].copy_from_slice(&addr.to_bytes());
            word
        }
        AbiValue::Uint(v) => uint_word(*v),
        AbiValue::Bool(b) => uint_word(u128::from(*b)),
        AbiValue::String(_) | AbiValue::StringArray(_) => [0_u8; WORD],
    }
}

fn dynamic_tail(value: &AbiValue) -> Vec<u8> {
    match value {
        AbiValue::String(s) => padded_bytes(s.as_bytes()),
        AbiValue::StringArray(items) => {
            let mut out = usize_word(items.len()).to_vec();
            let inner = items
                .iter()
                .map(|s| AbiValue::String(s.clone()))
                .collect::<Vec<_>>();
            out.extend(encode_values(&inner));
            out
        }
        _ => Vec::new(),
    }
}

/// Head/tail encoding of a value tuple.
#[must_use]
pub fn encode_values(values: &[AbiValue]) -> Vec<u8> {
    let head_len = WORD * values.len();
    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();
    for value in values {
        if value.is_dynamic() {
            head.extend_from_slice(&usize_word(head_len + tail.len()));
            tail.extend(dynamic_tail(value));
        } else {
            head.extend_from_slice(&static_word(value));
        }
    }
    head.extend(tail);
    head
}

#[must_use]
pub fn encode_call(signature: &str, args: &[AbiValue]) -> Vec<u8> {
    let mut out = selector(signature).to_vec();
    out.extend(encode_values(args));
    out
}

fn read_word(data: &[u8], offset: usize) -> Result<&[u8], ClientError> {
    offset
        .checked_add(WORD)
        .and_then(|end| data.get(offset..end))
        .ok_or_else(|| {
            ClientError::decode(format!(
                "abi data too short: need word at {offset}, have {} bytes",
                data.len()
            ))
        })
}

fn word_to_u128(word: &[u8]) -> Result<u128, ClientError> {
    if word[..16].iter().any(|b| *b != 0) {
        return Err(ClientError::decode("uint256 value exceeds 128 bits"));
    }
    let mut low = [0_u8; 16];
    low.copy_from_slice(&word[16..]);
    Ok(u128::from_be_bytes(low))
}

fn word_to_usize(word: &[u8], limit: usize) -> Result<usize, ClientError> {
    let value = word_to_u128(word)?;
    usize::try_from(value)
        .ok()
        .filter(|v| *v <= limit)
        .ok_or_else(|| ClientError::decode(format!("abi offset or length {value} out of range")))
}

fn decode_string_at(data: &[u8], offset: usize) -> Result<String, ClientError> {
    let len = word_to_usize(read_word(data, offset)?, data.len())?;
    let start = offset + WORD;
    let bytes = start
        .checked_add(len)
        .and_then(|end| data.get(start..end))
        .ok_or_else(|| ClientError::decode("abi string runs past end of data"))?;
    String::from_utf8(bytes.to_vec())
        .map_err(|e| ClientError::decode(format!("abi string is not utf-8: {e}")))
}

pub fn decode_values(types: &[AbiType], data: &[u8]) -> Result<Vec<AbiValue>, ClientError> {
    let mut out = Vec::with_capacity(types.len());
    for (i, ty) in types.iter().enumerate() {
        let word = read_word(data, i * WORD)?;
        let value = match ty {
            AbiType::Address => {
                if word[..12].iter().any(|b| *b != 0) {
                    return Err(ClientError::decode("address word has dirty high bytes"));
                }
                let mut bytes = [0_u8; 20];
                bytes.copy_from_slice(&word[12..]);
                AbiValue::Address(Address::from_bytes(bytes))
            }
            AbiType::Uint => AbiValue::Uint(word_to_u128(word)?),
            AbiType::Bool => match word_to_u128(word)? {
                0 => AbiValue::Bool(false),
                1 => AbiValue::Bool(true),
                other => return Err(ClientError::decode(format!("invalid bool word {other}"))),
            },
            AbiType::String => AbiValue::String(decode_string_at(data, word_to_usize(word, data.len())?)?),
            AbiType::StringArray => {
                let offset = word_to_usize(word, data.len())?;
                let len = word_to_usize(read_word(data, offset)?, data.len() / WORD)?;
                let inner = &data[offset + WORD..];
                let items = decode_values(&vec![AbiType::String; len], inner)?
                    .into_iter()
                    .filter_map(|v| match v {
                        AbiValue::String(s) => Some(s),
                        _ => None,
                    })
                    .collect();
                AbiValue::StringArray(items)
            }
        };
        out.push(value);
    }
    Ok(out)
}

/// Splits calldata into selector and argument bytes.
pub fn split_selector(calldata: &[u8]) -> Result<([u8; 4], &[u8]), ClientError> {
    if calldata.len() < 4 {
        return Err(ClientError::decode("calldata shorter than a selector"));
    }
    let mut sel = [0_u8; 4];
    sel.copy_from_slice(&calldata[..4]);
    Ok((sel, &calldata[4..]))
}

/// `Error(string)` payload carried by a revert, if that is what `data` holds.
#[must_use]
pub fn decode_revert_reason(data: &[u8]) -> Option<String> {
    let (sel, rest) = split_selector(data).ok()?;
    if sel != ERROR_STRING_SELECTOR {
        return None;
    }
    match decode_values(&[AbiType::String], rest).ok()?.pop()? {
        AbiValue::String(reason) => Some(reason),
        _ => None,
    }
}

#[must_use]
pub fn encode_revert_reason(reason: &str) -> Vec<u8> {
    let mut out = ERROR_STRING_SELECTOR.to_vec();
    out.extend(encode_values(&[AbiValue::String(reason.to_string())]));
    out
}

#[must_use]
pub fn to_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(2 + bytes.len() * 2);
    out.push_str("0x");
    for b in bytes {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{b:02x}");
    }
    out
}

pub fn from_hex(input: &str) -> Result<Vec<u8>, ClientError> {
    let body = input.trim();
    let body = body.strip_prefix("0x").unwrap_or(body);
    if body.len() % 2 != 0 {
        return Err(ClientError::decode("hex string must have even length"));
    }
    (0..body.len())
        .step_by(2)
        .map(|i| {
            body.get(i..i + 2)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .ok_or_else(|| ClientError::decode("hex string contains non-hex digits"))
        })
        .collect()
}
