// SPDX-License-Identifier: Apache-2.0

use sha2::{Digest, Sha256};

#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Short, non-reversible tag for a credential, safe to put in logs.
#[must_use]
pub fn token_fingerprint(token: &str) -> String {
    let mut digest = sha256_hex(token.as_bytes());
    digest.truncate(12);
    digest
}
