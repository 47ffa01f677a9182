// SPDX-License-Identifier: Apache-2.0

use std::fmt::Display;

use super::model::{ClientError, ErrorCode};

/// Lifts a foreign failure into the client taxonomy, prefixed with what was being attempted.
pub trait ResultExt<T> {
    fn with_context(self, code: ErrorCode, context: &'static str) -> Result<T, ClientError>;

    fn internal_context(self, context: &'static str) -> Result<T, ClientError>
    where
        Self: Sized,
    {
        self.with_context(ErrorCode::Internal, context)
    }
}

impl<T, E: Display> ResultExt<T> for Result<T, E> {
    fn with_context(self, code: ErrorCode, context: &'static str) -> Result<T, ClientError> {
        self.map_err(|source| {
            ClientError::new(code, format!("{context}: {source}")).with_detail("context", context)
        })
    }
}
