use std::collections::BTreeMap;
use std::fmt;

pub type Result<T> = std::result::Result<T, ClientError>;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ExitCode {
    Success = 0,
    Usage = 2,
    Validation = 3,
    DependencyFailure = 4,
    Internal = 10,
}

impl ExitCode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Usage => "usage",
            Self::Validation => "validation",
            Self::DependencyFailure => "dependency_failure",
            Self::Internal => "internal",
        }
    }
}

/// Failure classes a caller can observe from the wallet, the contract, or the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[non_exhaustive]
pub enum ErrorCode {
    ProviderUnavailable,
    AccessDenied,
    UserRejected,
    StaleAccount,
    ValidationError,
    TransactionReverted,
    ConfirmationTimeout,
    ActionPending,
    BackendError,
    AuthExpired,
    NotFound,
    Decode,
    Internal,
}

pub const ERROR_CODES: &[ErrorCode] = &[
    ErrorCode::ProviderUnavailable,
    ErrorCode::AccessDenied,
    ErrorCode::UserRejected,
    ErrorCode::StaleAccount,
    ErrorCode::ValidationError,
    ErrorCode::TransactionReverted,
    ErrorCode::ConfirmationTimeout,
    ErrorCode::ActionPending,
    ErrorCode::BackendError,
    ErrorCode::AuthExpired,
    ErrorCode::NotFound,
    ErrorCode::Decode,
    ErrorCode::Internal,
];

impl ErrorCode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ProviderUnavailable => "provider_unavailable",
            Self::AccessDenied => "access_denied",
            Self::UserRejected => "user_rejected",
            Self::StaleAccount => "stale_account",
            Self::ValidationError => "validation_error",
            Self::TransactionReverted => "transaction_reverted",
            Self::ConfirmationTimeout => "confirmation_timeout",
            Self::ActionPending => "action_pending",
            Self::BackendError => "backend_error",
            Self::AuthExpired => "auth_expired",
            Self::NotFound => "not_found",
            Self::Decode => "decode_error",
            Self::Internal => "internal_error",
        }
    }

    #[must_use]
    pub const fn exit_code(self) -> ExitCode {
        match self {
            Self::ValidationError | Self::ActionPending => ExitCode::Validation,
            Self::ProviderUnavailable
            | Self::AccessDenied
            | Self::UserRejected
            | Self::StaleAccount
            | Self::TransactionReverted
            | Self::ConfirmationTimeout
            | Self::BackendError
            | Self::AuthExpired
            | Self::NotFound => ExitCode::DependencyFailure,
            Self::Decode | Self::Internal => ExitCode::Internal,
        }
    }

    /// Validation failures are rendered inline next to the offending field; everything else
    /// surfaces as a blocking notification.
    #[must_use]
    pub const fn is_inline(self) -> bool {
        matches!(self, Self::ValidationError)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigPathScope {
    User,
    Workspace,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientError {
    pub code: ErrorCode,
    pub message: String,
    pub details: BTreeMap<String, String>,
}

impl ClientError {
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_detail(mut self, key: &str, value: impl Into<String>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }

    /// Single-field validation failure.
    #[must_use]
    pub fn invalid_field(field: &str, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self::new(ErrorCode::ValidationError, format!("invalid {field}: {reason}"))
            .with_detail(field, reason)
    }

    /// Validation failure over several fields; `fields` maps field name to reason.
    #[must_use]
    pub fn invalid_fields(fields: BTreeMap<String, String>) -> Self {
        let names = fields.keys().cloned().collect::<Vec<_>>().join(", ");
        Self {
            code: ErrorCode::ValidationError,
            message: format!("validation failed: {names}"),
            details: fields,
        }
    }

    #[must_use]
    pub fn provider_unavailable() -> Self {
        Self::new(
            ErrorCode::ProviderUnavailable,
            "no wallet provider detected; install or start a wallet provider",
        )
    }

    #[must_use]
    pub fn access_denied(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::AccessDenied, message)
    }

    #[must_use]
    pub fn user_rejected(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::UserRejected, message)
    }

    #[must_use]
    pub fn reverted(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self::new(
            ErrorCode::TransactionReverted,
            format!("transaction reverted: {reason}"),
        )
        .with_detail("reason", reason)
    }

    #[must_use]
    pub fn backend(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BackendError, message)
    }

    #[must_use]
    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Decode, message)
    }

    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, message)
    }

    /// Field-level reasons, populated only for validation failures.
    #[must_use]
    pub fn field_errors(&self) -> Option<&BTreeMap<String, String>> {
        if self.code == ErrorCode::ValidationError {
            Some(&self.details)
        } else {
            None
        }
    }

    #[must_use]
    pub fn to_machine(&self) -> MachineError {
        MachineError {
            code: self.code.as_str().to_string(),
            message: self.message.clone(),
            details: self.details.clone(),
        }
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ClientError {}

impl From<serde_json::Error> for ClientError {
    fn from(value: serde_json::Error) -> Self {
        Self::decode(format!("json decode failed: {value}"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MachineError {
    pub code: String,
    pub message: String,
    #[serde(default)]
    pub details: BTreeMap<String, String>,
}

impl MachineError {
    #[must_use]
    pub fn new(code: &str, message: &str) -> Self {
        Self {
            code: code.to_string(),
            message: message.to_string(),
            details: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_detail(mut self, key: &str, value: &str) -> Self {
        self.details.insert(key.to_string(), value.to_string());
        self
    }
}

impl fmt::Display for MachineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for MachineError {}
