// SPDX-License-Identifier: Apache-2.0

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use fundchain_core::{token_fingerprint, ClientError, ErrorCode, UnixSeconds};
use fundchain_model::{Identity, Role};
use fundchain_policies::{allowed_actions, require_role, UserAction};
use tracing::debug;

/// Placeholder some cookie jars store after a failed login.
const UNDEFINED_TOKEN: &str = "undefined";

/// What the locally decoded bearer token says about the current visitor.
///
/// Role is advisory: the contract and backend enforce their own rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    Authenticated(Identity),
    Expired(Identity),
}

impl SessionState {
    /// Decodes without a network call. Absent, placeholder and malformed tokens fall through
    /// to [`SessionState::Anonymous`].
    #[must_use]
    pub fn from_token(token: Option<&str>, now: UnixSeconds) -> Self {
        let Some(token) = token.map(str::trim).filter(|t| !t.is_empty()) else {
            return Self::Anonymous;
        };
        if token == UNDEFINED_TOKEN {
            return Self::Anonymous;
        }
        match decode_claims(token) {
            Some(identity) if identity.is_expired_at(now) => {
                debug!(token = %token_fingerprint(token), "bearer token expired");
                Self::Expired(identity)
            }
            Some(identity) => Self::Authenticated(identity),
            None => {
                debug!(token = %token_fingerprint(token), "bearer token not decodable");
                Self::Anonymous
            }
        }
    }

    #[must_use]
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Self::Authenticated(identity) => Some(identity),
            Self::Anonymous | Self::Expired(_) => None,
        }
    }

    #[must_use]
    pub fn role(&self) -> Option<Role> {
        self.identity().map(|identity| identity.role)
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    /// Actions a view should offer. Empty for anonymous or expired sessions.
    #[must_use]
    pub fn offered_actions(&self) -> &'static [UserAction] {
        match self.role() {
            Some(role) => allowed_actions(role),
            None => &[],
        }
    }

    /// Gate for a role-bound action.
    pub fn require(&self, action: UserAction) -> Result<&Identity, ClientError> {
        match self {
            Self::Expired(identity) => Err(ClientError::new(
                ErrorCode::AuthExpired,
                "session expired, sign in again",
            )
            .with_detail("username", identity.username.clone())),
            Self::Anonymous => {
                require_role(None, action)?;
                Err(ClientError::access_denied("sign in required"))
            }
            Self::Authenticated(identity) => {
                require_role(Some(identity.role), action)?;
                Ok(identity)
            }
        }
    }

    /// Any signed-in identity, regardless of role.
    pub fn require_signed_in(&self) -> Result<&Identity, ClientError> {
        match self {
            Self::Authenticated(identity) => Ok(identity),
            Self::Expired(_) => Err(ClientError::new(
                ErrorCode::AuthExpired,
                "session expired, sign in again",
            )),
            Self::Anonymous => Err(ClientError::access_denied("sign in required")),
        }
    }
}

fn decode_claims(token: &str) -> Option<Identity> {
    let mut segments = token.split('.');
    let (_header, payload, _signature) = (segments.next()?, segments.next()?, segments.next()?);
    if segments.next().is_some() {
        return None;
    }
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    serde_json::from_slice::<Identity>(&bytes).ok()
}
