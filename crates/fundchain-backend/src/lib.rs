#![forbid(unsafe_code)]
//! Off-chain half of fundchain: the campaign backend, the locally decoded bearer-token
//! session, the persisted token, and block-explorer lookups.
//!
//! Nothing here retries. Every failure is a [`fundchain_core::ClientError`] the caller
//! renders or surfaces as partial completion.

mod client;
mod explorer;
mod identity;
mod token_store;

pub use client::{Attachment, BackendClient, CampaignSubmission, DEFAULT_BACKEND_URL};
pub use explorer::{
    truncate_address, truncate_hash, ExplorerClient, DEFAULT_ADDRESS_LIMIT, DEFAULT_EXPLORER_URL,
};
pub use identity::SessionState;
pub use token_store::{TokenStore, TOKEN_FILE_NAME};

pub const CRATE_NAME: &str = "fundchain-backend";
