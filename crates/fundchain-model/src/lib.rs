#![forbid(unsafe_code)]
//! Fundchain data model.
//!
//! On-chain fields keep the contract's integer units ([`Wei`], unix seconds). Conversion
//! to a human-decimal ether string happens only at the view edge through
//! [`Wei::to_ether_string`] and [`Wei::parse_ether`].

mod amount;
mod campaign;
mod explorer;
mod identity;
mod ids;
mod nft;
mod profile;
pub mod serde_helpers;
mod time;

pub use amount::{Wei, ETHER_DECIMALS, WEI_PER_ETHER};
pub use campaign::{
    Campaign, CampaignMetadata, CampaignPresence, CampaignUpdate, CampaignView, Reward, UpdateLog,
};
pub use explorer::{ExplorerTransaction, TransactionSearch};
pub use identity::{Identity, Role};
pub use ids::{Address, CampaignId, TokenId, TxHash, CAMPAIGN_ID_MAX_LEN};
pub use nft::NftReward;
pub use profile::{
    ApprovalDecision, ApprovalStatus, FundraiserRecord, UserProfile, VerificationDocument,
};
pub use time::{format_deadline_input, format_unix, parse_date_input, parse_deadline_input};

use std::fmt::{Display, Formatter};

pub const CRATE_NAME: &str = "fundchain-model";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError(pub String);

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for ValidationError {}

impl ValidationError {
    /// Lifts a parse failure into the client taxonomy, attributed to one form field.
    #[must_use]
    pub fn into_field_error(self, field: &str) -> fundchain_core::ClientError {
        fundchain_core::ClientError::invalid_field(field, self.0)
    }
}
