#![forbid(unsafe_code)]
//! Pure rules over campaign snapshots and user input.
//!
//! Nothing here performs I/O or caches results: every predicate is a function of the
//! snapshot it is handed and an explicit `now`.

mod browse;
mod derivation;
mod forms;
mod roles;
mod status;

pub use browse::{apply_browse, BrowseQuery, BrowseSort};
pub use derivation::{
    can_claim_reward, can_refund, can_select_for_update, can_vote, days_left, derive_flags,
    is_expired, CampaignFlags, DerivationPolicy, DEFAULT_STALE_UPDATE_SECS,
};
pub use forms::{
    is_email, validate_campaign_form, validate_fundraiser_signup, validate_login,
    validate_profile_update, validate_signup, validate_update_form, CampaignForm, LoginForm,
    ProfileUpdateForm, RewardInput, SignupForm, UpdateForm, ValidatedCampaign, ValidatedUpdate,
    MIN_DEADLINE_LEAD_SECS,
};
pub use roles::{allowed_actions, require_role, role_allows, UserAction};
pub use status::{last_update_label, status_label, CampaignStatus, NOT_UPDATED_LABEL};

pub const CRATE_NAME: &str = "fundchain-policies";
