#![forbid(unsafe_code)]
//! Shared foundations for the fundchain client crates.
//!
//! Every external failure a view can observe is expressed as a [`ClientError`] whose
//! [`ErrorCode`] belongs to one fixed taxonomy, so callers can branch on the code and
//! render the message without inspecting transport details.

pub mod domain;
pub mod errors;

pub use domain::canonical::{sha256_hex, token_fingerprint};
pub use domain::config::{resolve_fundchain_cache_dir, resolve_fundchain_config_path};
pub use domain::time::{ClockPort, FixedClock, SystemClock, UnixSeconds, SECONDS_PER_DAY};
pub use errors::{
    ClientError, ConfigPathScope, ErrorCode, ExitCode, MachineError, Result, ResultExt,
    ERROR_CODES,
};

pub const CRATE_NAME: &str = "fundchain-core";

pub const ENV_FUNDCHAIN_LOG_LEVEL: &str = "FUNDCHAIN_LOG_LEVEL";
pub const ENV_FUNDCHAIN_CACHE_DIR: &str = "FUNDCHAIN_CACHE_DIR";
