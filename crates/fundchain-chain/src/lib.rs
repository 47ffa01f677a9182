#![forbid(unsafe_code)]
//! Wallet session and contract gateway.
//!
//! [`ProviderSession`] owns the connection to a [`ChainProvider`]; [`ContractGateway`]
//! is the only path views use to read or mutate contract state. Every mutation runs
//! through the [`ActionState`] machine and a per-action [`ActionGate`].

pub mod abi;
mod contract;
mod gateway;
mod memory;
mod provider;
mod rpc;
mod session;
mod state;

pub use contract::{
    decode_campaign, decode_id_list, decode_nft_details, decode_string, encode_campaign,
    encode_id_list, encode_nft_details, encode_string, ContractCall,
};
pub use gateway::{ConfirmationPolicy, ContractGateway, TxConfirmation};
pub use memory::{InMemoryProvider, SubmittedTx};
pub use provider::{AccountFeed, ChainProvider, SignedTransaction, TxReceipt, TxRequest};
pub use rpc::{JsonRpcProvider, DEFAULT_PROMPT_TIMEOUT};
pub use session::{ContractAddresses, ProviderSession};
pub use state::{ActionGate, ActionState, ActionTicket, ContractAction};

pub const CRATE_NAME: &str = "fundchain-chain";
