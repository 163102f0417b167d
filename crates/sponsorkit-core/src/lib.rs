#[macro_use]
extern crate lazy_static;

#[macro_use]
extern crate serde_derive;

pub mod account;
pub mod codec;
pub mod config;
pub mod constants;
pub mod errors;
pub mod rpc;
pub mod signers;


pub use account::{AccountPipeline, AuthorizationRequest, PipelineState, SentTransaction};
pub use codec::abi::{CallData, EncodedCall};
pub use config::SponsorConfig;
pub use errors::{AccountError, AccountResult};
pub use rpc::{ThorClient, ThorNode, TransactionId};
pub use signers::{KeyCustody, SignPrompt};
