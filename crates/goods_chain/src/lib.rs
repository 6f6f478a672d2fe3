//! NEAR access for the goods migration tool: network profiles, the local key
//! store, account lifecycle and contract invocation.

pub mod account;
pub mod client;
pub mod contracts;
pub mod error;
pub mod invoker;
pub mod keystore;
pub mod network;
pub mod rpc;
#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use account::{AccountManager, CreatedAccount};
pub use client::{
    CallDescriptor, ChainAction, ChainClient, MAX_GAS, ONE_NEAR, ONE_YOCTO, Outcome, TGAS,
    format_near, parse_near_amount,
};
pub use contracts::{ContractKind, InitArgs};
pub use error::ChainError;
pub use invoker::{ContractProxy, Deployment, deploy};
pub use keystore::{KeyStore, StoredKey};
pub use network::{Network, NetworkProfile};
pub use rpc::RpcClient;

pub use near_primitives::types::AccountId;
