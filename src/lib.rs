//! Transaction-signing core for a non-custodial EVM wallet
//!
//! Takes a user intent (transfer, approve, sign a message or typed data)
//! through to a confirmed on-chain outcome:
//! - Build a JSON-RPC request from the intent
//! - Simulate it and fold the findings into a safety verdict
//! - Sign it with whichever credential holds the key
//! - Route RPC calls to the wallet proxy or a user-chosen node
//! - Broadcast and track the transaction until it completes or fails
//!
//! # Security Model
//!
//! - Key material stays sealed until a signing call opens it with the
//!   session secret, and is wiped when the call returns
//! - Track-only accounts can never produce a signature
//! - Hardware signatures are checked against the account address
//! - Simulation is advisory; it never blocks signing on its own

pub mod config;
pub mod keystore;
pub mod network;
pub mod request;
pub mod safety;
pub mod signer;
pub mod submission;
pub mod telemetry;
pub mod tokens;
pub mod transport;

mod error;

// Re-export commonly used types
pub use config::{Config, RpcConfig};
pub use error::{Error, ParseError, Result};
pub use keystore::Credential;
pub use network::{Network, NetworkRpcRoute};
pub use request::RawRequest;
pub use safety::{SafetyCheck, SafetyResult};
pub use signer::{SignedPayload, SignerDispatcher, SigningError};
pub use submission::{SubmittedTransaction, TransactionState};
pub use transport::{AbortController, AbortSignal, RpcDispatcher};
