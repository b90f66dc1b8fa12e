//! Error types for the transaction-signing core

use crate::keystore::DecryptError;
use crate::signer::SigningError;
use crate::transport::{RpcError, TransportError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Rpc(#[from] RpcError),

    #[error(transparent)]
    Decrypt(#[from] DecryptError),

    #[error(transparent)]
    Signing(#[from] SigningError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Anything the core could not classify. Forwarded to the error reporter.
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

/// Malformed input coming back from a node, a trace, or a dApp request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Malformed JSON-RPC response: {0}")]
    RpcResponse(String),

    #[error("Malformed request params for {method}: {reason}")]
    RequestParams { method: String, reason: String },

    #[error("Malformed typed data: {0}")]
    TypedData(String),

    #[error("Unrecognised failure trace: {0}")]
    FailureTrace(String),

    #[error("Malformed {field}: {reason}")]
    Field { field: &'static str, reason: String },
}

impl ParseError {
    pub(crate) fn field(field: &'static str, reason: impl ToString) -> Self {
        Self::Field {
            field,
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
