//! JSON-RPC transport
//!
//! The core never talks HTTP directly. It hands an [`HttpRequest`] to an
//! [`HttpClient`] port and gets the raw response body back; the
//! [`RpcDispatcher`] decides the endpoint and interprets the envelope.

pub mod abort;
pub mod dispatcher;
pub mod http;
#[cfg(test)]
pub(crate) mod testing;

pub use abort::{AbortController, AbortSignal, Aborted};
pub use dispatcher::{RequestSource, RpcDispatcher};
pub use http::ReqwestHttpClient;

use crate::error::ParseError;
use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use url::Url;

/// A single POST to a JSON-RPC endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub url: Url,
    pub query: Vec<(String, String)>,
    pub body: Value,
    /// JSON-RPC method, for diagnostics only
    pub method: String,
}

impl HttpRequest {
    pub fn error(&self, message: impl Into<String>) -> TransportError {
        TransportError {
            url: self.url.to_string(),
            method: self.method.clone(),
            status: None,
            trace: None,
            payload: None,
            message: message.into(),
        }
    }

    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// The request never produced a usable response body
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message} ({method} via {url})")]
pub struct TransportError {
    pub url: String,
    pub method: String,
    pub status: Option<u16>,
    /// Source chain of the underlying client error
    pub trace: Option<String>,
    /// Response body, when the server sent JSON
    pub payload: Option<Value>,
    pub message: String,
}

impl TransportError {
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_trace(mut self, trace: impl Into<String>) -> Self {
        self.trace = Some(trace.into());
        self
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RpcError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The node answered with a JSON-RPC `error` object
    #[error("{method} failed: {payload}")]
    Rpc { method: String, payload: Value },

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("Response id mismatch: expected {expected}, got {actual}")]
    IdMismatch { expected: u64, actual: Value },

    #[error("Request aborted")]
    Aborted,
}

impl From<Aborted> for RpcError {
    fn from(_: Aborted) -> Self {
        RpcError::Aborted
    }
}

impl RpcError {
    /// `error.message` of a JSON-RPC failure
    pub fn rpc_message(&self) -> Option<&str> {
        match self {
            RpcError::Rpc { payload, .. } => payload.get("message").and_then(Value::as_str),
            _ => None,
        }
    }
}

/// HTTP client port
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// POST `request.body` as JSON and return the response body
    async fn post(&self, request: &HttpRequest) -> Result<String, TransportError>;
}
