//! Endpoint resolution and JSON-RPC envelope handling
//!
//! Routing is decided per call from the network snapshot and its route:
//!
//! - `route.current = Custom(url)`: POST straight to `url`
//! - `Default` on a predefined or test network: the managed proxy at
//!   `{proxy}/wallet/rpc/?network=<name>`, plus `requestSource=<hostname>`
//!   for calls made on behalf of a connected site
//! - `Default` on a custom network: its `rpcUrl`

use super::{AbortSignal, HttpClient, HttpRequest, RpcError};
use crate::error::ParseError;
use crate::network::{Network, NetworkRpcRoute, RpcSelection};
use crate::request::RawRequest;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use url::Url;

/// Who asked for the call
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RequestSource {
    #[default]
    Wallet,
    ConnectedSite { hostname: String },
}

pub struct RpcDispatcher<C> {
    http: C,
    proxy_endpoint: Url,
}

fn proxy_endpoint(base: &Url) -> Result<Url, ParseError> {
    let mut url = base.clone();
    url.set_query(None);
    url.path_segments_mut()
        .map_err(|_| ParseError::field("proxy url", format!("{base} cannot be a base URL")))?
        .pop_if_empty()
        .extend(["wallet", "rpc", ""]);
    Ok(url)
}

impl<C: HttpClient> RpcDispatcher<C> {
    pub fn new(http: C, proxy_base: &Url) -> Result<Self, ParseError> {
        Ok(Self {
            http,
            proxy_endpoint: proxy_endpoint(proxy_base)?,
        })
    }

    pub fn http(&self) -> &C {
        &self.http
    }

    /// Where `request` would go, without sending it
    pub fn resolve(
        &self,
        network: &Network,
        route: &NetworkRpcRoute,
        request: &RawRequest,
        source: &RequestSource,
    ) -> HttpRequest {
        let (url, query) = match (&route.current, network) {
            (RpcSelection::Custom(url), _) => (url.clone(), Vec::new()),
            (RpcSelection::Default, Network::Custom(custom)) => (custom.rpc_url.clone(), Vec::new()),
            (RpcSelection::Default, Network::Predefined(_) | Network::Testnet(_)) => {
                let mut query = Vec::with_capacity(2);
                if let Some(name) = network.proxy_name() {
                    query.push(("network".to_string(), name.to_string()));
                }
                if let RequestSource::ConnectedSite { hostname } = source {
                    query.push(("requestSource".to_string(), hostname.clone()));
                }
                (self.proxy_endpoint.clone(), query)
            }
        };

        HttpRequest {
            url,
            query,
            body: json!({
                "id": request.id,
                "jsonrpc": request.jsonrpc,
                "method": request.method,
                "params": request.params,
            }),
            method: request.method.clone(),
        }
    }

    /// Send `request` and return its `result` verbatim
    pub async fn dispatch(
        &self,
        network: &Network,
        route: &NetworkRpcRoute,
        request: &RawRequest,
        source: &RequestSource,
        signal: &AbortSignal,
    ) -> Result<Value, RpcError> {
        let http_request = self.resolve(network, route, request, source);
        tracing::debug!(
            method = %request.method,
            id = request.id,
            network = %network.display_name(),
            url = %http_request.url,
            "Dispatching JSON-RPC request"
        );

        let body = signal.race(self.http.post(&http_request)).await??;
        parse_response(request, &body)
    }

    /// Wallet-originated call with a fresh request
    pub async fn call(
        &self,
        network: &Network,
        route: &NetworkRpcRoute,
        method: &str,
        params: Vec<Value>,
        signal: &AbortSignal,
    ) -> Result<Value, RpcError> {
        let request = RawRequest::new(method, params);
        self.dispatch(network, route, &request, &RequestSource::Wallet, signal)
            .await
    }

    /// [`call`](Self::call) with the result deserialized
    pub async fn call_as<T: DeserializeOwned>(
        &self,
        network: &Network,
        route: &NetworkRpcRoute,
        method: &str,
        params: Vec<Value>,
        signal: &AbortSignal,
    ) -> Result<T, RpcError> {
        let result = self.call(network, route, method, params, signal).await?;
        serde_json::from_value(result).map_err(|e| {
            RpcError::Parse(ParseError::RpcResponse(format!("{method} result: {e}")))
        })
    }
}

/// Interpret a JSON-RPC response body
///
/// The id must be present and equal to the request id. A non-null `error`
/// wins over `result`; `result` is returned as-is, `null` included.
pub fn parse_response(request: &RawRequest, body: &str) -> Result<Value, RpcError> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| ParseError::RpcResponse(format!("invalid JSON: {e}")))?;
    let Value::Object(mut envelope) = value else {
        return Err(ParseError::RpcResponse("response is not an object".to_string()).into());
    };

    let id = envelope.remove("id").unwrap_or(Value::Null);
    // `as_u64` is None for strings, so "42" never matches 42
    if id.as_u64() != Some(request.id) {
        return Err(RpcError::IdMismatch {
            expected: request.id,
            actual: id,
        });
    }

    match envelope.remove("error") {
        Some(Value::Null) | None => {}
        Some(payload) => {
            tracing::debug!(method = %request.method, error = %payload, "JSON-RPC error response");
            return Err(RpcError::Rpc {
                method: request.method.clone(),
                payload,
            });
        }
    }

    envelope.remove("result").ok_or_else(|| {
        ParseError::RpcResponse("response has neither result nor error".to_string()).into()
    })
}
