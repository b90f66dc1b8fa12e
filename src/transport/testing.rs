//! In-memory [`HttpClient`] for tests

use super::{HttpClient, HttpRequest, TransportError};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Mutex;

type Handler = Box<dyn Fn(&str, &Value) -> Result<Value, TransportError> + Send + Sync>;

/// Answers every POST with whatever the handler returns for
/// `(method, params)`. The handler produces the envelope body (`result` or
/// `error`); `id` and `jsonrpc` are echoed from the request unless the
/// handler sets them.
pub(crate) struct MockHttpClient {
    handler: Handler,
    calls: Mutex<Vec<HttpRequest>>,
}

impl MockHttpClient {
    pub(crate) fn new<F>(handler: F) -> Self
    where
        F: Fn(&str, &Value) -> Value + Send + Sync + 'static,
    {
        Self::fallible(move |method, params| Ok(handler(method, params)))
    }

    pub(crate) fn fallible<F>(handler: F) -> Self
    where
        F: Fn(&str, &Value) -> Result<Value, TransportError> + Send + Sync + 'static,
    {
        Self {
            handler: Box::new(handler),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Every call succeeds with `result`
    pub(crate) fn with_result(result: Value) -> Self {
        Self::new(move |_, _| json!({ "result": result.clone() }))
    }

    pub(crate) fn calls(&self) -> Vec<HttpRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn methods(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.method).collect()
    }
}

#[async_trait]
impl HttpClient for MockHttpClient {
    async fn post(&self, request: &HttpRequest) -> Result<String, TransportError> {
        self.calls.lock().unwrap().push(request.clone());

        let method = request.body["method"].as_str().unwrap_or_default();
        let mut envelope = (self.handler)(method, &request.body["params"])?;
        if let Value::Object(map) = &mut envelope {
            map.entry("id").or_insert_with(|| request.body["id"].clone());
            map.entry("jsonrpc").or_insert_with(|| json!("2.0"));
        }
        Ok(envelope.to_string())
    }
}
