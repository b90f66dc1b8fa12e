//! reqwest-backed [`HttpClient`]

use super::{HttpClient, HttpRequest, TransportError};
use crate::{Error, Result};
use async_trait::async_trait;
use std::error::Error as StdError;
use std::time::Duration;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| Error::Config(format!("HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

fn source_chain(error: &reqwest::Error) -> String {
    let mut chain = vec![error.to_string()];
    let mut source = error.source();
    while let Some(cause) = source {
        chain.push(cause.to_string());
        source = cause.source();
    }
    chain.join(": ")
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn post(&self, request: &HttpRequest) -> std::result::Result<String, TransportError> {
        let response = self
            .client
            .post(request.url.clone())
            .query(&request.query)
            .json(&request.body)
            .send()
            .await
            .map_err(|e| {
                let message = if e.is_timeout() {
                    "request timed out"
                } else {
                    "request failed"
                };
                request.error(message).with_trace(source_chain(&e))
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            request
                .error("failed to read response body")
                .with_status(status.as_u16())
                .with_trace(source_chain(&e))
        })?;

        if !status.is_success() {
            let mut error = request
                .error(format!("HTTP {status}"))
                .with_status(status.as_u16());
            if let Ok(payload) = serde_json::from_str(&body) {
                error = error.with_payload(payload);
            }
            tracing::warn!(
                url = %request.url,
                method = %request.method,
                status = status.as_u16(),
                "RPC endpoint returned an error status"
            );
            return Err(error);
        }

        Ok(body)
    }
}
