//! HTTP JSON-RPC transport.

use std::time::Duration;

use async_trait::async_trait;

use rpcmux_core::error::RpcError;
use rpcmux_core::request::{JsonRpcRequest, JsonRpcResponse};
use rpcmux_core::transport::RpcTransport;

/// Configuration for [`HttpTransport`].
#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
    /// Deadline for a single HTTP round trip.
    pub request_timeout: Duration,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// One HTTP endpoint speaking JSON-RPC 2.0.
pub struct HttpTransport {
    url: String,
    http: reqwest::Client,
    request_timeout: Duration,
}

impl HttpTransport {
    /// Create a transport for the given endpoint URL.
    pub fn new(url: impl Into<String>, config: HttpTransportConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .expect("failed to build reqwest client");
        Self {
            url: url.into(),
            http,
            request_timeout: config.request_timeout,
        }
    }

    /// Create with default configuration.
    pub fn default_for(url: impl Into<String>) -> Self {
        Self::new(url, HttpTransportConfig::default())
    }
}

#[async_trait]
impl RpcTransport for HttpTransport {
    async fn send(&self, req: JsonRpcRequest) -> Result<JsonRpcResponse, RpcError> {
        let resp = self
            .http
            .post(&self.url)
            .json(&req)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RpcError::Timeout {
                        ms: self.request_timeout.as_millis() as u64,
                    }
                } else {
                    RpcError::Transport(e.to_string())
                }
            })?;

        let status = resp.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(RpcError::RateLimited {
                endpoint: self.url.clone(),
            });
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(RpcError::Transport(format!(
                "HTTP {}: {body}",
                status.as_u16()
            )));
        }

        resp.json::<JsonRpcResponse>()
            .await
            .map_err(|e| RpcError::MalformedResponse(e.to_string()))
    }

    fn url(&self) -> &str {
        &self.url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_timeout() {
        let config = HttpTransportConfig::default();
        assert_eq!(config.request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn url_passthrough() {
        let transport = HttpTransport::default_for("https://polygon-rpc.com");
        assert_eq!(transport.url(), "https://polygon-rpc.com");
    }
}
