//! HTTP transport to a replica.
//!
//! `HttpTransport` is the only piece that touches the network on the agent
//! side: it fetches the replica's root key and submits canister calls.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::{AgentError, MethodKind};

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// A single canister call as sent to the replica.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallRequest {
    pub canister_id: String,
    pub method: String,
    #[serde(skip)]
    pub kind: MethodKind,
    pub sender: String,
    pub arg: Value,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    root_key: String,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
enum CallReply {
    Replied {
        #[serde(default)]
        reply: Value,
    },
    Rejected {
        #[serde(default)]
        reject_message: String,
    },
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetch the replica's root key.
    async fn fetch_root_key(&self) -> Result<Vec<u8>, AgentError>;

    /// Submit a call, authenticated with `delegation` when present.
    async fn submit(&self, request: &CallRequest, delegation: Option<&str>) -> Result<Value, AgentError>;
}

/// Transport over the replica's HTTP interface.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    host: Url,
}

impl HttpTransport {
    pub fn new(host: &str) -> Result<Self, AgentError> {
        let mut host = Url::parse(host).map_err(|e| AgentError::InvalidHost(format!("{}: {}", host, e)))?;
        // Relative joins replace the last path segment unless it ends in '/'
        if !host.path().ends_with('/') {
            let path = format!("{}/", host.path());
            host.set_path(&path);
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self { client, host })
    }

    fn endpoint(&self, path: &str) -> Result<Url, AgentError> {
        self.host
            .join(path)
            .map_err(|e| AgentError::InvalidHost(format!("{}: {}", path, e)))
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, AgentError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(AgentError::from_status(status, &body))
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch_root_key(&self) -> Result<Vec<u8>, AgentError> {
        let url = self.endpoint("api/v2/status")?;
        debug!(url = %url, "Fetching root key");

        let response = self.client.get(url).send().await?;
        let response = Self::check_response(response).await?;
        let status: StatusResponse = response
            .json()
            .await
            .map_err(|e| AgentError::InvalidResponse(format!("status: {}", e)))?;

        decode_root_key(&status.root_key)
    }

    async fn submit(&self, request: &CallRequest, delegation: Option<&str>) -> Result<Value, AgentError> {
        let url = self.endpoint(&format!(
            "api/v2/canister/{}/{}",
            request.canister_id,
            request.kind.endpoint()
        ))?;
        debug!(url = %url, method = %request.method, "Submitting canister call");

        let mut builder = self.client.post(url).json(request);
        if let Some(token) = delegation {
            builder = builder.bearer_auth(token);
        }

        let response = Self::check_response(builder.send().await?).await?;
        let reply: CallReply = response
            .json()
            .await
            .map_err(|e| AgentError::InvalidResponse(format!("{}: {}", request.method, e)))?;

        match reply {
            CallReply::Replied { reply } => Ok(reply),
            CallReply::Rejected { reject_message } => Err(AgentError::Rejected(reject_message)),
        }
    }
}

/// Decode a hex root key, rejecting empty keys.
pub fn decode_root_key(raw: &str) -> Result<Vec<u8>, AgentError> {
    let key = hex::decode(raw.trim()).map_err(|e| AgentError::InvalidRootKey(e.to_string()))?;
    if key.is_empty() {
        return Err(AgentError::InvalidRootKey("empty key".to_string()));
    }
    Ok(key)
}
