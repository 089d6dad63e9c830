//! GraphQL-over-HTTP client for sibling federation servers.

use std::time::Duration;

use serde_json::{json, Value};
use tracing::{debug, instrument, trace};
use url::Url;

use cenote_core::error::{RemoteError, RemoteResult};

/// Configuration for a peer connection.
#[derive(Debug, Clone)]
pub struct PeerClientConfig {
    /// GraphQL endpoint of the peer (e.g. "http://peer.example/graphql").
    pub url: Url,
    /// Whole-request timeout.
    pub timeout: Duration,
}

/// HTTP client for one peer's GraphQL endpoint.
///
/// A peer is another federation server exposing the same schema shape
/// for the shared logical models; every adapter operation maps to one
/// query or mutation against it.
pub struct PeerClient {
    http: reqwest::Client,
    endpoint: Url,
}

impl PeerClient {
    pub fn new(config: &PeerClientConfig) -> RemoteResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| RemoteError::Http(e.to_string()))?;
        Ok(Self {
            http,
            endpoint: config.url.clone(),
        })
    }

    /// Execute one GraphQL request and return the `data` payload.
    ///
    /// A transport failure, a non-success status, or any entry in the
    /// response's `errors` list is an error; partial-failure signaling
    /// between federation layers travels inside the data payload, not
    /// through GraphQL errors.
    #[instrument(skip_all, fields(endpoint = %self.endpoint))]
    pub async fn execute(&self, query: &str, variables: Value) -> RemoteResult<Value> {
        trace!(%query, "Sending GraphQL request");

        let response = self
            .http
            .post(self.endpoint.clone())
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await
            .map_err(|e| RemoteError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(RemoteError::Status {
                status: status.as_u16(),
                message: message.chars().take(500).collect(),
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| RemoteError::Decode(e.to_string()))?;

        if let Some(errors) = body.get("errors").and_then(Value::as_array) {
            if !errors.is_empty() {
                let messages: Vec<&str> = errors
                    .iter()
                    .filter_map(|e| e.get("message").and_then(Value::as_str))
                    .collect();
                return Err(RemoteError::GraphQl(messages.join("; ")));
            }
        }

        debug!("GraphQL request succeeded");
        body.get("data")
            .cloned()
            .ok_or_else(|| RemoteError::Decode("response carries no data payload".into()))
    }
}
