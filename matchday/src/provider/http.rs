use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::events::{EventBridge, ProviderEvent};
use super::{ProviderError, WalletProvider};

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    #[serde(default)]
    message: String,
}

/// Wallet provider reached over JSON-RPC 2.0 on HTTP.
///
/// Suits wallet bridges and signer daemons that expose the EIP-1193 method
/// set (`eth_requestAccounts`, `personal_sign`, ...) on a local endpoint.
/// Events arrive separately through an [`EventBridge`].
#[derive(Debug)]
pub struct HttpProvider {
    client: Client,
    url: String,
    next_id: AtomicU64,
    events: broadcast::Sender<ProviderEvent>,
}

impl HttpProvider {
    pub fn new(url: &str) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            client: Client::new(),
            url: url.to_string(),
            next_id: AtomicU64::new(1),
            events,
        }
    }

    /// Start forwarding events from a bridge websocket at `ws_url`.
    pub fn connect_events(&self, ws_url: &str, cancel: CancellationToken) -> JoinHandle<()> {
        EventBridge::new(ws_url, self.events.clone()).spawn(cancel)
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl WalletProvider for HttpProvider {
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let body = JsonRpcRequest {
            jsonrpc: "2.0",
            id,
            method,
            params,
        };

        tracing::debug!(id, method, "provider request");

        let resp = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let text = resp.text().await.unwrap_or_default();
            return Err(ProviderError::Transport(format!("HTTP {status}: {text}")));
        }

        let decoded: JsonRpcResponse = resp
            .json()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))?;

        if let Some(err) = decoded.error {
            return Err(ProviderError::Rpc {
                code: err.code,
                message: err.message,
            });
        }

        Ok(decoded.result.unwrap_or(Value::Null))
    }

    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent> {
        self.events.subscribe()
    }
}
