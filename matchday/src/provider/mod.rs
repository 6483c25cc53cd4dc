//! The injected wallet provider contract.
//!
//! A provider brokers every wallet RPC (`request`) and pushes connectivity
//! events (`accountsChanged`, `chainChanged`, `disconnect`). The session only
//! talks to providers through [`WalletProvider`], so tests can swap in a
//! scripted fake.

pub mod events;
pub mod http;
pub mod rpc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::broadcast;

pub use events::{EventBridge, ProviderEvent, ProviderEventSubscription};
pub use http::HttpProvider;

/// User rejected the request.
pub const USER_REJECTED: i64 = 4001;
/// The provider throttled the request.
pub const REQUEST_THROTTLED: i64 = 4100;
/// The requested chain has not been added to the wallet.
pub const UNRECOGNIZED_CHAIN: i64 = 4902;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("wallet provider not available")]
    Unavailable,
}

impl ProviderError {
    pub fn rpc(code: i64, message: impl Into<String>) -> Self {
        ProviderError::Rpc {
            code,
            message: message.into(),
        }
    }

    /// The EIP-1193 error code, if the provider supplied one.
    pub fn code(&self) -> Option<i64> {
        match self {
            ProviderError::Rpc { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub fn is_user_rejected(&self) -> bool {
        self.code() == Some(USER_REJECTED)
    }

    pub fn is_throttled(&self) -> bool {
        self.code() == Some(REQUEST_THROTTLED)
    }

    pub fn is_unknown_chain(&self) -> bool {
        self.code() == Some(UNRECOGNIZED_CHAIN)
    }

    /// Message suitable for showing next to a generic failure.
    pub fn message(&self) -> String {
        match self {
            ProviderError::Rpc { message, .. } if !message.is_empty() => message.clone(),
            ProviderError::Rpc { .. } => "Unknown error".to_string(),
            other => other.to_string(),
        }
    }
}

/// An EIP-1193 style wallet provider.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Issue a single RPC request.
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError>;

    /// Subscribe to provider events.
    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_classification() {
        assert!(ProviderError::rpc(4001, "rejected").is_user_rejected());
        assert!(ProviderError::rpc(4100, "spam").is_throttled());
        assert!(ProviderError::rpc(4902, "unknown chain").is_unknown_chain());

        let transport = ProviderError::Transport("boom".into());
        assert_eq!(transport.code(), None);
        assert!(!transport.is_user_rejected());
    }

    #[test]
    fn test_error_message_fallback() {
        assert_eq!(ProviderError::rpc(-32000, "").message(), "Unknown error");
        assert_eq!(ProviderError::rpc(-32000, "oops").message(), "oops");
    }
}
