//! Client configuration.
//!
//! Everything environment-specific lives here: the backend base URL, the
//! target network the wallet must be on, the display language and the fixed
//! delays inserted around provider calls.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{MatchdayError, Result};

/// Display language for card catalogs and notices.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Pt,
}

impl Language {
    pub fn code(self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Pt => "pt",
        }
    }
}

impl FromStr for Language {
    type Err = MatchdayError;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_ascii_lowercase();
        match lower.split(['-', '_']).next().unwrap_or_default() {
            "en" => Ok(Language::En),
            "pt" => Ok(Language::Pt),
            _ => Err(MatchdayError::Config(format!("unsupported language: {s}"))),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// The single network the wallet is required to be on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkConfig {
    /// Chain id, decimal (`88882`) or `0x`-prefixed hex (`0x15b32`).
    pub chain_id: String,
    pub chain_name: String,
    pub rpc_url: String,
    /// Native currency symbol (also used as its display name).
    pub currency_symbol: String,
    pub explorer_url: Option<String>,
}

impl NetworkConfig {
    /// Read the target network from `MATCHDAY_*` environment variables.
    pub fn from_env() -> Result<Self> {
        let explorer_url = std::env::var("MATCHDAY_EXPLORER_URL")
            .ok()
            .filter(|v| !v.trim().is_empty());

        Ok(Self {
            chain_id: required_env("MATCHDAY_CHAIN_ID")?,
            chain_name: required_env("MATCHDAY_CHAIN_NAME")?,
            rpc_url: required_env("MATCHDAY_RPC_URL")?,
            currency_symbol: required_env("MATCHDAY_CURRENCY_SYMBOL")?,
            explorer_url,
        })
    }
}

/// Fixed delays around provider calls.
///
/// The wallet extension rate-limits aggressively, so every sensitive call is
/// preceded by a short pause. Tests use [`SessionTiming::immediate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionTiming {
    /// Pause before `eth_requestAccounts`.
    pub pre_connect: Duration,
    /// Pause between obtaining accounts and the network check.
    pub post_connect: Duration,
    /// Pause before `personal_sign`.
    pub pre_sign: Duration,
    /// Pause between signing and posting the signature to the backend.
    pub pre_submit: Duration,
    /// Delay before reacting to a `chainChanged` away from the target.
    pub chain_switch_reaction: Duration,
    /// Minimum spacing between two network checks.
    pub network_check_spacing: Duration,
    /// Wait imposed on every provider call after a throttling (4100) error.
    pub throttle_backoff: Duration,
}

impl Default for SessionTiming {
    fn default() -> Self {
        Self {
            pre_connect: Duration::from_millis(500),
            post_connect: Duration::from_millis(500),
            pre_sign: Duration::from_millis(1000),
            pre_submit: Duration::from_millis(500),
            chain_switch_reaction: Duration::from_millis(1500),
            network_check_spacing: Duration::from_millis(2000),
            throttle_backoff: Duration::from_millis(3000),
        }
    }
}

impl SessionTiming {
    /// No delays at all.
    pub fn immediate() -> Self {
        Self {
            pre_connect: Duration::ZERO,
            post_connect: Duration::ZERO,
            pre_sign: Duration::ZERO,
            pre_submit: Duration::ZERO,
            chain_switch_reaction: Duration::ZERO,
            network_check_spacing: Duration::ZERO,
            throttle_backoff: Duration::ZERO,
        }
    }
}

/// Configuration for the matchday client.
#[derive(Debug, Clone)]
pub struct MatchdayConfig {
    /// Base URL of the backend REST API (e.g. `https://api.example.com/api`).
    pub api_base_url: String,
    /// Application name embedded in the sign-in challenge.
    pub app_name: String,
    pub language: Language,
    pub network: NetworkConfig,
    pub timing: SessionTiming,
}

impl MatchdayConfig {
    /// Read the full configuration from `MATCHDAY_*` environment variables.
    pub fn from_env() -> Result<Self> {
        let api_base_url = required_env("MATCHDAY_API_URL")?;
        url::Url::parse(&api_base_url)
            .map_err(|e| MatchdayError::Config(format!("MATCHDAY_API_URL: {e}")))?;

        let language = match std::env::var("MATCHDAY_LANGUAGE") {
            Ok(v) if !v.trim().is_empty() => v.parse()?,
            _ => Language::default(),
        };

        Ok(Self {
            api_base_url,
            app_name: std::env::var("MATCHDAY_APP_NAME").unwrap_or_else(|_| "Matchday".into()),
            language,
            network: NetworkConfig::from_env()?,
            timing: SessionTiming::default(),
        })
    }
}

fn required_env(key: &str) -> Result<String> {
    match std::env::var(key) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(MatchdayError::Config(format!(
            "{key} environment variable is required"
        ))),
    }
}
