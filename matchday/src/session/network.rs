//! Target-network helpers: chain-id normalization, the add-chain descriptor,
//! check spacing and the outcome of a verify/switch attempt.

use std::time::Duration;

use serde::Serialize;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::config::NetworkConfig;

/// Normalize a chain id to lowercase `0x`-prefixed hex.
///
/// Accepts decimal (`88882`) or hex (`0x15B32`). Anything unparseable is
/// returned trimmed and lowercased so comparisons still behave.
pub fn format_chain_id(id: &str) -> String {
    let id = id.trim();
    let parsed = match id.strip_prefix("0x").or_else(|| id.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => id.parse::<u64>().ok(),
    };
    match parsed {
        Some(n) => format!("0x{n:x}"),
        None => id.to_lowercase(),
    }
}

pub fn same_chain(a: &str, b: &str) -> bool {
    format_chain_id(a) == format_chain_id(b)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NativeCurrency {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

/// `wallet_addEthereumChain` parameter object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddChainParams {
    pub chain_id: String,
    pub chain_name: String,
    pub rpc_urls: Vec<String>,
    pub native_currency: NativeCurrency,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_explorer_urls: Option<Vec<String>>,
}

impl From<&NetworkConfig> for AddChainParams {
    fn from(network: &NetworkConfig) -> Self {
        Self {
            chain_id: format_chain_id(&network.chain_id),
            chain_name: network.chain_name.clone(),
            rpc_urls: vec![network.rpc_url.clone()],
            native_currency: NativeCurrency {
                name: network.currency_symbol.clone(),
                symbol: network.currency_symbol.clone(),
                decimals: 18,
            },
            block_explorer_urls: network.explorer_url.clone().map(|url| vec![url]),
        }
    }
}

/// Keeps network checks at least `spacing` apart. Early callers are
/// delayed, never rejected.
#[derive(Debug)]
pub struct NetworkCooldown {
    spacing: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl NetworkCooldown {
    pub fn new(spacing: Duration) -> Self {
        Self {
            spacing,
            next_slot: Mutex::new(None),
        }
    }

    /// Reserve the next check slot and sleep until it arrives.
    pub async fn wait(&self) {
        let slot = {
            let mut next = self.next_slot.lock().await;
            let now = Instant::now();
            let slot = match *next {
                Some(at) if at > now => at,
                _ => now,
            };
            *next = Some(slot + self.spacing);
            slot
        };
        tokio::time::sleep_until(slot).await;
    }
}

/// The step of the network flow that produced a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkStep {
    Check,
    Switch,
    Add,
}

/// Result of verifying (and if needed switching to) the target network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkOutcome {
    AlreadyOnTarget,
    Switched,
    /// The chain was unknown to the wallet; it was added and selected.
    Added,
    Rejected(NetworkStep),
    Throttled,
    Failed { step: NetworkStep, message: String },
    NoProvider,
}

impl NetworkOutcome {
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            NetworkOutcome::AlreadyOnTarget | NetworkOutcome::Switched | NetworkOutcome::Added
        )
    }

    pub fn message(&self, chain_name: &str) -> String {
        match self {
            NetworkOutcome::AlreadyOnTarget => format!("Already on {chain_name} network"),
            NetworkOutcome::Switched => "Network switched successfully".into(),
            NetworkOutcome::Added => format!("{chain_name} network added successfully"),
            NetworkOutcome::Rejected(NetworkStep::Add) => {
                format!("User rejected adding {chain_name} network")
            }
            NetworkOutcome::Rejected(_) => "User rejected network switch".into(),
            NetworkOutcome::Throttled => {
                "Too many requests to the wallet. Please wait a few seconds and try again.".into()
            }
            NetworkOutcome::Failed { step, message } => match step {
                NetworkStep::Check => format!("Error verifying network: {message}"),
                NetworkStep::Switch => format!("Error switching to {chain_name} network: {message}"),
                NetworkStep::Add => format!("Error adding {chain_name} network: {message}"),
            },
            NetworkOutcome::NoProvider => "Wallet not found".into(),
        }
    }
}
