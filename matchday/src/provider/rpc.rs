//! Typed wrappers over the raw provider `request` call.

use serde_json::{json, Value};

use super::{ProviderError, WalletProvider};
use crate::session::network::AddChainParams;

/// `eth_requestAccounts` - prompt the user to expose accounts.
pub async fn request_accounts(provider: &dyn WalletProvider) -> Result<Vec<String>, ProviderError> {
    let value = provider.request("eth_requestAccounts", json!([])).await?;
    decode_accounts(value)
}

/// `eth_accounts` - accounts already approved for this origin, no prompt.
pub async fn accounts(provider: &dyn WalletProvider) -> Result<Vec<String>, ProviderError> {
    let value = provider.request("eth_accounts", json!([])).await?;
    decode_accounts(value)
}

/// `eth_chainId` - the wallet's current chain, `0x`-prefixed hex.
pub async fn chain_id(provider: &dyn WalletProvider) -> Result<String, ProviderError> {
    let value = provider.request("eth_chainId", json!([])).await?;
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| ProviderError::Decode(format!("eth_chainId: expected string, got {value}")))
}

/// `wallet_switchEthereumChain`.
pub async fn switch_chain(
    provider: &dyn WalletProvider,
    chain_id: &str,
) -> Result<(), ProviderError> {
    provider
        .request(
            "wallet_switchEthereumChain",
            json!([{ "chainId": chain_id }]),
        )
        .await?;
    Ok(())
}

/// `wallet_addEthereumChain`.
pub async fn add_chain(
    provider: &dyn WalletProvider,
    params: &AddChainParams,
) -> Result<(), ProviderError> {
    let params = serde_json::to_value(params)
        .map_err(|e| ProviderError::Decode(format!("wallet_addEthereumChain params: {e}")))?;
    provider
        .request("wallet_addEthereumChain", Value::Array(vec![params]))
        .await?;
    Ok(())
}

/// `personal_sign` - sign a UTF-8 message with `address`.
pub async fn personal_sign(
    provider: &dyn WalletProvider,
    message: &str,
    address: &str,
) -> Result<String, ProviderError> {
    let value = provider
        .request("personal_sign", json!([message, address]))
        .await?;
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| ProviderError::Decode(format!("personal_sign: expected string, got {value}")))
}

fn decode_accounts(value: Value) -> Result<Vec<String>, ProviderError> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => Ok(s.to_lowercase()),
                other => Err(ProviderError::Decode(format!(
                    "account: expected string, got {other}"
                ))),
            })
            .collect(),
        other => Err(ProviderError::Decode(format!(
            "accounts: expected array, got {other}"
        ))),
    }
}
