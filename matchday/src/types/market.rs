use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketOption {
    pub id: u64,
    #[serde(default)]
    pub market_id: Option<u64>,
    pub label: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, alias = "odd", with = "rust_decimal::serde::float_option")]
    pub odd_value: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Market {
    pub id: u64,
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub match_id: Option<u64>,
    #[serde(default)]
    pub options: Vec<MarketOption>,
}

/// Body for creating or updating a market.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketInput {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub match_id: u64,
}

/// Body for creating or updating a market option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionInput {
    pub market_id: u64,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(with = "rust_decimal::serde::float")]
    pub odd_value: Decimal,
}
