use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChipBalance {
    pub balance: Decimal,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChipTransaction {
    #[serde(default, deserialize_with = "super::string_or_number")]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    pub amount: Decimal,
    #[serde(default)]
    pub reference_type: Option<String>,
    #[serde(default, deserialize_with = "super::string_or_number")]
    pub reference_id: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChipStats {
    #[serde(flatten)]
    pub fields: BTreeMap<String, Value>,
}
