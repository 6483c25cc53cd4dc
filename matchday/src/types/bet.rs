use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::cards::{BetLeg, BetType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BetStatus {
    Pending,
    Won,
    Lost,
    Cancelled,
    #[serde(other)]
    Unknown,
}

/// A placed bet as returned by `/user-bet`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserBet {
    #[serde(default, deserialize_with = "super::string_or_number")]
    pub id: Option<String>,
    pub match_id: u64,
    pub bet_type: BetType,
    pub bet_amount: Decimal,
    pub total_odds: Decimal,
    pub potential_payout: Decimal,
    pub status: BetStatus,
    #[serde(default)]
    pub details: Vec<BetLeg>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Aggregates from `GET /user-bet/my-stats`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BetStats {
    pub total: u64,
    pub pending: u64,
    pub won: u64,
    pub lost: u64,
    #[serde(alias = "totalStaked")]
    pub total_staked: Decimal,
    #[serde(alias = "totalWon")]
    pub total_won: Decimal,
}

/// Body of `POST /user-bet/:id/cancel`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelBet {
    pub reason: String,
}
