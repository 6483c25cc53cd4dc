//! Bet drafts and the card effects folded onto them.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::catalog::RewardCard;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BetType {
    Single,
    Multiple,
}

/// Match phase up to which a card-granted action stays available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPhase {
    FirstHalf,
    SecondHalf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsuranceKind {
    FullRefund,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Insurance {
    #[serde(rename = "type")]
    pub kind: InsuranceKind,
    pub description: String,
}

/// One selected option within a bet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BetLeg {
    pub option_id: u64,
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    pub odd_value: Decimal,
}

/// A selection made on the betting screen, before it becomes a leg.
#[derive(Debug, Clone, PartialEq)]
pub struct BetSelection {
    pub match_id: u64,
    pub market_id: u64,
    pub option_id: u64,
    pub odd: Decimal,
}

/// The in-progress bet payload, as posted to `/user-bet`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BetDraft {
    #[serde(with = "rust_decimal::serde::float")]
    pub bet_amount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_odds: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub potential_payout: Decimal,
    pub match_id: u64,
    pub bet_type: BetType,
    #[serde(default)]
    pub details: Vec<BetLeg>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insurance: Option<Insurance>,
    #[serde(rename = "canChangeOdds", default, skip_serializing_if = "is_false")]
    pub can_change_odds: bool,
    #[serde(rename = "changeOddsUntil", default, skip_serializing_if = "Option::is_none")]
    pub change_odds_until: Option<MatchPhase>,
    #[serde(
        rename = "repMultiplier",
        default,
        skip_serializing_if = "Option::is_none",
        with = "rust_decimal::serde::float_option"
    )]
    pub rep_multiplier: Option<Decimal>,
    #[serde(rename = "allowOneMiss", default, skip_serializing_if = "is_false")]
    pub allow_one_miss: bool,
    #[serde(rename = "marginOfError", default, skip_serializing_if = "is_zero")]
    pub margin_of_error: u32,
}

fn is_false(v: &bool) -> bool {
    !*v
}

fn is_zero(v: &u32) -> bool {
    *v == 0
}

impl BetDraft {
    /// Build a draft from selections: odds multiply, payout is rounded to
    /// cents, and more than one selection makes it a multiple.
    pub fn from_selections(match_id: u64, bet_amount: Decimal, selections: &[BetSelection]) -> Self {
        let total_odds = if selections.is_empty() {
            Decimal::ZERO
        } else {
            selections.iter().fold(Decimal::ONE, |acc, s| acc * s.odd)
        };

        let potential_payout = if bet_amount <= Decimal::ZERO {
            Decimal::ZERO
        } else {
            (bet_amount * total_odds).round_dp(2)
        };

        Self {
            bet_amount,
            total_odds,
            potential_payout,
            match_id,
            bet_type: if selections.len() > 1 {
                BetType::Multiple
            } else {
                BetType::Single
            },
            details: selections
                .iter()
                .map(|s| BetLeg {
                    option_id: s.option_id,
                    odd_value: s.odd,
                })
                .collect(),
            insurance: None,
            can_change_odds: false,
            change_odds_until: None,
            rep_multiplier: None,
            allow_one_miss: false,
            margin_of_error: 0,
        }
    }

    /// Reward multiplier in effect (1 when no card touched it).
    pub fn effective_rep_multiplier(&self) -> Decimal {
        self.rep_multiplier.unwrap_or(Decimal::ONE)
    }
}

/// The gameplay effect a card grants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardEffect {
    NoRisk,
    LastChance,
    ExtraRecognition,
    Dribble,
    MarginOfError,
}

impl CardEffect {
    /// Resolve a card name in any catalog language.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "No Risk" | "Sem Risco" => Some(CardEffect::NoRisk),
            "Last Chance" | "Última Chance" => Some(CardEffect::LastChance),
            "Extra Recognition" | "Reconhecimento Extra" => Some(CardEffect::ExtraRecognition),
            "Dribble" | "Drible" => Some(CardEffect::Dribble),
            "Margin of Error" | "Margem de Erro" => Some(CardEffect::MarginOfError),
            _ => None,
        }
    }

    pub fn apply(self, draft: &mut BetDraft) {
        match self {
            CardEffect::NoRisk => {
                draft.insurance = Some(Insurance {
                    kind: InsuranceKind::FullRefund,
                    description: "Refunds 100% of the stake if the bet is lost".into(),
                });
            }
            CardEffect::LastChance => {
                draft.can_change_odds = true;
                draft.change_odds_until = Some(MatchPhase::SecondHalf);
            }
            CardEffect::ExtraRecognition => {
                draft.rep_multiplier =
                    Some(draft.effective_rep_multiplier() * Decimal::new(15, 1));
            }
            CardEffect::Dribble => {
                if draft.bet_type == BetType::Multiple {
                    draft.allow_one_miss = true;
                }
            }
            CardEffect::MarginOfError => {
                draft.margin_of_error += 1;
            }
        }
    }
}

/// Fold every card's effect onto a copy of `draft`, in the order given.
/// Unknown cards are skipped.
pub fn apply_effects(cards: &[RewardCard], draft: &BetDraft) -> BetDraft {
    let mut out = draft.clone();
    for card in cards {
        match CardEffect::from_name(&card.name) {
            Some(effect) => effect.apply(&mut out),
            None => tracing::debug!(card = %card.name, "card has no bet effect"),
        }
    }
    out
}
