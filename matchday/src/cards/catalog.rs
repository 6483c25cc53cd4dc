//! The static reward-card catalog.
//!
//! One canonical table per language, each indexed by rarity at load time.
//! Every language carries the same card ids with the same rarities; only
//! display strings differ.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::OnceLock;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::Language;
use crate::error::{MatchdayError, Result};

const BUILTIN_CATALOG: &str = include_str!("../../data/cards.json");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    #[serde(alias = "comum")]
    Common,
    #[serde(alias = "rara")]
    Rare,
    #[serde(alias = "lendaria")]
    Legendary,
}

impl Rarity {
    /// Starter-pack order: legendary, rare, common.
    pub const STARTER_ORDER: [Rarity; 3] = [Rarity::Legendary, Rarity::Rare, Rarity::Common];
}

impl fmt::Display for Rarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Rarity::Common => "common",
            Rarity::Rare => "rare",
            Rarity::Legendary => "legendary",
        })
    }
}

/// A reward card. Immutable value type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardCard {
    pub id: u32,
    pub name: String,
    pub description: String,
    pub rarity: Rarity,
    pub image_name: String,
}

#[derive(Debug, Clone)]
struct LocalizedCatalog {
    cards: Vec<RewardCard>,
    by_rarity: HashMap<Rarity, Vec<usize>>,
}

impl LocalizedCatalog {
    fn new(cards: Vec<RewardCard>) -> Self {
        let mut by_rarity: HashMap<Rarity, Vec<usize>> = HashMap::new();
        for (idx, card) in cards.iter().enumerate() {
            by_rarity.entry(card.rarity).or_default().push(idx);
        }
        Self { cards, by_rarity }
    }
}

#[derive(Debug, Clone)]
pub struct Catalog {
    tables: HashMap<Language, LocalizedCatalog>,
}

impl Catalog {
    /// The catalog compiled into the crate.
    pub fn builtin() -> &'static Catalog {
        static CATALOG: OnceLock<Catalog> = OnceLock::new();
        CATALOG.get_or_init(|| {
            // The embedded file is checked by `test_builtin_catalog_loads`.
            Catalog::from_json(BUILTIN_CATALOG).unwrap_or_else(|e| {
                tracing::error!(error = %e, "builtin card catalog is invalid");
                Catalog {
                    tables: HashMap::new(),
                }
            })
        })
    }

    /// Parse a catalog from `{"en": [...], "pt": [...]}`.
    pub fn from_json(text: &str) -> Result<Self> {
        let raw: BTreeMap<Language, Vec<RewardCard>> = serde_json::from_str(text)?;
        Self::from_tables(raw)
    }

    pub fn from_tables(raw: BTreeMap<Language, Vec<RewardCard>>) -> Result<Self> {
        let mut shape: Option<BTreeMap<u32, Rarity>> = None;
        let mut tables = HashMap::new();

        for (language, cards) in raw {
            let mut ids = BTreeMap::new();
            for card in &cards {
                if ids.insert(card.id, card.rarity).is_some() {
                    return Err(MatchdayError::Validation(format!(
                        "duplicate card id {} in {language} catalog",
                        card.id
                    )));
                }
            }

            match &shape {
                None => shape = Some(ids),
                Some(expected) if *expected != ids => {
                    return Err(MatchdayError::Validation(format!(
                        "{language} catalog does not match the other languages"
                    )));
                }
                Some(_) => {}
            }

            tables.insert(language, LocalizedCatalog::new(cards));
        }

        Ok(Self { tables })
    }

    fn table(&self, language: Language) -> Option<&LocalizedCatalog> {
        self.tables
            .get(&language)
            .or_else(|| self.tables.get(&Language::En))
    }

    /// All cards for `language`, falling back to English.
    pub fn cards(&self, language: Language) -> &[RewardCard] {
        self.table(language).map_or(&[], |t| t.cards.as_slice())
    }

    pub fn by_rarity(&self, language: Language, rarity: Rarity) -> Vec<&RewardCard> {
        let Some(table) = self.table(language) else {
            return Vec::new();
        };
        table
            .by_rarity
            .get(&rarity)
            .map(|idxs| idxs.iter().map(|&i| &table.cards[i]).collect())
            .unwrap_or_default()
    }

    pub fn find(&self, language: Language, id: u32) -> Option<&RewardCard> {
        self.cards(language).iter().find(|c| c.id == id)
    }

    /// Uniformly pick one card of `rarity`.
    pub fn random_of_rarity<R: Rng + ?Sized>(
        &self,
        language: Language,
        rarity: Rarity,
        rng: &mut R,
    ) -> Option<&RewardCard> {
        let table = self.table(language)?;
        let idx = table.by_rarity.get(&rarity)?.choose(rng)?;
        table.cards.get(*idx)
    }
}
