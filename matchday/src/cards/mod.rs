//! Reward-card cache.
//!
//! Grants each wallet address a starter pack once per cache lifetime and
//! records which cards were spent on which bet. Both tables live in the
//! shared key-value store under one expiry timestamp: once the last write is
//! older than the retention window every address's pack and every bet record
//! are dropped together.

pub mod catalog;
pub mod effects;

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, Duration, TimeZone, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::Language;
use crate::error::Result;
use crate::storage::KeyValueStore;
use crate::types::UserBet;

pub use catalog::{Catalog, Rarity, RewardCard};
pub use effects::{apply_effects, BetDraft, BetLeg, BetSelection, BetType, CardEffect};

pub const USER_CARDS_KEY: &str = "matchday_user_cards";
pub const CACHE_EXPIRY_KEY: &str = "matchday_cards_expiry";
pub const USED_CARDS_KEY: &str = "matchday_used_cards";

/// Cache retention window.
pub const RETENTION_DAYS: i64 = 30;

/// Source of wall-clock time for expiry decisions.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to. Used to simulate expiry.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Cards held by one address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserCardRecord {
    #[serde(default)]
    pub cards: Vec<RewardCard>,
    /// Milliseconds since the Unix epoch.
    pub last_updated: i64,
}

/// Cards spent on one bet.
///
/// Older records stored a single `card` instead of a `cards` list; both
/// shapes are normalized when read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawUsedCardRecord")]
pub struct UsedCardRecord {
    pub cards: Vec<RewardCard>,
    #[serde(rename = "betDetails")]
    pub bet_snapshot: Value,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    pub used: bool,
}

#[derive(Deserialize)]
struct RawUsedCardRecord {
    #[serde(default)]
    cards: Option<Vec<RewardCard>>,
    #[serde(default)]
    card: Option<RewardCard>,
    #[serde(default, rename = "betDetails", alias = "betSnapshot")]
    bet_snapshot: Value,
    #[serde(default)]
    timestamp: i64,
    #[serde(default = "default_used")]
    used: bool,
}

fn default_used() -> bool {
    true
}

impl From<RawUsedCardRecord> for UsedCardRecord {
    fn from(raw: RawUsedCardRecord) -> Self {
        let cards = match (raw.cards, raw.card) {
            (Some(cards), _) => cards,
            (None, Some(card)) => vec![card],
            (None, None) => Vec::new(),
        };
        Self {
            cards,
            bet_snapshot: raw.bet_snapshot,
            timestamp: raw.timestamp,
            used: raw.used,
        }
    }
}

/// Result of [`RewardCardCache::ensure_user_has_cards`].
#[derive(Debug, Clone, PartialEq)]
pub struct CardGrant {
    pub cards: Vec<RewardCard>,
    /// True when a fresh starter pack was minted by this call.
    pub is_new: bool,
}

/// Per-rarity counts of an address's cards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CardStats {
    pub total: usize,
    pub common: usize,
    pub rare: usize,
    pub legendary: usize,
}

type UserTable = BTreeMap<String, UserCardRecord>;
type UsedTable = BTreeMap<String, BTreeMap<String, UsedCardRecord>>;

pub struct RewardCardCache {
    store: Arc<dyn KeyValueStore>,
    catalog: Arc<Catalog>,
    clock: Arc<dyn Clock>,
    retention: Duration,
    write_lock: Mutex<()>,
}

impl RewardCardCache {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            catalog: Arc::new(Catalog::builtin().clone()),
            clock: Arc::new(SystemClock),
            retention: Duration::days(RETENTION_DAYS),
            write_lock: Mutex::new(()),
        }
    }

    pub fn with_catalog(mut self, catalog: Catalog) -> Self {
        self.catalog = Arc::new(catalog);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    // --- Starter packs ---

    /// One random legendary, rare and common card, in that order. A tier
    /// with no cards in the catalog is skipped.
    pub fn generate_starter_pack(&self, language: Language) -> Vec<RewardCard> {
        self.generate_starter_pack_with(language, &mut rand::thread_rng())
    }

    pub fn generate_starter_pack_with<R: Rng + ?Sized>(
        &self,
        language: Language,
        rng: &mut R,
    ) -> Vec<RewardCard> {
        Rarity::STARTER_ORDER
            .iter()
            .filter_map(|&rarity| self.catalog.random_of_rarity(language, rarity, rng))
            .cloned()
            .collect()
    }

    /// Return the cached cards for `address`, or mint and persist a starter
    /// pack if it has none.
    pub fn ensure_user_has_cards(&self, address: &str, language: Language) -> Result<CardGrant> {
        let key = normalize_address(address);
        let _guard = self.lock_writes();

        let (mut users, used) = self.load_tables()?;
        if let Some(record) = users.get(&key).filter(|r| !r.cards.is_empty()) {
            debug!(address = %key, count = record.cards.len(), "address already holds cards");
            return Ok(CardGrant {
                cards: record.cards.clone(),
                is_new: false,
            });
        }

        let pack = self.generate_starter_pack(language);
        if pack.is_empty() {
            warn!(%language, "card catalog is empty, no starter pack granted");
            return Ok(CardGrant {
                cards: Vec::new(),
                is_new: false,
            });
        }

        append_cards(&mut users, &key, &pack, self.now_ms());
        self.write_tables(&users, &used)?;
        info!(address = %key, cards = ?pack.iter().map(|c| c.id).collect::<Vec<_>>(), "starter pack granted");

        Ok(CardGrant {
            cards: pack,
            is_new: true,
        })
    }

    /// Append `cards` to `address`'s collection.
    pub fn save_cards(&self, address: &str, cards: &[RewardCard]) -> Result<()> {
        let key = normalize_address(address);
        let _guard = self.lock_writes();
        let (mut users, used) = self.load_tables()?;
        append_cards(&mut users, &key, cards, self.now_ms());
        self.write_tables(&users, &used)
    }

    pub fn user_cards(&self, address: &str) -> Result<Option<UserCardRecord>> {
        let (users, _) = self.load_tables()?;
        Ok(users.get(&normalize_address(address)).cloned())
    }

    /// Cards the address can attach to a bet.
    pub fn available_cards(&self, address: &str) -> Result<Vec<RewardCard>> {
        Ok(self
            .user_cards(address)?
            .map(|r| r.cards)
            .unwrap_or_default())
    }

    pub fn has_received_starter_pack(&self, address: &str) -> Result<bool> {
        Ok(!self.available_cards(address)?.is_empty())
    }

    pub fn card_stats(&self, address: &str) -> Result<Option<CardStats>> {
        let Some(record) = self.user_cards(address)? else {
            return Ok(None);
        };

        let mut stats = CardStats {
            total: record.cards.len(),
            ..Default::default()
        };
        for card in &record.cards {
            match card.rarity {
                Rarity::Common => stats.common += 1,
                Rarity::Rare => stats.rare += 1,
                Rarity::Legendary => stats.legendary += 1,
            }
        }
        Ok(Some(stats))
    }

    // --- Bet usage ---

    /// Attach `card` to bet `bet_id`. The first card creates the record with
    /// `bet_snapshot`; later cards are appended unless already present.
    pub fn record_usage<S: Serialize>(
        &self,
        address: &str,
        bet_id: &str,
        card: &RewardCard,
        bet_snapshot: &S,
    ) -> Result<()> {
        let key = normalize_address(address);
        let _guard = self.lock_writes();
        let (users, mut used) = self.load_tables()?;
        let now = self.now_ms();

        let bets = used.entry(key.clone()).or_default();
        match bets.get_mut(bet_id) {
            Some(record) => {
                if record.cards.iter().any(|c| c.id == card.id) {
                    debug!(address = %key, bet_id, card = card.id, "card already recorded for bet");
                    return Ok(());
                }
                record.cards.push(card.clone());
            }
            None => {
                bets.insert(
                    bet_id.to_string(),
                    UsedCardRecord {
                        cards: vec![card.clone()],
                        bet_snapshot: serde_json::to_value(bet_snapshot)?,
                        timestamp: now,
                        used: true,
                    },
                );
            }
        }

        self.write_tables(&users, &used)?;
        info!(address = %key, bet_id, card = %card.name, "card used on bet");
        Ok(())
    }

    /// Every bet record for `address`, keyed by bet id.
    pub fn used_cards(&self, address: &str) -> Result<BTreeMap<String, UsedCardRecord>> {
        let (_, mut used) = self.load_tables()?;
        Ok(used.remove(&normalize_address(address)).unwrap_or_default())
    }

    pub fn used_card_record(&self, address: &str, bet_id: &str) -> Result<Option<UsedCardRecord>> {
        Ok(self.used_cards(address)?.remove(bet_id))
    }

    pub fn is_card_used_in_bet(&self, address: &str, bet_id: &str) -> Result<bool> {
        Ok(self
            .used_card_record(address, bet_id)?
            .is_some_and(|r| r.used))
    }

    /// Cards spent on bet `bet_id`; empty when none were recorded.
    pub fn cards_used_in(&self, address: &str, bet_id: &str) -> Result<Vec<RewardCard>> {
        if bet_id.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self
            .used_card_record(address, bet_id)?
            .map(|r| r.cards)
            .unwrap_or_default())
    }

    /// Cards spent on a placed bet; empty for a bet without an id.
    pub fn cards_used_in_bet(&self, address: &str, bet: &UserBet) -> Result<Vec<RewardCard>> {
        match bet.id.as_deref() {
            Some(bet_id) => self.cards_used_in(address, bet_id),
            None => Ok(Vec::new()),
        }
    }

    // --- Cache lifecycle ---

    /// True while the last write is within the retention window.
    pub fn is_valid(&self) -> Result<bool> {
        let Some(raw) = self.store.get(CACHE_EXPIRY_KEY)? else {
            return Ok(false);
        };
        let Ok(stamp) = raw.trim().parse::<i64>() else {
            warn!(value = %raw, "unreadable card cache timestamp");
            return Ok(false);
        };
        let Some(written) = Utc.timestamp_millis_opt(stamp).single() else {
            return Ok(false);
        };
        Ok(self.clock.now() - written < self.retention)
    }

    /// Drop both tables and the expiry stamp.
    pub fn clear(&self) -> Result<()> {
        let users = self.store.remove(USER_CARDS_KEY);
        let expiry = self.store.remove(CACHE_EXPIRY_KEY);
        let used = self.store.remove(USED_CARDS_KEY);
        users.and(expiry).and(used)
    }

    fn load_tables(&self) -> Result<(UserTable, UsedTable)> {
        if !self.is_valid()? {
            if self.store.get(USER_CARDS_KEY)?.is_some() || self.store.get(USED_CARDS_KEY)?.is_some()
            {
                info!("card cache expired, dropping all cards and bet records");
            }
            self.clear()?;
            return Ok((UserTable::new(), UsedTable::new()));
        }

        let users = match self.store.get(USER_CARDS_KEY)? {
            Some(text) => serde_json::from_str(&text)?,
            None => UserTable::new(),
        };
        let used = match self.store.get(USED_CARDS_KEY)? {
            Some(text) => serde_json::from_str(&text)?,
            None => UsedTable::new(),
        };
        Ok((users, used))
    }

    fn write_tables(&self, users: &UserTable, used: &UsedTable) -> Result<()> {
        self.store
            .set(USER_CARDS_KEY, &serde_json::to_string(users)?)?;
        self.store
            .set(USED_CARDS_KEY, &serde_json::to_string(used)?)?;
        self.store
            .set(CACHE_EXPIRY_KEY, &self.now_ms().to_string())
    }

    fn now_ms(&self) -> i64 {
        self.clock.now().timestamp_millis()
    }

    fn lock_writes(&self) -> std::sync::MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn append_cards(users: &mut UserTable, key: &str, cards: &[RewardCard], now_ms: i64) {
    let record = users.entry(key.to_string()).or_insert(UserCardRecord {
        cards: Vec::new(),
        last_updated: now_ms,
    });
    record.cards.extend_from_slice(cards);
    record.last_updated = now_ms;
}

fn normalize_address(address: &str) -> String {
    address.trim().to_lowercase()
}

/// Deterministic identifier for a set of selections, independent of order.
pub fn generate_bet_id(selections: &[BetSelection]) -> String {
    let mut pairs: Vec<String> = selections
        .iter()
        .map(|s| format!("{}_{}", s.market_id, s.option_id))
        .collect();
    pairs.sort();

    STANDARD
        .encode(pairs.join("|"))
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .take(16)
        .collect()
}
