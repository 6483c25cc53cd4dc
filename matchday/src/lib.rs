pub mod cards;
pub mod config;
pub mod error;
pub mod notify;
pub mod provider;
pub mod rest;
pub mod session;
pub mod storage;
pub mod types;

// ---- Top-level re-exports for ergonomic usage ----

// Session
pub use session::{
    RegistrationStatus, SessionState, SignatureOutcome, Signer, WalletSession,
    WalletSessionBuilder,
};
pub use session::network::{NetworkOutcome, NetworkStep};

// Config + errors
pub use config::{Language, MatchdayConfig, NetworkConfig, SessionTiming};
pub use error::{MatchdayError, Result};

// Provider
pub use provider::{EventBridge, HttpProvider, ProviderError, ProviderEvent, WalletProvider};

// Cards
pub use cards::{
    apply_effects, generate_bet_id, BetDraft, BetSelection, CardGrant, CardStats, Catalog,
    Rarity, RewardCard, RewardCardCache, UsedCardRecord, UserCardRecord,
};

// Storage
pub use storage::{CredentialStore, Credentials, FileStore, KeyValueStore, MemoryStore};

// Notices
pub use notify::{ChannelNotifier, Notice, NoticeLevel, Notifier, TracingNotifier};

// REST client
pub use rest::ApiClient;
