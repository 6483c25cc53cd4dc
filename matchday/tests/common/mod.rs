//! Shared fixtures: a scripted wallet provider and session wiring.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::broadcast;

use matchday::notify::{ChannelNotifier, Notice};
use matchday::provider::{ProviderError, ProviderEvent, WalletProvider};
use matchday::{
    KeyValueStore, Language, MatchdayConfig, MemoryStore, NetworkConfig, SessionTiming,
    WalletSession,
};

pub const TARGET_CHAIN: &str = "0x15b32";
pub const OTHER_CHAIN: &str = "0x1";
pub const ADDRESS: &str = "0xabc";

type Reply = Result<Value, ProviderError>;

/// In-process provider with per-method scripted replies.
///
/// Queued replies are consumed first; after that the method's default reply
/// is returned. Every request is logged.
pub struct FakeProvider {
    queued: Mutex<HashMap<String, VecDeque<Reply>>>,
    defaults: Mutex<HashMap<String, Reply>>,
    calls: Mutex<Vec<(String, Value)>>,
    latency: Mutex<Duration>,
    events: broadcast::Sender<ProviderEvent>,
}

impl FakeProvider {
    /// A wallet with one approved account, already on the target chain.
    pub fn new() -> Arc<Self> {
        let (events, _) = broadcast::channel(16);
        let provider = Arc::new(Self {
            queued: Mutex::new(HashMap::new()),
            defaults: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            latency: Mutex::new(Duration::ZERO),
            events,
        });
        provider.set("eth_requestAccounts", Ok(json!(["0xABC"])));
        provider.set("eth_accounts", Ok(json!([ADDRESS])));
        provider.set("eth_chainId", Ok(json!(TARGET_CHAIN)));
        provider.set("wallet_switchEthereumChain", Ok(Value::Null));
        provider.set("wallet_addEthereumChain", Ok(Value::Null));
        provider.set("personal_sign", Ok(json!("0xsigned")));
        provider
    }

    pub fn set(&self, method: &str, reply: Reply) {
        self.defaults
            .lock()
            .unwrap()
            .insert(method.to_string(), reply);
    }

    pub fn push(&self, method: &str, reply: Reply) {
        self.queued
            .lock()
            .unwrap()
            .entry(method.to_string())
            .or_default()
            .push_back(reply);
    }

    pub fn fail(&self, method: &str, code: i64) {
        self.set(method, Err(ProviderError::rpc(code, "scripted failure")));
    }

    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock().unwrap() = latency;
    }

    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, method: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(m, _)| m == method)
            .count()
    }

    pub fn emit(&self, event: ProviderEvent) {
        let _ = self.events.send(event);
    }
}

#[async_trait]
impl WalletProvider for FakeProvider {
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError> {
        self.calls
            .lock()
            .unwrap()
            .push((method.to_string(), params));

        let latency = *self.latency.lock().unwrap();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let queued = self
            .queued
            .lock()
            .unwrap()
            .get_mut(method)
            .and_then(VecDeque::pop_front);
        if let Some(reply) = queued {
            return reply;
        }

        self.defaults
            .lock()
            .unwrap()
            .get(method)
            .cloned()
            .unwrap_or_else(|| Err(ProviderError::rpc(-32601, format!("{method} not scripted"))))
    }

    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent> {
        self.events.subscribe()
    }
}

pub fn config(api_base_url: &str) -> MatchdayConfig {
    MatchdayConfig {
        api_base_url: api_base_url.to_string(),
        app_name: "Matchday".into(),
        language: Language::En,
        network: NetworkConfig {
            chain_id: "88882".into(),
            chain_name: "Chiliz Spicy".into(),
            rpc_url: "https://spicy-rpc.chiliz.com".into(),
            currency_symbol: "CHZ".into(),
            explorer_url: None,
        },
        timing: SessionTiming::immediate(),
    }
}

pub struct Harness {
    pub session: WalletSession,
    pub provider: Arc<FakeProvider>,
    pub store: Arc<MemoryStore>,
    pub notices: tokio::sync::mpsc::UnboundedReceiver<Notice>,
}

impl Harness {
    pub fn new(api_base_url: &str) -> Self {
        Self::with_store(api_base_url, Arc::new(MemoryStore::new()))
    }

    pub fn with_store(api_base_url: &str, store: Arc<MemoryStore>) -> Self {
        let provider = FakeProvider::new();
        let (notifier, notices) = ChannelNotifier::new();
        let session = WalletSession::builder(config(api_base_url), store.clone() as Arc<dyn KeyValueStore>)
            .provider(provider.clone())
            .notifier(Arc::new(notifier))
            .build();
        Self {
            session,
            provider,
            store,
            notices,
        }
    }

    /// Every notice emitted so far.
    pub fn drain_notices(&mut self) -> Vec<Notice> {
        let mut out = Vec::new();
        while let Ok(notice) = self.notices.try_recv() {
            out.push(notice);
        }
        out
    }

    pub fn failure_notices(&mut self) -> Vec<Notice> {
        self.drain_notices()
            .into_iter()
            .filter(Notice::is_failure)
            .collect()
    }
}
