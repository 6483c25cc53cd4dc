//! Wallet session: connection, target-network enforcement and
//! signature-based sign-in against an injected wallet provider.
//!
//! Operations never fail with an error. Each returns a structured outcome and
//! reports a failure to the [`Notifier`] exactly once. All state changes flow
//! through [`SessionState::reduce`] and are published on a watch channel.

pub mod flight;
pub mod network;
pub mod state;

use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cards::{RewardCard, RewardCardCache};
use crate::config::MatchdayConfig;
use crate::error::MatchdayError;
use crate::notify::{Notice, Notifier, TracingNotifier};
use crate::provider::{rpc, ProviderError, ProviderEvent, ProviderEventSubscription, WalletProvider};
use crate::rest::ApiClient;
use crate::storage::{CredentialStore, KeyValueStore};
use crate::types::{SignatureRequest, WalletCheck};

pub use flight::SingleFlight;
pub use network::{
    format_chain_id, same_chain, AddChainParams, NetworkCooldown, NetworkOutcome, NetworkStep,
};
pub use state::{BusyFlag, Effect, SessionEvent, SessionState};

/// Account polls made by [`WalletSession::connect_and_check_registration`].
const ACCOUNT_POLL_ATTEMPTS: u32 = 3;

/// The challenge signed to prove control of `address`.
pub fn challenge_message(app_name: &str, address: &str) -> String {
    format!("{app_name} wallet validation: {address}")
}

/// Result of [`WalletSession::request_signature`].
#[derive(Debug, Clone, PartialEq)]
pub enum SignatureOutcome {
    Authenticated {
        /// The backend created the account on this sign-in.
        new_user: bool,
        /// Cards announced to the user on this sign-in; empty unless a pack
        /// was just granted or the user is new.
        welcome_cards: Vec<RewardCard>,
    },
    /// The user declined to sign.
    Cancelled,
    /// The provider throttled a request; back off before retrying.
    SpamBlocked,
    Failed(String),
}

impl SignatureOutcome {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, SignatureOutcome::Authenticated { .. })
    }
}

/// Result of [`WalletSession::connect_and_check_registration`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationStatus {
    AlreadyAuthenticated,
    Registered { address: String },
    NeedsRegistration { address: String },
    NeedsNetworkChange(String),
    Failed(String),
}

/// Signing handle for one account.
#[derive(Clone)]
pub struct Signer {
    address: String,
    provider: Arc<dyn WalletProvider>,
}

impl Signer {
    pub fn address(&self) -> &str {
        &self.address
    }

    /// `personal_sign` over `message`.
    pub async fn sign_message(&self, message: &str) -> Result<String, ProviderError> {
        rpc::personal_sign(self.provider.as_ref(), message, &self.address).await
    }
}

impl fmt::Debug for Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signer")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

pub struct WalletSessionBuilder {
    config: MatchdayConfig,
    store: Arc<dyn KeyValueStore>,
    provider: Option<Arc<dyn WalletProvider>>,
    notifier: Option<Arc<dyn Notifier>>,
    cards: Option<RewardCardCache>,
}

impl WalletSessionBuilder {
    pub fn provider(mut self, provider: Arc<dyn WalletProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Use `cards` instead of a cache over the session's store.
    pub fn card_cache(mut self, cards: RewardCardCache) -> Self {
        self.cards = Some(cards);
        self
    }

    pub fn build(self) -> WalletSession {
        let notifier = self
            .notifier
            .unwrap_or_else(|| Arc::new(TracingNotifier::new(self.config.language)));
        let cards = self
            .cards
            .unwrap_or_else(|| RewardCardCache::new(self.store.clone()));
        let (state, _) = watch::channel(SessionState::default());

        WalletSession {
            inner: Arc::new(Inner {
                api: ApiClient::new(&self.config.api_base_url),
                cooldown: NetworkCooldown::new(self.config.timing.network_check_spacing),
                credentials: CredentialStore::new(self.store),
                cards: Arc::new(cards),
                provider: self.provider,
                notifier,
                state,
                throttled_until: Mutex::new(None),
                signer: Mutex::new(None),
                connect_flight: SingleFlight::new("connect"),
                sign_flight: SingleFlight::new("sign"),
                config: self.config,
            }),
        }
    }
}

/// Process-wide wallet session. Cheap to clone.
#[derive(Clone)]
pub struct WalletSession {
    inner: Arc<Inner>,
}

impl WalletSession {
    pub fn builder(config: MatchdayConfig, store: Arc<dyn KeyValueStore>) -> WalletSessionBuilder {
        WalletSessionBuilder {
            config,
            store,
            provider: None,
            notifier: None,
            cards: None,
        }
    }

    pub fn config(&self) -> &MatchdayConfig {
        &self.inner.config
    }

    /// Current state snapshot.
    pub fn state(&self) -> SessionState {
        self.inner.snapshot()
    }

    /// Subscribe to state changes.
    pub fn watch(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    pub fn cards(&self) -> &RewardCardCache {
        &self.inner.cards
    }

    pub fn signer(&self) -> Option<Signer> {
        lock(&self.inner.signer).clone()
    }

    /// A backend client carrying the current bearer token, if any.
    pub fn api(&self) -> ApiClient {
        self.inner.api.with_token(self.state().token)
    }

    /// Restore persisted credentials, or adopt an already-approved account.
    pub async fn initialize(&self) -> SessionState {
        self.inner.initialize().await;
        self.state()
    }

    /// Request accounts from the provider and check the network.
    ///
    /// Returns true when an account was obtained; network failures are
    /// reported but do not fail the connection. Concurrent callers share one
    /// provider request and its result.
    pub async fn connect(&self) -> bool {
        let inner = Arc::clone(&self.inner);
        self.inner
            .connect_flight
            .run(move || async move { inner.connect().await })
            .await
    }

    /// Make sure the wallet is on the target network, switching (and adding
    /// the network) when needed. Does not notify.
    pub async fn verify_and_switch_network(&self) -> NetworkOutcome {
        self.inner.verify_and_switch_network().await
    }

    /// Read the wallet's chain and update `is_on_required_network`.
    pub async fn check_network(&self) -> bool {
        self.inner.check_network().await
    }

    /// Check, then switch if needed, retrying the check once after a
    /// throttle backoff. Reports the outcome.
    pub async fn ensure_network(&self) -> NetworkOutcome {
        self.inner.ensure_network().await
    }

    /// Sign the challenge for `address` (or the session's address) and
    /// exchange it for a backend token. Concurrent callers share one
    /// signature request and its result.
    pub async fn request_signature(&self, address: Option<&str>) -> SignatureOutcome {
        let Some(address) = self.inner.resolve_address(address) else {
            self.inner.notify(Notice::NoWallet);
            return SignatureOutcome::Failed("No wallet connected".into());
        };

        let inner = Arc::clone(&self.inner);
        self.inner
            .sign_flight
            .run(move || async move { inner.sign(address).await })
            .await
    }

    /// Sign-in for a wallet that is not registered yet. The backend creates
    /// the account on first signature.
    pub async fn register_with_signature(&self, address: Option<&str>) -> SignatureOutcome {
        self.request_signature(address).await
    }

    /// Forget credentials and reset the session. The provider itself stays
    /// connected; `is_authenticated` is the only authority afterwards.
    pub fn disconnect(&self) {
        self.inner.apply(SessionEvent::Disconnected);
        info!("session disconnected");
    }

    /// The session address, polling `eth_accounts` up to `max_attempts`
    /// times `delay` apart when none is known yet.
    pub async fn ensure_account_available(
        &self,
        max_attempts: u32,
        delay: Duration,
    ) -> Option<String> {
        self.inner
            .ensure_account_available(max_attempts, delay)
            .await
    }

    /// Whether `address` (or the session's address) is registered.
    pub async fn check_wallet_exists(&self, address: Option<&str>) -> WalletCheck {
        self.inner.check_wallet_exists(address).await
    }

    /// Profile of the signed-in user. A rejected token clears credentials.
    pub async fn user_profile(&self) -> Option<Value> {
        self.inner.user_profile().await
    }

    /// Connect, verify the network and look up whether the wallet is
    /// registered.
    pub async fn connect_and_check_registration(&self) -> RegistrationStatus {
        if !self.connect().await {
            return RegistrationStatus::Failed("Failed to connect wallet".into());
        }

        if self.state().is_authenticated {
            return RegistrationStatus::AlreadyAuthenticated;
        }

        if !self.state().is_on_required_network {
            let network = self.inner.verify_and_switch_network().await;
            if !network.is_success() {
                return RegistrationStatus::NeedsNetworkChange(
                    network.message(&self.inner.config.network.chain_name),
                );
            }
        }

        let poll_delay = self.inner.config.timing.post_connect;
        let Some(address) = self
            .ensure_account_available(ACCOUNT_POLL_ATTEMPTS, poll_delay)
            .await
        else {
            self.inner.notify(Notice::NoWallet);
            return RegistrationStatus::Failed("No wallet connected".into());
        };

        let check = self.check_wallet_exists(Some(&address)).await;
        if !check.success {
            let message = check
                .message
                .unwrap_or_else(|| "Error checking registration".into());
            self.inner
                .notify(Notice::RegistrationCheckFailed(message.clone()));
            return RegistrationStatus::Failed(message);
        }

        if check.exists {
            RegistrationStatus::Registered { address }
        } else {
            RegistrationStatus::NeedsRegistration { address }
        }
    }

    /// Feed one provider event into the session. Returns the network switch
    /// task when the event moved the wallet off the target network.
    pub fn handle_provider_event(&self, event: ProviderEvent) -> Option<JoinHandle<NetworkOutcome>> {
        debug!(?event, "provider event");
        self.inner.dispatch(SessionEvent::Provider(event))
    }

    /// Drive provider events into the session until `cancel` fires.
    pub fn spawn_event_listener(&self, cancel: CancellationToken) -> Option<JoinHandle<()>> {
        let provider = self.inner.provider.clone()?;
        let mut events = ProviderEventSubscription::new(provider.subscribe());
        let session = self.clone();

        Some(tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        debug!("provider event listener stopped");
                        break;
                    }
                    event = events.next() => match event {
                        Some(event) => {
                            let _ = session.handle_provider_event(event);
                        }
                        None => {
                            warn!("provider event stream closed");
                            break;
                        }
                    }
                }
            }
        }))
    }
}

struct Inner {
    config: MatchdayConfig,
    provider: Option<Arc<dyn WalletProvider>>,
    credentials: CredentialStore,
    cards: Arc<RewardCardCache>,
    api: ApiClient,
    notifier: Arc<dyn Notifier>,
    state: watch::Sender<SessionState>,
    cooldown: NetworkCooldown,
    throttled_until: Mutex<Option<Instant>>,
    signer: Mutex<Option<Signer>>,
    connect_flight: SingleFlight<bool>,
    sign_flight: SingleFlight<SignatureOutcome>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Raises a busy flag for its lifetime.
struct BusyGuard<'a> {
    inner: &'a Inner,
    flag: BusyFlag,
}

impl<'a> BusyGuard<'a> {
    fn new(inner: &'a Inner, flag: BusyFlag) -> Self {
        inner.apply(SessionEvent::Busy { flag, active: true });
        Self { inner, flag }
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.inner.apply(SessionEvent::Busy {
            flag: self.flag,
            active: false,
        });
    }
}

fn network_failure(step: NetworkStep, e: &ProviderError) -> NetworkOutcome {
    warn!(?step, error = %e, "network step failed");
    if e.is_user_rejected() {
        NetworkOutcome::Rejected(step)
    } else if e.is_throttled() {
        NetworkOutcome::Throttled
    } else {
        NetworkOutcome::Failed {
            step,
            message: e.message(),
        }
    }
}

impl Inner {
    fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    fn notify(&self, notice: Notice) {
        self.notifier.notify(notice);
    }

    /// Reduce `event` into the published state and run the effects that
    /// need no task. Remaining effects are returned.
    fn apply(&self, event: SessionEvent) -> Vec<Effect> {
        let target = self.config.network.chain_id.as_str();
        let mut effects = Vec::new();
        self.state
            .send_modify(|state| effects = state.reduce(event, target));

        effects.retain(|effect| match effect {
            Effect::ClearCredentials => {
                self.clear_credentials();
                false
            }
            Effect::SwitchNetwork => true,
        });
        effects
    }

    fn dispatch(self: &Arc<Self>, event: SessionEvent) -> Option<JoinHandle<NetworkOutcome>> {
        let mut task = None;
        for effect in self.apply(event) {
            if effect == Effect::SwitchNetwork {
                let inner = Arc::clone(self);
                task = Some(tokio::spawn(async move {
                    tokio::time::sleep(inner.config.timing.chain_switch_reaction).await;
                    let outcome = inner.verify_and_switch_network().await;
                    inner.report_network(&outcome);
                    outcome
                }));
            }
        }
        task
    }

    fn clear_credentials(&self) {
        if let Err(e) = self.credentials.clear() {
            warn!(error = %e, "failed to clear persisted credentials");
        }
        lock(&self.signer).take();
    }

    fn resolve_address(&self, address: Option<&str>) -> Option<String> {
        address
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(str::to_lowercase)
            .or_else(|| self.snapshot().address)
    }

    /// Reuse the signer for `address`, or create one.
    fn ensure_signer(&self, address: &str) -> Option<Signer> {
        let provider = self.provider.clone()?;
        let mut slot = lock(&self.signer);
        if let Some(signer) = slot.as_ref().filter(|s| s.address == address) {
            return Some(signer.clone());
        }
        debug!(%address, "signer created");
        let signer = Signer {
            address: address.to_string(),
            provider,
        };
        *slot = Some(signer.clone());
        Some(signer)
    }

    /// Run one provider request, waiting out any throttle backoff first and
    /// starting a new one if the provider throttles this request.
    async fn call<T>(
        &self,
        request: impl Future<Output = Result<T, ProviderError>>,
    ) -> Result<T, ProviderError> {
        let until = *lock(&self.throttled_until);
        if let Some(until) = until.filter(|u| *u > Instant::now()) {
            debug!("waiting out provider throttle backoff");
            tokio::time::sleep_until(until).await;
        }

        let out = request.await;
        if let Err(e) = &out {
            if e.is_throttled() {
                let backoff = self.config.timing.throttle_backoff;
                warn!(?backoff, "provider throttled, backing off");
                *lock(&self.throttled_until) = Some(Instant::now() + backoff);
            }
        }
        out
    }

    fn report_network(&self, outcome: &NetworkOutcome) {
        match outcome {
            NetworkOutcome::AlreadyOnTarget => {}
            NetworkOutcome::Switched | NetworkOutcome::Added => {
                self.notify(Notice::NetworkConnected {
                    chain_name: self.config.network.chain_name.clone(),
                });
            }
            NetworkOutcome::NoProvider => self.notify(Notice::ProviderMissing),
            NetworkOutcome::Throttled => self.notify(Notice::Throttled),
            other => self.notify(Notice::NetworkFailed(
                other.message(&self.config.network.chain_name),
            )),
        }
    }

    async fn connect(&self) -> bool {
        let Some(provider) = self.provider.as_deref() else {
            self.notify(Notice::ProviderMissing);
            return false;
        };
        let _busy = BusyGuard::new(self, BusyFlag::Connecting);

        tokio::time::sleep(self.config.timing.pre_connect).await;
        let accounts = match self.call(rpc::request_accounts(provider)).await {
            Ok(accounts) => accounts,
            Err(e) => {
                warn!(error = %e, "account request failed");
                self.notify(if e.is_user_rejected() {
                    Notice::ConnectionRejected
                } else if e.is_throttled() {
                    Notice::Throttled
                } else {
                    Notice::ConnectionFailed(e.message())
                });
                return false;
            }
        };

        let Some(address) = accounts.first().cloned() else {
            self.notify(Notice::NoAccount);
            return false;
        };
        self.apply(SessionEvent::AccountsObtained(accounts));
        self.ensure_signer(&address);
        info!(%address, "wallet connected");

        tokio::time::sleep(self.config.timing.post_connect).await;
        let outcome = self.verify_and_switch_network().await;
        self.report_network(&outcome);
        true
    }

    async fn verify_and_switch_network(&self) -> NetworkOutcome {
        let Some(provider) = self.provider.as_deref() else {
            return NetworkOutcome::NoProvider;
        };
        let _busy = BusyGuard::new(self, BusyFlag::SwitchingNetwork);
        self.cooldown.wait().await;

        let target = format_chain_id(&self.config.network.chain_id);
        let current = match self.call(rpc::chain_id(provider)).await {
            Ok(id) => id,
            Err(e) => return network_failure(NetworkStep::Check, &e),
        };

        if same_chain(&current, &target) {
            self.apply(SessionEvent::NetworkChecked { on_target: true });
            return NetworkOutcome::AlreadyOnTarget;
        }
        self.apply(SessionEvent::NetworkChecked { on_target: false });
        info!(%current, %target, "switching wallet network");

        let outcome = match self.call(rpc::switch_chain(provider, &target)).await {
            Ok(()) => NetworkOutcome::Switched,
            Err(e) if e.is_unknown_chain() => {
                info!(chain = %self.config.network.chain_name, "network unknown to wallet, adding it");
                let params = AddChainParams::from(&self.config.network);
                match self.call(rpc::add_chain(provider, &params)).await {
                    Ok(()) => match self.call(rpc::switch_chain(provider, &target)).await {
                        Ok(()) => NetworkOutcome::Added,
                        Err(e) => network_failure(NetworkStep::Switch, &e),
                    },
                    Err(e) => network_failure(NetworkStep::Add, &e),
                }
            }
            Err(e) => network_failure(NetworkStep::Switch, &e),
        };

        if outcome.is_success() {
            self.apply(SessionEvent::NetworkChecked { on_target: true });
        }
        outcome
    }

    async fn check_network(&self) -> bool {
        let Some(provider) = self.provider.as_deref() else {
            return false;
        };
        self.cooldown.wait().await;

        match self.call(rpc::chain_id(provider)).await {
            Ok(id) => {
                let on_target = same_chain(&id, &self.config.network.chain_id);
                self.apply(SessionEvent::NetworkChecked { on_target });
                on_target
            }
            Err(e) => {
                warn!(error = %e, "network check failed");
                false
            }
        }
    }

    async fn ensure_network(&self) -> NetworkOutcome {
        if self.check_network().await {
            return NetworkOutcome::AlreadyOnTarget;
        }

        let mut outcome = self.verify_and_switch_network().await;
        if outcome == NetworkOutcome::Throttled && self.check_network().await {
            outcome = NetworkOutcome::Switched;
        }
        self.report_network(&outcome);
        outcome
    }

    async fn sign(&self, address: String) -> SignatureOutcome {
        if self.provider.is_none() {
            self.notify(Notice::ProviderMissing);
            return SignatureOutcome::Failed("Wallet not found".into());
        }
        let _busy = BusyGuard::new(self, BusyFlag::Signing);
        let started = self.snapshot();

        let network = self.verify_and_switch_network().await;
        if !network.is_success() {
            self.report_network(&network);
            return match network {
                NetworkOutcome::Throttled => SignatureOutcome::SpamBlocked,
                other => SignatureOutcome::Failed(other.message(&self.config.network.chain_name)),
            };
        }

        self.notify(Notice::SignaturePrompt);
        tokio::time::sleep(self.config.timing.pre_sign).await;

        let message = challenge_message(&self.config.app_name, &address);
        let Some(signer) = self.ensure_signer(&address) else {
            self.notify(Notice::ProviderMissing);
            return SignatureOutcome::Failed("Wallet not found".into());
        };
        let signature = match self.call(signer.sign_message(&message)).await {
            Ok(signature) => signature,
            Err(e) if e.is_user_rejected() => {
                info!(%address, "signature declined");
                self.notify(Notice::SignatureCancelled);
                return SignatureOutcome::Cancelled;
            }
            Err(e) if e.is_throttled() => {
                self.notify(Notice::Throttled);
                return SignatureOutcome::SpamBlocked;
            }
            Err(e) => {
                warn!(error = %e, "signature request failed");
                self.notify(Notice::SignatureFailed);
                return SignatureOutcome::Failed(e.message());
            }
        };

        tokio::time::sleep(self.config.timing.pre_submit).await;
        let request = SignatureRequest {
            address: address.clone(),
            message,
            signature,
        };
        let response = match self.api.validate_signature(&request).await {
            Ok(response) => response,
            Err(e) => {
                let message = e.backend_message().unwrap_or_else(|| e.to_string());
                warn!(error = %e, "signature validation request failed");
                self.notify(Notice::LoginFailed(message.clone()));
                return SignatureOutcome::Failed(message);
            }
        };

        let server_message = response.message.clone();
        let validation = response.into_content();
        if !validation.success {
            let message = server_message.unwrap_or_else(|| "Unknown error".into());
            self.notify(Notice::ValidationFailed(message.clone()));
            return SignatureOutcome::Failed(message);
        }
        let Some(token) = validation.token.filter(|t| !t.is_empty()) else {
            self.notify(Notice::TokenMissing);
            return SignatureOutcome::Failed("Token not received".into());
        };

        match self.authenticate(token, &address, &started) {
            Ok(true) => {}
            Ok(false) => {
                info!(%address, "session changed during sign-in, discarding token");
                let message = "Wallet changed during sign-in".to_string();
                self.notify(Notice::LoginFailed(message.clone()));
                return SignatureOutcome::Failed(message);
            }
            Err(e) => {
                warn!(error = %e, "failed to persist credentials");
                self.notify(Notice::LoginFailed(e.to_string()));
                return SignatureOutcome::Failed(e.to_string());
            }
        }
        info!(%address, new_user = validation.new_user, "wallet authenticated");

        let welcome_cards = self.grant_cards(&address, validation.new_user);
        self.notify(Notice::LoginSucceeded);
        SignatureOutcome::Authenticated {
            new_user: validation.new_user,
            welcome_cards,
        }
    }

    /// Persist `token` and mark the session authenticated, unless the
    /// account binding changed since `started`. Returns false when the
    /// sign-in was superseded.
    ///
    /// The binding check and the write happen under the state lock, so a
    /// disconnect or account change either lands first and wins, or lands
    /// after and clears what was written.
    fn authenticate(
        &self,
        token: String,
        address: &str,
        started: &SessionState,
    ) -> Result<bool, MatchdayError> {
        let target = self.config.network.chain_id.as_str();
        let mut result = Ok(false);
        self.state.send_if_modified(|state| {
            let started_with = started.address.as_deref();
            if !state.may_authenticate(address, started.generation, started_with) {
                return false;
            }
            if let Err(e) = self.credentials.save(&token, address) {
                result = Err(e);
                return false;
            }
            state.reduce(
                SessionEvent::Authenticated {
                    token,
                    address: address.to_string(),
                },
                target,
            );
            result = Ok(true);
            true
        });
        result
    }

    /// Make sure `address` holds cards; announce them when they are new.
    fn grant_cards(&self, address: &str, new_user: bool) -> Vec<RewardCard> {
        match self.cards.ensure_user_has_cards(address, self.config.language) {
            Ok(grant) if !grant.cards.is_empty() && (new_user || grant.is_new) => {
                self.notify(Notice::WelcomeCards(grant.cards.clone()));
                grant.cards
            }
            Ok(_) => Vec::new(),
            Err(e) => {
                warn!(%address, error = %e, "card grant failed");
                Vec::new()
            }
        }
    }

    async fn initialize(&self) {
        match self.credentials.load() {
            Ok(Some(creds)) => {
                info!(address = %creds.address, "restoring persisted session");
                self.apply(SessionEvent::CredentialsRestored {
                    token: creds.token,
                    address: creds.address.clone(),
                });
                self.ensure_signer(&creds.address);
                self.check_network().await;
                self.grant_cards(&creds.address, false);
            }
            Ok(None) => {
                if let Some(provider) = self.provider.as_deref() {
                    match self.call(rpc::accounts(provider)).await {
                        Ok(accounts) if !accounts.is_empty() => {
                            self.apply(SessionEvent::AccountsObtained(accounts));
                            self.check_network().await;
                        }
                        Ok(_) => debug!("no approved account"),
                        Err(e) => warn!(error = %e, "failed to read approved accounts"),
                    }
                }
            }
            Err(e) => warn!(error = %e, "failed to load persisted credentials"),
        }
        self.apply(SessionEvent::Initialized);
    }

    async fn ensure_account_available(&self, max_attempts: u32, delay: Duration) -> Option<String> {
        let known = self.snapshot().address;
        if known.is_some() {
            return known;
        }
        let provider = self.provider.as_deref()?;

        for attempt in 1..=max_attempts {
            match self.call(rpc::accounts(provider)).await {
                Ok(accounts) if !accounts.is_empty() => {
                    let first = accounts[0].clone();
                    self.apply(SessionEvent::AccountsObtained(accounts));
                    return Some(first);
                }
                Ok(_) => debug!(attempt, "no approved account yet"),
                Err(e) => debug!(attempt, error = %e, "account poll failed"),
            }
            if attempt < max_attempts {
                tokio::time::sleep(delay).await;
            }
        }
        self.snapshot().address
    }

    async fn check_wallet_exists(&self, address: Option<&str>) -> WalletCheck {
        let Some(address) = self.resolve_address(address) else {
            return WalletCheck::failed("No wallet connected");
        };

        match self.api.check_wallet(&address).await {
            Ok(check) => check,
            Err(e) => {
                warn!(%address, error = %e, "wallet check failed");
                WalletCheck::failed(
                    e.backend_message()
                        .unwrap_or_else(|| "Error checking wallet".into()),
                )
            }
        }
    }

    async fn user_profile(&self) -> Option<Value> {
        let state = self.snapshot();
        let token = state.token.filter(|_| state.is_authenticated);

        match self.api.with_token(token).get_user().await {
            Ok(resp) if resp.success => resp.content,
            Ok(_) => None,
            Err(MatchdayError::NotAuthenticated) => {
                debug!("no session token, skipping profile");
                None
            }
            Err(e) if e.status() == Some(401) => {
                info!("token rejected, clearing credentials");
                self.apply(SessionEvent::CredentialsRevoked);
                None
            }
            Err(e) => {
                warn!(error = %e, "failed to load user profile");
                None
            }
        }
    }
}
