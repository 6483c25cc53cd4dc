//! Integration tests for the wallet session state machine.
//!
//! The wallet is a scripted `FakeProvider`; the backend is a wiremock server.
//! All session delays are zeroed with `SessionTiming::immediate()`.

mod common;

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{Harness, ADDRESS, OTHER_CHAIN, TARGET_CHAIN};
use matchday::notify::Notice;
use matchday::provider::{ProviderError, ProviderEvent};
use matchday::storage::{AUTH_TOKEN_KEY, WALLET_ADDRESS_KEY};
use matchday::{
    KeyValueStore, MemoryStore, NetworkOutcome, NetworkStep, RegistrationStatus,
    SignatureOutcome,
};

const UNUSED_BACKEND: &str = "http://127.0.0.1:9";

async fn mount_signature_ok(server: &MockServer, new_user: bool) {
    Mock::given(method("POST"))
        .and(path("/wallet/signature"))
        .and(body_json(json!({
            "address": ADDRESS,
            "message": format!("Matchday wallet validation: {ADDRESS}"),
            "signature": "0xsigned"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": {"success": true, "token": "tok-1", "new_user": new_user}
        })))
        .mount(server)
        .await;
}

/// token present <=> address persisted <=> authenticated.
fn assert_credentials_consistent(h: &Harness) {
    let state = h.session.state();
    let token = h.store.get(AUTH_TOKEN_KEY).unwrap();
    let address = h.store.get(WALLET_ADDRESS_KEY).unwrap();
    assert_eq!(state.token.is_some(), state.is_authenticated);
    assert_eq!(token.is_some(), state.is_authenticated);
    assert_eq!(address.is_some(), state.is_authenticated);
    assert_eq!(token, state.token);
}

// ---------------------------------------------------------------------------
// connect
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_connect_sets_lowercase_address() {
    let mut h = Harness::new(UNUSED_BACKEND);

    assert!(h.session.connect().await);

    let state = h.session.state();
    assert_eq!(state.address.as_deref(), Some(ADDRESS));
    assert!(state.is_connected);
    assert!(state.is_on_required_network);
    assert!(!state.is_authenticated);
    assert!(!state.connecting);
    assert_eq!(h.session.signer().unwrap().address(), ADDRESS);
    assert!(h.failure_notices().is_empty());
}

#[tokio::test]
async fn test_concurrent_connects_issue_one_account_request() {
    let h = Harness::new(UNUSED_BACKEND);
    h.provider.set_latency(Duration::from_millis(50));

    let (a, b, c) = tokio::join!(
        h.session.connect(),
        h.session.connect(),
        h.session.connect()
    );

    assert!(a && b && c);
    assert_eq!(h.provider.count("eth_requestAccounts"), 1);
    assert!(!h.session.state().connecting);
}

#[tokio::test]
async fn test_connect_rejected_by_user() {
    let mut h = Harness::new(UNUSED_BACKEND);
    h.provider.fail("eth_requestAccounts", 4001);

    assert!(!h.session.connect().await);
    assert_eq!(h.failure_notices(), vec![Notice::ConnectionRejected]);
    assert!(!h.session.state().connecting);
    assert!(!h.session.state().is_connected);
}

#[tokio::test]
async fn test_connect_throttled() {
    let mut h = Harness::new(UNUSED_BACKEND);
    h.provider.fail("eth_requestAccounts", 4100);

    assert!(!h.session.connect().await);
    assert_eq!(h.failure_notices(), vec![Notice::Throttled]);
}

#[tokio::test]
async fn test_connect_generic_failure() {
    let mut h = Harness::new(UNUSED_BACKEND);
    h.provider
        .set("eth_requestAccounts", Err(ProviderError::rpc(-32603, "internal")));

    assert!(!h.session.connect().await);
    assert_eq!(
        h.failure_notices(),
        vec![Notice::ConnectionFailed("internal".into())]
    );
}

#[tokio::test]
async fn test_connect_succeeds_when_network_switch_fails() {
    let mut h = Harness::new(UNUSED_BACKEND);
    h.provider.set("eth_chainId", Ok(json!(OTHER_CHAIN)));
    h.provider.fail("wallet_switchEthereumChain", 4001);

    assert!(h.session.connect().await);
    let state = h.session.state();
    assert!(state.is_connected);
    assert!(!state.is_on_required_network);
    assert_eq!(
        h.failure_notices(),
        vec![Notice::NetworkFailed("User rejected network switch".into())]
    );
}

#[tokio::test]
async fn test_connect_without_provider() {
    let (notifier, mut notices) = matchday::ChannelNotifier::new();
    let session = matchday::WalletSession::builder(
        common::config(UNUSED_BACKEND),
        Arc::new(MemoryStore::new()),
    )
    .notifier(Arc::new(notifier))
    .build();

    assert!(!session.connect().await);
    assert_eq!(notices.try_recv().unwrap(), Notice::ProviderMissing);
    assert!(notices.try_recv().is_err());
}

// ---------------------------------------------------------------------------
// network
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_already_on_target_skips_switch() {
    let h = Harness::new(UNUSED_BACKEND);

    assert_eq!(
        h.session.verify_and_switch_network().await,
        NetworkOutcome::AlreadyOnTarget
    );
    assert_eq!(h.provider.count("wallet_switchEthereumChain"), 0);
}

#[tokio::test]
async fn test_unknown_chain_is_added_then_switched() {
    let h = Harness::new(UNUSED_BACKEND);
    h.provider.set("eth_chainId", Ok(json!(OTHER_CHAIN)));
    h.provider.push(
        "wallet_switchEthereumChain",
        Err(ProviderError::rpc(4902, "unrecognized chain")),
    );

    assert_eq!(
        h.session.verify_and_switch_network().await,
        NetworkOutcome::Added
    );

    let methods: Vec<String> = h.provider.calls().into_iter().map(|(m, _)| m).collect();
    assert_eq!(
        methods,
        vec![
            "eth_chainId",
            "wallet_switchEthereumChain",
            "wallet_addEthereumChain",
            "wallet_switchEthereumChain"
        ]
    );

    let (_, params) = &h.provider.calls()[2];
    assert_eq!(params[0]["chainId"], TARGET_CHAIN);
    assert_eq!(params[0]["chainName"], "Chiliz Spicy");
    assert_eq!(params[0]["nativeCurrency"]["symbol"], "CHZ");
    assert!(h.session.state().is_on_required_network);
}

#[tokio::test]
async fn test_add_chain_rejected() {
    let h = Harness::new(UNUSED_BACKEND);
    h.provider.set("eth_chainId", Ok(json!(OTHER_CHAIN)));
    h.provider.fail("wallet_switchEthereumChain", 4902);
    h.provider.fail("wallet_addEthereumChain", 4001);

    let outcome = h.session.verify_and_switch_network().await;
    assert_eq!(outcome, NetworkOutcome::Rejected(NetworkStep::Add));
    assert_eq!(
        outcome.message("Chiliz Spicy"),
        "User rejected adding Chiliz Spicy network"
    );
    assert!(!h.session.state().switching_network);
}

#[tokio::test(start_paused = true)]
async fn test_network_checks_are_spaced() {
    let mut config = common::config(UNUSED_BACKEND);
    config.timing.network_check_spacing = Duration::from_secs(2);
    let provider = common::FakeProvider::new();
    let session = matchday::WalletSession::builder(config, Arc::new(MemoryStore::new()))
        .provider(provider.clone())
        .build();

    let start = tokio::time::Instant::now();
    assert!(session.check_network().await);
    assert!(session.check_network().await);
    assert!(start.elapsed() >= Duration::from_secs(2));
    assert_eq!(provider.count("eth_chainId"), 2);
}

#[tokio::test]
async fn test_ensure_network_reports_switch() {
    let mut h = Harness::new(UNUSED_BACKEND);
    h.provider.push("eth_chainId", Ok(json!(OTHER_CHAIN)));
    h.provider.push("eth_chainId", Ok(json!(OTHER_CHAIN)));

    assert_eq!(h.session.ensure_network().await, NetworkOutcome::Switched);
    assert_eq!(
        h.drain_notices(),
        vec![Notice::NetworkConnected {
            chain_name: "Chiliz Spicy".into()
        }]
    );
}

#[tokio::test]
async fn test_ensure_network_rechecks_after_throttle() {
    let h = Harness::new(UNUSED_BACKEND);
    h.provider.push("eth_chainId", Ok(json!(OTHER_CHAIN)));
    h.provider.push("eth_chainId", Ok(json!(OTHER_CHAIN)));
    h.provider.push(
        "wallet_switchEthereumChain",
        Err(ProviderError::rpc(4100, "throttled")),
    );

    // The wallet finished the switch on its own; the re-check sees it.
    assert_eq!(h.session.ensure_network().await, NetworkOutcome::Switched);
    assert_eq!(h.provider.count("eth_chainId"), 3);
}

// ---------------------------------------------------------------------------
// request_signature
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_signature_authenticates_and_grants_cards() {
    let server = MockServer::start().await;
    mount_signature_ok(&server, true).await;
    let mut h = Harness::new(&server.uri());

    assert!(h.session.connect().await);
    let outcome = h.session.request_signature(None).await;

    let SignatureOutcome::Authenticated {
        new_user,
        welcome_cards,
    } = outcome
    else {
        panic!("expected authentication, got {outcome:?}");
    };
    assert!(new_user);
    assert_eq!(welcome_cards.len(), 3);

    let state = h.session.state();
    assert!(state.is_authenticated);
    assert_eq!(state.token.as_deref(), Some("tok-1"));
    assert!(!state.signing);
    assert_credentials_consistent(&h);

    let notices = h.drain_notices();
    assert!(notices.iter().all(|n| !n.is_failure()));
    assert!(notices.contains(&Notice::WelcomeCards(welcome_cards.clone())));
    assert!(notices.contains(&Notice::LoginSucceeded));

    assert_eq!(
        h.session.cards().available_cards(ADDRESS).unwrap(),
        welcome_cards
    );
}

#[tokio::test]
async fn test_second_sign_in_does_not_regrant() {
    let server = MockServer::start().await;
    mount_signature_ok(&server, false).await;
    let h = Harness::new(&server.uri());
    assert!(h.session.connect().await);

    let first = h.session.request_signature(None).await;
    let SignatureOutcome::Authenticated { welcome_cards, .. } = first else {
        panic!("expected authentication, got {first:?}");
    };
    assert_eq!(welcome_cards.len(), 3);

    let second = h.session.request_signature(None).await;
    assert_eq!(
        second,
        SignatureOutcome::Authenticated {
            new_user: false,
            welcome_cards: vec![]
        }
    );
    assert_eq!(h.session.cards().available_cards(ADDRESS).unwrap().len(), 3);
}

#[tokio::test]
async fn test_concurrent_signatures_issue_one_sign_request() {
    let server = MockServer::start().await;
    mount_signature_ok(&server, false).await;
    let h = Harness::new(&server.uri());
    assert!(h.session.connect().await);
    h.provider.set_latency(Duration::from_millis(50));

    let (a, b) = tokio::join!(
        h.session.request_signature(None),
        h.session.request_signature(Some("0xABC"))
    );

    assert!(a.is_authenticated());
    assert_eq!(a, b);
    assert_eq!(h.provider.count("personal_sign"), 1);
}

#[tokio::test]
async fn test_sign_throttled_is_spam_blocked() {
    let mut h = Harness::new(UNUSED_BACKEND);
    assert!(h.session.connect().await);
    h.drain_notices();
    h.provider.fail("personal_sign", 4100);

    assert_eq!(
        h.session.request_signature(None).await,
        SignatureOutcome::SpamBlocked
    );
    let state = h.session.state();
    assert!(!state.signing);
    assert!(!state.is_authenticated);
    assert_eq!(h.failure_notices(), vec![Notice::Throttled]);
    assert_credentials_consistent(&h);
}

#[tokio::test]
async fn test_throttled_network_check_during_sign_is_spam_blocked() {
    let mut h = Harness::new(UNUSED_BACKEND);
    assert!(h.session.connect().await);
    h.drain_notices();
    h.provider.fail("eth_chainId", 4100);

    assert_eq!(
        h.session.request_signature(None).await,
        SignatureOutcome::SpamBlocked
    );
    assert!(!h.session.state().signing);
    assert_eq!(h.provider.count("personal_sign"), 0);
    assert_eq!(h.failure_notices(), vec![Notice::Throttled]);
}

#[tokio::test]
async fn test_sign_cancelled_by_user() {
    let mut h = Harness::new(UNUSED_BACKEND);
    assert!(h.session.connect().await);
    h.drain_notices();
    h.provider.fail("personal_sign", 4001);

    assert_eq!(
        h.session.request_signature(None).await,
        SignatureOutcome::Cancelled
    );
    assert!(!h.session.state().signing);
    assert_eq!(h.failure_notices(), vec![Notice::SignatureCancelled]);
}

#[tokio::test]
async fn test_sign_without_address() {
    let mut h = Harness::new(UNUSED_BACKEND);

    assert_eq!(
        h.session.request_signature(None).await,
        SignatureOutcome::Failed("No wallet connected".into())
    );
    assert_eq!(h.failure_notices(), vec![Notice::NoWallet]);
    assert_eq!(h.provider.count("personal_sign"), 0);
}

#[tokio::test]
async fn test_backend_rejection_persists_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/wallet/signature"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": {"success": false},
            "message": "invalid signature"
        })))
        .mount(&server)
        .await;
    let mut h = Harness::new(&server.uri());
    assert!(h.session.connect().await);
    h.drain_notices();

    assert_eq!(
        h.session.request_signature(None).await,
        SignatureOutcome::Failed("invalid signature".into())
    );
    assert_eq!(
        h.failure_notices(),
        vec![Notice::ValidationFailed("invalid signature".into())]
    );
    assert!(h.store.get(AUTH_TOKEN_KEY).unwrap().is_none());
    assert_credentials_consistent(&h);
}

#[tokio::test]
async fn test_backend_error_status_is_login_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/wallet/signature"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"message": "bad address"})),
        )
        .mount(&server)
        .await;
    let mut h = Harness::new(&server.uri());
    assert!(h.session.connect().await);
    h.drain_notices();

    assert_eq!(
        h.session.request_signature(None).await,
        SignatureOutcome::Failed("bad address".into())
    );
    assert_eq!(
        h.failure_notices(),
        vec![Notice::LoginFailed("bad address".into())]
    );
    assert!(!h.session.state().is_authenticated);
}

#[tokio::test]
async fn test_missing_token_is_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/wallet/signature"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"content": {"success": true}})),
        )
        .mount(&server)
        .await;
    let mut h = Harness::new(&server.uri());
    assert!(h.session.connect().await);
    h.drain_notices();

    assert!(!h.session.request_signature(None).await.is_authenticated());
    assert_eq!(h.failure_notices(), vec![Notice::TokenMissing]);
    assert_credentials_consistent(&h);
}

// ---------------------------------------------------------------------------
// disconnect + provider events
// ---------------------------------------------------------------------------

async fn authenticated_harness(server: &MockServer) -> Harness {
    mount_signature_ok(server, false).await;
    let h = Harness::new(&server.uri());
    assert!(h.session.connect().await);
    assert!(h.session.request_signature(None).await.is_authenticated());
    h
}

#[tokio::test]
async fn test_disconnect_clears_credentials() {
    let server = MockServer::start().await;
    let h = authenticated_harness(&server).await;

    h.session.disconnect();

    let state = h.session.state();
    assert!(!state.is_authenticated);
    assert!(!state.is_connected);
    assert_eq!(state.address, None);
    assert!(h.session.signer().is_none());
    assert_credentials_consistent(&h);
}

#[tokio::test]
async fn test_empty_accounts_event_logs_out() {
    let server = MockServer::start().await;
    let h = authenticated_harness(&server).await;

    assert!(h
        .session
        .handle_provider_event(ProviderEvent::AccountsChanged(vec![]))
        .is_none());

    let state = h.session.state();
    assert!(!state.is_authenticated);
    assert_eq!(state.token, None);
    assert_eq!(state.address, None);
    assert_credentials_consistent(&h);
}

#[tokio::test]
async fn test_account_switch_event_logs_out() {
    let server = MockServer::start().await;
    let h = authenticated_harness(&server).await;

    h.session
        .handle_provider_event(ProviderEvent::AccountsChanged(vec!["0xDEF".into()]));

    let state = h.session.state();
    assert!(!state.is_authenticated);
    assert!(state.is_connected);
    assert_eq!(state.address.as_deref(), Some("0xdef"));
    assert_credentials_consistent(&h);
}

#[tokio::test]
async fn test_chain_change_away_triggers_switch() {
    let mut h = Harness::new(UNUSED_BACKEND);
    assert!(h.session.connect().await);
    h.drain_notices();
    h.provider.set("eth_chainId", Ok(json!(OTHER_CHAIN)));

    let task = h
        .session
        .handle_provider_event(ProviderEvent::ChainChanged(OTHER_CHAIN.into()))
        .expect("switch task");
    assert!(!h.session.state().is_on_required_network);

    assert_eq!(task.await.unwrap(), NetworkOutcome::Switched);
    assert!(h.session.state().is_on_required_network);
    assert_eq!(h.provider.count("wallet_switchEthereumChain"), 1);
    assert_eq!(
        h.drain_notices(),
        vec![Notice::NetworkConnected {
            chain_name: "Chiliz Spicy".into()
        }]
    );
}

#[tokio::test]
async fn test_provider_disconnect_event_via_listener() {
    let server = MockServer::start().await;
    let h = authenticated_harness(&server).await;
    let mut watch = h.session.watch();
    let cancel = CancellationToken::new();
    let listener = h.session.spawn_event_listener(cancel.clone()).unwrap();

    h.provider.emit(ProviderEvent::Disconnect);
    let state = watch
        .wait_for(|s| !s.is_authenticated)
        .await
        .unwrap()
        .clone();

    assert_eq!(state.address, None);
    assert_credentials_consistent(&h);

    cancel.cancel();
    listener.await.unwrap();
}

// ---------------------------------------------------------------------------
// events racing a sign-in
// ---------------------------------------------------------------------------

/// What a settled session exposes: the public state plus the persisted pair.
type Settled = (
    Option<String>,
    bool,
    bool,
    Option<String>,
    Option<String>,
    Option<String>,
);

fn settled(h: &Harness) -> Settled {
    let state = h.session.state();
    (
        state.address,
        state.is_connected,
        state.is_authenticated,
        state.token,
        h.store.get(AUTH_TOKEN_KEY).unwrap(),
        h.store.get(WALLET_ADDRESS_KEY).unwrap(),
    )
}

/// Start a sign-in whose backend answer takes 300ms, run `interrupt` while
/// it is in flight, and return the sign-in outcome.
async fn sign_in_interrupted(
    h: &Harness,
    server: &MockServer,
    interrupt: impl FnOnce(&Harness),
) -> SignatureOutcome {
    Mock::given(method("POST"))
        .and(path("/wallet/signature"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({
                    "content": {"success": true, "token": "tok-1", "new_user": false}
                }))
                .set_delay(Duration::from_millis(300)),
        )
        .mount(server)
        .await;
    assert!(h.session.connect().await);

    let mut watch = h.session.watch();
    let session = h.session.clone();
    let sign_in = tokio::spawn(async move { session.request_signature(None).await });

    watch.wait_for(|s| s.signing).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    interrupt(h);

    let outcome = sign_in.await.unwrap();
    assert!(!h.session.state().signing);
    outcome
}

async fn assert_converges(interrupt: fn(&Harness)) {
    let server = MockServer::start().await;
    let mut during = Harness::new(&server.uri());
    let outcome = sign_in_interrupted(&during, &server, interrupt).await;

    assert!(matches!(outcome, SignatureOutcome::Failed(_)), "got {outcome:?}");
    assert!(during
        .drain_notices()
        .iter()
        .all(|n| !matches!(n, Notice::LoginSucceeded | Notice::WelcomeCards(_))));
    assert_credentials_consistent(&during);
    assert_eq!(during.session.cards().available_cards(ADDRESS).unwrap().len(), 0);

    let server = MockServer::start().await;
    let after = authenticated_harness(&server).await;
    interrupt(&after);

    assert_eq!(settled(&during), settled(&after));
}

#[tokio::test]
async fn test_empty_accounts_during_sign_in_wins() {
    assert_converges(|h| {
        h.session
            .handle_provider_event(ProviderEvent::AccountsChanged(vec![]));
    })
    .await;
}

#[tokio::test]
async fn test_disconnect_during_sign_in_wins() {
    assert_converges(|h| h.session.disconnect()).await;
}

#[tokio::test]
async fn test_provider_disconnect_during_sign_in_wins() {
    assert_converges(|h| {
        h.session.handle_provider_event(ProviderEvent::Disconnect);
    })
    .await;
}

#[tokio::test]
async fn test_account_switch_during_sign_in_wins() {
    assert_converges(|h| {
        h.session
            .handle_provider_event(ProviderEvent::AccountsChanged(vec!["0xDEF".into()]));
    })
    .await;
}

#[tokio::test]
async fn test_same_account_event_during_sign_in_keeps_it() {
    let server = MockServer::start().await;
    let h = Harness::new(&server.uri());

    let outcome = sign_in_interrupted(&h, &server, |h| {
        h.session
            .handle_provider_event(ProviderEvent::AccountsChanged(vec![ADDRESS.to_uppercase()]));
    })
    .await;

    assert!(outcome.is_authenticated());
    assert_eq!(h.session.state().token.as_deref(), Some("tok-1"));
    assert_credentials_consistent(&h);
}

// ---------------------------------------------------------------------------
// account polling, startup, registration
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_ensure_account_available_polls() {
    let h = Harness::new(UNUSED_BACKEND);
    h.provider.push("eth_accounts", Ok(json!([])));
    h.provider.push("eth_accounts", Ok(json!([])));
    h.provider.push("eth_accounts", Ok(json!(["0xDEF"])));

    let address = h
        .session
        .ensure_account_available(5, Duration::from_millis(1))
        .await;
    assert_eq!(address.as_deref(), Some("0xdef"));
    assert_eq!(h.provider.count("eth_accounts"), 3);

    // Known address: no further polling.
    let again = h
        .session
        .ensure_account_available(5, Duration::from_millis(1))
        .await;
    assert_eq!(again.as_deref(), Some("0xdef"));
    assert_eq!(h.provider.count("eth_accounts"), 3);
}

#[tokio::test]
async fn test_ensure_account_available_gives_up() {
    let mut h = Harness::new(UNUSED_BACKEND);
    h.provider.set("eth_accounts", Ok(json!([])));

    let address = h
        .session
        .ensure_account_available(3, Duration::from_millis(1))
        .await;
    assert_eq!(address, None);
    assert_eq!(h.provider.count("eth_accounts"), 3);
    assert!(h.drain_notices().is_empty());
}

#[tokio::test]
async fn test_initialize_restores_credentials() {
    let store = Arc::new(MemoryStore::new());
    store.set(AUTH_TOKEN_KEY, "tok-restored").unwrap();
    store.set(WALLET_ADDRESS_KEY, ADDRESS).unwrap();
    let mut h = Harness::with_store(UNUSED_BACKEND, store);

    let state = h.session.initialize().await;

    assert!(state.initialized);
    assert!(state.is_authenticated);
    assert_eq!(state.token.as_deref(), Some("tok-restored"));
    assert!(state.is_on_required_network);
    assert!(h.session.cards().has_received_starter_pack(ADDRESS).unwrap());
    assert!(matches!(
        h.drain_notices().as_slice(),
        [Notice::WelcomeCards(cards)] if cards.len() == 3
    ));
    assert_credentials_consistent(&h);
}

#[tokio::test]
async fn test_initialize_adopts_approved_account() {
    let h = Harness::new(UNUSED_BACKEND);

    let state = h.session.initialize().await;

    assert!(state.initialized);
    assert!(!state.is_authenticated);
    assert!(state.is_connected);
    assert_eq!(state.address.as_deref(), Some(ADDRESS));
    assert_eq!(h.provider.count("eth_requestAccounts"), 0);
}

#[tokio::test]
async fn test_connect_and_check_registration_new_wallet() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/wallet/check/{ADDRESS}")))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"success": true, "exists": false})),
        )
        .expect(1)
        .mount(&server)
        .await;
    let h = Harness::new(&server.uri());

    assert_eq!(
        h.session.connect_and_check_registration().await,
        RegistrationStatus::NeedsRegistration {
            address: ADDRESS.into()
        }
    );
}

#[tokio::test]
async fn test_check_wallet_exists_folds_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/wallet/check/{ADDRESS}")))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(json!({"message": "database down"})),
        )
        .mount(&server)
        .await;
    let h = Harness::new(&server.uri());

    let check = h.session.check_wallet_exists(Some(ADDRESS)).await;
    assert!(!check.success);
    assert!(!check.exists);
    assert_eq!(check.message.as_deref(), Some("database down"));

    let none = Harness::new(&server.uri())
        .session
        .check_wallet_exists(None)
        .await;
    assert_eq!(none.message.as_deref(), Some("No wallet connected"));
}

#[tokio::test]
async fn test_user_profile_401_clears_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/user"))
        .and(header("authorization", "Bearer tok-1"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    let h = authenticated_harness(&server).await;

    assert_eq!(h.session.user_profile().await, None);

    let state = h.session.state();
    assert!(!state.is_authenticated);
    assert!(state.is_connected);
    assert_credentials_consistent(&h);
}

#[tokio::test]
async fn test_user_profile_returns_content() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/user"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "content": {"id": 7, "wallet": ADDRESS}
        })))
        .mount(&server)
        .await;
    let h = authenticated_harness(&server).await;

    let profile = h.session.user_profile().await.unwrap();
    assert_eq!(profile["id"], 7);
}

#[tokio::test]
async fn test_user_profile_without_sign_in_skips_backend() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/user"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    let h = Harness::new(&server.uri());
    assert!(h.session.connect().await);

    assert_eq!(h.session.user_profile().await, None);
    assert!(h.session.state().is_connected);
}
