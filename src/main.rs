mod cli;
mod error;
mod output;

use std::io;
use std::sync::Arc;

use clap::Parser;
use cli::{CardsCommand, Command};
use error::CliError;
use matchday::{
    FileStore, HttpProvider, KeyValueStore, Language, MatchdayConfig, MemoryStore,
    RewardCardCache, WalletSession,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("failed to install rustls crypto provider");

    let cli = cli::Cli::parse();

    // Initialize tracing
    let filter = cli
        .log_level
        .parse::<tracing_subscriber::filter::LevelFilter>()
        .unwrap_or(tracing_subscriber::filter::LevelFilter::INFO);

    tracing_subscriber::fmt()
        .with_max_level(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let _ = dotenvy::dotenv(); // load .env if present

    let cancel = setup_signal_handlers();

    if let Err(e) = run(cli, cancel).await {
        error!(error = %e, "matchday failed");
        std::process::exit(1);
    }
}

async fn run(cli: cli::Cli, cancel: CancellationToken) -> Result<(), CliError> {
    let store: Arc<dyn KeyValueStore> = match &cli.store {
        Some(path) => Arc::new(FileStore::open(path)?),
        None => Arc::new(MemoryStore::new()),
    };
    let mut stdout = io::stdout().lock();

    match cli.command {
        Command::Cards(cmd) => {
            let cache = RewardCardCache::new(store);
            match cmd {
                CardsCommand::Show { address } => {
                    let cards = cache.available_cards(&address)?;
                    let stats = cache.card_stats(&address)?;
                    output::write_cards(&mut stdout, &cards, stats, cli.json)?;
                }
                CardsCommand::Grant { address, language } => {
                    let language: Language = language.parse()?;
                    let grant = cache.ensure_user_has_cards(&address, language)?;
                    info!(%address, is_new = grant.is_new, "cards ready");
                    let stats = cache.card_stats(&address)?;
                    output::write_cards(&mut stdout, &grant.cards, stats, cli.json)?;
                }
                CardsCommand::Used { address, bet_id } => {
                    let record = cache.used_card_record(&address, &bet_id)?;
                    output::write_used(&mut stdout, record.as_ref(), cli.json)?;
                }
            }
        }

        Command::Login => {
            let session = build_session(store, &cancel)?;
            session.initialize().await;
            if !session.state().is_connected && !session.connect().await {
                return Err(CliError::SignIn("wallet not connected".into()));
            }
            let outcome = session.request_signature(None).await;
            output::write_state(&mut stdout, &session.state(), cli.json)?;
            if !outcome.is_authenticated() {
                return Err(CliError::SignIn(format!("{outcome:?}")));
            }
        }

        Command::Logout => {
            let session = build_session(store, &cancel)?;
            session.initialize().await;
            session.disconnect();
            output::write_state(&mut stdout, &session.state(), cli.json)?;
        }

        Command::Status => {
            let session = build_session(store, &cancel)?;
            let state = session.initialize().await;
            output::write_state(&mut stdout, &state, cli.json)?;
        }

        Command::Watch => {
            let session = build_session(store, &cancel)?;
            output::write_state(&mut stdout, &session.initialize().await, cli.json)?;

            let mut changes = session.watch();
            changes.borrow_and_update();
            let listener = session.spawn_event_listener(cancel.clone());
            info!("watching wallet events, Ctrl-C to stop");

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    changed = changes.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let state = changes.borrow_and_update().clone();
                        output::write_state(&mut stdout, &state, cli.json)?;
                    }
                }
            }

            if let Some(listener) = listener {
                let _ = listener.await;
            }
        }
    }

    Ok(())
}

/// Session over the configured backend and the wallet bridge named by
/// `MATCHDAY_WALLET_RPC_URL`. Events are bridged when
/// `MATCHDAY_WALLET_EVENTS_URL` is set.
fn build_session(
    store: Arc<dyn KeyValueStore>,
    cancel: &CancellationToken,
) -> Result<WalletSession, CliError> {
    let config = MatchdayConfig::from_env()?;

    let rpc_url = std::env::var("MATCHDAY_WALLET_RPC_URL")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or(CliError::MissingEnv("MATCHDAY_WALLET_RPC_URL"))?;
    let provider = Arc::new(HttpProvider::new(&rpc_url));

    if let Some(ws_url) = std::env::var("MATCHDAY_WALLET_EVENTS_URL")
        .ok()
        .filter(|v| !v.trim().is_empty())
    {
        provider.connect_events(&ws_url, cancel.clone());
    }

    info!(api = %config.api_base_url, wallet = %rpc_url, "session configured");
    Ok(WalletSession::builder(config, store).provider(provider).build())
}

/// Register SIGINT and SIGTERM handlers that trigger the returned token.
fn setup_signal_handlers() -> CancellationToken {
    let cancel = CancellationToken::new();

    let cancel_clone = cancel.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        info!("received SIGINT, shutting down");
        cancel_clone.cancel();
    });

    #[cfg(unix)]
    {
        let cancel_clone = cancel.clone();
        tokio::spawn(async move {
            let mut sig = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to register SIGTERM handler");
            sig.recv().await;
            info!("received SIGTERM, shutting down");
            cancel_clone.cancel();
        });
    }

    cancel
}
