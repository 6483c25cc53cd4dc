//! Provider events and the websocket bridge that delivers them.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::MatchdayError;

const PING_INTERVAL: Duration = Duration::from_secs(30);
const PONG_TIMEOUT: Duration = Duration::from_secs(10);
const RECONNECT_DELAY: Duration = Duration::from_secs(3);

/// An unsolicited event emitted by the wallet provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderEvent {
    /// The exposed account list changed; empty means the user locked or
    /// disconnected every account.
    AccountsChanged(Vec<String>),
    /// The wallet switched chains (`0x`-prefixed hex id).
    ChainChanged(String),
    /// The provider lost its connection to every chain.
    Disconnect,
}

impl ProviderEvent {
    /// Parse a bridge frame of the form `{"event": "...", "data": ...}`.
    pub fn from_message(text: &str) -> Option<Self> {
        let value: Value = serde_json::from_str(text).ok()?;
        let event = value.get("event")?.as_str()?;
        let data = value.get("data").cloned().unwrap_or(Value::Null);

        match event {
            "accountsChanged" => {
                let accounts = match data {
                    Value::Array(items) => items
                        .iter()
                        .filter_map(|a| a.as_str().map(str::to_lowercase))
                        .collect(),
                    Value::Null => Vec::new(),
                    _ => return None,
                };
                Some(ProviderEvent::AccountsChanged(accounts))
            }
            "chainChanged" => data
                .as_str()
                .map(|id| ProviderEvent::ChainChanged(id.to_string())),
            "disconnect" => Some(ProviderEvent::Disconnect),
            _ => None,
        }
    }
}

/// Typed subscription for provider events.
pub struct ProviderEventSubscription {
    rx: broadcast::Receiver<ProviderEvent>,
}

impl ProviderEventSubscription {
    pub fn new(rx: broadcast::Receiver<ProviderEvent>) -> Self {
        Self { rx }
    }

    /// Receive the next event. Returns `None` if the channel is closed.
    pub async fn next(&mut self) -> Option<ProviderEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("provider event subscription lagged by {n} events");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// Websocket client for a wallet bridge that pushes provider events.
///
/// Reconnects after [`RECONNECT_DELAY`] whenever the connection drops and
/// republishes every recognized frame on a broadcast channel.
#[derive(Debug, Clone)]
pub struct EventBridge {
    url: String,
    tx: broadcast::Sender<ProviderEvent>,
}

/// Ping schedule and the pong we are waiting on.
struct Heartbeat {
    ticker: tokio::time::Interval,
    awaiting_pong_until: Option<Instant>,
}

impl Heartbeat {
    fn new() -> Self {
        Self {
            ticker: tokio::time::interval(PING_INTERVAL),
            awaiting_pong_until: None,
        }
    }

    /// Wait for the next ping slot. Fails when the previous ping went
    /// unanswered past [`PONG_TIMEOUT`].
    async fn due(&mut self) -> Result<(), MatchdayError> {
        self.ticker.tick().await;
        if self.awaiting_pong_until.is_some_and(|t| Instant::now() > t) {
            return Err(MatchdayError::WebSocket("pong timeout".into()));
        }
        self.awaiting_pong_until = Some(Instant::now() + PONG_TIMEOUT);
        Ok(())
    }

    fn pong(&mut self) {
        self.awaiting_pong_until = None;
    }
}

/// What the read loop does with one incoming frame.
#[derive(Debug, PartialEq)]
enum FrameAction {
    Continue,
    Pong,
    Reply(Message),
    Drop(&'static str),
}

fn classify(frame: Option<Message>) -> FrameAction {
    match frame {
        Some(Message::Pong(_)) => FrameAction::Pong,
        Some(Message::Ping(data)) => FrameAction::Reply(Message::Pong(data)),
        Some(Message::Close(_)) => FrameAction::Drop("bridge closed connection"),
        None => FrameAction::Drop("stream ended"),
        Some(_) => FrameAction::Continue,
    }
}

impl EventBridge {
    pub fn new(url: impl Into<String>, tx: broadcast::Sender<ProviderEvent>) -> Self {
        Self {
            url: url.into(),
            tx,
        }
    }

    /// Connect and process frames in the background until `cancel` fires.
    pub fn spawn(&self, cancel: CancellationToken) -> JoinHandle<()> {
        let bridge = self.clone();

        tokio::spawn(async move {
            while let Err(e) = bridge.session(&cancel).await {
                warn!(
                    url = %bridge.url,
                    error = %e,
                    delay = ?RECONNECT_DELAY,
                    "event bridge dropped, reconnecting"
                );
                tokio::select! {
                    _ = tokio::time::sleep(RECONNECT_DELAY) => {}
                    _ = cancel.cancelled() => break,
                }
            }
            info!(url = %bridge.url, "event bridge stopped");
        })
    }

    /// One connection, from handshake until it drops or `cancel` fires.
    async fn session(&self, cancel: &CancellationToken) -> Result<(), MatchdayError> {
        let (stream, _) = tokio_tungstenite::connect_async(self.url.as_str())
            .await
            .map_err(|e| MatchdayError::WebSocket(format!("connect failed: {e}")))?;
        info!(url = %self.url, "event bridge connected");

        let (mut sink, mut frames) = stream.split();
        let mut heartbeat = Heartbeat::new();

        loop {
            let frame = tokio::select! {
                _ = cancel.cancelled() => {
                    let _ = sink.close().await;
                    return Ok(());
                }
                due = heartbeat.due() => {
                    due?;
                    let _ = sink.send(Message::Ping(Vec::new())).await;
                    continue;
                }
                frame = frames.next() => frame
                    .transpose()
                    .map_err(|e| MatchdayError::WebSocket(format!("read error: {e}")))?,
            };

            if let Some(Message::Text(text)) = &frame {
                self.publish(text);
                continue;
            }
            match classify(frame) {
                FrameAction::Continue => {}
                FrameAction::Pong => heartbeat.pong(),
                FrameAction::Reply(reply) => {
                    let _ = sink.send(reply).await;
                }
                FrameAction::Drop(reason) => return Err(MatchdayError::WebSocket(reason.into())),
            }
        }
    }

    fn publish(&self, text: &str) {
        match ProviderEvent::from_message(text) {
            Some(event) => {
                debug!(?event, "provider event");
                // Dropped when nobody is subscribed.
                let _ = self.tx.send(event);
            }
            None if serde_json::from_str::<Value>(text).is_ok() => {
                debug!(frame = %text, "unrecognized bridge frame");
            }
            None => error!(frame = %text, "bridge frame is not JSON"),
        }
    }
}
