//! Session state and its reducer.
//!
//! Every change to the session (operation results and unsolicited provider
//! events alike) goes through [`SessionState::reduce`]. The reducer is pure:
//! side effects it requires are returned as [`Effect`]s for the caller to
//! run. State is re-derived from the latest event, so provider events and
//! user operations converge regardless of arrival order.

use serde::Serialize;

use super::network::same_chain;
use crate::provider::ProviderEvent;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionState {
    /// Lowercase account address.
    pub address: Option<String>,
    pub is_connected: bool,
    pub is_authenticated: bool,
    pub is_on_required_network: bool,
    #[serde(skip)]
    pub token: Option<String>,
    pub connecting: bool,
    pub signing: bool,
    pub switching_network: bool,
    /// Startup restoration has run.
    pub initialized: bool,
    /// Advanced whenever the account binding is dropped or replaced.
    #[serde(skip)]
    pub generation: u64,
}

impl SessionState {
    /// Whether a sign-in for `address`, started at `generation` while the
    /// session held `started_with`, may still land. The account must not have
    /// been dropped or replaced in the meantime.
    pub fn may_authenticate(
        &self,
        address: &str,
        generation: u64,
        started_with: Option<&str>,
    ) -> bool {
        let current = self.address.as_deref();
        self.generation == generation && (current == started_with || current == Some(address))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusyFlag {
    Connecting,
    Signing,
    SwitchingNetwork,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Busy { flag: BusyFlag, active: bool },
    /// The provider exposed these accounts in answer to a request.
    AccountsObtained(Vec<String>),
    NetworkChecked { on_target: bool },
    /// The backend issued `token` and it has been persisted.
    Authenticated { token: String, address: String },
    /// Persisted credentials were loaded at startup.
    CredentialsRestored { token: String, address: String },
    /// The token was rejected or revoked; the connection stays.
    CredentialsRevoked,
    Disconnected,
    Initialized,
    Provider(ProviderEvent),
}

/// Side effects requested by the reducer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Remove the persisted credential pair and drop the signer.
    ClearCredentials,
    /// Run the network switch flow after a short delay.
    SwitchNetwork,
}

impl SessionState {
    /// Apply `event`. `target_chain_id` is the configured network.
    pub fn reduce(&mut self, event: SessionEvent, target_chain_id: &str) -> Vec<Effect> {
        match event {
            SessionEvent::Busy { flag, active } => {
                match flag {
                    BusyFlag::Connecting => self.connecting = active,
                    BusyFlag::Signing => self.signing = active,
                    BusyFlag::SwitchingNetwork => self.switching_network = active,
                }
                Vec::new()
            }
            SessionEvent::AccountsObtained(accounts) => self.adopt_accounts(&accounts),
            SessionEvent::NetworkChecked { on_target } => {
                self.is_on_required_network = on_target;
                Vec::new()
            }
            SessionEvent::Authenticated { token, address }
            | SessionEvent::CredentialsRestored { token, address } => {
                self.token = Some(token);
                self.address = Some(address.to_lowercase());
                self.is_authenticated = true;
                self.is_connected = true;
                Vec::new()
            }
            SessionEvent::CredentialsRevoked => self.revoke(),
            SessionEvent::Disconnected | SessionEvent::Provider(ProviderEvent::Disconnect) => {
                *self = SessionState {
                    initialized: self.initialized,
                    generation: self.generation + 1,
                    ..SessionState::default()
                };
                vec![Effect::ClearCredentials]
            }
            SessionEvent::Initialized => {
                self.initialized = true;
                Vec::new()
            }
            SessionEvent::Provider(ProviderEvent::AccountsChanged(accounts)) => {
                self.adopt_accounts(&accounts)
            }
            SessionEvent::Provider(ProviderEvent::ChainChanged(chain_id)) => {
                self.is_on_required_network = same_chain(&chain_id, target_chain_id);
                if self.is_on_required_network || !self.is_connected {
                    Vec::new()
                } else {
                    vec![Effect::SwitchNetwork]
                }
            }
        }
    }

    fn adopt_accounts(&mut self, accounts: &[String]) -> Vec<Effect> {
        let Some(first) = accounts.first().map(|a| a.to_lowercase()) else {
            let effects = self.revoke();
            self.address = None;
            self.is_connected = false;
            self.generation += 1;
            return effects;
        };

        let switched = self.address.as_deref().is_some_and(|old| old != first);
        let effects = if switched {
            self.generation += 1;
            self.revoke()
        } else {
            Vec::new()
        };
        self.address = Some(first);
        self.is_connected = true;
        effects
    }

    fn revoke(&mut self) -> Vec<Effect> {
        let had_credentials = self.is_authenticated || self.token.is_some();
        self.token = None;
        self.is_authenticated = false;
        if had_credentials {
            vec![Effect::ClearCredentials]
        } else {
            Vec::new()
        }
    }
}
