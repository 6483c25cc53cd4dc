//! User-visible notices.
//!
//! Session operations never return errors to their callers; instead each
//! failure class is reported exactly once through a [`Notifier`], rendered in
//! the configured [`Language`].

use std::fmt;

use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::cards::RewardCard;
use crate::config::Language;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl fmt::Display for NoticeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NoticeLevel::Info => "info",
            NoticeLevel::Success => "success",
            NoticeLevel::Warning => "warning",
            NoticeLevel::Error => "error",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    /// No wallet provider is available.
    ProviderMissing,
    /// No account could be resolved for the operation.
    NoWallet,
    NoAccount,
    ConnectionRejected,
    ConnectionFailed(String),
    /// The provider is rate limiting; wait before retrying.
    Throttled,
    NetworkConnected { chain_name: String },
    NetworkFailed(String),
    SignaturePrompt,
    SignatureCancelled,
    SignatureFailed,
    TokenMissing,
    ValidationFailed(String),
    LoginFailed(String),
    LoginSucceeded,
    RegistrationCheckFailed(String),
    /// A fresh starter pack was granted.
    WelcomeCards(Vec<RewardCard>),
}

impl Notice {
    pub fn level(&self) -> NoticeLevel {
        match self {
            Notice::SignaturePrompt => NoticeLevel::Info,
            Notice::NetworkConnected { .. } | Notice::LoginSucceeded | Notice::WelcomeCards(_) => {
                NoticeLevel::Success
            }
            Notice::Throttled => NoticeLevel::Warning,
            _ => NoticeLevel::Error,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.level(), NoticeLevel::Error | NoticeLevel::Warning)
    }

    /// Render the notice text.
    pub fn message(&self, language: Language) -> String {
        match language {
            Language::En => self.message_en(),
            Language::Pt => self.message_pt(),
        }
    }

    fn message_en(&self) -> String {
        match self {
            Notice::ProviderMissing => {
                "Wallet not found. Install or unlock your wallet extension to continue.".into()
            }
            Notice::NoWallet => "No wallet connected".into(),
            Notice::NoAccount => "No account found. Please check your wallet.".into(),
            Notice::ConnectionRejected => "You refused the wallet connection".into(),
            Notice::ConnectionFailed(msg) => format!("Error connecting to wallet: {msg}"),
            Notice::Throttled => {
                "Too many requests to the wallet. Please wait a few seconds and try again.".into()
            }
            Notice::NetworkConnected { chain_name } => {
                format!("{chain_name} network connected successfully!")
            }
            Notice::NetworkFailed(msg) => msg.clone(),
            Notice::SignaturePrompt => "Please sign the message to enter the platform".into(),
            Notice::SignatureCancelled => {
                "Signature cancelled by user. Signing is required to enter the platform.".into()
            }
            Notice::SignatureFailed => "Failed to request signature. Try again later.".into(),
            Notice::TokenMissing => "Authentication failed: Token not received".into(),
            Notice::ValidationFailed(msg) => format!("Validation failed: {msg}"),
            Notice::LoginFailed(msg) => format!("Login failed: {msg}"),
            Notice::LoginSucceeded => "Login successful!".into(),
            Notice::RegistrationCheckFailed(msg) => format!("Error checking registration: {msg}"),
            Notice::WelcomeCards(cards) => {
                format!("Welcome! You received {} reward cards.", cards.len())
            }
        }
    }

    fn message_pt(&self) -> String {
        match self {
            Notice::ProviderMissing => {
                "Carteira não encontrada. Instale ou desbloqueie a extensão da carteira para continuar."
                    .into()
            }
            Notice::NoWallet => "Nenhuma carteira conectada".into(),
            Notice::NoAccount => "Nenhuma conta encontrada. Verifique sua carteira.".into(),
            Notice::ConnectionRejected => "Você recusou a conexão da carteira".into(),
            Notice::ConnectionFailed(msg) => format!("Erro ao conectar a carteira: {msg}"),
            Notice::Throttled => {
                "Muitas solicitações à carteira. Aguarde alguns segundos e tente novamente.".into()
            }
            Notice::NetworkConnected { chain_name } => {
                format!("Rede {chain_name} conectada com sucesso!")
            }
            Notice::NetworkFailed(msg) => msg.clone(),
            Notice::SignaturePrompt => "Assine a mensagem para entrar na plataforma".into(),
            Notice::SignatureCancelled => {
                "Assinatura cancelada pelo usuário. A assinatura é necessária para entrar na plataforma."
                    .into()
            }
            Notice::SignatureFailed => {
                "Falha ao solicitar assinatura. Tente novamente mais tarde.".into()
            }
            Notice::TokenMissing => "Falha na autenticação: token não recebido".into(),
            Notice::ValidationFailed(msg) => format!("Falha na validação: {msg}"),
            Notice::LoginFailed(msg) => format!("Falha no login: {msg}"),
            Notice::LoginSucceeded => "Login realizado com sucesso!".into(),
            Notice::RegistrationCheckFailed(msg) => format!("Erro ao verificar cadastro: {msg}"),
            Notice::WelcomeCards(cards) => {
                format!("Bem-vindo! Você recebeu {} cartas de recompensa.", cards.len())
            }
        }
    }
}

/// Sink for user-visible notices.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Writes notices to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier {
    language: Language,
}

impl TracingNotifier {
    pub fn new(language: Language) -> Self {
        Self { language }
    }
}

impl Notifier for TracingNotifier {
    fn notify(&self, notice: Notice) {
        let text = notice.message(self.language);
        match notice.level() {
            NoticeLevel::Error => error!(notice = %text),
            NoticeLevel::Warning => warn!(notice = %text),
            NoticeLevel::Info | NoticeLevel::Success => info!(notice = %text),
        }
    }
}

/// Forwards notices to a channel, for UIs that render them.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<Notice>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notice>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, notice: Notice) {
        if self.tx.send(notice).is_err() {
            warn!("notice receiver dropped");
        }
    }
}
