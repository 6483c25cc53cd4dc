use thiserror::Error;

use crate::provider::ProviderError;

#[derive(Error, Debug)]
pub enum MatchdayError {
    #[error("HTTP error {status}: {message}")]
    Http { status: u16, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(String),

    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("not authenticated")]
    NotAuthenticated,

    #[error("validation error: {0}")]
    Validation(String),
}

impl MatchdayError {
    /// HTTP status of a failed backend call, if that is what this is.
    pub fn status(&self) -> Option<u16> {
        match self {
            MatchdayError::Http { status, .. } => Some(*status),
            MatchdayError::Request(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// The `message` field of a JSON error body returned by the backend.
    pub fn backend_message(&self) -> Option<String> {
        let MatchdayError::Http { message, .. } = self else {
            return None;
        };
        let body: serde_json::Value = serde_json::from_str(message).ok()?;
        body.get("message")?.as_str().map(str::to_string)
    }
}

impl From<std::io::Error> for MatchdayError {
    fn from(e: std::io::Error) -> Self {
        MatchdayError::Storage(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, MatchdayError>;
