use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body of `POST /wallet/signature`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureRequest {
    pub address: String,
    pub message: String,
    pub signature: String,
}

/// Content of a `POST /wallet/signature` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureValidation {
    pub success: bool,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub new_user: bool,
}

/// `GET /wallet/check/:address` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletCheck {
    pub success: bool,
    #[serde(default)]
    pub exists: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl WalletCheck {
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            exists: false,
            message: Some(message.into()),
        }
    }
}

/// `GET /user` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfileResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub content: Option<Value>,
    #[serde(default)]
    pub message: Option<String>,
}
