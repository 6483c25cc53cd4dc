pub mod bet;
pub mod chips;
pub mod market;
pub mod wallet;

pub use bet::*;
pub use chips::*;
pub use market::*;
pub use wallet::*;

use serde::{Deserialize, Deserializer, Serialize};

/// The backend's `{status, content}` response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    pub content: T,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> Envelope<T> {
    /// Responses without a status field are treated as successful.
    pub fn is_success(&self) -> bool {
        self.status
            .as_deref()
            .map_or(true, |s| s.eq_ignore_ascii_case("success"))
    }

    pub fn into_content(self) -> T {
        self.content
    }
}

/// `limit`/`offset` pagination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub limit: u32,
    pub offset: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: 20,
            offset: 0,
        }
    }
}

/// Accept an identifier sent either as a JSON string or a number.
pub(crate) fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Str(String),
        Num(i64),
    }

    Ok(Option::<Id>::deserialize(deserializer)?.map(|id| match id {
        Id::Str(s) => s,
        Id::Num(n) => n.to_string(),
    }))
}
