//! Remote admin API: auth and quick-add.

pub mod client;
pub mod errors;
pub mod session;

pub use client::AdminClient;
pub use errors::ApiError;
pub use session::Session;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::snapshot::ProductSnapshot;

/// Message shown when the server gave no usable reason
pub const SERVER_ERROR: &str = "Server error";

/// Body of a quick-add reply.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuickAddReply {
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item: Option<SavedItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SavedItem {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReplyBody {
    /// Parsed JSON; `Null` when the server claimed JSON but sent garbage
    Json(Value),
    Text(String),
}

/// Status and body of a call whose outcome the caller interprets itself.
#[derive(Debug, Clone, PartialEq)]
pub struct RawReply {
    pub status: u16,
    pub body: ReplyBody,
}

impl RawReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The admin endpoints used by the popup and background flows.
pub trait AdminApi: Send + Sync {
    /// `true` when the stored session is accepted. Any failure counts as `false`.
    fn check_auth(&self) -> bool;

    fn login(&self, email: &str, password: &str) -> Result<(), ApiError>;

    /// Post `{url}`. Only transport failures are errors.
    fn quick_add_url(&self, url: &str) -> Result<RawReply, ApiError>;

    /// Post `{snapshot}`. `Ok` only for a 2xx reply with `success: true`.
    fn quick_add_snapshot(&self, snapshot: &ProductSnapshot) -> Result<QuickAddReply, ApiError>;
}
