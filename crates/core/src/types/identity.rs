//! Authenticated user identity.

use serde::{Deserialize, Serialize};

use super::id::UserId;

/// The identity attached to an authenticated session.
///
/// Created from a successful login exchange or restored alongside a cached
/// credential; cleared on logout or irrecoverable refresh failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: UserId,
    /// Human-readable name for greeting chrome.
    pub display_name: String,
    /// The user's id in the host platform (stable across sessions).
    pub external_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}
