//! Host runtime identity bridge.
//!
//! The embedding mini-app host supplies a signed identity assertion (the
//! "init data" blob): a query-string-encoded payload carrying the user's
//! profile, an auth date, and a signature the remote service verifies. The
//! client never validates the signature itself; it forwards the blob once to
//! bootstrap a session.
//!
//! The bridge is injected as a capability (`Arc<dyn HostBridge>`) so the
//! session core stays testable outside any real host.

use serde::Deserialize;

/// User profile embedded in the host identity assertion.
///
/// Parsed best-effort for display purposes only; the authoritative identity
/// comes from the login exchange.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HostUser {
    pub id: i64,
    pub first_name: String,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

impl HostUser {
    /// First and last name joined for greeting chrome.
    #[must_use]
    pub fn display_name(&self) -> String {
        match &self.last_name {
            Some(last) if !last.is_empty() => format!("{} {last}", self.first_name),
            _ => self.first_name.clone(),
        }
    }
}

/// Capability provided by the surrounding runtime.
pub trait HostBridge: Send + Sync {
    /// The raw signed identity assertion, when the host supplies one.
    fn init_data(&self) -> Option<String>;

    /// Whether an assertion is available to bootstrap authentication.
    fn available(&self) -> bool {
        self.init_data().is_some_and(|data| !data.is_empty())
    }

    /// The user profile parsed out of the assertion's `user` field.
    fn user(&self) -> Option<HostUser> {
        parse_user(&self.init_data()?)
    }
}

fn parse_user(init_data: &str) -> Option<HostUser> {
    let encoded = url::form_urlencoded::parse(init_data.as_bytes())
        .find(|(key, _)| key == "user")
        .map(|(_, value)| value.into_owned())?;
    serde_json::from_str(&encoded).ok()
}

/// Bridge for a client embedded in the Telegram mini-app shell.
///
/// The shell hands over its init data string at startup (or via the
/// `TELEGRAM_INIT_DATA` environment variable for development runs).
#[derive(Debug, Clone)]
pub struct TelegramHost {
    init_data: String,
}

impl TelegramHost {
    #[must_use]
    pub fn new(init_data: impl Into<String>) -> Self {
        Self {
            init_data: init_data.into(),
        }
    }
}

impl HostBridge for TelegramHost {
    fn init_data(&self) -> Option<String> {
        if self.init_data.is_empty() {
            None
        } else {
            Some(self.init_data.clone())
        }
    }
}

/// Bridge for runs outside any host (plain browser, tests).
#[derive(Debug, Clone, Copy, Default)]
pub struct DetachedHost;

impl HostBridge for DetachedHost {
    fn init_data(&self) -> Option<String> {
        None
    }
}
