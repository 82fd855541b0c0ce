//! Wire-level token exchanges.
//!
//! These run over a bare HTTP client, never through the request gateway:
//! the gateway depends on the session for credentials, so the session's own
//! exchanges must sit below it. Neither exchange is retried here beyond the
//! transport's own behavior.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use blossom_core::{Identity, UserId};

use super::Credential;
use crate::error::AuthError;

const LOGIN_PATH: &str = "/auth/telegram/";
const REFRESH_PATH: &str = "/auth/refresh/";

#[derive(Serialize)]
struct LoginRequest<'a> {
    init_data: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    user: WireUser,
    tokens: TokenPair,
}

/// User payload as the auth endpoints serve it (`/auth/telegram/`,
/// `/auth/me/`).
#[derive(Deserialize)]
pub(crate) struct WireUser {
    pub(crate) id: i64,
    pub(crate) telegram_id: i64,
    pub(crate) first_name: String,
    #[serde(default)]
    pub(crate) last_name: Option<String>,
    #[serde(default)]
    pub(crate) username: Option<String>,
}

#[derive(Deserialize)]
struct TokenPair {
    access: String,
    refresh: String,
    /// Access-token lifetime in seconds, when the service reports one.
    #[serde(default)]
    expires_in: Option<i64>,
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    refresh: &'a str,
}

#[derive(Deserialize)]
struct RefreshResponse {
    access: String,
    /// Rotated refresh token, when the service rotates on use.
    #[serde(default)]
    refresh: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// Result of a successful refresh exchange.
pub(super) struct RefreshGrant {
    pub access: SecretString,
    /// Present only when the service rotated the refresh token.
    pub refresh: Option<SecretString>,
    pub expires_hint: Option<i64>,
}

impl From<WireUser> for Identity {
    fn from(user: WireUser) -> Self {
        let display_name = match &user.last_name {
            Some(last) if !last.is_empty() => format!("{} {last}", user.first_name),
            _ => user.first_name.clone(),
        };
        Self {
            user_id: UserId::new(user.id),
            display_name,
            external_id: user.telegram_id,
            username: user.username,
        }
    }
}

/// Exchange a host identity assertion for a fresh credential.
///
/// # Errors
///
/// Returns `AuthError::Rejected` if the service refuses the assertion,
/// `AuthError::Http` on transport failure.
#[instrument(skip_all)]
pub(super) async fn exchange_host_identity(
    client: &reqwest::Client,
    base_url: &str,
    init_data: &str,
) -> Result<(Credential, Identity), AuthError> {
    let now = chrono::Utc::now().timestamp();

    let response = client
        .post(format!("{base_url}{LOGIN_PATH}"))
        .json(&LoginRequest { init_data })
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        return Err(AuthError::Rejected(format!(
            "login exchange failed ({status}): {text}"
        )));
    }

    let login: LoginResponse = response.json().await?;
    let credential = Credential {
        access: SecretString::from(login.tokens.access),
        refresh: SecretString::from(login.tokens.refresh),
        expires_hint: login.tokens.expires_in.map(|secs| now + secs),
    };
    Ok((credential, Identity::from(login.user)))
}

/// Exchange a refresh token for a new access token.
///
/// # Errors
///
/// Returns `AuthError::Rejected` if the service refuses the token,
/// `AuthError::Http` on transport failure.
#[instrument(skip_all)]
pub(super) async fn exchange_refresh_token(
    client: &reqwest::Client,
    base_url: &str,
    refresh_token: &SecretString,
) -> Result<RefreshGrant, AuthError> {
    let now = chrono::Utc::now().timestamp();

    let response = client
        .post(format!("{base_url}{REFRESH_PATH}"))
        .json(&RefreshRequest {
            refresh: refresh_token.expose_secret(),
        })
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        return Err(AuthError::Rejected(format!(
            "token refresh failed ({status}): {text}"
        )));
    }

    let refreshed: RefreshResponse = response.json().await?;
    Ok(RefreshGrant {
        access: SecretString::from(refreshed.access),
        refresh: refreshed.refresh.map(SecretString::from),
        expires_hint: refreshed.expires_in.map(|secs| now + secs),
    })
}
