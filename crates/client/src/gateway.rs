//! Authenticated request gateway.
//!
//! Wraps every outbound call: injects the current credential, detects
//! authorization failure, and drives the recovery path - a single refresh
//! (bearer) or re-init (host assertion) followed by exactly one retry. The
//! refresh itself is single-flight inside [`AuthSession`], so any number of
//! concurrent 401s produce at most one exchange on the wire.
//!
//! The retry is issued with the token the refresh *returned*, not re-read
//! from shared state: a third refresh starting after ours resolved must not
//! swap the token under us mid-retry.

use std::sync::Arc;

use reqwest::{Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::auth::AuthSession;
use crate::error::ApiError;
use crate::host::HostBridge;

/// Header carrying the raw host identity assertion when no bearer token
/// exists yet.
pub const HOST_ASSERTION_HEADER: &str = "X-Telegram-Init-Data";

/// Credential attached to an outbound request.
enum AttachedCredential {
    Bearer(SecretString),
    HostAssertion(String),
    None,
}

struct GatewayInner {
    http: reqwest::Client,
    base_url: String,
    session: AuthSession,
    host: Arc<dyn HostBridge>,
}

/// Sends requests to the remote API with credential injection and bounded
/// 401 recovery.
#[derive(Clone)]
pub struct RequestGateway {
    inner: Arc<GatewayInner>,
}

impl RequestGateway {
    #[must_use]
    pub fn new(
        http: reqwest::Client,
        base_url: impl Into<String>,
        session: AuthSession,
        host: Arc<dyn HostBridge>,
    ) -> Self {
        Self {
            inner: Arc::new(GatewayInner {
                http,
                base_url: base_url.into(),
                session,
                host,
            }),
        }
    }

    /// The session this gateway authenticates with.
    #[must_use]
    pub fn session(&self) -> &AuthSession {
        &self.inner.session
    }

    // =========================================================================
    // Typed helpers
    // =========================================================================

    /// GET expecting a JSON body.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` on transport failure, terminal status, or decode
    /// mismatch.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send(Method::GET, path, &[], None)
            .await?
            .ok_or(ApiError::EmptyResponse)
    }

    /// GET with query pairs, expecting a JSON body.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` on transport failure, terminal status, or decode
    /// mismatch.
    pub async fn get_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        self.send(Method::GET, path, query, None)
            .await?
            .ok_or(ApiError::EmptyResponse)
    }

    /// POST a JSON body, expecting a JSON body back.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` on transport failure, terminal status, or decode
    /// mismatch.
    pub async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &impl Serialize,
    ) -> Result<T, ApiError> {
        let body = serde_json::to_value(body)?;
        self.send(Method::POST, path, &[], Some(body))
            .await?
            .ok_or(ApiError::EmptyResponse)
    }

    /// DELETE, tolerating an empty (204) response.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` on transport failure or terminal status.
    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, ApiError> {
        self.send(Method::DELETE, path, &[], None).await
    }

    // =========================================================================
    // Core send path
    // =========================================================================

    /// Issue one logical call with credential injection and at most one
    /// retry after an authorization failure.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Http` on transport failure, `ApiError::Status`
    /// for a terminal non-2xx outcome (including a second 401), or
    /// `ApiError::Decode` when the body does not parse.
    pub async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<serde_json::Value>,
    ) -> Result<Option<T>, ApiError> {
        let attached = self.resolve_credential();
        let response = self
            .dispatch(&method, path, query, body.as_ref(), &attached)
            .await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            match attached {
                AttachedCredential::Bearer(_) => {
                    debug!(path, "received 401, attempting token refresh");
                    match self.inner.session.refresh().await {
                        Ok(fresh_token) => {
                            let retry = self
                                .dispatch(
                                    &method,
                                    path,
                                    query,
                                    body.as_ref(),
                                    &AttachedCredential::Bearer(fresh_token),
                                )
                                .await?;
                            return Self::finalize(retry).await;
                        }
                        Err(error) => {
                            debug!(path, %error, "refresh failed, surfacing original 401");
                            return Err(Self::error_from_response(response).await);
                        }
                    }
                }
                AttachedCredential::HostAssertion(_) => {
                    debug!(path, "received 401 on assertion path, re-initializing session");
                    self.inner.session.init().await;
                    if let Some(token) = self.inner.session.access_token() {
                        let retry = self
                            .dispatch(
                                &method,
                                path,
                                query,
                                body.as_ref(),
                                &AttachedCredential::Bearer(token),
                            )
                            .await?;
                        return Self::finalize(retry).await;
                    }
                    return Err(Self::error_from_response(response).await);
                }
                AttachedCredential::None => {}
            }
        }

        Self::finalize(response).await
    }

    /// Prefer the session's bearer token; fall back to the host assertion.
    fn resolve_credential(&self) -> AttachedCredential {
        if let Some(token) = self.inner.session.access_token() {
            return AttachedCredential::Bearer(token);
        }
        match self.inner.host.init_data() {
            Some(init_data) if !init_data.is_empty() => {
                AttachedCredential::HostAssertion(init_data)
            }
            _ => AttachedCredential::None,
        }
    }

    async fn dispatch(
        &self,
        method: &Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&serde_json::Value>,
        attached: &AttachedCredential,
    ) -> Result<reqwest::Response, ApiError> {
        let mut builder = self
            .inner
            .http
            .request(method.clone(), format!("{}{path}", self.inner.base_url));
        if !query.is_empty() {
            builder = builder.query(query);
        }
        builder = match attached {
            AttachedCredential::Bearer(token) => builder.bearer_auth(token.expose_secret()),
            AttachedCredential::HostAssertion(init_data) => {
                builder.header(HOST_ASSERTION_HEADER, init_data)
            }
            AttachedCredential::None => builder,
        };
        if let Some(body) = body {
            builder = builder.json(body);
        }
        Ok(builder.send().await?)
    }

    async fn finalize<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<Option<T>, ApiError> {
        let status = response.status();
        if !status.is_success() {
            return Err(Self::error_from_response(response).await);
        }
        if status == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        let text = response.text().await?;
        if text.is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(&text)?))
    }

    async fn error_from_response(response: reqwest::Response) -> ApiError {
        let status = response.status();
        let body = response.json::<serde_json::Value>().await.ok();
        ApiError::from_status(status, body)
    }
}
