//! Host-identity bootstrap: login exchange, single-flight init, the
//! assertion-path 401 recovery.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::sync::atomic::Ordering;

use blossom_client::SessionState;
use blossom_client::host::{DetachedHost, TelegramHost};
use blossom_integration_tests::{TestContext, VALID_INIT_DATA};

fn telegram_host() -> Arc<TelegramHost> {
    Arc::new(TelegramHost::new(VALID_INIT_DATA))
}

#[tokio::test]
async fn test_bootstrap_via_host_assertion() {
    let ctx = TestContext::new(telegram_host()).await;

    let state = ctx.client.session().init().await;

    assert_eq!(state, SessionState::Authenticated);
    assert_eq!(ctx.state.login_calls.load(Ordering::SeqCst), 1);
    assert!(ctx.client.session().access_token().is_some());
    // Identity came from the login response.
    let identity = ctx.client.session().identity().unwrap();
    assert_eq!(identity.external_id, 4242);
}

#[tokio::test]
async fn test_concurrent_init_shares_single_login_exchange() {
    let ctx = TestContext::new(telegram_host()).await;

    let (a, b) = tokio::join!(ctx.client.session().init(), ctx.client.session().init());

    assert_eq!(a, SessionState::Authenticated);
    assert_eq!(b, SessionState::Authenticated);
    assert_eq!(ctx.state.login_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_assertion_request_reinits_and_retries_once() {
    // No persisted credential and no init(): the first request goes out
    // with the raw assertion header, which protected endpoints reject.
    let ctx = TestContext::new(telegram_host()).await;

    let identity = ctx.client.fetch_identity().await.unwrap();
    assert_eq!(identity.external_id, 4242);

    // 401 -> one login exchange -> one retry with the fresh bearer.
    assert_eq!(ctx.state.login_calls.load(Ordering::SeqCst), 1);
    assert_eq!(ctx.state.me_calls.load(Ordering::SeqCst), 2);
    assert_eq!(ctx.client.session().state(), SessionState::Authenticated);
}

#[tokio::test]
async fn test_login_failure_settles_anonymous() {
    let ctx = TestContext::new(telegram_host()).await;
    ctx.state.login_fails.store(true, Ordering::SeqCst);

    let state = ctx.client.session().init().await;

    assert_eq!(state, SessionState::Anonymous);
    assert_eq!(ctx.state.login_calls.load(Ordering::SeqCst), 1);
    assert!(ctx.client.session().access_token().is_none());
}

#[tokio::test]
async fn test_detached_host_has_no_recovery_path() {
    let ctx = TestContext::new(Arc::new(DetachedHost)).await;
    ctx.client.session().init().await;

    let error = ctx.client.fetch_identity().await.unwrap_err();
    assert!(error.is_unauthorized());

    // Nothing to recover with: no retry, no exchanges.
    assert_eq!(ctx.state.me_calls.load(Ordering::SeqCst), 1);
    assert_eq!(ctx.state.login_calls.load(Ordering::SeqCst), 0);
    assert_eq!(ctx.state.refresh_calls.load(Ordering::SeqCst), 0);
}
