//! Token refresh behavior: single-flight, bounded retry, teardown races.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::sync::atomic::Ordering;

use secrecy::ExposeSecret;

use blossom_client::host::DetachedHost;
use blossom_client::storage::KeyValueStore;
use blossom_client::{AuthError, SessionState};
use blossom_integration_tests::TestContext;

/// A context whose session holds a persisted access token the stub no
/// longer accepts, with a refresh exchange standing by.
async fn context_with_stale_token() -> TestContext {
    let ctx = TestContext::new(Arc::new(DetachedHost)).await;
    ctx.seed_credential("stale-access", "refresh-0");
    assert_eq!(
        ctx.client.session().init().await,
        SessionState::Authenticated
    );
    ctx
}

#[tokio::test]
async fn test_401_refreshes_and_retries_exactly_once() {
    let ctx = context_with_stale_token().await;

    let identity = ctx.client.fetch_identity().await.unwrap();
    assert_eq!(identity.external_id, 4242);

    assert_eq!(ctx.state.refresh_calls.load(Ordering::SeqCst), 1);
    // Original attempt plus one retry, never two.
    assert_eq!(ctx.state.me_calls.load(Ordering::SeqCst), 2);
    assert_eq!(
        ctx.client
            .session()
            .access_token()
            .unwrap()
            .expose_secret(),
        "access-1"
    );
}

#[tokio::test]
async fn test_concurrent_refresh_calls_share_one_exchange() {
    let ctx = context_with_stale_token().await;
    ctx.state.refresh_delay_ms.store(100, Ordering::SeqCst);

    let session = ctx.client.session();
    let (a, b, c) = tokio::join!(session.refresh(), session.refresh(), session.refresh());

    // One exchange on the wire; every caller resolved to its token.
    assert_eq!(ctx.state.refresh_calls.load(Ordering::SeqCst), 1);
    for result in [a, b, c] {
        assert_eq!(result.unwrap().expose_secret(), "access-1");
    }

    // The persisted credential was replaced exactly once, with the token
    // the single exchange minted.
    let stored = ctx.store.load("auth").unwrap().unwrap();
    let stored: serde_json::Value = serde_json::from_str(&stored).unwrap();
    assert_eq!(stored["access"], "access-1");
}

#[tokio::test]
async fn test_concurrent_401s_share_one_refresh() {
    let ctx = context_with_stale_token().await;
    ctx.state.refresh_delay_ms.store(100, Ordering::SeqCst);

    // Five logical calls hit 401 together; the gateway funnels them into
    // a single refresh and each retries with the shared result.
    let (a, b, c, d, e) = tokio::join!(
        ctx.client.fetch_identity(),
        ctx.client.fetch_identity(),
        ctx.client.fetch_identity(),
        ctx.client.fetch_identity(),
        ctx.client.fetch_identity(),
    );
    for result in [a, b, c, d, e] {
        assert_eq!(result.unwrap().external_id, 4242);
    }

    assert_eq!(ctx.state.refresh_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_refresh_failure_surfaces_original_401_and_degrades() {
    let ctx = context_with_stale_token().await;
    ctx.state.refresh_fails.store(true, Ordering::SeqCst);

    let error = ctx.client.fetch_identity().await.unwrap_err();
    assert!(error.is_unauthorized());

    // No retry happened - the original unauthorized outcome is what the
    // caller sees.
    assert_eq!(ctx.state.me_calls.load(Ordering::SeqCst), 1);

    // Logical logout: session degraded silently, storage cleared.
    assert_eq!(ctx.client.session().state(), SessionState::Anonymous);
    assert!(ctx.client.session().access_token().is_none());
    assert!(ctx.store.load("auth").unwrap().is_none());
}

#[tokio::test]
async fn test_second_401_is_terminal() {
    let ctx = context_with_stale_token().await;
    // The refresh succeeds, but the token it mints is rejected too.
    ctx.state.mint_invalid_tokens.store(true, Ordering::SeqCst);

    let error = ctx.client.fetch_identity().await.unwrap_err();
    assert!(error.is_unauthorized());

    assert_eq!(ctx.state.refresh_calls.load(Ordering::SeqCst), 1);
    // Original attempt plus exactly one retry; the second 401 stops the
    // recovery instead of looping.
    assert_eq!(ctx.state.me_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_logout_during_inflight_refresh_is_not_resurrected() {
    let ctx = context_with_stale_token().await;
    ctx.state.refresh_delay_ms.store(200, Ordering::SeqCst);

    let session = ctx.client.session().clone();
    let refresh = tokio::spawn(async move { session.refresh().await });

    // Let the exchange reach the wire, then tear the session down.
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    ctx.client.logout();

    let result = refresh.await.unwrap();
    assert!(matches!(result, Err(AuthError::SessionCleared)));

    // The late resolution must not resurrect the cleared session.
    assert_eq!(ctx.client.session().state(), SessionState::Anonymous);
    assert!(ctx.client.session().access_token().is_none());
    assert!(ctx.store.load("auth").unwrap().is_none());
}

#[tokio::test]
async fn test_valid_token_never_touches_refresh() {
    let ctx = TestContext::new(Arc::new(DetachedHost)).await;
    ctx.seed_credential("good-access", "refresh-0");
    ctx.state.accept_token("good-access");
    ctx.client.session().init().await;

    ctx.client.fetch_identity().await.unwrap();

    assert_eq!(ctx.state.refresh_calls.load(Ordering::SeqCst), 0);
    assert_eq!(ctx.state.me_calls.load(Ordering::SeqCst), 1);
}
