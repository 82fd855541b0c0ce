//! Integration test harness for the Blossom storefront client.
//!
//! Spins up an in-process stub of the remote API (axum, ephemeral port)
//! and assembles a real [`ShopClient`] against it. The stub counts every
//! exchange it serves, so tests can assert the client's wire behavior:
//! exactly one refresh under concurrent 401s, exactly one retry per
//! logical call, one merge push per session, and so on.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p blossom-integration-tests
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::unwrap_used)] // test harness: panics are failures

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use serde_json::{Value, json};

use blossom_client::host::HostBridge;
use blossom_client::storage::{KeyValueStore, MemoryStore};
use blossom_client::{ClientConfig, ShopClient};

/// The init-data blob the stub's login endpoint accepts.
pub const VALID_INIT_DATA: &str = "query_id=AAE1&user=%7B%22id%22%3A4242%2C%22first_name%22%3A%22Stub%22%7D&auth_date=1720000000&hash=ok";

/// Shared state of the stub API.
#[derive(Default)]
pub struct StubState {
    /// Access tokens the protected endpoints accept.
    valid_tokens: Mutex<BTreeSet<String>>,
    token_counter: AtomicU64,

    pub login_calls: AtomicUsize,
    pub refresh_calls: AtomicUsize,
    pub me_calls: AtomicUsize,
    pub favorites_list_calls: AtomicUsize,
    pub favorites_sync_calls: AtomicUsize,
    /// Add/remove mutations served, for awaiting background mirroring.
    pub favorites_mutation_calls: AtomicUsize,
    pub products_list_calls: AtomicUsize,
    pub product_detail_calls: AtomicUsize,
    pub categories_calls: AtomicUsize,
    pub orders_create_calls: AtomicUsize,

    /// Make `/auth/telegram/` reject every assertion.
    pub login_fails: AtomicBool,
    /// Make `/auth/refresh/` reject every refresh token.
    pub refresh_fails: AtomicBool,
    /// Mint refresh grants whose access token the protected endpoints
    /// reject (simulates a rapid double-401).
    pub mint_invalid_tokens: AtomicBool,
    /// Hold each refresh exchange open this long, to widen race windows.
    pub refresh_delay_ms: AtomicU64,

    /// Server-side favorites set (product ids).
    pub favorites: Mutex<BTreeSet<i64>>,
}

impl StubState {
    /// Mark a token as accepted by the protected endpoints.
    pub fn accept_token(&self, token: &str) {
        self.valid_tokens.lock().unwrap().insert(token.to_string());
    }

    fn mint_access(&self) -> String {
        let n = self.token_counter.fetch_add(1, Ordering::SeqCst) + 1;
        let access = format!("access-{n}");
        if !self.mint_invalid_tokens.load(Ordering::SeqCst) {
            self.accept_token(&access);
        }
        access
    }

    fn bearer_is_valid(&self, headers: &HeaderMap) -> bool {
        let Some(value) = headers.get("authorization") else {
            return false;
        };
        let Ok(value) = value.to_str() else {
            return false;
        };
        let Some(token) = value.strip_prefix("Bearer ") else {
            return false;
        };
        self.valid_tokens.lock().unwrap().contains(token)
    }

    /// Ids currently in the server-side favorites set.
    pub fn favorite_ids(&self) -> Vec<i64> {
        self.favorites.lock().unwrap().iter().copied().collect()
    }
}

/// A fabricated catalog product, as the stub serves it.
#[must_use]
pub fn product_json(id: i64) -> Value {
    json!({
        "id": id,
        "category_id": 1,
        "title": format!("product-{id}"),
        "slug": format!("product-{id}"),
        "description": "",
        "price": "100",
        "stock": 10,
        "is_active": true,
        "image_url": format!("https://cdn.example.com/{id}.jpg"),
        "created_at": "2025-06-01T10:00:00Z"
    })
}

fn me_json() -> Value {
    json!({
        "id": 7,
        "telegram_id": 4242,
        "first_name": "Stub",
        "last_name": "User",
        "username": "stub"
    })
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"detail": "Authentication credentials were not provided or are invalid."})),
    )
        .into_response()
}

// =============================================================================
// Handlers
// =============================================================================

async fn login(State(state): State<Arc<StubState>>, Json(body): Json<Value>) -> Response {
    state.login_calls.fetch_add(1, Ordering::SeqCst);

    let init_data = body.get("init_data").and_then(Value::as_str).unwrap_or("");
    if state.login_fails.load(Ordering::SeqCst) || init_data.is_empty() {
        return unauthorized();
    }

    let access = state.mint_access();
    let n = state.token_counter.load(Ordering::SeqCst);
    (
        StatusCode::OK,
        Json(json!({
            "user": me_json(),
            "tokens": { "access": access, "refresh": format!("refresh-{n}") }
        })),
    )
        .into_response()
}

async fn refresh(State(state): State<Arc<StubState>>, Json(_body): Json<Value>) -> Response {
    state.refresh_calls.fetch_add(1, Ordering::SeqCst);

    let delay = state.refresh_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
    }

    if state.refresh_fails.load(Ordering::SeqCst) {
        return unauthorized();
    }

    let access = state.mint_access();
    (StatusCode::OK, Json(json!({ "access": access }))).into_response()
}

async fn me(State(state): State<Arc<StubState>>, headers: HeaderMap) -> Response {
    state.me_calls.fetch_add(1, Ordering::SeqCst);
    if !state.bearer_is_valid(&headers) {
        return unauthorized();
    }
    (StatusCode::OK, Json(me_json())).into_response()
}

async fn favorites_list(State(state): State<Arc<StubState>>, headers: HeaderMap) -> Response {
    state.favorites_list_calls.fetch_add(1, Ordering::SeqCst);
    if !state.bearer_is_valid(&headers) {
        return unauthorized();
    }
    let products: Vec<Value> = state.favorite_ids().into_iter().map(product_json).collect();
    (StatusCode::OK, Json(Value::Array(products))).into_response()
}

async fn favorites_add(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !state.bearer_is_valid(&headers) {
        return unauthorized();
    }
    let Some(id) = body.get("product_id").and_then(Value::as_i64) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"detail": "product_id required"})),
        )
            .into_response();
    };
    state.favorites.lock().unwrap().insert(id);
    state.favorites_mutation_calls.fetch_add(1, Ordering::SeqCst);
    (
        StatusCode::OK,
        Json(json!({"detail": "Added to favorites.", "is_favorite": true})),
    )
        .into_response()
}

async fn favorites_remove(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Response {
    if !state.bearer_is_valid(&headers) {
        return unauthorized();
    }
    state.favorites.lock().unwrap().remove(&id);
    state.favorites_mutation_calls.fetch_add(1, Ordering::SeqCst);
    (
        StatusCode::OK,
        Json(json!({"detail": "Removed from favorites.", "is_favorite": false})),
    )
        .into_response()
}

async fn favorites_sync(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state.favorites_sync_calls.fetch_add(1, Ordering::SeqCst);
    if !state.bearer_is_valid(&headers) {
        return unauthorized();
    }
    let pushed: Vec<i64> = body
        .get("product_ids")
        .and_then(Value::as_array)
        .map(|ids| ids.iter().filter_map(Value::as_i64).collect())
        .unwrap_or_default();

    let mut favorites = state.favorites.lock().unwrap();
    let before = favorites.len();
    favorites.extend(pushed.iter().copied());
    let added = favorites.len() - before;

    (
        StatusCode::OK,
        Json(json!({"detail": "Favorites synced.", "added": added, "removed": 0})),
    )
        .into_response()
}

/// Catalog size served by the stub: ids 1..=5, three per page.
const CATALOG_SIZE: i64 = 5;
const PAGE_SIZE: i64 = 3;

async fn products_list(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
    axum::extract::Query(params): axum::extract::Query<std::collections::HashMap<String, String>>,
) -> Response {
    state.products_list_calls.fetch_add(1, Ordering::SeqCst);

    let page: i64 = params.get("page").and_then(|p| p.parse().ok()).unwrap_or(1);
    let host = headers
        .get("host")
        .and_then(|h| h.to_str().ok())
        .unwrap_or("localhost");
    let page_url = |n: i64| format!("http://{host}/api/v1/products/?page={n}");

    let first = (page - 1) * PAGE_SIZE + 1;
    let results: Vec<Value> = (first..=CATALOG_SIZE.min(first + PAGE_SIZE - 1))
        .map(product_json)
        .collect();
    let next = (first + PAGE_SIZE <= CATALOG_SIZE).then(|| page_url(page + 1));
    let previous = (page > 1).then(|| {
        if page == 2 {
            format!("http://{host}/api/v1/products/")
        } else {
            page_url(page - 1)
        }
    });

    (
        StatusCode::OK,
        Json(json!({
            "count": CATALOG_SIZE,
            "next": next,
            "previous": previous,
            "results": results
        })),
    )
        .into_response()
}

async fn product_detail(
    State(state): State<Arc<StubState>>,
    Path(slug): Path<String>,
) -> Response {
    state.product_detail_calls.fetch_add(1, Ordering::SeqCst);
    let id = slug
        .strip_prefix("product-")
        .and_then(|raw| raw.parse::<i64>().ok());
    match id {
        Some(id) if (1..=CATALOG_SIZE).contains(&id) => {
            (StatusCode::OK, Json(product_json(id))).into_response()
        }
        _ => (
            StatusCode::NOT_FOUND,
            Json(json!({"detail": "Not found."})),
        )
            .into_response(),
    }
}

async fn categories(State(state): State<Arc<StubState>>) -> Response {
    state.categories_calls.fetch_add(1, Ordering::SeqCst);
    (
        StatusCode::OK,
        Json(json!([
            {"id": 1, "title": "Bouquets", "slug": "bouquets", "is_active": true},
            {"id": 2, "title": "Potted plants", "slug": "potted-plants", "is_active": true}
        ])),
    )
        .into_response()
}

async fn orders_create(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state.orders_create_calls.fetch_add(1, Ordering::SeqCst);
    if !state.bearer_is_valid(&headers) {
        return unauthorized();
    }
    (
        StatusCode::CREATED,
        Json(json!({
            "id": 1,
            "status": "created",
            "total_amount": "200",
            "customer_name": body.get("customer_name").and_then(Value::as_str).unwrap_or(""),
            "phone": body.get("phone").and_then(Value::as_str).unwrap_or(""),
            "address": body.get("address").and_then(Value::as_str).unwrap_or(""),
            "created_at": "2025-06-02T12:00:00Z",
            "items": [
                {
                    "id": 1,
                    "product_id": 2,
                    "title_snapshot": "product-2",
                    "price_snapshot": "100",
                    "quantity": 2
                }
            ]
        })),
    )
        .into_response()
}

async fn orders_list(State(state): State<Arc<StubState>>, headers: HeaderMap) -> Response {
    if !state.bearer_is_valid(&headers) {
        return unauthorized();
    }
    (
        StatusCode::OK,
        Json(json!({"count": 0, "next": null, "previous": null, "results": []})),
    )
        .into_response()
}

// =============================================================================
// TestContext
// =============================================================================

/// A running stub API plus a real client pointed at it.
pub struct TestContext {
    pub client: ShopClient,
    pub state: Arc<StubState>,
    pub store: Arc<MemoryStore>,
    pub base_url: String,
}

impl TestContext {
    /// Start the stub server and assemble a client with the given host
    /// bridge and an in-memory store.
    pub async fn new(host: Arc<dyn HostBridge>) -> Self {
        let state = Arc::new(StubState::default());

        let api = Router::new()
            .route("/auth/telegram/", post(login))
            .route("/auth/refresh/", post(refresh))
            .route("/auth/me/", get(me))
            .route("/products/", get(products_list))
            .route("/products/categories/", get(categories))
            .route("/products/{slug}/", get(product_detail))
            .route(
                "/products/favorites/",
                get(favorites_list).post(favorites_add),
            )
            .route("/products/favorites/{id}/", delete(favorites_remove))
            .route("/products/favorites/sync/", post(favorites_sync))
            .route("/orders/", get(orders_list).post(orders_create))
            .with_state(state.clone());
        let app = Router::new().nest("/api/v1", api);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        let base_url = format!("http://{addr}/api/v1");
        let store = Arc::new(MemoryStore::new());
        let config = ClientConfig::new(base_url.clone(), "unused");
        let client = ShopClient::with_parts(&config, store.clone(), host);

        Self {
            client,
            state,
            store,
            base_url,
        }
    }

    /// Persist a credential as a previous run would have, so `init()`
    /// restores it without a network round-trip.
    pub fn seed_credential(&self, access: &str, refresh: &str) {
        let snapshot = json!({"access": access, "refresh": refresh}).to_string();
        self.store.save("auth", &snapshot).unwrap();
    }
}
