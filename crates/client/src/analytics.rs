//! Best-effort analytics sidecar.
//!
//! Events are queued onto a channel and delivered by a background task:
//! debounced batches for low-value events, immediate sends for conversion
//! events that must beat a page transition. Delivery failures are logged
//! and dropped - telemetry never blocks the UI, never triggers a token
//! refresh, and never surfaces an error.

use std::time::Duration;

use secrecy::ExposeSecret;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;

use blossom_core::{CategoryId, OrderId, ProductId};

use crate::auth::AuthSession;

const TRACK_PATH: &str = "/analytics/track/";
const TRACK_BATCH_PATH: &str = "/analytics/track/batch/";

/// Flush after this many queued events regardless of the debounce timer.
const BATCH_LIMIT: usize = 5;
/// Quiet period after the last queued event before a batch goes out.
const DEBOUNCE: Duration = Duration::from_millis(500);

/// Event vocabulary shared with the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    AppOpen,
    ProductView,
    ProductClick,
    CartAdd,
    CartRemove,
    CategoryView,
    Search,
    CheckoutStart,
    OrderComplete,
}

#[derive(Debug, Clone, Serialize)]
struct EventRecord {
    event_type: EventKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    product_id: Option<ProductId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    category_id: Option<CategoryId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    search_query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<serde_json::Value>,
    session_id: Uuid,
}

impl EventRecord {
    fn new(event_type: EventKind, session_id: Uuid) -> Self {
        Self {
            event_type,
            product_id: None,
            category_id: None,
            search_query: None,
            metadata: None,
            session_id,
        }
    }
}

enum Command {
    Queue(EventRecord),
    Immediate(EventRecord),
    Flush(oneshot::Sender<()>),
}

/// Queues and delivers analytics events.
#[derive(Clone)]
pub struct AnalyticsTracker {
    tx: mpsc::UnboundedSender<Command>,
    session_id: Uuid,
}

impl AnalyticsTracker {
    /// Create the tracker and spawn its delivery task.
    ///
    /// Must be called within a Tokio runtime.
    #[must_use]
    pub fn new(http: reqwest::Client, base_url: impl Into<String>, session: AuthSession) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let session_id = Uuid::new_v4();
        tokio::spawn(run_delivery_worker(rx, http, base_url.into(), session));
        Self { tx, session_id }
    }

    // =========================================================================
    // Tracking API
    // =========================================================================

    pub fn track_app_open(&self) {
        self.queue(EventRecord::new(EventKind::AppOpen, self.session_id));
    }

    /// Product page opened. Sent immediately.
    pub fn track_product_view(&self, product_id: ProductId) {
        let mut event = EventRecord::new(EventKind::ProductView, self.session_id);
        event.product_id = Some(product_id);
        self.immediate(event);
    }

    /// Catalog tile clicked. Sent immediately - the user is navigating away.
    pub fn track_product_click(&self, product_id: ProductId) {
        let mut event = EventRecord::new(EventKind::ProductClick, self.session_id);
        event.product_id = Some(product_id);
        self.immediate(event);
    }

    /// Added to cart. Sent immediately - conversion signal.
    pub fn track_cart_add(&self, product_id: ProductId, quantity: u32) {
        let mut event = EventRecord::new(EventKind::CartAdd, self.session_id);
        event.product_id = Some(product_id);
        event.metadata = Some(serde_json::json!({ "quantity": quantity }));
        self.immediate(event);
    }

    /// Removed from cart. Sent immediately.
    pub fn track_cart_remove(&self, product_id: ProductId) {
        let mut event = EventRecord::new(EventKind::CartRemove, self.session_id);
        event.product_id = Some(product_id);
        self.immediate(event);
    }

    pub fn track_category_view(&self, category_id: CategoryId) {
        let mut event = EventRecord::new(EventKind::CategoryView, self.session_id);
        event.category_id = Some(category_id);
        self.queue(event);
    }

    /// Search issued. Blank queries are dropped.
    pub fn track_search(&self, query: &str) {
        let query = query.trim();
        if query.is_empty() {
            return;
        }
        let mut event = EventRecord::new(EventKind::Search, self.session_id);
        event.search_query = Some(query.to_string());
        self.queue(event);
    }

    /// Checkout begun. Sent immediately - conversion signal.
    pub fn track_checkout_start(&self) {
        self.immediate(EventRecord::new(EventKind::CheckoutStart, self.session_id));
    }

    /// Order placed. Sent immediately - conversion signal.
    pub fn track_order_complete(&self, order_id: OrderId, total: rust_decimal::Decimal) {
        let mut event = EventRecord::new(EventKind::OrderComplete, self.session_id);
        event.metadata = Some(serde_json::json!({ "order_id": order_id, "total": total }));
        self.immediate(event);
    }

    /// Force-deliver everything queued and wait for the attempt to finish.
    pub async fn flush(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.tx.send(Command::Flush(ack_tx)).is_ok() {
            let _ = ack_rx.await;
        }
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn queue(&self, event: EventRecord) {
        if self.tx.send(Command::Queue(event)).is_err() {
            debug!("analytics worker unavailable, dropping event");
        }
    }

    fn immediate(&self, event: EventRecord) {
        if self.tx.send(Command::Immediate(event)).is_err() {
            debug!("analytics worker unavailable, dropping event");
        }
    }
}

async fn run_delivery_worker(
    mut rx: mpsc::UnboundedReceiver<Command>,
    http: reqwest::Client,
    base_url: String,
    session: AuthSession,
) {
    let mut queue: Vec<EventRecord> = Vec::new();
    let mut deadline: Option<Instant> = None;

    loop {
        let sleep_until = deadline.unwrap_or_else(|| Instant::now() + Duration::from_secs(3600));
        tokio::select! {
            command = rx.recv() => match command {
                None => {
                    // Tracker dropped; deliver what's left and stop.
                    deliver_batch(&http, &base_url, &session, &mut queue).await;
                    break;
                }
                Some(Command::Queue(event)) => {
                    queue.push(event);
                    if queue.len() >= BATCH_LIMIT {
                        deliver_batch(&http, &base_url, &session, &mut queue).await;
                        deadline = None;
                    } else {
                        deadline = Some(Instant::now() + DEBOUNCE);
                    }
                }
                Some(Command::Immediate(event)) => {
                    deliver_single(&http, &base_url, &session, event).await;
                }
                Some(Command::Flush(ack)) => {
                    deliver_batch(&http, &base_url, &session, &mut queue).await;
                    deadline = None;
                    let _ = ack.send(());
                }
            },
            () = tokio::time::sleep_until(sleep_until), if deadline.is_some() => {
                deliver_batch(&http, &base_url, &session, &mut queue).await;
                deadline = None;
            }
        }
    }
}

async fn deliver_batch(
    http: &reqwest::Client,
    base_url: &str,
    session: &AuthSession,
    queue: &mut Vec<EventRecord>,
) {
    if queue.is_empty() {
        return;
    }
    let events = std::mem::take(queue);
    let body = serde_json::json!({ "events": events });
    post_best_effort(http, base_url, session, TRACK_BATCH_PATH, &body).await;
}

async fn deliver_single(
    http: &reqwest::Client,
    base_url: &str,
    session: &AuthSession,
    event: EventRecord,
) {
    let body = match serde_json::to_value(&event) {
        Ok(body) => body,
        Err(error) => {
            warn!(%error, "failed to encode analytics event");
            return;
        }
    };
    post_best_effort(http, base_url, session, TRACK_PATH, &body).await;
}

/// Fire one POST with the current bearer token, outside the gateway: a 401
/// here must not trigger a refresh storm over telemetry.
async fn post_best_effort(
    http: &reqwest::Client,
    base_url: &str,
    session: &AuthSession,
    path: &str,
    body: &serde_json::Value,
) {
    let mut builder = http.post(format!("{base_url}{path}")).json(body);
    if let Some(token) = session.access_token() {
        builder = builder.bearer_auth(token.expose_secret());
    }
    match builder.send().await {
        Ok(response) if !response.status().is_success() => {
            warn!(status = %response.status(), "analytics delivery rejected");
        }
        Ok(_) => {}
        Err(error) => {
            warn!(%error, "analytics delivery failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::DetachedHost;
    use crate::storage::MemoryStore;
    use std::sync::Arc;

    fn tracker() -> AnalyticsTracker {
        let session = AuthSession::new(
            reqwest::Client::new(),
            "http://127.0.0.1:1/api/v1",
            Arc::new(MemoryStore::new()),
            Arc::new(DetachedHost),
        );
        AnalyticsTracker::new(reqwest::Client::new(), "http://127.0.0.1:1/api/v1", session)
    }

    #[test]
    fn test_event_kind_wire_names() {
        assert_eq!(
            serde_json::to_string(&EventKind::CartAdd).unwrap(),
            "\"cart_add\""
        );
        assert_eq!(
            serde_json::to_string(&EventKind::OrderComplete).unwrap(),
            "\"order_complete\""
        );
    }

    #[test]
    fn test_event_record_omits_empty_fields() {
        let record = EventRecord::new(EventKind::AppOpen, Uuid::nil());
        let value = serde_json::to_value(&record).unwrap();
        let object = value.as_object().unwrap();
        assert!(object.contains_key("event_type"));
        assert!(object.contains_key("session_id"));
        assert!(!object.contains_key("product_id"));
        assert!(!object.contains_key("metadata"));
    }

    #[tokio::test]
    async fn test_flush_with_empty_queue_completes() {
        let tracker = tracker();
        // Nothing queued: the worker acks without touching the network.
        tracker.flush().await;
    }

    #[tokio::test]
    async fn test_blank_search_is_dropped() {
        let tracker = tracker();
        tracker.track_search("   ");
        // Nothing to deliver, so flush returns immediately.
        tracker.flush().await;
    }
}
