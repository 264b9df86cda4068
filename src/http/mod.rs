//! HTTP surface: router, shared state, and route handlers.

pub mod auth;
pub mod cart;
pub mod orders;
pub mod products;

use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use sqlx::postgres::PgPool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::checkout::CheckoutService;
use crate::domain::events::OrderEvent;
use crate::store::{PgCartStore, PgCatalogStore, PgOrderStore, PgUserStore};

pub type PgCheckoutService =
    CheckoutService<PgCatalogStore, PgCartStore, PgOrderStore, PgUserStore>;

#[derive(Clone)]
pub struct AppState {
    pub catalog: PgCatalogStore,
    pub carts: PgCartStore,
    pub orders: PgOrderStore,
    pub checkout: PgCheckoutService,
    pub nats: Option<async_nats::Client>,
}

impl AppState {
    pub fn new(db: PgPool, nats: Option<async_nats::Client>) -> Self {
        let catalog = PgCatalogStore::new(db.clone());
        let carts = PgCartStore::new(db.clone());
        let orders = PgOrderStore::new(db.clone());
        let users = PgUserStore::new(db);
        let checkout =
            CheckoutService::new(catalog.clone(), carts.clone(), orders.clone(), users);
        Self { catalog, carts, orders, checkout, nats }
    }
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "agromart"})) }))
        .route("/api/products", get(products::list).post(products::create))
        .route("/api/products/:id", get(products::get).put(products::update).delete(products::remove))
        .route("/api/cart", get(cart::get))
        .route("/api/cart/add", post(cart::add))
        .route("/api/cart/update", put(cart::update))
        .route("/api/cart/remove/:product_id", delete(cart::remove))
        .route("/api/cart/clear", delete(cart::clear))
        .route("/api/orders", get(orders::list).post(orders::create))
        .route("/api/orders/:id", get(orders::get))
        .route("/api/orders/:id/cancel", put(orders::cancel))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Fire-and-forget publish; a missing or failing bus never affects the
/// request outcome.
pub(crate) async fn publish_order_event(nats: &Option<async_nats::Client>, event: &OrderEvent) {
    let Some(client) = nats else { return };
    match serde_json::to_vec(event) {
        Ok(payload) => {
            if let Err(err) = client.publish(event.subject().to_string(), payload.into()).await {
                tracing::warn!(error = %err, subject = event.subject(), "failed to publish order event");
            }
        }
        Err(err) => tracing::warn!(error = %err, "failed to serialize order event"),
    }
}
