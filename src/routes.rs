//! Router assembly.

use axum::routing::{get, post, put};
use axum::{Json, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{cart, checkout, negotiation, orders, returns};
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/cart", get(cart::get_cart).delete(cart::clear_cart))
        .route("/api/cart/items", post(cart::add_item))
        .route(
            "/api/cart/items/:product_id",
            put(cart::update_item).delete(cart::remove_item),
        )
        .route("/api/cart/coupon", post(cart::apply_coupon).delete(cart::remove_coupon))
        .route("/api/cart/merge", post(cart::merge_cart))
        .route("/api/orders/summary", post(checkout::generate_summary))
        .route("/api/orders", post(checkout::create_order).get(orders::list_my_orders))
        .route("/api/orders/return", post(returns::request_return))
        .route("/api/orders/return/:id", get(returns::get_return))
        .route("/api/orders/replacement", post(returns::request_replacement))
        .route("/api/orders/admin/all", get(orders::list_all_orders))
        .route("/api/orders/admin/:id/status", put(orders::update_status))
        .route("/api/orders/admin/:id/invoice/send", post(orders::send_invoice))
        .route("/api/orders/admin/return/:id", put(returns::process_return))
        .route("/api/orders/admin/replacement/:id", put(returns::process_replacement))
        .route("/api/orders/:id", get(orders::get_order))
        .route("/api/negotiations", post(negotiation::submit))
        .route("/api/negotiations/admin/:id", put(negotiation::process))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "healthy", "service": "storefront-api" }))
}
