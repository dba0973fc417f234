//! API routes for sms-notifier

pub mod health;
pub mod templates;
pub mod test_intake;
pub mod webhook;

use crate::state::AppState;
use axum::Router;
use axum::routing::{get, post, put};
use tower_http::trace::TraceLayer;

/// Create the combined router
pub fn create_router(state: AppState) -> Router {
    // Signed Shopify webhook (raw body)
    let webhook = Router::new().route("/webhook/order", post(webhook::handle_order_webhook));

    let templates = Router::new()
        .route("/templates", get(templates::list).put(templates::replace))
        .route("/templates/reset", post(templates::reset))
        .route("/templates/{key}", put(templates::upsert));

    let mut app = Router::new()
        .route("/health", get(health::health_check))
        .merge(webhook)
        .merge(templates);

    if state.config.enable_test_routes {
        tracing::warn!("Test routes enabled: /test/webhook/order and /test/sms accept unsigned requests");
        app = app
            .route("/test/webhook/order", post(test_intake::test_order_webhook))
            .route("/test/sms", get(test_intake::test_sms));
    }

    app.layer(TraceLayer::new_for_http()).with_state(state)
}
