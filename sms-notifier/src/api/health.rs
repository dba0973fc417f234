//! Health check endpoint

use axum::Json;
use axum::extract::State;

use crate::state::AppState;

pub async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "sms-notifier",
        "version": env!("CARGO_PKG_VERSION"),
        "environment": state.config.environment,
        "template_store": state.templates.backend().describe(),
        "time": chrono::Utc::now().to_rfc3339(),
    }))
}
