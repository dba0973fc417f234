//! Shopify order webhook
//!
//! POST /webhook/order: raw body, verified against `X-Shopify-Hmac-Sha256`
//! before anything is parsed.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use shared::error::{ApiResponse, AppError, AppResult, ErrorCode};

use crate::notify::dispatcher::{DispatchMode, DispatchReport, TagState};
use crate::notify::event::OrderChangeEvent;
use crate::shopify::verify_webhook_hmac;
use crate::state::AppState;

pub const HMAC_HEADER: &str = "x-shopify-hmac-sha256";

pub async fn handle_order_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<ApiResponse<DispatchReport>> {
    let Some(signature) = headers.get(HMAC_HEADER).and_then(|v| v.to_str().ok()) else {
        tracing::warn!("Missing Shopify HMAC header");
        return Err(AppError::new(ErrorCode::SignatureMissing));
    };

    if let Err(e) = verify_webhook_hmac(&body, signature, &state.config.shopify_webhook_secret) {
        tracing::warn!(error = e, "Webhook signature verification failed");
        return Err(AppError::with_message(ErrorCode::SignatureInvalid, e));
    }

    let payload: serde_json::Value = serde_json::from_slice(&body).map_err(|e| {
        tracing::warn!(%e, "Failed to parse webhook JSON");
        AppError::with_message(ErrorCode::OrderPayloadInvalid, format!("Invalid JSON body: {e}"))
    })?;

    let topic = headers
        .get("x-shopify-topic")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown");
    tracing::info!(
        topic,
        order_id = %payload["id"],
        tags = %payload["tags"],
        "Received Shopify order webhook"
    );

    let event = OrderChangeEvent::from_payload(&payload).inspect_err(|e| {
        tracing::warn!(error = %e, "Shopify order validation failed");
    })?;

    let report = state.dispatcher.dispatch(&event, &DispatchMode::Production).await?;

    let message = if report.tags_in(TagState::Sent).is_empty() {
        "No SMS sent for this order"
    } else {
        "SMS processing completed"
    };
    Ok(ApiResponse::success_with_message(message, report))
}
