//! Diagnostic intake, mounted only when `ENABLE_TEST_ROUTES` is on
//!
//! POST /test/webhook/order?tag=...  unsigned order payload, echo rendering, no sent log
//! GET  /test/sms?phone=...&template=...

use axum::body::Bytes;
use axum::extract::{Query, State};
use serde::Deserialize;
use serde_json::{Value, json};
use shared::error::{ApiResponse, AppError, AppResult, ErrorCode};

use crate::notify::dispatcher::{DirectSend, DispatchMode, DispatchReport};
use crate::notify::event::OrderChangeEvent;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct TestOrderQuery {
    /// Replace the order's tags with this single tag
    pub tag: Option<String>,
}

pub async fn test_order_webhook(
    State(state): State<AppState>,
    Query(query): Query<TestOrderQuery>,
    body: Bytes,
) -> AppResult<ApiResponse<DispatchReport>> {
    let payload: Value = serde_json::from_slice(&body).map_err(|e| {
        tracing::warn!(%e, "Failed to parse test order JSON");
        AppError::with_message(ErrorCode::OrderPayloadInvalid, format!("Invalid JSON body: {e}"))
    })?;
    let event = OrderChangeEvent::from_payload(&payload)?;
    let mode = DispatchMode::Diagnostic {
        forced_tag: query.tag.filter(|t| !t.trim().is_empty()),
    };
    let report = state.dispatcher.dispatch(&event, &mode).await?;
    Ok(ApiResponse::success_with_message("Test order processed", report))
}

#[derive(Debug, Deserialize)]
pub struct TestSmsQuery {
    pub phone: Option<String>,
    pub template: Option<String>,
    pub name: Option<String>,
    pub order_number: Option<String>,
    pub tracking: Option<String>,
}

pub async fn test_sms(
    State(state): State<AppState>,
    Query(query): Query<TestSmsQuery>,
) -> AppResult<ApiResponse<DirectSend>> {
    let (Some(phone), Some(template)) = (
        query.phone.filter(|p| !p.trim().is_empty()),
        query.template.filter(|t| !t.trim().is_empty()),
    ) else {
        return Err(AppError::validation("Query params \"phone\" and \"template\" are required")
            .with_detail("required", json!(["phone", "template"])));
    };

    // An unescaped '+' in a query string arrives as a space
    let phone = phone.trim();
    let phone = if phone.starts_with('+') || phone.starts_with("00") {
        phone.to_string()
    } else {
        format!("+{phone}")
    };

    let context = json!({
        "name": query.name.unwrap_or_else(|| "Test Customer".into()),
        "order_number": query.order_number.unwrap_or_else(|| "TEST123".into()),
        "tracking": query.tracking.unwrap_or_else(|| "https://example.com/tracking".into()),
    });

    let sent = state.dispatcher.send_template(&phone, &template, &context).await?;
    Ok(ApiResponse::success_with_message("Test SMS sent", sent))
}
