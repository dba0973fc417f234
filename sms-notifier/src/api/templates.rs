//! Template management API
//!
//! GET  /templates
//! PUT  /templates           whole map, or `{ "templates": map | "json string" }`
//! PUT  /templates/{key}     `{ "body": "..." }`, key in any spelling of the tag
//! POST /templates/reset

use axum::Json;
use axum::extract::{Path, State};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared::error::{ApiResponse, AppError, AppResult};

use crate::notify::tags::normalize_tag;
use crate::notify::templates::TemplateMap;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct TemplatesView {
    pub store: String,
    pub templates: TemplateMap,
}

#[derive(Debug, Deserialize)]
pub struct UpsertTemplate {
    pub body: String,
}

fn view(state: &AppState, templates: &TemplateMap) -> TemplatesView {
    TemplatesView {
        store: state.templates.backend().describe(),
        templates: templates.clone(),
    }
}

pub async fn list(State(state): State<AppState>) -> AppResult<ApiResponse<TemplatesView>> {
    let templates = state.templates.fetch().await?;
    Ok(ApiResponse::success(view(&state, &templates)))
}

pub async fn replace(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> AppResult<ApiResponse<TemplatesView>> {
    let templates = parse_templates(body)?;
    let saved = state.templates.save(templates).await?;
    tracing::info!(keys = saved.len(), "Templates replaced");
    Ok(ApiResponse::success_with_message("Templates saved", view(&state, &saved)))
}

pub async fn upsert(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(payload): Json<UpsertTemplate>,
) -> AppResult<ApiResponse<TemplatesView>> {
    if normalize_tag(&key).is_none() {
        return Err(AppError::validation("Template key must not be blank"));
    }
    let saved = state.templates.upsert(&key, payload.body).await?;
    tracing::info!(key = %key, "Template updated");
    Ok(ApiResponse::success_with_message("Template saved", view(&state, &saved)))
}

pub async fn reset(State(state): State<AppState>) -> AppResult<ApiResponse<TemplatesView>> {
    let saved = state.templates.reset().await?;
    tracing::info!("Templates reset to defaults");
    Ok(ApiResponse::success_with_message("Templates reset to defaults", view(&state, &saved)))
}

/// Accept the map itself or a `templates` field holding the map or its JSON text.
fn parse_templates(body: Value) -> Result<TemplateMap, AppError> {
    let raw = match body {
        Value::Object(mut obj) if obj.contains_key("templates") => match obj.remove("templates") {
            Some(Value::String(text)) => serde_json::from_str(&text)
                .map_err(|_| AppError::validation("templates must be valid JSON"))?,
            Some(other) => other,
            None => Value::Null,
        },
        other => other,
    };

    serde_json::from_value(raw)
        .map_err(|_| AppError::validation("templates must be an object mapping tags to message bodies"))
}
