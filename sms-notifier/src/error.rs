//! Service-layer error type for sms-notifier
//!
//! `NotifyError` is what the dispatch pipeline, template repository and ledger
//! return. It converts into the HTTP-facing `AppError` with a stable code and
//! structured details, so handlers can just use `?`.

use axum::response::IntoResponse;
use shared::error::{AppError, ErrorCode};
use thiserror::Error;

use crate::notify::phone::PhoneError;
use crate::notify::templates::{MAX_TEMPLATE_LENGTH, TemplateSchemaError};
use crate::shopify::RemoteError;
use crate::sms::SmsError;

#[derive(Debug, Error)]
pub enum NotifyError {
    /// Order payload is malformed or missing customer identity
    #[error("Invalid order payload: {}", .0.join("; "))]
    InvalidEvent(Vec<String>),

    /// Destination phone cannot be normalized
    #[error(transparent)]
    Phone(#[from] PhoneError),

    /// No template registered under the requested key
    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    /// Template set failed schema validation, nothing was written
    #[error(transparent)]
    TemplateSchema(#[from] TemplateSchemaError),

    /// Remote attribute store failure (after retries when transient)
    #[error("Remote store error: {0}")]
    Remote(#[from] RemoteError),

    /// SMS gateway refused or failed the send
    #[error("SMS gateway error: {0}")]
    Sms(#[from] SmsError),

    /// Missing credentials/secrets for a backend
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Local template file could not be read or written
    #[error("Template storage error: {0}")]
    Storage(String),
}

impl NotifyError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Rate-limited or server-side remote failures; the only ones worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Remote(e) if e.is_transient())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Remote(e) if e.is_not_found())
    }
}

impl From<NotifyError> for AppError {
    fn from(e: NotifyError) -> Self {
        let message = e.to_string();
        match e {
            NotifyError::InvalidEvent(errors) => {
                AppError::with_message(ErrorCode::OrderPayloadInvalid, "Invalid order payload")
                    .with_detail("errors", errors)
            }
            NotifyError::TemplateNotFound(key) => {
                AppError::with_message(ErrorCode::TemplateNotFound, message).with_detail("key", key)
            }
            NotifyError::Phone(_) => AppError::with_message(ErrorCode::PhoneInvalid, message),
            NotifyError::TemplateSchema(schema) => {
                AppError::with_message(ErrorCode::TemplateSchemaInvalid, message)
                    .with_detail("missing", schema.missing)
                    .with_detail("oversized", schema.oversized)
                    .with_detail("max_length", MAX_TEMPLATE_LENGTH)
            }
            NotifyError::Remote(remote) => {
                tracing::error!(error = %remote, "Remote store error");
                let code = if remote.is_transient() {
                    ErrorCode::RemoteUnavailable
                } else {
                    ErrorCode::RemoteRejected
                };
                let err = AppError::with_message(code, message);
                match remote.status {
                    Some(status) => err.with_detail("status", status),
                    None => err,
                }
            }
            NotifyError::Sms(sms) => {
                let mut err = AppError::with_message(ErrorCode::SmsSendFailed, message);
                if let Some(code) = sms.code {
                    err = err.with_detail("code", code);
                }
                if let Some(status) = sms.status {
                    err = err.with_detail("status", status);
                }
                if let Some(more_info) = sms.more_info {
                    err = err.with_detail("more_info", more_info);
                }
                err
            }
            NotifyError::Configuration(_) => AppError::with_message(ErrorCode::ConfigError, message),
            NotifyError::Storage(_) => {
                tracing::error!(error = %message, "Template storage error");
                AppError::with_message(ErrorCode::TemplateStorageFailed, message)
            }
        }
    }
}

impl IntoResponse for NotifyError {
    fn into_response(self) -> axum::response::Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}

pub type NotifyResult<T> = Result<T, NotifyError>;
