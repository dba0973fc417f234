//! Unified error system for the SMS notifier
//!
//! This module provides:
//! - [`ErrorCode`]: Standardized error codes for all error types
//! - [`ErrorCategory`]: Classification of errors by domain
//! - [`AppError`]: Rich error type with codes, messages, and details
//! - [`ApiResponse`]: Unified API response format
//!
//! # Error Code Ranges
//!
//! - 0xxx: General errors
//! - 1xxx: Webhook authentication errors
//! - 2xxx: Template errors
//! - 3xxx: Order event errors
//! - 4xxx: Remote store errors
//! - 5xxx: SMS gateway errors
//! - 9xxx: System errors
//!
//! # Example
//!
//! ```
//! use shared::error::{AppError, ErrorCode, ApiResponse};
//!
//! let err = AppError::with_message(ErrorCode::PhoneInvalid, "Phone number is missing digits")
//!     .with_detail("order_id", 1001);
//!
//! let response = ApiResponse::<()>::error(&err);
//! assert_eq!(response.code, Some(3002));
//! ```

mod category;
mod codes;
mod http;
mod types;

pub use category::ErrorCategory;
pub use codes::{ErrorCode, InvalidErrorCode};
pub use types::{ApiResponse, AppError, AppResult};
