//! Unified error codes for the SMS notifier
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Webhook authentication errors
//! - 2xxx: Template errors
//! - 3xxx: Order event errors
//! - 4xxx: Remote store errors
//! - 5xxx: SMS gateway errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values so clients can switch on them
/// without parsing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Validation failed
    ValidationFailed = 2,

    // ==================== 1xxx: Webhook auth ====================
    /// Webhook signature header missing
    SignatureMissing = 1001,
    /// Webhook signature does not match the payload
    SignatureInvalid = 1002,

    // ==================== 2xxx: Template ====================
    /// Template not found for key
    TemplateNotFound = 2001,
    /// Template set failed schema validation
    TemplateSchemaInvalid = 2002,
    /// Template storage read/write failed
    TemplateStorageFailed = 2003,

    // ==================== 3xxx: Order event ====================
    /// Order payload is malformed or incomplete
    OrderPayloadInvalid = 3001,
    /// Customer phone number cannot be normalized
    PhoneInvalid = 3002,

    // ==================== 4xxx: Remote store ====================
    /// Remote store rate-limited or failed server-side (retries exhausted)
    RemoteUnavailable = 4001,
    /// Remote store rejected the request
    RemoteRejected = 4002,

    // ==================== 5xxx: SMS gateway ====================
    /// SMS gateway refused or failed to send
    SmsSendFailed = 5001,

    // ==================== 9xxx: System ====================
    /// Configuration error
    ConfigError = 9005,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Get the developer-facing English message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::ValidationFailed => "Validation failed",

            // Webhook auth
            ErrorCode::SignatureMissing => "Missing HMAC signature",
            ErrorCode::SignatureInvalid => "Invalid HMAC signature",

            // Template
            ErrorCode::TemplateNotFound => "Template not found",
            ErrorCode::TemplateSchemaInvalid => "Template set is invalid",
            ErrorCode::TemplateStorageFailed => "Template storage failed",

            // Order event
            ErrorCode::OrderPayloadInvalid => "Invalid order payload",
            ErrorCode::PhoneInvalid => "Invalid customer phone number",

            // Remote store
            ErrorCode::RemoteUnavailable => "Remote store unavailable",
            ErrorCode::RemoteRejected => "Remote store rejected the request",

            // SMS
            ErrorCode::SmsSendFailed => "Failed to send SMS",

            // System
            ErrorCode::ConfigError => "Configuration error",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error when converting from an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            0 => Ok(ErrorCode::Success),
            2 => Ok(ErrorCode::ValidationFailed),

            // Webhook auth
            1001 => Ok(ErrorCode::SignatureMissing),
            1002 => Ok(ErrorCode::SignatureInvalid),

            // Template
            2001 => Ok(ErrorCode::TemplateNotFound),
            2002 => Ok(ErrorCode::TemplateSchemaInvalid),
            2003 => Ok(ErrorCode::TemplateStorageFailed),

            // Order event
            3001 => Ok(ErrorCode::OrderPayloadInvalid),
            3002 => Ok(ErrorCode::PhoneInvalid),

            // Remote store
            4001 => Ok(ErrorCode::RemoteUnavailable),
            4002 => Ok(ErrorCode::RemoteRejected),

            // SMS
            5001 => Ok(ErrorCode::SmsSendFailed),

            // System
            9005 => Ok(ErrorCode::ConfigError),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_values() {
        assert_eq!(ErrorCode::Success.code(), 0);
        assert_eq!(ErrorCode::ValidationFailed.code(), 2);
        assert_eq!(ErrorCode::SignatureInvalid.code(), 1002);
        assert_eq!(ErrorCode::TemplateSchemaInvalid.code(), 2002);
        assert_eq!(ErrorCode::PhoneInvalid.code(), 3002);
        assert_eq!(ErrorCode::RemoteUnavailable.code(), 4001);
        assert_eq!(ErrorCode::SmsSendFailed.code(), 5001);
        assert_eq!(ErrorCode::ConfigError.code(), 9005);
    }

    #[test]
    fn test_try_from_invalid() {
        assert_eq!(ErrorCode::try_from(4242), Err(InvalidErrorCode(4242)));
        assert_eq!(
            InvalidErrorCode(4242).to_string(),
            "invalid error code: 4242"
        );
    }

    #[test]
    fn test_serialize_as_number() {
        let json = serde_json::to_string(&ErrorCode::TemplateSchemaInvalid).unwrap();
        assert_eq!(json, "2002");
        let code: ErrorCode = serde_json::from_str("3002").unwrap();
        assert_eq!(code, ErrorCode::PhoneInvalid);
        assert!(serde_json::from_str::<ErrorCode>("12345").is_err());
    }

    #[test]
    fn test_every_code_survives_u16() {
        let all = [
            ErrorCode::Success,
            ErrorCode::ValidationFailed,
            ErrorCode::SignatureMissing,
            ErrorCode::SignatureInvalid,
            ErrorCode::TemplateNotFound,
            ErrorCode::TemplateSchemaInvalid,
            ErrorCode::TemplateStorageFailed,
            ErrorCode::OrderPayloadInvalid,
            ErrorCode::PhoneInvalid,
            ErrorCode::RemoteUnavailable,
            ErrorCode::RemoteRejected,
            ErrorCode::SmsSendFailed,
            ErrorCode::ConfigError,
        ];
        for code in all {
            assert_eq!(ErrorCode::try_from(u16::from(code)), Ok(code));
        }
    }
}
