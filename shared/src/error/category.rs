//! Error category classification

use super::codes::ErrorCode;
use serde::{Deserialize, Serialize};

/// Error category classification based on error code ranges
///
/// Categories are determined by the leading digit of the error code:
/// - 0xxx: General errors
/// - 1xxx: Webhook authentication errors
/// - 2xxx: Template errors
/// - 3xxx: Order event errors
/// - 4xxx: Remote store errors
/// - 5xxx: SMS gateway errors
/// - 9xxx: System errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// General errors (0xxx)
    General,
    /// Webhook authentication errors (1xxx)
    Auth,
    /// Template errors (2xxx)
    Template,
    /// Order event errors (3xxx)
    Order,
    /// Remote store errors (4xxx)
    Remote,
    /// SMS gateway errors (5xxx)
    Sms,
    /// System errors (6xxx-9xxx)
    System,
}

impl ErrorCategory {
    /// Determine category from error code value
    pub fn from_code(code: u16) -> Self {
        match code {
            0..1000 => Self::General,
            1000..2000 => Self::Auth,
            2000..3000 => Self::Template,
            3000..4000 => Self::Order,
            4000..5000 => Self::Remote,
            5000..6000 => Self::Sms,
            _ => Self::System,
        }
    }
}

impl ErrorCode {
    /// Get the category for this error code
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::from_code(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_from_code() {
        assert_eq!(ErrorCategory::from_code(2), ErrorCategory::General);
        assert_eq!(ErrorCategory::from_code(1002), ErrorCategory::Auth);
        assert_eq!(ErrorCategory::from_code(2002), ErrorCategory::Template);
        assert_eq!(ErrorCategory::from_code(3002), ErrorCategory::Order);
        assert_eq!(ErrorCategory::from_code(4001), ErrorCategory::Remote);
        assert_eq!(ErrorCategory::from_code(5001), ErrorCategory::Sms);
        assert_eq!(ErrorCategory::from_code(9005), ErrorCategory::System);
    }

    #[test]
    fn test_error_code_category() {
        assert_eq!(ErrorCode::PhoneInvalid.category(), ErrorCategory::Order);
        assert_eq!(ErrorCode::ConfigError.category(), ErrorCategory::System);
    }
}
