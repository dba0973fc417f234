//! Phone number canonicalization to E.164
//!
//! - Removes spaces, dashes, parentheses and anything else that is not a digit or `+`.
//! - Converts a leading `00` international prefix to `+`.
//! - Ensures a single leading `+` followed by 8-15 digits.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

pub const MIN_DIGITS: usize = 8;
pub const MAX_DIGITS: usize = 15;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PhoneError {
    #[error("Phone number is required")]
    Missing,

    #[error("Phone number is missing digits")]
    MissingDigits,

    #[error("Phone number must have 8-15 digits for E.164 format (got {digits})")]
    InvalidLength { digits: usize },
}

/// Phone number with a single leading `+` and 8-15 digits
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct E164Phone(String);

impl E164Phone {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for E164Phone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn normalize_phone(raw: &str) -> Result<E164Phone, PhoneError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(PhoneError::Missing);
    }

    let kept: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '+')
        .collect();

    let rest = match kept.strip_prefix("00") {
        Some(after_prefix) => after_prefix,
        None => kept.strip_prefix('+').unwrap_or(&kept),
    };
    let digits: String = rest.chars().filter(char::is_ascii_digit).collect();

    if digits.is_empty() {
        return Err(PhoneError::MissingDigits);
    }
    if !(MIN_DIGITS..=MAX_DIGITS).contains(&digits.len()) {
        return Err(PhoneError::InvalidLength {
            digits: digits.len(),
        });
    }

    Ok(E164Phone(format!("+{digits}")))
}
