//! Shared types for the SMS notifier workspace
//!
//! Error vocabulary and the API response envelope used by every HTTP surface.

pub mod error;
