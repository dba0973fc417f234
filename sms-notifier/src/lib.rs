//! sms-notifier: order tag changes to deduplicated, templated SMS
//!
//! - Receives signed Shopify order webhooks
//! - Maps order tags to canonical notification tags and templates
//! - Sends through Twilio, recording sent tags per order in a metafield
//! - Serves template management and diagnostic routes

pub mod api;
pub mod config;
pub mod error;
pub mod logger;
pub mod notify;
pub mod retry;
pub mod shopify;
pub mod sms;
pub mod state;

pub use config::Config;
pub use error::{NotifyError, NotifyResult};
pub use state::AppState;
