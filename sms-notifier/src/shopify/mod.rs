//! Shopify metafields as a remote key/value store
//!
//! Both the sent-tag ledger (one metafield per order) and the remote template
//! backend (one metafield on the shop) live in namespaced metafields, written
//! with the same create-or-update-by-id discipline. Calls here are single
//! attempts; callers wrap them in [`crate::retry::with_backoff`].

mod client;
mod memory;
mod webhook;

pub use client::{ShopifyClient, ShopifyCredentials};
pub use memory::MemoryMetafieldStore;
pub use webhook::verify_webhook_hmac;

use async_trait::async_trait;
use serde::Deserialize;
use std::fmt;
use thiserror::Error;

use crate::error::NotifyResult;

pub type MetafieldId = u64;

/// Value type used for every metafield this service writes
pub const JSON_VALUE_TYPE: &str = "json";

/// Non-2xx response or transport failure from the remote store
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct RemoteError {
    /// HTTP status, `None` for transport failures (timeout, DNS, reset)
    pub status: Option<u16>,
    pub message: String,
}

impl RemoteError {
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }

    /// 429 and 5xx
    pub fn is_transient(&self) -> bool {
        matches!(self.status, Some(429) | Some(500..=599))
    }

    pub fn is_not_found(&self) -> bool {
        self.status == Some(404)
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "HTTP {status}: {}", self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

/// A stored metafield record
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Metafield {
    pub id: MetafieldId,
    pub namespace: String,
    pub key: String,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub owner_resource: Option<String>,
}

/// Which resource a metafield hangs off
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MetafieldOwner {
    Shop,
    Order(String),
}

/// Payload for creating a metafield
#[derive(Debug, Clone)]
pub struct NewMetafield {
    pub owner: MetafieldOwner,
    pub namespace: String,
    pub key: String,
    pub value: String,
}

/// Namespaced key/value attribute store
#[async_trait]
pub trait MetafieldStore: Send + Sync {
    /// Metafield `(namespace, key)` on an order, `None` when absent
    async fn order_metafield(
        &self,
        order_id: &str,
        namespace: &str,
        key: &str,
    ) -> NotifyResult<Option<Metafield>>;

    /// Metafield `(namespace, key)` on the shop, `None` when absent
    async fn shop_metafield(&self, namespace: &str, key: &str) -> NotifyResult<Option<Metafield>>;

    /// Create a metafield, returning its new record id
    async fn create_metafield(&self, metafield: NewMetafield) -> NotifyResult<MetafieldId>;

    /// Replace the value of an existing metafield
    async fn update_metafield(&self, id: MetafieldId, value: String) -> NotifyResult<()>;
}
