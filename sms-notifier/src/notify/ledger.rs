//! Per-order record of tags already notified
//!
//! Stored as a JSON array in an order metafield. Updates are read-modify-write
//! with no compare-and-swap, so two concurrent deliveries for the same order can
//! both send. Best effort at-most-once.

use std::sync::Arc;

use crate::error::{NotifyError, NotifyResult};
use crate::notify::tags::{CanonicalTag, normalize_tag};
use crate::retry::{RetryPolicy, with_backoff};
use crate::shopify::{MetafieldId, MetafieldOwner, MetafieldStore, NewMetafield};

/// Ledger contents as read from the store
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerSnapshot {
    /// `None` until the metafield has been created
    pub record_id: Option<MetafieldId>,
    pub tags: Vec<CanonicalTag>,
}

impl LedgerSnapshot {
    pub fn contains(&self, tag: &CanonicalTag) -> bool {
        self.tags.contains(tag)
    }
}

pub struct SentTagLedger {
    store: Arc<dyn MetafieldStore>,
    namespace: String,
    key: String,
    retry: RetryPolicy,
}

impl SentTagLedger {
    pub fn new(
        store: Arc<dyn MetafieldStore>,
        namespace: impl Into<String>,
        key: impl Into<String>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            store,
            namespace: namespace.into(),
            key: key.into(),
            retry,
        }
    }

    /// Read the ledger for an order. A missing metafield (or a 404) is an empty ledger.
    pub async fn get(&self, order_id: &str) -> NotifyResult<LedgerSnapshot> {
        let result = with_backoff(&self.retry, "get_sent_log", NotifyError::is_transient, || {
            self.store.order_metafield(order_id, &self.namespace, &self.key)
        })
        .await;

        let field = match result {
            Ok(Some(field)) => field,
            Ok(None) => return Ok(LedgerSnapshot::default()),
            Err(e) if e.is_not_found() => {
                tracing::debug!(order_id, "No sent log found for order");
                return Ok(LedgerSnapshot::default());
            }
            Err(e) => return Err(e),
        };

        let tags = match field.value.as_deref() {
            Some(raw) if !raw.trim().is_empty() => parse_tags(order_id, raw),
            _ => Vec::new(),
        };

        Ok(LedgerSnapshot {
            record_id: Some(field.id),
            tags,
        })
    }

    /// Write the tag set back, creating the metafield when `record_id` is `None`.
    /// Returns the record id written to.
    pub async fn put(
        &self,
        order_id: &str,
        tags: &[CanonicalTag],
        record_id: Option<MetafieldId>,
    ) -> NotifyResult<MetafieldId> {
        let mut unique: Vec<&CanonicalTag> = Vec::with_capacity(tags.len());
        for tag in tags {
            if !unique.contains(&tag) {
                unique.push(tag);
            }
        }
        let value = serde_json::to_string(&unique)
            .map_err(|e| NotifyError::Storage(format!("Failed to serialize sent log: {e}")))?;

        match record_id {
            Some(id) => {
                with_backoff(&self.retry, "update_sent_log", NotifyError::is_transient, || {
                    self.store.update_metafield(id, value.clone())
                })
                .await?;
                Ok(id)
            }
            None => {
                with_backoff(&self.retry, "create_sent_log", NotifyError::is_transient, || {
                    self.store.create_metafield(NewMetafield {
                        owner: MetafieldOwner::Order(order_id.to_string()),
                        namespace: self.namespace.clone(),
                        key: self.key.clone(),
                        value: value.clone(),
                    })
                })
                .await
            }
        }
    }

    /// Fresh read, add `tag`, write back.
    pub async fn record_sent(&self, order_id: &str, tag: &CanonicalTag) -> NotifyResult<LedgerSnapshot> {
        let mut snapshot = self.get(order_id).await?;
        if !snapshot.contains(tag) {
            snapshot.tags.push(tag.clone());
        }
        let id = self.put(order_id, &snapshot.tags, snapshot.record_id).await?;
        snapshot.record_id = Some(id);
        Ok(snapshot)
    }
}

/// Stored values are normalized on read; unreadable logs count as empty.
fn parse_tags(order_id: &str, raw: &str) -> Vec<CanonicalTag> {
    match serde_json::from_str::<Vec<String>>(raw) {
        Ok(stored) => {
            let mut tags: Vec<CanonicalTag> = Vec::with_capacity(stored.len());
            for tag in stored.iter().filter_map(|t| normalize_tag(t)) {
                if !tags.contains(&tag) {
                    tags.push(tag);
                }
            }
            tags
        }
        Err(e) => {
            tracing::warn!(order_id, error = %e, "Sent log is not a JSON array of strings, treating as empty");
            Vec::new()
        }
    }
}
