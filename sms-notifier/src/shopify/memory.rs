//! In-process metafield store
//!
//! Same create-or-update-by-id semantics as the Shopify backend. Used for local
//! runs without a shop and by tests, which can queue failures and add latency.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use super::{Metafield, MetafieldId, MetafieldOwner, MetafieldStore, NewMetafield, RemoteError};
use crate::error::NotifyResult;

#[derive(Debug, Clone)]
struct StoredMetafield {
    owner: MetafieldOwner,
    field: Metafield,
}

#[derive(Default)]
struct Inner {
    next_id: MetafieldId,
    records: Vec<StoredMetafield>,
    failures: VecDeque<RemoteError>,
    latency: Option<Duration>,
    reads: u32,
    writes: u32,
}

#[derive(Clone, Default)]
pub struct MemoryMetafieldStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryMetafieldStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next call (of any kind) fails with `error` instead of running.
    pub async fn fail_next(&self, error: RemoteError) {
        self.inner.lock().await.failures.push_back(error);
    }

    /// Every call sleeps this long before touching the store.
    pub async fn set_latency(&self, latency: Duration) {
        self.inner.lock().await.latency = Some(latency);
    }

    /// Current value of a metafield, bypassing failure injection and counters.
    pub async fn value_of(&self, owner: &MetafieldOwner, namespace: &str, key: &str) -> Option<String> {
        let inner = self.inner.lock().await;
        find(&inner.records, owner, namespace, key).and_then(|stored| stored.field.value.clone())
    }

    /// Seed a metafield directly, returning its id.
    pub async fn seed(&self, owner: MetafieldOwner, namespace: &str, key: &str, value: &str) -> MetafieldId {
        let mut inner = self.inner.lock().await;
        insert(&mut inner, owner, namespace, key, value.to_string())
    }

    pub async fn read_count(&self) -> u32 {
        self.inner.lock().await.reads
    }

    pub async fn write_count(&self) -> u32 {
        self.inner.lock().await.writes
    }

    /// Apply latency and pop an injected failure, if any.
    async fn enter(&self) -> NotifyResult<()> {
        let latency = self.inner.lock().await.latency;
        if let Some(delay) = latency {
            tokio::time::sleep(delay).await;
        }
        match self.inner.lock().await.failures.pop_front() {
            Some(err) => Err(err.into()),
            None => Ok(()),
        }
    }

    async fn lookup(&self, owner: MetafieldOwner, namespace: &str, key: &str) -> NotifyResult<Option<Metafield>> {
        self.enter().await?;
        let mut inner = self.inner.lock().await;
        inner.reads += 1;
        Ok(find(&inner.records, &owner, namespace, key).map(|stored| stored.field.clone()))
    }
}

fn find<'a>(
    records: &'a [StoredMetafield],
    owner: &MetafieldOwner,
    namespace: &str,
    key: &str,
) -> Option<&'a StoredMetafield> {
    records
        .iter()
        .find(|r| &r.owner == owner && r.field.namespace == namespace && r.field.key == key)
}

fn insert(inner: &mut Inner, owner: MetafieldOwner, namespace: &str, key: &str, value: String) -> MetafieldId {
    inner.next_id += 1;
    let id = inner.next_id;
    let owner_resource = match owner {
        MetafieldOwner::Shop => "shop",
        MetafieldOwner::Order(_) => "order",
    };
    inner.records.push(StoredMetafield {
        owner,
        field: Metafield {
            id,
            namespace: namespace.to_string(),
            key: key.to_string(),
            value: Some(value),
            owner_resource: Some(owner_resource.to_string()),
        },
    });
    id
}

#[async_trait]
impl MetafieldStore for MemoryMetafieldStore {
    async fn order_metafield(
        &self,
        order_id: &str,
        namespace: &str,
        key: &str,
    ) -> NotifyResult<Option<Metafield>> {
        self.lookup(MetafieldOwner::Order(order_id.to_string()), namespace, key)
            .await
    }

    async fn shop_metafield(&self, namespace: &str, key: &str) -> NotifyResult<Option<Metafield>> {
        self.lookup(MetafieldOwner::Shop, namespace, key).await
    }

    async fn create_metafield(&self, metafield: NewMetafield) -> NotifyResult<MetafieldId> {
        self.enter().await?;
        let mut inner = self.inner.lock().await;
        inner.writes += 1;
        // Shopify rejects a second metafield with the same owner/namespace/key
        if find(&inner.records, &metafield.owner, &metafield.namespace, &metafield.key).is_some() {
            return Err(RemoteError::http(422, "key must be unique within this namespace on this resource").into());
        }
        Ok(insert(
            &mut inner,
            metafield.owner,
            &metafield.namespace,
            &metafield.key,
            metafield.value,
        ))
    }

    async fn update_metafield(&self, id: MetafieldId, value: String) -> NotifyResult<()> {
        self.enter().await?;
        let mut inner = self.inner.lock().await;
        inner.writes += 1;
        let stored = inner
            .records
            .iter_mut()
            .find(|r| r.field.id == id)
            .ok_or_else(|| RemoteError::http(404, format!("metafield {id} not found")))?;
        stored.field.value = Some(value);
        Ok(())
    }
}
