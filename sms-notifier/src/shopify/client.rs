//! Shopify Admin REST client (no SDK dependency)

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use std::time::Duration;

use super::{
    JSON_VALUE_TYPE, Metafield, MetafieldId, MetafieldOwner, MetafieldStore, NewMetafield,
    RemoteError,
};
use crate::error::{NotifyError, NotifyResult};

/// Per-call network timeout
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct ShopifyCredentials {
    /// e.g. `my-shop.myshopify.com`
    pub store_domain: String,
    /// Admin API access token
    pub admin_token: String,
}

/// Metafield store backed by the Shopify Admin API
///
/// Built even without credentials so the service can boot; the first remote
/// call then fails with a configuration error.
pub struct ShopifyClient {
    client: Client,
    credentials: Option<ShopifyCredentials>,
    api_version: String,
}

#[derive(Deserialize)]
struct MetafieldList {
    #[serde(default)]
    metafields: Vec<Metafield>,
}

#[derive(Deserialize)]
struct MetafieldEnvelope {
    metafield: Metafield,
}

impl ShopifyClient {
    pub fn new(
        credentials: Option<ShopifyCredentials>,
        api_version: impl Into<String>,
    ) -> NotifyResult<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| NotifyError::configuration(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            credentials,
            api_version: api_version.into(),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.credentials.is_some()
    }

    fn credentials(&self) -> NotifyResult<&ShopifyCredentials> {
        self.credentials.as_ref().ok_or_else(|| {
            NotifyError::configuration("Shopify credentials are not configured (SHOP_DOMAIN, SHOPIFY_TOKEN)")
        })
    }

    fn url(&self, creds: &ShopifyCredentials, path: &str) -> String {
        format!(
            "https://{}/admin/api/{}{path}",
            creds.store_domain, self.api_version
        )
    }

    fn request(&self, method: reqwest::Method, path: &str) -> NotifyResult<RequestBuilder> {
        let creds = self.credentials()?;
        Ok(self
            .client
            .request(method, self.url(creds, path))
            .header("X-Shopify-Access-Token", &creds.admin_token))
    }

    /// Send and decode, mapping non-2xx statuses to [`RemoteError`].
    async fn send<T: for<'de> Deserialize<'de>>(request: RequestBuilder) -> NotifyResult<T> {
        let resp = request
            .send()
            .await
            .map_err(|e| RemoteError::transport(format!("Shopify request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let detail: String = body.chars().take(300).collect();
            return Err(RemoteError::http(status.as_u16(), detail).into());
        }

        resp.json::<T>()
            .await
            .map_err(|e| RemoteError::transport(format!("Invalid Shopify response: {e}")).into())
    }
}

#[async_trait]
impl MetafieldStore for ShopifyClient {
    async fn order_metafield(
        &self,
        order_id: &str,
        namespace: &str,
        key: &str,
    ) -> NotifyResult<Option<Metafield>> {
        let request = self
            .request(reqwest::Method::GET, &format!("/orders/{order_id}/metafields.json"))?
            .query(&[("namespace", namespace)]);

        let list: MetafieldList = Self::send(request).await?;
        Ok(list.metafields.into_iter().find(|field| field.key == key))
    }

    async fn shop_metafield(&self, namespace: &str, key: &str) -> NotifyResult<Option<Metafield>> {
        let request = self
            .request(reqwest::Method::GET, "/metafields.json")?
            .query(&[
                ("namespace", namespace),
                ("key", key),
                ("owner_resource", "shop"),
            ]);

        let list: MetafieldList = Self::send(request).await?;
        Ok(list.metafields.into_iter().find(|field| {
            field.namespace == namespace
                && field.key == key
                && field.owner_resource.as_deref().is_none_or(|owner| owner == "shop")
        }))
    }

    async fn create_metafield(&self, metafield: NewMetafield) -> NotifyResult<MetafieldId> {
        let mut payload = serde_json::json!({
            "namespace": metafield.namespace,
            "key": metafield.key,
            "type": JSON_VALUE_TYPE,
            "value": metafield.value,
        });
        match &metafield.owner {
            MetafieldOwner::Shop => {
                payload["owner_resource"] = "shop".into();
            }
            MetafieldOwner::Order(order_id) => {
                payload["owner_resource"] = "order".into();
                payload["owner_id"] = order_id
                    .parse::<u64>()
                    .map(serde_json::Value::from)
                    .unwrap_or_else(|_| order_id.clone().into());
            }
        }

        let request = self
            .request(reqwest::Method::POST, "/metafields.json")?
            .json(&serde_json::json!({ "metafield": payload }));

        let created: MetafieldEnvelope = Self::send(request).await?;
        tracing::debug!(
            metafield_id = created.metafield.id,
            namespace = %created.metafield.namespace,
            key = %created.metafield.key,
            "Shopify metafield created"
        );
        Ok(created.metafield.id)
    }

    async fn update_metafield(&self, id: MetafieldId, value: String) -> NotifyResult<()> {
        let request = self
            .request(reqwest::Method::PUT, &format!("/metafields/{id}.json"))?
            .json(&serde_json::json!({
                "metafield": {
                    "id": id,
                    "type": JSON_VALUE_TYPE,
                    "value": value,
                }
            }));

        let _updated: MetafieldEnvelope = Self::send(request).await?;
        tracing::debug!(metafield_id = id, "Shopify metafield updated");
        Ok(())
    }
}
