//! Application state for sms-notifier

use std::sync::Arc;

use crate::config::{Config, TemplateStoreMode};
use crate::error::NotifyResult;
use crate::notify::dispatcher::Dispatcher;
use crate::notify::ledger::SentTagLedger;
use crate::notify::templates::{TemplateBackend, TemplateRepository};
use crate::retry::RetryPolicy;
use crate::shopify::{MemoryMetafieldStore, MetafieldStore, ShopifyClient};
use crate::sms::{SmsGateway, TwilioGateway, UnconfiguredGateway};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub templates: Arc<TemplateRepository>,
    pub dispatcher: Arc<Dispatcher>,
}

impl AppState {
    /// Wire the real backends from configuration.
    ///
    /// Missing Shopify or Twilio credentials do not stop the boot. In development
    /// the metafields live in memory; elsewhere the affected backend reports a
    /// configuration error on first use.
    pub fn new(config: Config) -> NotifyResult<Self> {
        let store: Arc<dyn MetafieldStore> = match (&config.shopify, config.is_development()) {
            (None, true) => {
                tracing::warn!("SHOP_DOMAIN/SHOPIFY_TOKEN not set: using in-memory metafields (lost on restart)");
                Arc::new(MemoryMetafieldStore::new())
            }
            (shopify, _) => {
                if shopify.is_none() {
                    tracing::warn!("SHOP_DOMAIN/SHOPIFY_TOKEN not set: sent log and remote templates are unavailable");
                }
                Arc::new(ShopifyClient::new(
                    shopify.clone(),
                    config.shopify_api_version.clone(),
                )?)
            }
        };

        let gateway: Arc<dyn SmsGateway> = match config.twilio.clone() {
            Some(credentials) => Arc::new(TwilioGateway::new(credentials)?),
            None => {
                tracing::warn!("Twilio credentials not set: SMS sends will fail");
                Arc::new(UnconfiguredGateway::new(
                    "Twilio client is not configured (TWILIO_ACCOUNT_SID, TWILIO_AUTH_TOKEN, TWILIO_FROM)",
                ))
            }
        };

        Ok(Self::with_backends(config, store, gateway))
    }

    /// Wire explicit backends (in-memory store and fake gateway in tests).
    pub fn with_backends(config: Config, store: Arc<dyn MetafieldStore>, gateway: Arc<dyn SmsGateway>) -> Self {
        let retry = RetryPolicy::default();

        let backend = match config.template_store {
            TemplateStoreMode::Local => TemplateBackend::Local {
                path: config.template_file.clone(),
            },
            TemplateStoreMode::Shopify => TemplateBackend::Remote {
                store: store.clone(),
                namespace: config.template_metafield_namespace.clone(),
                key: config.template_metafield_key.clone(),
                retry,
            },
        };
        let templates = Arc::new(TemplateRepository::new(backend));
        tracing::info!(backend = %templates.backend().describe(), "Template store configured");

        let ledger = Arc::new(SentTagLedger::new(
            store,
            config.ledger_metafield_namespace.clone(),
            config.ledger_metafield_key.clone(),
            retry,
        ));

        let dispatcher = Arc::new(Dispatcher::new(templates.clone(), ledger, gateway));

        Self {
            config: Arc::new(config),
            templates,
            dispatcher,
        }
    }
}
