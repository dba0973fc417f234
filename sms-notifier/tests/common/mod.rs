//! Shared fixtures for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{Value, json};
use sms_notifier::config::{Config, TemplateStoreMode};
use sms_notifier::shopify::MemoryMetafieldStore;
use sms_notifier::sms::{SentMessage, SmsError, SmsGateway};
use sms_notifier::{AppState, NotifyResult};
use std::sync::Arc;
use tokio::sync::Mutex;

pub const WEBHOOK_SECRET: &str = "shpss_test_secret";

/// Gateway fake that records every message; optionally rejects some numbers
#[derive(Default)]
pub struct RecordingGateway {
    pub sent: Mutex<Vec<(String, String)>>,
    pub reject_to: Option<String>,
}

impl RecordingGateway {
    pub async fn messages(&self) -> Vec<(String, String)> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl SmsGateway for RecordingGateway {
    async fn send(&self, to: &str, body: &str) -> NotifyResult<SentMessage> {
        if self.reject_to.as_deref() == Some(to) {
            return Err(SmsError {
                code: Some(21610),
                status: Some(400),
                message: "Attempt to send to unsubscribed recipient".into(),
                more_info: Some("https://www.twilio.com/docs/errors/21610".into()),
            }
            .into());
        }
        let mut sent = self.sent.lock().await;
        sent.push((to.to_string(), body.to_string()));
        Ok(SentMessage {
            sid: format!("SM{:032}", sent.len()),
        })
    }
}

pub struct TestApp {
    pub state: AppState,
    pub store: MemoryMetafieldStore,
    pub gateway: Arc<RecordingGateway>,
    pub dir: tempfile::TempDir,
}

pub fn config(dir: &tempfile::TempDir, enable_test_routes: bool) -> Config {
    let mut config = Config::from_lookup(|_| None).unwrap();
    config.shopify_webhook_secret = WEBHOOK_SECRET.to_string();
    config.template_store = TemplateStoreMode::Local;
    config.template_file = dir.path().join("templates.json");
    config.enable_test_routes = enable_test_routes;
    config
}

pub fn test_app_with(config_fn: impl FnOnce(&mut Config), gateway: RecordingGateway) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config(&dir, true);
    config_fn(&mut config);

    let store = MemoryMetafieldStore::new();
    let gateway = Arc::new(gateway);
    let state = AppState::with_backends(config, Arc::new(store.clone()), gateway.clone());
    TestApp {
        state,
        store,
        gateway,
        dir,
    }
}

pub fn test_app() -> TestApp {
    test_app_with(|_| {}, RecordingGateway::default())
}

pub fn order_payload(id: u64, tags: &str) -> Value {
    json!({
        "id": id,
        "name": format!("#{}", id - 4000),
        "order_number": id - 4000,
        "tags": tags,
        "customer": { "first_name": "Grace", "last_name": "Hopper", "phone": "(555) 010-0199" },
        "phone": null,
        "fulfillments": [{ "tracking_url": "https://track.example/1Z999" }],
        "total_outstanding": "40.00"
    })
}
