//! sms-notifier configuration

use std::path::PathBuf;

use crate::shopify::ShopifyCredentials;
use crate::sms::TwilioCredentials;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Where the template set is persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateStoreMode {
    Local,
    Shopify,
}

impl std::str::FromStr for TemplateStoreMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "shopify" | "remote" => Ok(Self::Shopify),
            other => Err(format!("TEMPLATE_STORE must be 'local' or 'shopify', got '{other}'")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Environment: development | staging | production
    pub environment: String,
    pub http_port: u16,
    /// Shopify Admin API access; `None` until both domain and token are set
    pub shopify: Option<ShopifyCredentials>,
    pub shopify_api_version: String,
    /// Webhook HMAC secret
    pub shopify_webhook_secret: String,
    /// Twilio access; `None` until SID, token and sender are all set
    pub twilio: Option<TwilioCredentials>,
    pub template_store: TemplateStoreMode,
    pub template_file: PathBuf,
    pub template_metafield_namespace: String,
    pub template_metafield_key: String,
    pub ledger_metafield_namespace: String,
    pub ledger_metafield_key: String,
    /// Mount `/test/*` routes (unsigned diagnostic intake)
    pub enable_test_routes: bool,
    pub log_level: String,
    pub log_json: bool,
    pub log_dir: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, BoxError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source (`from_env` uses the process environment)
    pub fn from_lookup<F>(lookup: F) -> Result<Self, BoxError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let environment = var("ENVIRONMENT").unwrap_or_else(|| "development".into());
        let is_dev = environment == "development";

        let http_port = match var("HTTP_PORT") {
            Some(p) => p.parse().map_err(|_| format!("HTTP_PORT must be a port number, got '{p}'"))?,
            None => 4000,
        };

        let shopify = match (var("SHOP_DOMAIN"), var("SHOPIFY_TOKEN")) {
            (Some(store_domain), Some(admin_token)) => Some(ShopifyCredentials {
                store_domain,
                admin_token,
            }),
            _ => None,
        };

        let twilio = match (
            var("TWILIO_ACCOUNT_SID"),
            var("TWILIO_AUTH_TOKEN"),
            var("TWILIO_FROM"),
        ) {
            (Some(account_sid), Some(auth_token), Some(from_number)) => Some(TwilioCredentials {
                account_sid,
                auth_token,
                from_number,
            }),
            _ => None,
        };

        let template_store = match var("TEMPLATE_STORE") {
            Some(mode) => mode.parse()?,
            None => TemplateStoreMode::Local,
        };

        let enable_test_routes = match var("ENABLE_TEST_ROUTES") {
            Some(flag) => parse_flag(&flag)
                .ok_or_else(|| format!("ENABLE_TEST_ROUTES must be true or false, got '{flag}'"))?,
            None => is_dev,
        };

        Ok(Self {
            http_port,
            shopify,
            shopify_api_version: var("SHOPIFY_API_VERSION").unwrap_or_else(|| "2024-10".into()),
            shopify_webhook_secret: require_secret(var("SHOPIFY_WEBHOOK_SECRET"), "SHOPIFY_WEBHOOK_SECRET", &environment)?,
            twilio,
            template_store,
            template_file: var("TEMPLATE_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("data/templates.json")),
            template_metafield_namespace: var("TEMPLATE_METAFIELD_NAMESPACE").unwrap_or_else(|| "sms".into()),
            template_metafield_key: var("TEMPLATE_METAFIELD_KEY").unwrap_or_else(|| "templates".into()),
            ledger_metafield_namespace: var("LEDGER_METAFIELD_NAMESPACE").unwrap_or_else(|| "sms".into()),
            ledger_metafield_key: var("LEDGER_METAFIELD_KEY").unwrap_or_else(|| "sent_log".into()),
            enable_test_routes,
            log_level: var("LOG_LEVEL").unwrap_or_else(|| "info".into()),
            log_json: var("LOG_JSON").and_then(|v| parse_flag(&v)).unwrap_or(false),
            log_dir: var("LOG_DIR"),
            environment,
        })
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

/// Require a secret: must be set in non-development environments.
fn require_secret(value: Option<String>, name: &str, environment: &str) -> Result<String, BoxError> {
    match value {
        Some(v) => Ok(v),
        None if environment == "development" => Ok(format!("dev-{name}-not-for-production")),
        None => Err(format!("{name} must be set in {environment} environment").into()),
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
