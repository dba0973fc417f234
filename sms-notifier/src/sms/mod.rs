//! Outbound SMS gateway
//!
//! Twilio via REST API (no SDK dependency). Without credentials the service
//! still boots; every send then fails with a configuration error.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::error::{NotifyError, NotifyResult};

const TWILIO_API_BASE: &str = "https://api.twilio.com/2010-04-01";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Accepted message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SentMessage {
    /// Gateway message identifier
    pub sid: String,
}

/// Typed gateway failure (code, status, detail)
#[derive(Debug, Clone, PartialEq, Eq, Error, Deserialize)]
#[error("{message}")]
pub struct SmsError {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub status: Option<u16>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub more_info: Option<String>,
}

impl SmsError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            code: None,
            status: None,
            message: message.into(),
            more_info: None,
        }
    }
}

#[async_trait]
pub trait SmsGateway: Send + Sync {
    /// Send `body` to an E.164 number from the configured sender number
    async fn send(&self, to: &str, body: &str) -> NotifyResult<SentMessage>;
}

#[derive(Debug, Clone)]
pub struct TwilioCredentials {
    pub account_sid: String,
    pub auth_token: String,
    /// Sender number (`TWILIO_FROM`)
    pub from_number: String,
}

pub struct TwilioGateway {
    client: reqwest::Client,
    credentials: TwilioCredentials,
    api_base: String,
}

impl TwilioGateway {
    pub fn new(credentials: TwilioCredentials) -> NotifyResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| NotifyError::configuration(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            credentials,
            api_base: TWILIO_API_BASE.to_string(),
        })
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/Accounts/{}/Messages.json",
            self.api_base, self.credentials.account_sid
        )
    }
}

#[derive(Deserialize)]
struct MessageResource {
    sid: String,
}

#[async_trait]
impl SmsGateway for TwilioGateway {
    async fn send(&self, to: &str, body: &str) -> NotifyResult<SentMessage> {
        let resp = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.credentials.account_sid, Some(&self.credentials.auth_token))
            .form(&[
                ("To", to),
                ("From", self.credentials.from_number.as_str()),
                ("Body", body),
            ])
            .send()
            .await
            .map_err(|e| SmsError::transport(format!("Twilio request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let mut err = resp
                .json::<SmsError>()
                .await
                .unwrap_or_else(|_| SmsError::transport(format!("Twilio returned {status}")));
            err.status.get_or_insert(status.as_u16());
            tracing::error!(
                to = to,
                code = ?err.code,
                status = ?err.status,
                "Failed to send SMS via Twilio: {}",
                err.message
            );
            return Err(err.into());
        }

        let message: MessageResource = resp
            .json()
            .await
            .map_err(|e| SmsError::transport(format!("Invalid Twilio response: {e}")))?;

        tracing::info!(sid = %message.sid, to = to, "SMS dispatched via Twilio");
        Ok(SentMessage { sid: message.sid })
    }
}

/// Stand-in when Twilio credentials are missing
pub struct UnconfiguredGateway {
    reason: String,
}

impl UnconfiguredGateway {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl SmsGateway for UnconfiguredGateway {
    async fn send(&self, _to: &str, _body: &str) -> NotifyResult<SentMessage> {
        Err(NotifyError::configuration(self.reason.clone()))
    }
}
