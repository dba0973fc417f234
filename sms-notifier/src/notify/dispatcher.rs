//! Order event -> SMS sends
//!
//! Per tag, in the order the tags appear on the order:
//! no template -> `no_template`; already in the ledger -> `already_sent`;
//! otherwise render and send, then record the tag in the ledger.
//! A failed send is recorded on its tag and the loop moves on.

use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use crate::error::{NotifyError, NotifyResult};
use crate::notify::event::OrderChangeEvent;
use crate::notify::ledger::{LedgerSnapshot, SentTagLedger};
use crate::notify::phone::{E164Phone, normalize_phone};
use crate::notify::render::{MissingPlaceholder, render};
use crate::notify::tags::{CanonicalTag, normalize_tag};
use crate::notify::templates::{TemplateRepository, template_for};
use crate::sms::{SentMessage, SmsGateway};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TagState {
    NoTemplate,
    AlreadySent,
    Pending,
    Sent,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchMode {
    /// Signed webhook: blank missing placeholders, consult and update the ledger
    Production,
    /// Test intake: echo missing placeholders, ignore the ledger,
    /// optionally replace the order's tags with a single forced tag
    Diagnostic { forced_tag: Option<String> },
}

impl DispatchMode {
    fn uses_ledger(&self) -> bool {
        matches!(self, Self::Production)
    }

    fn missing_placeholder(&self) -> MissingPlaceholder {
        match self {
            Self::Production => MissingPlaceholder::Blank,
            Self::Diagnostic { .. } => MissingPlaceholder::Echo,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TagOutcome {
    pub tag: CanonicalTag,
    pub state: TagState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TagOutcome {
    fn new(tag: CanonicalTag, state: TagState) -> Self {
        Self {
            tag,
            state,
            message_id: None,
            error: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DispatchReport {
    pub order_id: String,
    pub order_number: String,
    pub to: E164Phone,
    pub outcomes: Vec<TagOutcome>,
}

impl DispatchReport {
    pub fn tags_in(&self, state: TagState) -> Vec<&CanonicalTag> {
        self.outcomes
            .iter()
            .filter(|o| o.state == state)
            .map(|o| &o.tag)
            .collect()
    }
}

/// Result of a one-off templated send
#[derive(Debug, Clone, Serialize)]
pub struct DirectSend {
    pub to: E164Phone,
    pub template: String,
    pub body: String,
    pub sid: String,
}

pub struct Dispatcher {
    templates: Arc<TemplateRepository>,
    ledger: Arc<SentTagLedger>,
    gateway: Arc<dyn SmsGateway>,
}

impl Dispatcher {
    pub fn new(
        templates: Arc<TemplateRepository>,
        ledger: Arc<SentTagLedger>,
        gateway: Arc<dyn SmsGateway>,
    ) -> Self {
        Self {
            templates,
            ledger,
            gateway,
        }
    }

    pub async fn dispatch(&self, event: &OrderChangeEvent, mode: &DispatchMode) -> NotifyResult<DispatchReport> {
        // Phone is event-wide: a bad number stops everything before any tag work
        let to = normalize_phone(&event.raw_phone).inspect_err(|e| {
            tracing::warn!(order_id = %event.order_id, raw_phone = %event.raw_phone, error = %e, "Invalid customer phone number for SMS");
        })?;

        let tags = match mode {
            DispatchMode::Diagnostic {
                forced_tag: Some(forced),
            } => normalize_tag(forced).into_iter().collect(),
            _ => event.canonical_tags(),
        };

        let mut report = DispatchReport {
            order_id: event.order_id.clone(),
            order_number: event.order_number.clone(),
            to,
            outcomes: Vec::with_capacity(tags.len()),
        };

        tracing::info!(
            order_id = %report.order_id,
            order_number = %report.order_number,
            tags = ?tags.iter().map(CanonicalTag::as_str).collect::<Vec<_>>(),
            "Processing order event"
        );
        if tags.is_empty() {
            return Ok(report);
        }

        let templates = self.templates.fetch().await?;
        let any_template = tags.iter().any(|t| template_for(&templates, t).is_some());
        let ledger = if mode.uses_ledger() && any_template {
            self.ledger.get(&event.order_id).await?
        } else {
            LedgerSnapshot::default()
        };

        let context = event.render_context(&report.to);

        for tag in tags {
            let Some(template) = template_for(&templates, &tag) else {
                tracing::debug!(order_id = %event.order_id, tag = %tag, "No template configured for tag. Skipping SMS send.");
                report.outcomes.push(TagOutcome::new(tag, TagState::NoTemplate));
                continue;
            };

            if ledger.contains(&tag) {
                tracing::info!(order_id = %event.order_id, tag = %tag, "SMS already sent for this tag");
                report.outcomes.push(TagOutcome::new(tag, TagState::AlreadySent));
                continue;
            }

            let mut outcome = TagOutcome::new(tag, TagState::Pending);
            let body = render(template, &context, mode.missing_placeholder());

            match self.gateway.send(report.to.as_str(), &body).await {
                Ok(SentMessage { sid }) => {
                    outcome.state = TagState::Sent;
                    outcome.message_id = Some(sid);
                    if mode.uses_ledger()
                        && let Err(e) = self.ledger.record_sent(&event.order_id, &outcome.tag).await
                    {
                        tracing::error!(order_id = %event.order_id, tag = %outcome.tag, error = %e, "SMS sent but sent log update failed");
                        outcome.error = Some(format!("Sent log update failed: {e}"));
                    } else {
                        tracing::info!(order_id = %event.order_id, tag = %outcome.tag, "SMS sent");
                    }
                }
                Err(e) => {
                    tracing::error!(order_id = %event.order_id, tag = %outcome.tag, error = %e, "Failed to send SMS for tag");
                    outcome.state = TagState::Failed;
                    outcome.error = Some(e.to_string());
                }
            }
            report.outcomes.push(outcome);
        }

        Ok(report)
    }

    /// Render one template with echo placeholders and send it, bypassing the ledger.
    pub async fn send_template(&self, raw_phone: &str, template_key: &str, context: &Value) -> NotifyResult<DirectSend> {
        let to = normalize_phone(raw_phone)?;
        let templates = self.templates.fetch().await?;

        let not_found = || NotifyError::TemplateNotFound(template_key.to_string());
        let tag = normalize_tag(template_key).ok_or_else(not_found)?;
        let template = template_for(&templates, &tag).ok_or_else(not_found)?;
        let body = render(template, context, MissingPlaceholder::Echo);

        let SentMessage { sid } = self.gateway.send(to.as_str(), &body).await?;
        tracing::info!(to = %to, template = template_key, sid = %sid, "Test SMS sent");
        Ok(DirectSend {
            to,
            template: tag.into_inner(),
            body,
            sid,
        })
    }
}
