//! Order payload parsing
//!
//! [`OrderChangeEvent::from_payload`] is the only place that looks at the raw
//! Shopify order JSON. Everything downstream works with the validated event.

use serde_json::{Value, json};

use crate::error::{NotifyError, NotifyResult};
use crate::notify::phone::E164Phone;
use crate::notify::tags::{CanonicalTag, extract_canonical_tags, split_tag_string};

/// Where the customer phone may live, in priority order
const PHONE_POINTERS: &[&str] = &[
    "/customer/phone",
    "/phone",
    "/shipping_address/phone",
    "/billing_address/phone",
];

#[derive(Debug, Clone)]
pub struct OrderChangeEvent {
    pub order_id: String,
    /// Display number without the leading `#`
    pub order_number: String,
    pub customer_name: String,
    pub customer_first_name: Option<String>,
    pub customer_last_name: Option<String>,
    /// Phone as found in the payload, not yet normalized
    pub raw_phone: String,
    pub raw_tags: Vec<String>,
    pub tracking: Option<String>,
    pub remaining_balance: Option<String>,
    /// Full payload, exposed to templates as `order.*`
    pub payload: Value,
}

impl OrderChangeEvent {
    /// Parse and validate a Shopify order payload.
    ///
    /// All problems are collected into one [`NotifyError::InvalidEvent`].
    pub fn from_payload(payload: &Value) -> NotifyResult<Self> {
        if !payload.is_object() {
            return Err(NotifyError::InvalidEvent(vec![
                "Order payload must be a JSON object".to_string(),
            ]));
        }

        let mut errors = Vec::new();

        let order_id = scalar(payload.get("id"));
        if order_id.is_none() {
            errors.push("Order ID is required".to_string());
        }

        let customer = payload.get("customer").filter(|c| c.is_object());
        if customer.is_none() {
            errors.push("Customer information is required".to_string());
        }
        let customer_first_name = customer.and_then(|c| scalar(c.get("first_name")));
        let customer_last_name = customer.and_then(|c| scalar(c.get("last_name")));
        if customer.is_some() && customer_first_name.is_none() && customer_last_name.is_none() {
            errors.push("Customer name is required".to_string());
        }

        let raw_phone = PHONE_POINTERS
            .iter()
            .find_map(|pointer| scalar(payload.pointer(pointer)));
        match &raw_phone {
            None => errors.push("Customer phone is required".to_string()),
            Some(phone) if !phone.chars().all(is_phone_char) => {
                errors.push("Customer phone format is invalid".to_string());
            }
            Some(_) => {}
        }

        let (Some(order_id), Some(raw_phone), true) = (order_id, raw_phone, errors.is_empty()) else {
            return Err(NotifyError::InvalidEvent(errors));
        };

        let order_number = scalar(payload.get("order_number"))
            .or_else(|| scalar(payload.get("name")).map(|n| n.trim_start_matches('#').to_string()))
            .unwrap_or_else(|| order_id.clone());

        let customer_name = [customer_first_name.as_deref(), customer_last_name.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");

        Ok(Self {
            order_id,
            order_number,
            customer_name,
            customer_first_name,
            customer_last_name,
            raw_phone,
            raw_tags: raw_tags(payload.get("tags")),
            tracking: tracking_url(payload),
            remaining_balance: scalar(payload.get("total_outstanding")),
            payload: payload.clone(),
        })
    }

    pub fn canonical_tags(&self) -> Vec<CanonicalTag> {
        extract_canonical_tags(&self.raw_tags)
    }

    /// Values available to `{{placeholders}}`; absent fields are `null`
    pub fn render_context(&self, phone: &E164Phone) -> Value {
        json!({
            "name": self.customer_name,
            "order_number": self.order_number,
            "tracking": self.tracking,
            "remaining_balance": self.remaining_balance,
            "customer_first_name": self.customer_first_name,
            "customer_last_name": self.customer_last_name,
            "phone": phone.as_str(),
            "order": self.payload,
        })
    }
}

fn is_phone_char(c: char) -> bool {
    c.is_ascii_digit() || matches!(c, '+' | '-' | '(' | ')' | '.' | ' ')
}

/// Non-empty string or number as a string
fn scalar(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn raw_tags(tags: Option<&Value>) -> Vec<String> {
    match tags {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| item.as_str())
            .map(str::to_string)
            .collect(),
        Some(Value::String(joined)) => split_tag_string(joined)
            .into_iter()
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

fn tracking_url(payload: &Value) -> Option<String> {
    let fulfillments = payload.get("fulfillments")?.as_array()?;
    fulfillments.iter().find_map(|f| {
        scalar(f.get("tracking_url")).or_else(|| {
            f.get("tracking_urls")
                .and_then(Value::as_array)
                .and_then(|urls| scalar(urls.first()))
        })
    })
}
