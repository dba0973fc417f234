//! Order tag normalization
//!
//! Merchants type order tags by hand ("On The Way", "pickup 2", "Make like new").
//! Every tag is folded to a canonical identifier before it is used as a key into
//! the template repository or the sent-tag ledger.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Normalized identifier for an order status tag
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalTag(String);

impl CanonicalTag {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for CanonicalTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CanonicalTag {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Textual variants (already lowercased and underscored) -> canonical id
fn alias_target(folded: &str) -> Option<&'static str> {
    let target = match folded {
        "on_the_way" => "on_the_way",
        "ready_for_pickup" => "ready_for_pickup",
        "pickup_2" | "pickup2" => "pickup2",
        "pickup_3" | "pickup3" => "pickup3",
        "alterations_pickup" => "alterations_pickup",
        "alterations_pickup2" | "alterations_pickup_2" => "alterations_pickup2",
        "alterations_pickup3" | "alterations_pickup_3" => "alterations_pickup3",
        "partially_paid1" | "partially_paid_1" => "partially_paid1",
        "partially_paid2" | "partially_paid_2" => "partially_paid2",
        "partially_paid3" | "partially_paid_3" => "partially_paid3",
        "make_like_new" | "mln" => "MLN",
        _ => return None,
    };
    Some(target)
}

/// Lowercase, whitespace runs -> `_`, repeated `_` collapsed.
fn fold(trimmed: &str) -> String {
    let lowered = trimmed.to_lowercase();
    let underscored = lowered.split_whitespace().collect::<Vec<_>>().join("_");

    let mut folded = String::with_capacity(underscored.len());
    for ch in underscored.chars() {
        if ch == '_' && folded.ends_with('_') {
            continue;
        }
        folded.push(ch);
    }
    folded
}

/// Normalize a raw tag, `None` when it is blank.
pub fn normalize_tag(raw: &str) -> Option<CanonicalTag> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let folded = fold(trimmed);
    let canonical = match alias_target(&folded) {
        Some(target) => target.to_string(),
        None => folded,
    };
    Some(CanonicalTag(canonical))
}

/// Normalize a list of raw tags, keeping first-occurrence order without duplicates.
pub fn extract_canonical_tags<I, S>(raw_tags: I) -> Vec<CanonicalTag>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut result: Vec<CanonicalTag> = Vec::new();
    for raw in raw_tags {
        if let Some(tag) = normalize_tag(raw.as_ref())
            && !result.contains(&tag)
        {
            result.push(tag);
        }
    }
    result
}

/// Split Shopify's comma-separated tag string.
pub fn split_tag_string(tags: &str) -> Vec<&str> {
    tags.split(',').map(str::trim).filter(|t| !t.is_empty()).collect()
}
