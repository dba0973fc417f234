//! `{{ placeholder }}` substitution
//!
//! One `replace_all` pass over the template. Identifiers are word characters and
//! dots; dotted identifiers walk nested objects in the context. Substituted text
//! is never scanned again, so a customer name containing `{{...}}` stays literal.

use regex::{Captures, Regex};
use serde_json::Value;
use std::sync::LazyLock;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*([\w.]+)\s*\}\}").expect("placeholder pattern compiles"));

/// What to emit for a placeholder the context cannot resolve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingPlaceholder {
    /// Substitute an empty string (customer-facing sends)
    Blank,
    /// Echo `{{identifier}}` so missing data is visible (diagnostics, previews)
    Echo,
}

pub fn render(template: &str, context: &Value, missing: MissingPlaceholder) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures| {
            let ident = &caps[1];
            match lookup(context, ident) {
                Some(value) => value,
                None if missing == MissingPlaceholder::Echo => format!("{{{{{ident}}}}}"),
                None => String::new(),
            }
        })
        .into_owned()
}

fn lookup(context: &Value, path: &str) -> Option<String> {
    let mut current = context;
    for part in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(part)?,
            Value::Array(items) => items.get(part.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }

    match current {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}
