//! Notification pipeline: tags, templates, sent log, rendering and dispatch

pub mod dispatcher;
pub mod event;
pub mod ledger;
pub mod phone;
pub mod render;
pub mod tags;
pub mod templates;

pub use dispatcher::{DirectSend, DispatchMode, DispatchReport, Dispatcher, TagOutcome, TagState};
pub use event::OrderChangeEvent;
pub use ledger::{LedgerSnapshot, SentTagLedger};
pub use phone::{E164Phone, PhoneError, normalize_phone};
pub use render::{MissingPlaceholder, render};
pub use tags::{CanonicalTag, extract_canonical_tags, normalize_tag};
pub use templates::{TemplateBackend, TemplateMap, TemplateRepository, TemplateSchemaError};
