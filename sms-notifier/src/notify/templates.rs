//! Template repository
//!
//! Holds the tag -> SMS body mapping. Loads from the configured backend (a local
//! JSON file or a shop metafield), falls back to the bundled defaults when the
//! backend is unreachable or holds an invalid set, and caches the result for
//! [`TEMPLATE_CACHE_TTL`].
//!
//! Canonical tags are the source of truth: every key is folded through
//! [`normalize_tag`] on load and save, so "pickup 2", "Pickup2" and "pickup2"
//! address one template. A few canonical tags also have a legacy alternate
//! spelling ("on the way"); both spellings are rewritten from the single
//! resolved body, so they never diverge.

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;

use crate::error::{NotifyError, NotifyResult};
use crate::notify::tags::{CanonicalTag, normalize_tag};
use crate::retry::{RetryPolicy, with_backoff};
use crate::shopify::{MetafieldId, MetafieldOwner, MetafieldStore, NewMetafield};

pub const TEMPLATE_CACHE_TTL: Duration = Duration::from_secs(60);
pub const MAX_TEMPLATE_LENGTH: usize = 5000;

/// Tag -> body, ordered for stable JSON output
pub type TemplateMap = BTreeMap<String, String>;

const DEFAULT_TEMPLATES_JSON: &str = include_str!("../../messages/default_templates.json");

/// Canonical tags that must always have a template
pub const REQUIRED_TEMPLATE_KEYS: &[&str] = &[
    "processing",
    "on_the_way",
    "ready_for_pickup",
    "pickup2",
    "pickup3",
    "MLN",
    "alterations_pickup",
    "alterations_pickup2",
    "alterations_pickup3",
    "partially_paid1",
    "partially_paid2",
    "partially_paid3",
];

/// canonical -> alternate spelling
const TEMPLATE_KEY_ALIASES: &[(&str, &str)] = &[
    ("on_the_way", "on the way"),
    ("ready_for_pickup", "ready for pickup"),
    ("alterations_pickup", "alterations pickup"),
    ("alterations_pickup2", "alterations pickup2"),
    ("alterations_pickup3", "alterations pickup3"),
    ("partially_paid1", "partially paid1"),
    ("partially_paid2", "partially paid2"),
    ("partially_paid3", "partially paid3"),
];

fn alternate_spelling(canonical: &str) -> Option<&'static str> {
    TEMPLATE_KEY_ALIASES
        .iter()
        .find(|(c, _)| *c == canonical)
        .map(|(_, alt)| *alt)
}

fn within_limit(body: &str) -> bool {
    body.chars().count() <= MAX_TEMPLATE_LENGTH
}

/// Fold every key to its canonical tag; blank keys are dropped.
///
/// When several spellings land on one tag, a non-canonical spelling with a body
/// overrides the canonical key, the same precedence alias pairs resolve with.
pub fn canonicalize_keys(templates: &TemplateMap) -> TemplateMap {
    let mut canonical = TemplateMap::new();
    let mut respelled = Vec::new();
    for (key, body) in templates {
        let Some(tag) = normalize_tag(key) else {
            continue;
        };
        if tag.as_str() == key {
            canonical.insert(key.clone(), body.clone());
        } else {
            respelled.push((tag.into_inner(), body));
        }
    }
    for (key, body) in respelled {
        if !body.trim().is_empty() || !canonical.contains_key(&key) {
            canonical.insert(key, body.clone());
        }
    }
    canonical
}

fn non_empty<'a>(templates: &'a TemplateMap, key: &str) -> Option<&'a String> {
    templates.get(key).filter(|body| !body.trim().is_empty())
}

/// The body alias expansion keeps for a canonical key (and the key it came from).
///
/// The alternate spelling wins when both are populated; it is the one older
/// editors wrote to.
fn resolved_body<'a>(templates: &'a TemplateMap, canonical: &'a str) -> Option<(&'a str, &'a String)> {
    if let Some(alt) = alternate_spelling(canonical)
        && let Some(body) = non_empty(templates, alt)
    {
        return Some((alt, body));
    }
    non_empty(templates, canonical).map(|body| (canonical, body))
}

/// Schema violation: required keys without a body, or bodies over the limit.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{}", self.describe())]
pub struct TemplateSchemaError {
    pub missing: Vec<String>,
    pub oversized: Vec<String>,
}

impl TemplateSchemaError {
    fn describe(&self) -> String {
        let mut parts = Vec::new();
        if !self.missing.is_empty() {
            parts.push(format!(
                "Missing required template keys: {}",
                self.missing.join(", ")
            ));
        }
        if !self.oversized.is_empty() {
            parts.push(format!(
                "Template values exceed {MAX_TEMPLATE_LENGTH} characters: {}",
                self.oversized.join(", ")
            ));
        }
        parts.join("; ")
    }
}

pub fn validate_templates(templates: &TemplateMap) -> Result<(), TemplateSchemaError> {
    let missing: Vec<String> = REQUIRED_TEMPLATE_KEYS
        .iter()
        .filter(|canonical| resolved_body(templates, canonical).is_none())
        .map(|canonical| canonical.to_string())
        .collect();

    let oversized: Vec<String> = templates
        .iter()
        .filter(|(_, body)| !within_limit(body))
        .map(|(key, _)| key.clone())
        .collect();

    if missing.is_empty() && oversized.is_empty() {
        Ok(())
    } else {
        Err(TemplateSchemaError { missing, oversized })
    }
}

/// Rewrite both spellings of every aliased key from the resolved body.
pub fn expand_aliases(templates: &TemplateMap) -> TemplateMap {
    let mut expanded = templates.clone();
    for (canonical, alt) in TEMPLATE_KEY_ALIASES {
        if let Some((_, body)) = resolved_body(templates, canonical) {
            expanded.insert(canonical.to_string(), body.clone());
            expanded.insert(alt.to_string(), body.clone());
        }
    }
    expanded
}

/// Template body for a canonical tag, if one is registered and non-empty.
pub fn template_for<'a>(templates: &'a TemplateMap, tag: &CanonicalTag) -> Option<&'a str> {
    non_empty(templates, tag.as_str()).map(String::as_str)
}

/// Bundled defaults, compiled into the binary
pub fn default_templates() -> NotifyResult<TemplateMap> {
    let templates: TemplateMap = serde_json::from_str(DEFAULT_TEMPLATES_JSON)
        .map_err(|e| NotifyError::Storage(format!("Bundled default templates are not valid JSON: {e}")))?;
    validate_templates(&templates)?;
    Ok(templates)
}

/// Durable home of the template set
pub enum TemplateBackend {
    /// JSON document on disk, replaced atomically on save
    Local { path: PathBuf },
    /// JSON value of a shop metafield
    Remote {
        store: Arc<dyn MetafieldStore>,
        namespace: String,
        key: String,
        retry: RetryPolicy,
    },
}

impl TemplateBackend {
    pub fn describe(&self) -> String {
        match self {
            Self::Local { path } => format!("Local file ({})", path.display()),
            Self::Remote { namespace, key, .. } => format!("Shopify metafield ({namespace}.{key})"),
        }
    }
}

/// Where the cached set came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TemplateSource {
    /// Read from or written to the backend
    Stored,
    /// Bundled defaults: nothing stored, stored set unusable, or backend unreachable
    Defaults,
}

struct TemplateCache {
    templates: Arc<TemplateMap>,
    source: TemplateSource,
    fetched_at: Instant,
}

pub struct TemplateRepository {
    backend: TemplateBackend,
    ttl: Duration,
    cache: RwLock<Option<TemplateCache>>,
    /// Held while loading or saving: one in-flight refresh, shared by waiters
    refresh: Mutex<()>,
    /// Record id of the remote metafield once seen
    remote_id: Mutex<Option<MetafieldId>>,
}

impl TemplateRepository {
    pub fn new(backend: TemplateBackend) -> Self {
        Self::with_ttl(backend, TEMPLATE_CACHE_TTL)
    }

    pub fn with_ttl(backend: TemplateBackend, ttl: Duration) -> Self {
        Self {
            backend,
            ttl,
            cache: RwLock::new(None),
            refresh: Mutex::new(()),
            remote_id: Mutex::new(None),
        }
    }

    pub fn backend(&self) -> &TemplateBackend {
        &self.backend
    }

    /// Current template set, alias-expanded.
    ///
    /// Never fails because of the backend: unreadable or invalid stored sets
    /// fall back to the bundled defaults.
    pub async fn fetch(&self) -> NotifyResult<Arc<TemplateMap>> {
        if let Some(templates) = self.fresh().await {
            return Ok(templates);
        }

        let _refresh = self.refresh.lock().await;
        // Someone else may have refreshed while we waited
        if let Some(templates) = self.fresh().await {
            return Ok(templates);
        }

        let (loaded, source) = match self.load_stored().await {
            Ok(Some(stored)) => (stored, TemplateSource::Stored),
            Ok(None) => (default_templates()?, TemplateSource::Defaults),
            Err(e) => {
                tracing::warn!(backend = %self.backend.describe(), error = %e, "Unable to load templates. Falling back to defaults.");
                (default_templates()?, TemplateSource::Defaults)
            }
        };
        let templates = Arc::new(expand_aliases(&loaded));
        self.replace_cache(templates.clone(), source).await;
        Ok(templates)
    }

    /// Validate, alias-expand and persist a whole template set.
    ///
    /// Validation failures write nothing. Backend failures leave the previous
    /// durable copy and the cache untouched.
    pub async fn save(&self, templates: TemplateMap) -> NotifyResult<Arc<TemplateMap>> {
        let _refresh = self.refresh.lock().await;
        self.save_locked(&templates).await
    }

    /// Set one template body, addressed by any spelling of its tag.
    ///
    /// Edits the stored set. When the cache only holds the defaults fallback the
    /// backend is read again first, and a read failure aborts the edit.
    pub async fn upsert(&self, key: &str, body: String) -> NotifyResult<Arc<TemplateMap>> {
        let tag = normalize_tag(key).ok_or_else(|| NotifyError::TemplateNotFound(key.to_string()))?;

        let _refresh = self.refresh.lock().await;
        let current = match self.stored_snapshot().await {
            Some(templates) => (*templates).clone(),
            None => match self.load_stored().await? {
                Some(stored) => stored,
                None => default_templates()?,
            },
        };

        let mut templates = canonicalize_keys(&current);
        templates.insert(tag.into_inner(), body);
        self.save_locked(&templates).await
    }

    /// Replace the stored set with the bundled defaults.
    pub async fn reset(&self) -> NotifyResult<Arc<TemplateMap>> {
        let defaults = default_templates()?;
        self.save(defaults).await
    }

    /// Canonicalize, validate, expand and persist. Caller holds `refresh`.
    async fn save_locked(&self, templates: &TemplateMap) -> NotifyResult<Arc<TemplateMap>> {
        let templates = canonicalize_keys(templates);
        validate_templates(&templates)?;
        let expanded = Arc::new(expand_aliases(&templates));

        self.persist(&expanded).await?;
        self.replace_cache(expanded.clone(), TemplateSource::Stored).await;

        tracing::info!(backend = %self.backend.describe(), keys = expanded.len(), "Templates saved");
        Ok(expanded)
    }

    async fn fresh(&self) -> Option<Arc<TemplateMap>> {
        let cache = self.cache.read().await;
        cache
            .as_ref()
            .filter(|c| c.fetched_at.elapsed() < self.ttl)
            .map(|c| c.templates.clone())
    }

    /// Fresh cached set, only if it mirrors the backend.
    async fn stored_snapshot(&self) -> Option<Arc<TemplateMap>> {
        let cache = self.cache.read().await;
        cache
            .as_ref()
            .filter(|c| c.source == TemplateSource::Stored && c.fetched_at.elapsed() < self.ttl)
            .map(|c| c.templates.clone())
    }

    async fn replace_cache(&self, templates: Arc<TemplateMap>, source: TemplateSource) {
        *self.cache.write().await = Some(TemplateCache {
            templates,
            source,
            fetched_at: Instant::now(),
        });
    }

    /// Stored set, canonicalized.
    ///
    /// `Ok(None)` when nothing usable is stored (absent, not JSON, or failing
    /// validation); `Err` when the backend could not be read at all.
    async fn load_stored(&self) -> NotifyResult<Option<TemplateMap>> {
        let raw = match &self.backend {
            TemplateBackend::Local { path } => match read_local(path).await? {
                Some(raw) => raw,
                None => return Ok(None),
            },
            TemplateBackend::Remote {
                store,
                namespace,
                key,
                retry,
            } => {
                let field = with_backoff(retry, "fetch_template_metafield", NotifyError::is_transient, || {
                    store.shop_metafield(namespace, key)
                })
                .await?;
                let Some(field) = field else {
                    return Ok(None);
                };
                *self.remote_id.lock().await = Some(field.id);
                match field.value.filter(|v| !v.trim().is_empty()) {
                    Some(raw) => raw,
                    None => return Ok(None),
                }
            }
        };

        let parsed: TemplateMap = match serde_json::from_str(&raw) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!(error = %e, "Stored templates are not a JSON object of strings. Falling back to defaults.");
                return Ok(None);
            }
        };

        let mut templates = canonicalize_keys(&parsed);
        // An oversized optional template costs only itself
        templates.retain(|key, body| {
            let keep = REQUIRED_TEMPLATE_KEYS.contains(&key.as_str()) || within_limit(body);
            if !keep {
                tracing::warn!(key = %key, "Dropping stored template over {MAX_TEMPLATE_LENGTH} characters");
            }
            keep
        });

        if let Err(e) = validate_templates(&templates) {
            tracing::warn!(error = %e, "Stored templates failed validation. Falling back to defaults.");
            return Ok(None);
        }
        Ok(Some(templates))
    }

    async fn persist(&self, templates: &TemplateMap) -> NotifyResult<()> {
        match &self.backend {
            TemplateBackend::Local { path } => write_local(path, templates).await,
            TemplateBackend::Remote {
                store,
                namespace,
                key,
                retry,
            } => {
                let value = serde_json::to_string(templates)
                    .map_err(|e| NotifyError::Storage(format!("Failed to serialize templates: {e}")))?;

                let mut remote_id = self.remote_id.lock().await;
                if remote_id.is_none() {
                    // Single lookup; a failure here surfaces instead of risking a duplicate create
                    *remote_id = store.shop_metafield(namespace, key).await?.map(|f| f.id);
                }

                match *remote_id {
                    Some(id) => {
                        with_backoff(retry, "update_template_metafield", NotifyError::is_transient, || {
                            store.update_metafield(id, value.clone())
                        })
                        .await?;
                    }
                    None => {
                        let id = with_backoff(retry, "create_template_metafield", NotifyError::is_transient, || {
                            store.create_metafield(NewMetafield {
                                owner: MetafieldOwner::Shop,
                                namespace: namespace.clone(),
                                key: key.clone(),
                                value: value.clone(),
                            })
                        })
                        .await?;
                        *remote_id = Some(id);
                    }
                }
                Ok(())
            }
        }
    }
}

async fn read_local(path: &Path) -> NotifyResult<Option<String>> {
    match tokio::fs::read_to_string(path).await {
        Ok(raw) => Ok(Some(raw)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(NotifyError::Storage(format!("{}: {e}", path.display()))),
    }
}

/// Write to `<path>.tmp` then rename over the target.
async fn write_local(path: &Path, templates: &TemplateMap) -> NotifyResult<()> {
    let storage_err = |e: std::io::Error| NotifyError::Storage(format!("{}: {e}", path.display()));

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(dir).await.map_err(storage_err)?;
    }

    let mut serialized = serde_json::to_string_pretty(templates)
        .map_err(|e| NotifyError::Storage(format!("Failed to serialize templates: {e}")))?;
    serialized.push('\n');

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    tokio::fs::write(&tmp, serialized).await.map_err(storage_err)?;
    tokio::fs::rename(&tmp, path).await.map_err(storage_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shopify::{MemoryMetafieldStore, RemoteError};

    fn minimal_valid() -> TemplateMap {
        REQUIRED_TEMPLATE_KEYS
            .iter()
            .map(|k| (k.to_string(), format!("{k}: hi {{{{name}}}}")))
            .collect()
    }

    fn remote_repo(store: &MemoryMetafieldStore) -> TemplateRepository {
        TemplateRepository::new(TemplateBackend::Remote {
            store: Arc::new(store.clone()),
            namespace: "sms".into(),
            key: "templates".into(),
            retry: RetryPolicy::default(),
        })
    }

    #[test]
    fn test_bundled_defaults_are_valid() {
        let defaults = default_templates().unwrap();
        assert!(validate_templates(&defaults).is_ok());
        assert_eq!(expand_aliases(&defaults), defaults);
    }

    #[test]
    fn test_validate_reports_missing_and_oversized() {
        let mut templates = minimal_valid();
        templates.remove("processing");
        templates.insert("pickup2".into(), "   ".into());
        templates.insert("MLN".into(), "x".repeat(MAX_TEMPLATE_LENGTH + 1));

        let err = validate_templates(&templates).unwrap_err();
        assert_eq!(err.missing, vec!["processing", "pickup2"]);
        assert_eq!(err.oversized, vec!["MLN"]);
        assert!(err.to_string().contains("Missing required template keys: processing, pickup2"));
    }

    #[test]
    fn test_alternate_spelling_satisfies_requirement() {
        let mut templates = minimal_valid();
        let body = templates.remove("on_the_way").unwrap();
        templates.insert("on the way".into(), body);
        assert!(validate_templates(&templates).is_ok());
    }

    #[test]
    fn test_expand_aliases_copies_resolved_body_to_both_spellings() {
        let mut templates = minimal_valid();
        templates.insert("ready for pickup".into(), "spaced".into());
        templates.insert("ready_for_pickup".into(), "underscored".into());

        let expanded = expand_aliases(&templates);
        assert_eq!(expanded["ready_for_pickup"], "spaced");
        assert_eq!(expanded["ready for pickup"], "spaced");
        assert_eq!(expanded["on the way"], expanded["on_the_way"]);
        assert!(!expanded.contains_key("pickup 2"));
    }

    #[test]
    fn test_template_for_by_canonical_tag() {
        let expanded = expand_aliases(&minimal_valid());
        let tag = crate::notify::tags::normalize_tag("On The Way").unwrap();
        assert_eq!(template_for(&expanded, &tag), Some("on_the_way: hi {{name}}"));
        let unknown = crate::notify::tags::normalize_tag("gift wrap").unwrap();
        assert_eq!(template_for(&expanded, &unknown), None);
    }

    #[test]
    fn test_canonicalize_keys_folds_every_spelling() {
        let mut templates = minimal_valid();
        templates.insert("partially paid2".into(), "spaced".into());
        templates.insert("VIP Customer".into(), "vip".into());
        templates.insert("Pickup 3".into(), "   ".into());
        templates.insert("  ".into(), "blank key".into());

        let folded = canonicalize_keys(&templates);
        assert_eq!(folded["partially_paid2"], "spaced");
        assert_eq!(folded["vip_customer"], "vip");
        // an empty respelling does not clobber the canonical body
        assert_eq!(folded["pickup3"], "pickup3: hi {{name}}");
        assert!(!folded.contains_key("partially paid2"));
        assert!(!folded.contains_key("Pickup 3"));
        assert!(!folded.contains_key("  "));
    }

    #[tokio::test]
    async fn test_local_missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let repo = TemplateRepository::new(TemplateBackend::Local {
            path: dir.path().join("templates.json"),
        });
        let templates = repo.fetch().await.unwrap();
        assert_eq!(*templates, default_templates().unwrap());
    }

    #[tokio::test]
    async fn test_local_corrupt_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("templates.json");
        std::fs::write(&path, "{ not json").unwrap();

        let repo = TemplateRepository::new(TemplateBackend::Local { path });
        assert_eq!(*repo.fetch().await.unwrap(), default_templates().unwrap());
    }

    #[tokio::test]
    async fn test_local_save_then_fetch_round_trips_expanded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("templates.json");
        let repo = TemplateRepository::new(TemplateBackend::Local { path: path.clone() });

        let saved = repo.save(minimal_valid()).await.unwrap();
        assert_eq!(*saved, expand_aliases(&minimal_valid()));
        assert!(!dir.path().join("nested").join("templates.json.tmp").exists());

        // A fresh repository reads the durable copy, not the cache
        let reopened = TemplateRepository::new(TemplateBackend::Local { path });
        assert_eq!(*reopened.fetch().await.unwrap(), *saved);
    }

    #[tokio::test]
    async fn test_invalid_save_leaves_durable_copy_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("templates.json");
        let repo = TemplateRepository::new(TemplateBackend::Local { path: path.clone() });
        repo.save(minimal_valid()).await.unwrap();
        let before = std::fs::read_to_string(&path).unwrap();

        let mut broken = minimal_valid();
        broken.remove("MLN");
        let err = repo.save(broken).await.unwrap_err();
        match err {
            NotifyError::TemplateSchema(schema) => assert_eq!(schema.missing, vec!["MLN"]),
            other => panic!("unexpected error: {other}"),
        }

        assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
        assert!(repo.fetch().await.unwrap().contains_key("MLN"));
    }

    #[tokio::test]
    async fn test_upsert_by_alternate_spelling_updates_both() {
        let dir = tempfile::tempdir().unwrap();
        let repo = TemplateRepository::new(TemplateBackend::Local {
            path: dir.path().join("templates.json"),
        });

        let templates = repo
            .upsert("on the way", "Shipped! {{tracking}}".into())
            .await
            .unwrap();
        assert_eq!(templates["on_the_way"], "Shipped! {{tracking}}");
        assert_eq!(templates["on the way"], "Shipped! {{tracking}}");

        let templates = repo.upsert("on_the_way", "Again".into()).await.unwrap();
        assert_eq!(templates["on the way"], "Again");
    }

    #[tokio::test(start_paused = true)]
    async fn test_cache_is_reused_until_ttl_expires() {
        let store = MemoryMetafieldStore::new();
        store
            .seed(
                MetafieldOwner::Shop,
                "sms",
                "templates",
                &serde_json::to_string(&minimal_valid()).unwrap(),
            )
            .await;
        let repo = remote_repo(&store);

        repo.fetch().await.unwrap();
        repo.fetch().await.unwrap();
        assert_eq!(store.read_count().await, 1);

        tokio::time::advance(TEMPLATE_CACHE_TTL + Duration::from_millis(1)).await;
        repo.fetch().await.unwrap();
        assert_eq!(store.read_count().await, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_refreshes_are_coalesced() {
        let store = MemoryMetafieldStore::new();
        store.set_latency(Duration::from_millis(200)).await;
        let repo = remote_repo(&store);

        let (a, b, c) = tokio::join!(repo.fetch(), repo.fetch(), repo.fetch());
        assert_eq!(*a.unwrap(), *b.unwrap());
        assert!(c.is_ok());
        assert_eq!(store.read_count().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unreachable_remote_falls_back_to_defaults() {
        let store = MemoryMetafieldStore::new();
        for _ in 0..3 {
            store.fail_next(RemoteError::http(503, "unavailable")).await;
        }
        let repo = remote_repo(&store);

        let templates = repo.fetch().await.unwrap();
        assert_eq!(*templates, default_templates().unwrap());
        assert!(validate_templates(&templates).is_ok());
    }

    #[tokio::test]
    async fn test_remote_save_creates_then_updates_known_id() {
        let store = MemoryMetafieldStore::new();
        let repo = remote_repo(&store);

        repo.save(minimal_valid()).await.unwrap();
        let mut changed = minimal_valid();
        changed.insert("processing".into(), "Working on #{{order_number}}".into());
        repo.save(changed.clone()).await.unwrap();

        let stored = store
            .value_of(&MetafieldOwner::Shop, "sms", "templates")
            .await
            .unwrap();
        let stored: TemplateMap = serde_json::from_str(&stored).unwrap();
        assert_eq!(stored, expand_aliases(&changed));
        // lookup + create, then update by the remembered id
        assert_eq!(store.write_count().await, 2);
        assert_eq!(*repo.fetch().await.unwrap(), stored);
    }

    #[tokio::test]
    async fn test_remote_write_failure_keeps_previous_copy() {
        let store = MemoryMetafieldStore::new();
        let repo = remote_repo(&store);
        repo.save(minimal_valid()).await.unwrap();

        store.fail_next(RemoteError::http(403, "forbidden")).await;
        let mut changed = minimal_valid();
        changed.insert("pickup3".into(), "changed".into());
        let err = repo.save(changed).await.unwrap_err();
        assert!(matches!(err, NotifyError::Remote(_)));

        assert_eq!(
            repo.fetch().await.unwrap()["pickup3"],
            minimal_valid()["pickup3"]
        );
    }

    #[tokio::test]
    async fn test_save_stores_one_copy_per_tag() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("templates.json");
        let repo = TemplateRepository::new(TemplateBackend::Local { path: path.clone() });

        let mut templates = minimal_valid();
        let body = templates.remove("pickup2").unwrap();
        templates.insert("Pickup 2".into(), body);
        templates.insert("VIP".into(), "Thanks for being a VIP, {{name}}".into());

        let saved = repo.save(templates).await.unwrap();
        assert_eq!(saved["pickup2"], "pickup2: hi {{name}}");
        assert_eq!(saved["vip"], "Thanks for being a VIP, {{name}}");
        assert!(!saved.contains_key("Pickup 2"));
        assert!(!saved.contains_key("VIP"));

        let on_disk: TemplateMap = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk, *saved);
    }

    #[tokio::test]
    async fn test_stored_respellings_collapse_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("templates.json");
        let mut stored = minimal_valid();
        stored.insert("pickup 2".into(), "older spaced copy".into());
        std::fs::write(&path, serde_json::to_string(&stored).unwrap()).unwrap();

        let repo = TemplateRepository::new(TemplateBackend::Local { path });
        let templates = repo.fetch().await.unwrap();
        assert!(!templates.contains_key("pickup 2"));
        assert_eq!(templates["pickup2"], "older spaced copy");

        let edited = repo.upsert("pickup 2", "EDITED".into()).await.unwrap();
        let tag = crate::notify::tags::normalize_tag("Pickup 2").unwrap();
        assert_eq!(template_for(&edited, &tag), Some("EDITED"));
    }

    #[tokio::test]
    async fn test_oversized_optional_template_is_dropped_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("templates.json");
        let mut stored = minimal_valid();
        stored.insert("processing".into(), "custom processing".into());
        stored.insert("newsletter".into(), "x".repeat(MAX_TEMPLATE_LENGTH + 1));
        std::fs::write(&path, serde_json::to_string(&stored).unwrap()).unwrap();

        let repo = TemplateRepository::new(TemplateBackend::Local { path });
        let templates = repo.fetch().await.unwrap();
        assert_eq!(templates["processing"], "custom processing");
        assert!(!templates.contains_key("newsletter"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_upsert_after_outage_keeps_stored_customizations() {
        let store = MemoryMetafieldStore::new();
        let mut custom = minimal_valid();
        custom.insert("processing".into(), "custom processing".into());
        custom.insert("pickup3".into(), "custom pickup3".into());
        store
            .seed(MetafieldOwner::Shop, "sms", "templates", &serde_json::to_string(&custom).unwrap())
            .await;
        let repo = remote_repo(&store);
        assert_eq!(repo.fetch().await.unwrap()["processing"], "custom processing");

        // Refresh during an outage serves the defaults
        tokio::time::advance(TEMPLATE_CACHE_TTL + Duration::from_secs(1)).await;
        for _ in 0..3 {
            store.fail_next(RemoteError::http(503, "unavailable")).await;
        }
        assert_eq!(*repo.fetch().await.unwrap(), default_templates().unwrap());

        repo.upsert("MLN", "Make Like New is done".into()).await.unwrap();

        let stored = store
            .value_of(&MetafieldOwner::Shop, "sms", "templates")
            .await
            .unwrap();
        let stored: TemplateMap = serde_json::from_str(&stored).unwrap();
        assert_eq!(stored["processing"], "custom processing");
        assert_eq!(stored["pickup3"], "custom pickup3");
        assert_eq!(stored["MLN"], "Make Like New is done");
    }

    #[tokio::test(start_paused = true)]
    async fn test_upsert_fails_while_backend_unreachable() {
        let store = MemoryMetafieldStore::new();
        let mut custom = minimal_valid();
        custom.insert("processing".into(), "custom processing".into());
        let seeded = serde_json::to_string(&custom).unwrap();
        store.seed(MetafieldOwner::Shop, "sms", "templates", &seeded).await;
        let repo = remote_repo(&store);

        for _ in 0..3 {
            store.fail_next(RemoteError::http(503, "unavailable")).await;
        }
        assert_eq!(*repo.fetch().await.unwrap(), default_templates().unwrap());

        for _ in 0..3 {
            store.fail_next(RemoteError::http(503, "unavailable")).await;
        }
        let err = repo.upsert("MLN", "Make Like New is done".into()).await.unwrap_err();
        assert!(err.is_transient());

        assert_eq!(store.write_count().await, 0);
        assert_eq!(
            store.value_of(&MetafieldOwner::Shop, "sms", "templates").await.as_deref(),
            Some(seeded.as_str())
        );
    }

    #[tokio::test]
    async fn test_unreadable_local_file_blocks_upsert() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the file should be: reads fail with something other than NotFound
        let path = dir.path().join("templates.json");
        std::fs::create_dir(&path).unwrap();

        let repo = TemplateRepository::new(TemplateBackend::Local { path: path.clone() });
        assert_eq!(*repo.fetch().await.unwrap(), default_templates().unwrap());

        let err = repo.upsert("MLN", "edited".into()).await.unwrap_err();
        assert!(matches!(err, NotifyError::Storage(_)));
        assert!(path.is_dir());
    }
}
