//! Network introspection source with an on-disk cache
//!
//! The last fetched payload for a request is stored as JSON under
//! `<cache_dir>/<sha256(url, headers)>.json`. A cache entry that cannot be
//! read or parsed is a miss. Writes are idempotent, so concurrent loads for
//! the same request may race on a file and the last writer wins.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

use super::{FileSystem, InputSource, LoadContext, SourceName};
use crate::catalog::Catalog;
use crate::checksum::Checksum;
use crate::config::IntrospectionConfig;
use crate::date::DateOnly;
use crate::definition::{SchemaDefinition, INTROSPECTION_QUERY};
use crate::error::{CatalogError, Result};
use crate::history::{unversioned_catalog, Snapshot};

/// Fetches a raw introspection result (the `data` member of the response)
pub trait Introspector: Send + Sync {
    fn introspect(&self, url: &str, headers: &BTreeMap<String, String>) -> Result<serde_json::Value>;
}

/// Posts the standard introspection query over HTTP
#[derive(Debug, Clone)]
pub struct HttpIntrospector {
    timeout: Duration,
}

impl HttpIntrospector {
    pub const fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for HttpIntrospector {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

impl Introspector for HttpIntrospector {
    fn introspect(&self, url: &str, headers: &BTreeMap<String, String>) -> Result<serde_json::Value> {
        let failed = |e: reqwest::Error| CatalogError::Introspection(format!("{}: {}", url, e));
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(failed)?;
        let mut request = client
            .post(url)
            .json(&serde_json::json!({ "query": INTROSPECTION_QUERY }));
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }
        let response = request.send().map_err(failed)?;
        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::Introspection(format!("{} returned HTTP {}", url, status)));
        }
        let body: serde_json::Value = response.json().map_err(failed)?;
        match body.get("data") {
            Some(data) if !data.is_null() => Ok(data.clone()),
            _ => Err(CatalogError::Introspection(format!(
                "{} returned no data: {}",
                url,
                body.get("errors").cloned().unwrap_or_default()
            ))),
        }
    }
}

/// On-disk cache entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub url: String,
    pub fetched_at: DateTime<Utc>,
    pub introspection_result: serde_json::Value,
}

/// Cache store keyed by request hash
#[derive(Debug, Clone)]
pub struct IntrospectionCache {
    dir: PathBuf,
}

impl IntrospectionCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, url: &str, headers: &BTreeMap<String, String>) -> PathBuf {
        self.dir.join(format!("{}.json", Checksum::of_request(url, headers)))
    }

    /// Cached entry for the request, or `None` on any miss or failure
    pub fn load(&self, fs: &dyn FileSystem, url: &str, headers: &BTreeMap<String, String>) -> Option<CacheEntry> {
        let path = self.path_for(url, headers);
        let text = match fs.read(&path) {
            Ok(Some(text)) => text,
            Ok(None) => return None,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "unreadable introspection cache entry");
                return None;
            }
        };
        match serde_json::from_str::<CacheEntry>(&text) {
            Ok(entry) if entry.url == url => match SchemaDefinition::from_introspection(&entry.introspection_result) {
                Ok(_) => Some(entry),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "unusable introspection cache entry");
                    None
                }
            },
            Ok(entry) => {
                warn!(path = %path.display(), cached = %entry.url, "introspection cache entry is for another url");
                None
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "corrupt introspection cache entry");
                None
            }
        }
    }

    /// Persist an entry. Failures are logged and otherwise ignored.
    pub fn store(&self, fs: &dyn FileSystem, headers: &BTreeMap<String, String>, entry: &CacheEntry) {
        let path = self.path_for(&entry.url, headers);
        let written = serde_json::to_string_pretty(entry)
            .map_err(CatalogError::from)
            .and_then(|text| fs.write(&path, &text));
        if let Err(e) = written {
            warn!(path = %path.display(), error = %e, "failed to write introspection cache");
        }
    }
}

/// Builds a catalog by introspecting a live endpoint
#[derive(Debug, Clone, Copy, Default)]
pub struct IntrospectionSource;

impl IntrospectionSource {
    fn cache(&self, ctx: &LoadContext<'_>, config: &IntrospectionConfig) -> Option<IntrospectionCache> {
        config
            .cache
            .then(|| IntrospectionCache::new(ctx.resolve(&config.cache_dir)))
    }

    fn fetch(&self, ctx: &LoadContext<'_>, config: &IntrospectionConfig, force: bool) -> Result<CacheEntry> {
        let cache = self.cache(ctx, config);
        if let Some(cache) = cache.as_ref().filter(|_| !force) {
            if let Some(hit) = cache.load(ctx.fs, &config.url, &config.headers) {
                debug!(url = %config.url, fetched_at = %hit.fetched_at, "introspection cache hit");
                return Ok(hit);
            }
        }
        debug!(url = %config.url, force, "fetching introspection");
        let introspection_result = ctx.introspector.introspect(&config.url, &config.headers)?;
        let entry = CacheEntry {
            url: config.url.clone(),
            fetched_at: Utc::now(),
            introspection_result,
        };
        if let Some(cache) = &cache {
            cache.store(ctx.fs, &config.headers, &entry);
        }
        Ok(entry)
    }

    fn load(&self, ctx: &LoadContext<'_>, force: bool) -> Result<Option<Catalog>> {
        let Some(config) = ctx.config.introspection.as_ref() else {
            return Ok(None);
        };
        let entry = self.fetch(ctx, config, force)?;
        catalog_from_entry(&entry)
    }
}

/// Single-revision catalog dated by when the payload was fetched
pub(crate) fn catalog_from_entry(entry: &CacheEntry) -> Result<Option<Catalog>> {
    let definition = SchemaDefinition::from_introspection(&entry.introspection_result)?;
    let date = DateOnly::from(entry.fetched_at.date_naive());
    unversioned_catalog(vec![Snapshot::new(date, definition)])
}

impl InputSource for IntrospectionSource {
    fn name(&self) -> &str {
        SourceName::Introspection.as_str()
    }

    fn is_applicable(&self, ctx: &LoadContext<'_>) -> bool {
        ctx.config.introspection.is_some()
    }

    fn read_if_applicable_or_throw(&self, ctx: &LoadContext<'_>) -> Result<Option<Catalog>> {
        let force = ctx
            .config
            .introspection
            .as_ref()
            .map(|c| c.force_refetch)
            .unwrap_or(false);
        self.load(ctx, force)
    }

    fn re_create(&self, ctx: &LoadContext<'_>) -> Result<Option<Catalog>> {
        self.load(ctx, true)
    }
}
