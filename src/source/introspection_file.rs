//! Introspection result stored in a project file

use super::introspection::{catalog_from_entry, CacheEntry};
use super::{InputSource, LoadContext, SourceName};
use crate::catalog::Catalog;
use crate::definition::SchemaDefinition;
use crate::date::DateOnly;
use crate::error::{ParseError, ParseType, Result};
use crate::history::{unversioned_catalog, Snapshot};

/// `schema.introspection.json`, holding either a cache entry
/// (`{url, fetchedAt, introspectionResult}`) or a bare introspection result
#[derive(Debug, Clone, Copy, Default)]
pub struct IntrospectionFileSource;

impl InputSource for IntrospectionFileSource {
    fn name(&self) -> &str {
        SourceName::IntrospectionFile.as_str()
    }

    fn is_applicable(&self, ctx: &LoadContext<'_>) -> bool {
        ctx.fs.exists(&ctx.resolve(&ctx.config.introspection_file))
    }

    fn read_if_applicable_or_throw(&self, ctx: &LoadContext<'_>) -> Result<Option<Catalog>> {
        let path = ctx.resolve(&ctx.config.introspection_file);
        let Some(text) = ctx.reader.get(&path)? else {
            return Ok(None);
        };
        let json: serde_json::Value = serde_json::from_str(&text).map_err(|e| ParseError {
            parse_type: ParseType::Schema,
            origin: path.display().to_string(),
            excerpt: text.lines().nth(e.line().saturating_sub(1)).unwrap_or_default().to_string(),
            message: e.to_string(),
        })?;

        if json.get("introspectionResult").is_some() {
            let entry: CacheEntry = serde_json::from_value(json)?;
            return catalog_from_entry(&entry);
        }
        let definition = SchemaDefinition::from_introspection(&json)?;
        unversioned_catalog(vec![Snapshot::new(DateOnly::today(), definition)])
    }
}
