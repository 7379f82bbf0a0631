//! Catalog root aggregate
//!
//! A catalog is either one evolving schema or a set of versioned schemas.
//! Consumers branch with [`Catalog::fold`] rather than inspecting contents.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::change::Changeset;
use crate::definition::SchemaDefinition;
use crate::schema::{SchemaMut, SchemaRef, UnversionedSchema, VersionedSchema};
use crate::version::Version;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnversionedCatalog {
    pub schema: UnversionedSchema,
}

/// Versioned schemas, kept newest first
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionedCatalog {
    entries: Vec<VersionedSchema>,
}

impl VersionedCatalog {
    /// Build from schemas in any order
    pub fn new(mut entries: Vec<VersionedSchema>) -> Self {
        entries.sort_by(|a, b| b.version.cmp(&a.version));
        Self { entries }
    }

    /// Newest first
    pub fn entries(&self) -> &[VersionedSchema] {
        &self.entries
    }

    pub fn entries_mut(&mut self) -> &mut [VersionedSchema] {
        &mut self.entries
    }

    pub fn latest(&self) -> Option<&VersionedSchema> {
        self.entries.first()
    }

    pub fn get(&self, version: &Version) -> Option<&VersionedSchema> {
        self.entries.iter().find(|s| &s.version == version)
    }

    pub fn parent_of(&self, schema: &VersionedSchema) -> Option<&VersionedSchema> {
        schema.parent.as_ref().and_then(|v| self.get(v))
    }

    pub fn versions(&self) -> Vec<&Version> {
        self.entries.iter().map(|s| &s.version).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "_tag")]
pub enum Catalog {
    Unversioned(UnversionedCatalog),
    Versioned(VersionedCatalog),
}

impl Catalog {
    pub fn unversioned(schema: UnversionedSchema) -> Self {
        Catalog::Unversioned(UnversionedCatalog { schema })
    }

    pub fn versioned(entries: Vec<VersionedSchema>) -> Self {
        Catalog::Versioned(VersionedCatalog::new(entries))
    }

    pub fn fold<'a, R>(
        &'a self,
        on_versioned: impl FnOnce(&'a VersionedCatalog) -> R,
        on_unversioned: impl FnOnce(&'a UnversionedCatalog) -> R,
    ) -> R {
        match self {
            Catalog::Versioned(c) => on_versioned(c),
            Catalog::Unversioned(c) => on_unversioned(c),
        }
    }

    pub fn fold_mut<'a, R>(
        &'a mut self,
        on_versioned: impl FnOnce(&'a mut VersionedCatalog) -> R,
        on_unversioned: impl FnOnce(&'a mut UnversionedCatalog) -> R,
    ) -> R {
        match self {
            Catalog::Versioned(c) => on_versioned(c),
            Catalog::Unversioned(c) => on_unversioned(c),
        }
    }

    pub fn is_versioned(&self) -> bool {
        self.fold(|_| true, |_| false)
    }

    /// Every schema, newest first
    pub fn schemas(&self) -> Vec<SchemaRef<'_>> {
        self.fold(
            |c| c.entries.iter().map(SchemaRef::Versioned).collect(),
            |c| vec![SchemaRef::Unversioned(&c.schema)],
        )
    }

    /// Auxiliary mutable access to every schema, newest first
    pub fn schemas_mut(&mut self) -> Vec<SchemaMut<'_>> {
        self.fold_mut(
            |c| c.entries.iter_mut().map(SchemaMut::from).collect(),
            |c| vec![SchemaMut::from(&mut c.schema)],
        )
    }

    /// Definition of the newest schema
    pub fn latest_definition(&self) -> Option<&Arc<SchemaDefinition>> {
        self.fold(
            |c| c.latest().map(|s| &s.definition),
            |c| Some(&c.schema.definition),
        )
    }

    /// Every changeset reachable from revision provenance, oldest first.
    /// Versioned catalogs list the oldest version's history first.
    pub fn changesets_ascending(&self) -> Vec<Arc<Changeset>> {
        self.schemas()
            .into_iter()
            .rev()
            .flat_map(|s| s.revisions().iter().rev())
            .filter_map(|r| r.changeset.clone())
            .collect()
    }

    pub fn revision_count(&self) -> usize {
        self.schemas().iter().map(|s| s.revisions().len()).sum()
    }
}
