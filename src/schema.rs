//! Schema histories and revisions

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::change::{Change, Changeset};
use crate::date::DateOnly;
use crate::definition::SchemaDefinition;
use crate::version::Version;

/// One dated node in a schema's history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Revision {
    pub date: DateOnly,
    pub changes: Vec<Change>,
    /// Provenance; not serialized
    #[serde(skip)]
    pub changeset: Option<Arc<Changeset>>,
}

impl Revision {
    pub fn from_changeset(changeset: Arc<Changeset>) -> Self {
        Self {
            date: changeset.date,
            changes: changeset.changes.clone(),
            changeset: Some(changeset),
        }
    }

    /// The snapshot this revision produced, when provenance is attached
    pub fn snapshot(&self) -> Option<&Arc<SchemaDefinition>> {
        self.changeset.as_ref().map(|c| &c.after)
    }
}

/// A named group of types, attached after loading
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub types: Vec<String>,
}

/// The single evolving schema of an unversioned catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnversionedSchema {
    pub definition: Arc<SchemaDefinition>,
    /// Newest first
    pub revisions: Vec<Revision>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<Category>,
}

/// One version of a versioned catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionedSchema {
    pub version: Version,
    pub definition: Arc<SchemaDefinition>,
    /// The version this one derived from; `None` for the first
    pub parent: Option<Version>,
    /// Newest first
    pub revisions: Vec<Revision>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<Category>,
}

/// Either kind of schema, borrowed. Branch with [`SchemaRef::fold`].
#[derive(Debug, Clone, Copy)]
pub enum SchemaRef<'a> {
    Unversioned(&'a UnversionedSchema),
    Versioned(&'a VersionedSchema),
}

impl<'a> SchemaRef<'a> {
    pub fn fold<R>(
        self,
        on_versioned: impl FnOnce(&'a VersionedSchema) -> R,
        on_unversioned: impl FnOnce(&'a UnversionedSchema) -> R,
    ) -> R {
        match self {
            SchemaRef::Versioned(s) => on_versioned(s),
            SchemaRef::Unversioned(s) => on_unversioned(s),
        }
    }

    pub fn definition(self) -> &'a Arc<SchemaDefinition> {
        self.fold(|s| &s.definition, |s| &s.definition)
    }

    pub fn revisions(self) -> &'a [Revision] {
        self.fold(|s| s.revisions.as_slice(), |s| s.revisions.as_slice())
    }

    pub fn categories(self) -> &'a [Category] {
        self.fold(|s| s.categories.as_slice(), |s| s.categories.as_slice())
    }

    pub fn version(self) -> Option<&'a Version> {
        self.fold(|s| Some(&s.version), |_| None)
    }

    /// Newest revision, if any
    pub fn latest_revision(self) -> Option<&'a Revision> {
        self.revisions().first()
    }
}

/// Mutable access to the auxiliary parts of either kind of schema
pub struct SchemaMut<'a> {
    pub version: Option<&'a Version>,
    pub definition: &'a mut Arc<SchemaDefinition>,
    pub categories: &'a mut Vec<Category>,
}

impl<'a> From<&'a mut UnversionedSchema> for SchemaMut<'a> {
    fn from(s: &'a mut UnversionedSchema) -> Self {
        Self { version: None, definition: &mut s.definition, categories: &mut s.categories }
    }
}

impl<'a> From<&'a mut VersionedSchema> for SchemaMut<'a> {
    fn from(s: &'a mut VersionedSchema) -> Self {
        Self { version: Some(&s.version), definition: &mut s.definition, categories: &mut s.categories }
    }
}
