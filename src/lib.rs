//! GraphQL Schema Catalog
//!
//! Loads GraphQL schemas from pluggable sources, records their history as
//! dated revisions of classified changes, and derives when each type and
//! field was added or removed.
//!
//! ## Features
//!
//! - **Version Identity**: semver, calendar date, or opaque custom versions
//! - **Change Detection**: typed diff with BREAKING / DANGEROUS / NON_BREAKING criticality
//! - **Pluggable Sources**: SDL files, dated directories, versioned directories, memory, introspection
//! - **Lifecycle Index**: per-type and per-field add/remove timelines
//!
//! ## Architecture
//!
//! ```text
//! CatalogConfig ──► Loader ──► InputSource ──► Snapshots ──► diff ──► Catalog
//!                                                                     │
//!                          augment / categories ◄─────────────────────┤
//!                                                                     ▼
//!                                                              SchemaLifecycle
//! ```

pub mod augment;
pub mod catalog;
pub mod category;
pub mod change;
pub mod checksum;
pub mod config;
pub mod date;
pub mod definition;
pub mod diagnostics;
pub mod diff;
pub mod error;
pub mod history;
pub mod lifecycle;
pub mod loader;
pub mod schema;
pub mod source;
pub mod version;

pub use augment::{DescriptionAugmentation, Placement};
pub use catalog::{Catalog, UnversionedCatalog, VersionedCatalog};
pub use category::{CategoriesConfig, CategoryConfig, CategoryMode};
pub use change::{Change, ChangeKind, ChangeMeta, Changeset, Criticality, CriticalityLevel};
pub use checksum::Checksum;
pub use config::{CatalogConfig, IntrospectionConfig, MemoryRevision, MemorySourceConfig, SchemaSourcesConfig};
pub use date::DateOnly;
pub use definition::{SchemaDefinition, SchemaParser, SdlParser, TypeDefinition, TypeKind, TypeRef};
pub use diagnostics::{Diagnostic, DiagnosticCode, Severity};
pub use diff::diff;
pub use error::{CatalogError, ParseError, ParseType, Result};
pub use lifecycle::{Backref, EventKind, FieldLifecycle, LifecycleEvent, SchemaLifecycle, TypeLifecycle};
pub use loader::{load, LoadEnv, LoadedCatalog, Loader};
pub use schema::{Category, Revision, SchemaRef, UnversionedSchema, VersionedSchema};
pub use source::{FileSystem, InputSource, Introspector, LoadContext, OsFileSystem, SourceName};
pub use version::{Version, VersionKind};
