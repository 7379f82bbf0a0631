//! Input Sources
//!
//! Each source turns one kind of external data into a [`Catalog`]. Sources
//! are stateless: everything they need arrives through a [`LoadContext`], so
//! one instance can serve any number of loads.
//!
//! ```text
//! <root>/
//! ├── schema.graphql                 file
//! ├── schema.introspection.json      introspection-file
//! └── schema/
//!     ├── 2024-01-01.graphql         directory
//!     ├── 2024-02-01.graphql
//!     ├── 1.0.0/schema.graphql       versioned-directory
//!     └── 2.0.0/2024-03-01.graphql
//! ```

pub mod directory;
pub mod file;
pub mod fs;
pub mod introspection;
pub mod introspection_file;
pub mod memory;
pub mod versioned_directory;

pub use directory::DirectorySource;
pub use file::FileSource;
pub use fs::{CachedReader, DirEntry, FileSystem, OsFileSystem};
pub use introspection::{
    CacheEntry, HttpIntrospector, IntrospectionCache, IntrospectionSource, Introspector,
};
pub use introspection_file::IntrospectionFileSource;
pub use memory::MemorySource;
pub use versioned_directory::VersionedDirectorySource;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::catalog::Catalog;
use crate::config::SchemaSourcesConfig;
use crate::date::DateOnly;
use crate::definition::{SchemaDefinition, SchemaParser};
use crate::error::{CatalogError, Result};

/// Names of the built-in sources, used to pin or reorder selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceName {
    VersionedDirectory,
    Directory,
    File,
    Memory,
    Introspection,
    IntrospectionFile,
}

impl SourceName {
    /// Default probe order
    pub const PRIORITY: [SourceName; 6] = [
        SourceName::VersionedDirectory,
        SourceName::Directory,
        SourceName::File,
        SourceName::Memory,
        SourceName::Introspection,
        SourceName::IntrospectionFile,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceName::VersionedDirectory => "versioned-directory",
            SourceName::Directory => "directory",
            SourceName::File => "file",
            SourceName::Memory => "memory",
            SourceName::Introspection => "introspection",
            SourceName::IntrospectionFile => "introspection-file",
        }
    }
}

impl fmt::Display for SourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SourceName {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        SourceName::PRIORITY
            .into_iter()
            .find(|n| n.as_str() == s)
            .ok_or_else(|| format!("unknown source '{}'", s))
    }
}

/// Everything a source may use during one load
pub struct LoadContext<'a> {
    pub config: &'a SchemaSourcesConfig,
    pub fs: &'a dyn FileSystem,
    pub reader: CachedReader<'a>,
    pub parser: &'a dyn SchemaParser,
    pub introspector: &'a dyn Introspector,
}

impl<'a> LoadContext<'a> {
    pub fn new(
        config: &'a SchemaSourcesConfig,
        fs: &'a dyn FileSystem,
        parser: &'a dyn SchemaParser,
        introspector: &'a dyn Introspector,
    ) -> Self {
        Self { config, fs, reader: CachedReader::new(fs), parser, introspector }
    }

    /// Resolve a configured path against the project root
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.config.root.join(path)
        }
    }
}

/// A pluggable loader of catalogs
pub trait InputSource: Send + Sync {
    fn name(&self) -> &str;

    /// Cheap probe (existence or option check). Never performs the real read.
    fn is_applicable(&self, ctx: &LoadContext<'_>) -> bool;

    /// Read and build the catalog. `Ok(None)` if on closer inspection the
    /// source does not apply after all.
    fn read_if_applicable_or_throw(&self, ctx: &LoadContext<'_>) -> Result<Option<Catalog>>;

    /// Rebuild bypassing any cache the source keeps
    fn re_create(&self, ctx: &LoadContext<'_>) -> Result<Option<Catalog>> {
        self.read_if_applicable_or_throw(ctx)
    }
}

/// All built-in sources in default priority order
pub fn default_sources() -> Vec<Box<dyn InputSource>> {
    SourceName::PRIORITY.into_iter().map(builtin).collect()
}

pub fn builtin(name: SourceName) -> Box<dyn InputSource> {
    match name {
        SourceName::VersionedDirectory => Box::new(VersionedDirectorySource),
        SourceName::Directory => Box::new(DirectorySource),
        SourceName::File => Box::new(FileSource),
        SourceName::Memory => Box::new(MemorySource),
        SourceName::Introspection => Box::new(IntrospectionSource),
        SourceName::IntrospectionFile => Box::new(IntrospectionFileSource),
    }
}

/// `2024-01-15.graphql` → its date
pub(crate) fn dated_file_stem(name: &str) -> Option<DateOnly> {
    name.strip_suffix(".graphql").and_then(DateOnly::parse)
}

/// Read and parse independent files concurrently, one scoped thread per file.
/// Files that turn out to be absent come back as `None`. Results keep the
/// order of `paths`.
pub fn read_all_sdl(ctx: &LoadContext<'_>, paths: &[PathBuf]) -> Result<Vec<Option<SchemaDefinition>>> {
    std::thread::scope(|scope| {
        let handles: Vec<_> = paths
            .iter()
            .map(|path| {
                scope.spawn(move || -> Result<Option<SchemaDefinition>> {
                    match ctx.reader.get(path)? {
                        Some(text) => ctx.parser.parse_sdl(&text, &path.display().to_string()).map(Some),
                        None => Ok(None),
                    }
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| {
                handle.join().unwrap_or_else(|_| {
                    Err(CatalogError::Io(std::io::Error::new(
                        std::io::ErrorKind::Other,
                        "schema reader thread panicked",
                    )))
                })
            })
            .collect()
    })
}
