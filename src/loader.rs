//! Source selection
//!
//! The loader probes sources in priority order (or in the order pinned by
//! `schema.use_sources`) and builds the catalog from the first source that
//! applies and produces one. Only that source performs its real read.

use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info};

use crate::augment;
use crate::catalog::Catalog;
use crate::category;
use crate::config::{CatalogConfig, SchemaSourcesConfig};
use crate::definition::{SchemaParser, SdlParser};
use crate::diagnostics::{Diagnostic, DiagnosticCode};
use crate::error::{CatalogError, Result};
use crate::source::{default_sources, FileSystem, HttpIntrospector, InputSource, Introspector, LoadContext, OsFileSystem};

static OS_FS: OsFileSystem = OsFileSystem;
static SDL_PARSER: SdlParser = SdlParser;
static HTTP_INTROSPECTOR: HttpIntrospector = HttpIntrospector::new(Duration::from_secs(30));

/// Collaborators shared by every source during a load
#[derive(Clone, Copy)]
pub struct LoadEnv<'a> {
    pub fs: &'a dyn FileSystem,
    pub parser: &'a dyn SchemaParser,
    pub introspector: &'a dyn Introspector,
}

impl LoadEnv<'static> {
    /// Real filesystem, `graphql-parser`, and HTTP introspection
    pub fn os() -> Self {
        Self { fs: &OS_FS, parser: &SDL_PARSER, introspector: &HTTP_INTROSPECTOR }
    }
}

impl<'a> LoadEnv<'a> {
    pub fn with_fs(self, fs: &'a dyn FileSystem) -> Self {
        Self { fs, ..self }
    }

    pub fn with_introspector(self, introspector: &'a dyn Introspector) -> Self {
        Self { introspector, ..self }
    }
}

/// Result of a load
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadedCatalog {
    /// `None` only when loading is disabled
    pub data: Option<Catalog>,
    /// Name of the source that produced `data`
    pub source: Option<String>,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct Loader {
    sources: Vec<Box<dyn InputSource>>,
}

impl Default for Loader {
    fn default() -> Self {
        Self::with_default_sources()
    }
}

impl Loader {
    /// Custom registry; earlier sources win
    pub fn new(sources: Vec<Box<dyn InputSource>>) -> Self {
        Self { sources }
    }

    pub fn with_default_sources() -> Self {
        Self::new(default_sources())
    }

    pub fn sources(&self) -> impl Iterator<Item = &dyn InputSource> {
        self.sources.iter().map(|s| s.as_ref())
    }

    /// Load using whatever caches sources keep
    pub fn load(&self, config: &CatalogConfig, env: &LoadEnv<'_>) -> Result<LoadedCatalog> {
        self.run(config, env, false)
    }

    /// Load rebuilding the selected source from scratch
    pub fn load_fresh(&self, config: &CatalogConfig, env: &LoadEnv<'_>) -> Result<LoadedCatalog> {
        self.run(config, env, true)
    }

    fn candidates(&self, config: &SchemaSourcesConfig, diagnostics: &mut Vec<Diagnostic>) -> Vec<&dyn InputSource> {
        let Some(pins) = &config.use_sources else {
            return self.sources().collect();
        };
        let mut picked = Vec::with_capacity(pins.len());
        for pin in pins {
            match self.sources().find(|s| s.name() == pin.as_str()) {
                Some(source) => picked.push(source),
                None => diagnostics.push(
                    Diagnostic::new(DiagnosticCode::UnknownSourcePin, "pinned source is not registered")
                        .with_target(pin.as_str()),
                ),
            }
        }
        picked
    }

    fn run(&self, config: &CatalogConfig, env: &LoadEnv<'_>, fresh: bool) -> Result<LoadedCatalog> {
        if !config.schema.enabled {
            info!("schema loading disabled");
            return Ok(LoadedCatalog::default());
        }
        config.validate()?;

        let mut diagnostics = Vec::new();
        let ctx = LoadContext::new(&config.schema, env.fs, env.parser, env.introspector);
        let mut tried = Vec::new();

        for source in self.candidates(&config.schema, &mut diagnostics) {
            let name = source.name().to_string();
            tried.push(name.clone());
            if !source.is_applicable(&ctx) {
                debug!(source = %name, "source not applicable");
                continue;
            }
            let read = if fresh { source.re_create(&ctx)? } else { source.read_if_applicable_or_throw(&ctx)? };
            let Some(mut catalog) = read else {
                debug!(source = %name, "source declined after probing");
                continue;
            };
            info!(
                source = %name,
                versioned = catalog.is_versioned(),
                revisions = catalog.revision_count(),
                "loaded schema catalog"
            );
            augment::apply(&mut catalog, &config.augmentations, &mut diagnostics);
            category::apply(&mut catalog, &config.categories, &mut diagnostics);
            return Ok(LoadedCatalog { data: Some(catalog), source: Some(name), diagnostics });
        }

        Err(CatalogError::NoApplicableSource { tried, hint: remediation_hint(&config.schema) })
    }
}

fn remediation_hint(config: &SchemaSourcesConfig) -> String {
    format!(
        "Add {} or dated files under {}/, or set schema.introspection.url",
        config.root.join(&config.file).display(),
        config.root.join(&config.directory).display()
    )
}

/// Load with default sources against the real environment
pub fn load(config: &CatalogConfig) -> Result<LoadedCatalog> {
    Loader::default().load(config, &LoadEnv::os())
}
