//! Configuration management for the schema catalog
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (catalog.toml)
//! - Environment variables (CATALOG__*)
//!
//! ## Example config file (catalog.toml):
//! ```toml
//! [schema]
//! root = "./api"
//! use_sources = ["versioned-directory", "introspection"]
//!
//! [schema.introspection]
//! url = "https://api.example.com/graphql"
//! headers = { Authorization = "Bearer token" }
//!
//! [[augmentations]]
//! on = "User.email"
//! placement = "after"
//! content = "Verified addresses only."
//!
//! [[categories]]
//! name = "Accounts"
//! types = ["User", "/^Account.*/"]
//! ```

use config_crate::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::augment::DescriptionAugmentation;
use crate::category::CategoriesConfig;
use crate::date::DateOnly;
use crate::error::{CatalogError, Result};
use crate::source::SourceName;

/// Main configuration for the catalog
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Where schemas come from
    #[serde(default)]
    pub schema: SchemaSourcesConfig,

    /// Description rewrites applied after loading
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub augmentations: Vec<DescriptionAugmentation>,

    /// Type groupings attached after loading
    #[serde(default, skip_serializing_if = "CategoriesConfig::is_empty")]
    pub categories: CategoriesConfig,
}

/// Source selection and per-source options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaSourcesConfig {
    /// Disabled configs load nothing and report no error
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Project root; relative source paths resolve against it
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// Restrict and order the probed sources
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_sources: Option<Vec<SourceName>>,

    #[serde(default = "default_file")]
    pub file: PathBuf,

    /// Dated `.graphql` files
    #[serde(default = "default_directory")]
    pub directory: PathBuf,

    /// One subdirectory per version
    #[serde(default = "default_directory")]
    pub versioned_directory: PathBuf,

    #[serde(default = "default_introspection_file")]
    pub introspection_file: PathBuf,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<MemorySourceConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub introspection: Option<IntrospectionConfig>,
}

/// SDL supplied inline
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemorySourceConfig {
    #[serde(default)]
    pub revisions: Vec<MemoryRevision>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryRevision {
    pub sdl: String,

    /// Defaults to today
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DateOnly>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl MemoryRevision {
    pub fn new(sdl: impl Into<String>) -> Self {
        Self { sdl: sdl.into(), date: None, version: None }
    }

    pub fn dated(mut self, date: DateOnly) -> Self {
        self.date = Some(date);
        self
    }

    pub fn versioned(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }
}

/// Live endpoint introspection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntrospectionConfig {
    pub url: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,

    /// Reuse the last fetched payload when present
    #[serde(default = "default_true")]
    pub cache: bool,

    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// Ignore any cached payload on the next load
    #[serde(default)]
    pub force_refetch: bool,
}

impl IntrospectionConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: BTreeMap::new(),
            cache: true,
            cache_dir: default_cache_dir(),
            force_refetch: false,
        }
    }
}

// Default value functions
fn default_true() -> bool {
    true
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_file() -> PathBuf {
    PathBuf::from("schema.graphql")
}

fn default_directory() -> PathBuf {
    PathBuf::from("schema")
}

fn default_introspection_file() -> PathBuf {
    PathBuf::from("schema.introspection.json")
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from(".catalog/cache")
}

impl Default for SchemaSourcesConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            root: default_root(),
            use_sources: None,
            file: default_file(),
            directory: default_directory(),
            versioned_directory: default_directory(),
            introspection_file: default_introspection_file(),
            memory: None,
            introspection: None,
        }
    }
}

impl SchemaSourcesConfig {
    /// Defaults rooted at `root`
    pub fn rooted(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), ..Self::default() }
    }
}

impl CatalogConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration, layering an explicit file over the defaults
    pub fn load_from(config_path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();

        for location in ["catalog.toml", ".catalog.toml", "config/catalog.toml"] {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        if let Some(dirs) = directories::ProjectDirs::from("dev", "graphql-catalog", "catalog") {
            let xdg_config = dirs.config_dir().join("catalog.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix("CATALOG")
                .separator("__")
                .try_parsing(true),
        );

        let config: CatalogConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| CatalogError::InvalidConfig(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject values no source could act on
    pub fn validate(&self) -> Result<()> {
        let root = &self.schema.root;
        if root.exists() && !root.is_dir() {
            return Err(CatalogError::InvalidPath {
                path: root.display().to_string(),
                reason: "schema.root is not a directory".to_string(),
            });
        }
        if let Some(introspection) = &self.schema.introspection {
            if introspection.url.trim().is_empty() {
                return Err(CatalogError::InvalidConfig("schema.introspection.url is empty".to_string()));
            }
        }
        if let Some(pins) = &self.schema.use_sources {
            if pins.is_empty() {
                return Err(CatalogError::InvalidConfig(
                    "schema.use_sources is empty; omit it to probe every source".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Wrap source options with no augmentations or categories
    pub fn from_sources(schema: SchemaSourcesConfig) -> Self {
        Self { schema, ..Self::default() }
    }
}
