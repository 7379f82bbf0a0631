//! Error types for the schema catalog

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type for catalog operations
pub type Result<T> = std::result::Result<T, CatalogError>;

/// Catalog errors
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("No applicable schema source (tried: {}). {hint}", .tried.join(", "))]
    NoApplicableSource { tried: Vec<String>, hint: String },

    #[error("{0}")]
    Parse(#[from] ParseError),

    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    #[error("Inconsistent diff: TYPE_ADDED for '{type_name}' but the type is absent from the after schema")]
    InconsistentDiff { type_name: String },

    #[error("Introspection failed: {0}")]
    Introspection(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid path {path}: {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("Config error: {0}")]
    Config(#[from] config_crate::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// What kind of text failed to parse
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParseType {
    Schema,
    Document,
    Unknown,
}

impl fmt::Display for ParseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseType::Schema => write!(f, "schema"),
            ParseType::Document => write!(f, "document"),
            ParseType::Unknown => write!(f, "unknown"),
        }
    }
}

/// Parse failure raised by a parsing collaborator, with the offending location.
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
#[error("Failed to parse {parse_type} from {origin}: {message}\n{excerpt}")]
pub struct ParseError {
    pub parse_type: ParseType,
    /// Where the text came from (file path, URL or memory label)
    #[serde(rename = "source")]
    pub origin: String,
    /// A few lines of the offending text
    pub excerpt: String,
    pub message: String,
}
