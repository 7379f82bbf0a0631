//! Diagnostics
//!
//! Non-fatal findings from source selection and the post-load passes
//! (augmentation and categorization). A load that produces diagnostics still succeeds.

use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Diagnostic Codes
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticCode {
    // === Augmentation ===
    /// `on` names a type or field the schema does not have
    AugmentationTargetNotFound,
    /// `on` is not a `Type` or `Type.field` coordinate
    InvalidAugmentationTarget,

    // === Categories ===
    /// A `/regex/` type pattern failed to compile
    InvalidCategoryPattern,
    /// A version scope matched no schema, or a schema matched no scope
    UnmatchedVersionScope,

    // === Loading ===
    /// A pinned source is not registered with the loader
    UnknownSourcePin,
}

impl DiagnosticCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AugmentationTargetNotFound => "W001",
            Self::InvalidAugmentationTarget => "E001",
            Self::InvalidCategoryPattern => "E002",
            Self::UnmatchedVersionScope => "W002",
            Self::UnknownSourcePin => "W003",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Self::InvalidAugmentationTarget | Self::InvalidCategoryPattern => Severity::Error,
            Self::AugmentationTargetNotFound | Self::UnmatchedVersionScope | Self::UnknownSourcePin => {
                Severity::Warning
            }
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Severity
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

// =============================================================================
// Diagnostic
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub code: DiagnosticCode,
    pub message: String,
    /// Coordinate or pattern the finding is about
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    /// Schema version, for versioned catalogs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl Diagnostic {
    pub fn new(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self { code, message: message.into(), target: None, version: None }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn with_version(mut self, version: Option<impl Into<String>>) -> Self {
        self.version = version.map(Into::into);
        self
    }

    pub fn severity(&self) -> Severity {
        self.code.severity()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code, self.severity(), self.message)?;
        if let Some(target) = &self.target {
            write!(f, " ({})", target)?;
        }
        if let Some(version) = &self.version {
            write!(f, " @ {}", version)?;
        }
        Ok(())
    }
}
