//! Type categories
//!
//! Categories group the types of a loaded schema by name. A pattern is an
//! exact type name or a `/regex/`.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::catalog::Catalog;
use crate::definition::SchemaDefinition;
use crate::diagnostics::{Diagnostic, DiagnosticCode};
use crate::schema::Category;
use crate::version::Version;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryMode {
    /// Types matching any pattern
    #[default]
    Include,
    /// Types matching no pattern
    Exclude,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub types: Vec<String>,
    #[serde(default)]
    pub mode: CategoryMode,
}

impl CategoryConfig {
    pub fn include(name: impl Into<String>, types: &[&str]) -> Self {
        Self {
            name: name.into(),
            description: None,
            types: types.iter().map(|t| t.to_string()).collect(),
            mode: CategoryMode::Include,
        }
    }

    pub fn exclude(name: impl Into<String>, types: &[&str]) -> Self {
        Self { mode: CategoryMode::Exclude, ..Self::include(name, types) }
    }
}

/// One list for every schema, or a list per version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CategoriesConfig {
    Uniform(Vec<CategoryConfig>),
    PerVersion(BTreeMap<String, Vec<CategoryConfig>>),
}

impl Default for CategoriesConfig {
    fn default() -> Self {
        CategoriesConfig::Uniform(Vec::new())
    }
}

impl CategoriesConfig {
    pub fn is_empty(&self) -> bool {
        match self {
            CategoriesConfig::Uniform(list) => list.is_empty(),
            CategoriesConfig::PerVersion(map) => map.is_empty(),
        }
    }

    /// Categories scoped to `version`; `None` when no scope matches
    fn scoped(&self, version: Option<&Version>) -> Option<&[CategoryConfig]> {
        match (self, version) {
            (CategoriesConfig::Uniform(list), _) => Some(list),
            (CategoriesConfig::PerVersion(map), Some(version)) => map
                .iter()
                .find(|(key, _)| &Version::decode(key) == version)
                .map(|(_, list)| list.as_slice()),
            (CategoriesConfig::PerVersion(_), None) => None,
        }
    }
}

enum Pattern {
    Exact(String),
    Regex(Regex),
}

impl Pattern {
    fn compile(raw: &str) -> Result<Self, regex::Error> {
        match raw.strip_prefix('/').and_then(|r| r.strip_suffix('/')) {
            Some(expr) => Regex::new(expr).map(Pattern::Regex),
            _ => Ok(Pattern::Exact(raw.to_string())),
        }
    }

    fn matches(&self, type_name: &str) -> bool {
        match self {
            Pattern::Exact(name) => name == type_name,
            Pattern::Regex(re) => re.is_match(type_name),
        }
    }
}

/// Resolve category configs against one definition. A category with an
/// invalid pattern is kept with no types.
pub fn categorize(
    definition: &SchemaDefinition,
    version: Option<&Version>,
    configs: &[CategoryConfig],
) -> (Vec<Category>, Vec<Diagnostic>) {
    let mut diagnostics = Vec::new();
    let categories = configs
        .iter()
        .map(|config| {
            let mut patterns = Vec::with_capacity(config.types.len());
            let mut valid = true;
            for raw in &config.types {
                match Pattern::compile(raw) {
                    Ok(pattern) => patterns.push(pattern),
                    Err(e) => {
                        valid = false;
                        diagnostics.push(
                            Diagnostic::new(
                                DiagnosticCode::InvalidCategoryPattern,
                                format!("category '{}': {}", config.name, e),
                            )
                            .with_target(raw.as_str())
                            .with_version(version.map(Version::encode)),
                        );
                    }
                }
            }
            let types = if valid {
                definition
                    .types
                    .keys()
                    .filter(|name| {
                        let hit = patterns.iter().any(|p| p.matches(name));
                        match config.mode {
                            CategoryMode::Include => hit,
                            CategoryMode::Exclude => !hit,
                        }
                    })
                    .cloned()
                    .collect()
            } else {
                Vec::new()
            };
            Category { name: config.name.clone(), description: config.description.clone(), types }
        })
        .collect();
    (categories, diagnostics)
}

/// Attach categories to every schema in the catalog
pub fn apply(catalog: &mut Catalog, config: &CategoriesConfig, diagnostics: &mut Vec<Diagnostic>) {
    if config.is_empty() {
        return;
    }
    for schema in catalog.schemas_mut() {
        let encoded = schema.version.map(Version::encode);
        match config.scoped(schema.version) {
            Some(configs) => {
                let (categories, found) = categorize(schema.definition, schema.version, configs);
                *schema.categories = categories;
                diagnostics.extend(found);
            }
            None => {
                schema.categories.clear();
                diagnostics.push(
                    Diagnostic::new(
                        DiagnosticCode::UnmatchedVersionScope,
                        match encoded {
                            Some(_) => "no category scope for this version",
                            None => "per-version categories configured for an unversioned catalog",
                        },
                    )
                    .with_version(encoded),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{SchemaParser, SdlParser};

    fn schema() -> SchemaDefinition {
        SdlParser
            .parse_sdl(
                "type Query { me: User } type User { id: ID } type AccountSettings { a: Int } type AccountOwner { b: Int }",
                "test",
            )
            .unwrap()
    }

    #[test]
    fn test_include_exact_and_regex() {
        let (categories, diagnostics) =
            categorize(&schema(), None, &[CategoryConfig::include("Accounts", &["User", "/^Account/"])]);
        assert!(diagnostics.is_empty());
        assert_eq!(categories[0].types, vec!["AccountOwner", "AccountSettings", "User"]);
    }

    #[test]
    fn test_exclude_mode() {
        let (categories, _) = categorize(&schema(), None, &[CategoryConfig::exclude("Rest", &["/^Account/"])]);
        assert_eq!(categories[0].types, vec!["Query", "User"]);
    }

    #[test]
    fn test_invalid_pattern_yields_empty_category() {
        let (categories, diagnostics) = categorize(&schema(), None, &[CategoryConfig::include("Bad", &["/(/"])]);
        assert!(categories[0].types.is_empty());
        assert_eq!(diagnostics[0].code, DiagnosticCode::InvalidCategoryPattern);
    }

    #[test]
    fn test_untagged_config_forms() {
        let uniform: CategoriesConfig = serde_json::from_str(r#"[{"name":"A","types":["User"]}]"#).unwrap();
        assert!(matches!(uniform, CategoriesConfig::Uniform(ref l) if l.len() == 1));

        let per_version: CategoriesConfig =
            serde_json::from_str(r#"{"1.0.0":[{"name":"A","types":["User"],"mode":"exclude"}]}"#).unwrap();
        let v1 = Version::decode("v1.0.0");
        let scoped = per_version.scoped(Some(&v1)).unwrap();
        assert_eq!(scoped[0].mode, CategoryMode::Exclude);
        assert!(per_version.scoped(None).is_none());
    }
}
