//! Description augmentation
//!
//! Rewrites type and field descriptions of loaded schemas from
//! configuration. Only the current definition of each schema is touched;
//! revision snapshots keep the descriptions they were diffed with.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::catalog::Catalog;
use crate::definition::SchemaDefinition;
use crate::diagnostics::{Diagnostic, DiagnosticCode};
use crate::version::Version;

/// Where augmented content goes relative to the existing description
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Placement {
    Before,
    #[default]
    After,
    Over,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptionAugmentation {
    /// `Type` or `Type.member` (field, input field, or enum value)
    pub on: String,
    #[serde(default)]
    pub placement: Placement,
    pub content: String,
    /// Restrict to these versions; unrestricted when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub versions: Option<Vec<String>>,
}

impl DescriptionAugmentation {
    pub fn new(on: impl Into<String>, placement: Placement, content: impl Into<String>) -> Self {
        Self { on: on.into(), placement, content: content.into(), versions: None }
    }

    fn applies_to(&self, version: Option<&Version>) -> bool {
        match (&self.versions, version) {
            (None, _) => true,
            (Some(scope), Some(version)) => scope.iter().any(|v| &Version::decode(v) == version),
            (Some(_), None) => false,
        }
    }
}

enum Target<'a> {
    Type(&'a str),
    Member(&'a str, &'a str),
}

fn parse_target(on: &str) -> Option<Target<'_>> {
    let mut parts = on.split('.');
    let type_name = parts.next().filter(|s| !s.is_empty())?;
    match (parts.next(), parts.next()) {
        (None, _) => Some(Target::Type(type_name)),
        (Some(member), None) if !member.is_empty() => Some(Target::Member(type_name, member)),
        _ => None,
    }
}

fn merge(existing: Option<&str>, placement: Placement, content: &str) -> String {
    match (existing.filter(|s| !s.is_empty()), placement) {
        (None, _) | (_, Placement::Over) => content.to_string(),
        (Some(existing), Placement::Before) => format!("{}\n\n{}", content, existing),
        (Some(existing), Placement::After) => format!("{}\n\n{}", existing, content),
    }
}

fn rewrite(slot: &mut Option<String>, placement: Placement, content: &str) {
    *slot = Some(merge(slot.as_deref(), placement, content));
}

/// Apply augmentations to one definition. Returns the rewritten definition
/// and a diagnostic for every augmentation that could not be placed.
pub fn augment_definition(
    definition: &SchemaDefinition,
    version: Option<&Version>,
    augmentations: &[DescriptionAugmentation],
) -> (SchemaDefinition, Vec<Diagnostic>) {
    let mut out = definition.clone();
    let mut diagnostics = Vec::new();
    let encoded = version.map(Version::encode);

    for aug in augmentations.iter().filter(|a| a.applies_to(version)) {
        let applied = match parse_target(&aug.on) {
            None => {
                diagnostics.push(
                    Diagnostic::new(
                        DiagnosticCode::InvalidAugmentationTarget,
                        "expected a `Type` or `Type.field` coordinate",
                    )
                    .with_target(aug.on.as_str())
                    .with_version(encoded),
                );
                continue;
            }
            Some(Target::Type(type_name)) => out
                .get_type_mut(type_name)
                .map(|ty| rewrite(&mut ty.description, aug.placement, &aug.content))
                .is_some(),
            Some(Target::Member(type_name, member)) => out
                .get_type_mut(type_name)
                .and_then(|ty| {
                    if let Some(field) = ty.fields.get_mut(member) {
                        Some(&mut field.description)
                    } else if let Some(input) = ty.input_fields.get_mut(member) {
                        Some(&mut input.description)
                    } else {
                        ty.enum_values.get_mut(member).map(|value| &mut value.description)
                    }
                })
                .map(|slot| rewrite(slot, aug.placement, &aug.content))
                .is_some(),
        };
        if !applied {
            diagnostics.push(
                Diagnostic::new(DiagnosticCode::AugmentationTargetNotFound, "augmentation target not found")
                    .with_target(aug.on.as_str())
                    .with_version(encoded),
            );
        }
    }
    (out, diagnostics)
}

/// Augment the current definition of every schema in the catalog
pub fn apply(catalog: &mut Catalog, augmentations: &[DescriptionAugmentation], diagnostics: &mut Vec<Diagnostic>) {
    if augmentations.is_empty() {
        return;
    }
    let mut seen_versions: Vec<Version> = Vec::new();
    for schema in catalog.schemas_mut() {
        let (augmented, found) = augment_definition(schema.definition, schema.version, augmentations);
        if augmented != **schema.definition {
            *Arc::make_mut(schema.definition) = augmented;
        }
        diagnostics.extend(found);
        seen_versions.extend(schema.version.cloned());
    }

    for aug in augmentations {
        let Some(scope) = &aug.versions else { continue };
        for v in scope {
            if !seen_versions.contains(&Version::decode(v)) {
                diagnostics.push(
                    Diagnostic::new(DiagnosticCode::UnmatchedVersionScope, "augmentation version matches no schema")
                        .with_target(aug.on.as_str())
                        .with_version(Some(v.as_str())),
                );
            }
        }
    }
    debug!(augmentations = augmentations.len(), "applied description augmentations");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{SchemaParser, SdlParser};

    fn schema() -> SchemaDefinition {
        SdlParser
            .parse_sdl(
                r#"
                "A person"
                type User { email: String name: String }
                enum Role { ADMIN }
                type Query { me: User }
                "#,
                "test",
            )
            .unwrap()
    }

    #[test]
    fn test_placements() {
        let augs = vec![
            DescriptionAugmentation::new("User", Placement::After, "Stored in accounts."),
            DescriptionAugmentation::new("User.email", Placement::Before, "Verified."),
            DescriptionAugmentation::new("Role.ADMIN", Placement::Over, "Superuser."),
        ];
        let (out, diagnostics) = augment_definition(&schema(), None, &augs);
        assert!(diagnostics.is_empty());
        let user = out.get_type("User").unwrap();
        assert_eq!(user.description.as_deref(), Some("A person\n\nStored in accounts."));
        assert_eq!(user.fields["email"].description.as_deref(), Some("Verified."));
        let role = out.get_type("Role").unwrap();
        assert_eq!(role.enum_values["ADMIN"].description.as_deref(), Some("Superuser."));
    }

    #[test]
    fn test_missing_and_invalid_targets() {
        let augs = vec![
            DescriptionAugmentation::new("User.nickname", Placement::After, "x"),
            DescriptionAugmentation::new("a.b.c", Placement::After, "x"),
        ];
        let (out, diagnostics) = augment_definition(&schema(), None, &augs);
        assert_eq!(out, schema());
        let codes: Vec<_> = diagnostics.iter().map(|d| d.code).collect();
        assert_eq!(
            codes,
            vec![DiagnosticCode::AugmentationTargetNotFound, DiagnosticCode::InvalidAugmentationTarget]
        );
    }

    #[test]
    fn test_version_scope() {
        let mut aug = DescriptionAugmentation::new("User", Placement::Over, "v1 only");
        aug.versions = Some(vec!["1.0.0".to_string()]);
        let v1 = Version::decode("v1.0.0");
        let v2 = Version::decode("2.0.0");

        let (out, _) = augment_definition(&schema(), Some(&v1), std::slice::from_ref(&aug));
        assert_eq!(out.get_type("User").unwrap().description.as_deref(), Some("v1 only"));
        let (out, _) = augment_definition(&schema(), Some(&v2), std::slice::from_ref(&aug));
        assert_eq!(out.get_type("User").unwrap().description.as_deref(), Some("A person"));
    }
}
