//! Change entries and changesets

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::date::DateOnly;
use crate::definition::SchemaDefinition;

/// Kind of a detected change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeKind {
    TypeAdded,
    TypeRemoved,
    TypeKindChanged,
    TypeDescriptionChanged,
    FieldAdded,
    FieldRemoved,
    FieldTypeChanged,
    FieldDescriptionChanged,
    FieldDeprecationAdded,
    FieldDeprecationRemoved,
    FieldArgumentAdded,
    FieldArgumentRemoved,
    FieldArgumentTypeChanged,
    FieldArgumentDefaultChanged,
    InputFieldAdded,
    InputFieldRemoved,
    InputFieldTypeChanged,
    InputFieldDefaultValueChanged,
    EnumValueAdded,
    EnumValueRemoved,
    UnionMemberAdded,
    UnionMemberRemoved,
    ObjectTypeInterfaceAdded,
    ObjectTypeInterfaceRemoved,
    SchemaRootTypeChanged,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::TypeAdded => "TYPE_ADDED",
            ChangeKind::TypeRemoved => "TYPE_REMOVED",
            ChangeKind::TypeKindChanged => "TYPE_KIND_CHANGED",
            ChangeKind::TypeDescriptionChanged => "TYPE_DESCRIPTION_CHANGED",
            ChangeKind::FieldAdded => "FIELD_ADDED",
            ChangeKind::FieldRemoved => "FIELD_REMOVED",
            ChangeKind::FieldTypeChanged => "FIELD_TYPE_CHANGED",
            ChangeKind::FieldDescriptionChanged => "FIELD_DESCRIPTION_CHANGED",
            ChangeKind::FieldDeprecationAdded => "FIELD_DEPRECATION_ADDED",
            ChangeKind::FieldDeprecationRemoved => "FIELD_DEPRECATION_REMOVED",
            ChangeKind::FieldArgumentAdded => "FIELD_ARGUMENT_ADDED",
            ChangeKind::FieldArgumentRemoved => "FIELD_ARGUMENT_REMOVED",
            ChangeKind::FieldArgumentTypeChanged => "FIELD_ARGUMENT_TYPE_CHANGED",
            ChangeKind::FieldArgumentDefaultChanged => "FIELD_ARGUMENT_DEFAULT_CHANGED",
            ChangeKind::InputFieldAdded => "INPUT_FIELD_ADDED",
            ChangeKind::InputFieldRemoved => "INPUT_FIELD_REMOVED",
            ChangeKind::InputFieldTypeChanged => "INPUT_FIELD_TYPE_CHANGED",
            ChangeKind::InputFieldDefaultValueChanged => "INPUT_FIELD_DEFAULT_VALUE_CHANGED",
            ChangeKind::EnumValueAdded => "ENUM_VALUE_ADDED",
            ChangeKind::EnumValueRemoved => "ENUM_VALUE_REMOVED",
            ChangeKind::UnionMemberAdded => "UNION_MEMBER_ADDED",
            ChangeKind::UnionMemberRemoved => "UNION_MEMBER_REMOVED",
            ChangeKind::ObjectTypeInterfaceAdded => "OBJECT_TYPE_INTERFACE_ADDED",
            ChangeKind::ObjectTypeInterfaceRemoved => "OBJECT_TYPE_INTERFACE_REMOVED",
            ChangeKind::SchemaRootTypeChanged => "SCHEMA_ROOT_TYPE_CHANGED",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Severity of a change for existing clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CriticalityLevel {
    NonBreaking,
    Dangerous,
    Breaking,
}

impl fmt::Display for CriticalityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CriticalityLevel::NonBreaking => write!(f, "NON_BREAKING"),
            CriticalityLevel::Dangerous => write!(f, "DANGEROUS"),
            CriticalityLevel::Breaking => write!(f, "BREAKING"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Criticality {
    pub level: CriticalityLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Criticality {
    pub fn non_breaking() -> Self {
        Self { level: CriticalityLevel::NonBreaking, reason: None }
    }

    pub fn dangerous(reason: impl Into<String>) -> Self {
        Self { level: CriticalityLevel::Dangerous, reason: Some(reason.into()) }
    }

    pub fn breaking(reason: impl Into<String>) -> Self {
        Self { level: CriticalityLevel::Breaking, reason: Some(reason.into()) }
    }
}

/// Names involved in a change. Only the members relevant to the kind are set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeMeta {
    pub type_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub argument_name: Option<String>,
    /// Enum value, union member or interface name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_value: Option<String>,
}

impl ChangeMeta {
    pub fn for_type(type_name: impl Into<String>) -> Self {
        Self { type_name: type_name.into(), ..Self::default() }
    }

    pub fn for_field(type_name: impl Into<String>, field_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            field_name: Some(field_name.into()),
            ..Self::default()
        }
    }

    pub fn with_argument(mut self, argument_name: impl Into<String>) -> Self {
        self.argument_name = Some(argument_name.into());
        self
    }

    pub fn with_member(mut self, member_name: impl Into<String>) -> Self {
        self.member_name = Some(member_name.into());
        self
    }

    pub fn with_values(mut self, old_value: Option<String>, new_value: Option<String>) -> Self {
        self.old_value = old_value;
        self.new_value = new_value;
        self
    }
}

/// One diff entry.
///
/// `path` is a GraphQL coordinate (`Type`, `Type.field`, `Type.field(arg)`)
/// into the after schema for additions and the before schema for removals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    #[serde(rename = "type")]
    pub kind: ChangeKind,
    pub path: String,
    pub criticality: Criticality,
    pub message: String,
    pub meta: ChangeMeta,
}

impl Change {
    pub fn is_breaking(&self) -> bool {
        self.criticality.level == CriticalityLevel::Breaking
    }
}

/// A diff bundle between two consecutive snapshots
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Changeset {
    pub date: DateOnly,
    /// May be the empty-schema sentinel for the first changeset
    pub before: Arc<SchemaDefinition>,
    pub after: Arc<SchemaDefinition>,
    /// Exactly `diff(before, after)`
    pub changes: Vec<Change>,
}

impl Changeset {
    pub fn is_initial(&self) -> bool {
        self.before.is_empty()
    }

    pub fn breaking_count(&self) -> usize {
        self.changes.iter().filter(|c| c.is_breaking()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_serializes_screaming() {
        let json = serde_json::to_string(&ChangeKind::FieldArgumentDefaultChanged).unwrap();
        assert_eq!(json, format!("\"{}\"", ChangeKind::FieldArgumentDefaultChanged.as_str()));
    }

    #[test]
    fn test_criticality_ordering() {
        assert!(CriticalityLevel::Breaking > CriticalityLevel::Dangerous);
        assert!(CriticalityLevel::Dangerous > CriticalityLevel::NonBreaking);
        assert_eq!(
            serde_json::to_string(&CriticalityLevel::NonBreaking).unwrap(),
            "\"NON_BREAKING\""
        );
    }
}
