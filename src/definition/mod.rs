//! Schema Definition Model
//!
//! A resolved GraphQL schema snapshot: root operation types plus every named
//! type keyed by name. Produced by the SDL and introspection collaborators,
//! consumed by the diff engine and the lifecycle index.

pub mod introspection;
pub mod sdl;

pub use introspection::{IntrospectionSchema, INTROSPECTION_QUERY};
pub use sdl::{SchemaParser, SdlParser};

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::error::{CatalogError, Result};

/// Scalars every GraphQL schema has implicitly
pub const BUILTIN_SCALARS: [&str; 5] = ["String", "Int", "Float", "Boolean", "ID"];

/// `true` for names the model never stores (built-in scalars, `__` types)
pub fn is_builtin_type(name: &str) -> bool {
    name.starts_with("__") || BUILTIN_SCALARS.contains(&name)
}

/// Kind of a named type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TypeKind {
    Scalar,
    Object,
    Interface,
    Union,
    Enum,
    InputObject,
}

impl TypeKind {
    /// Object and interface types have output fields
    pub fn has_fields(&self) -> bool {
        matches!(self, TypeKind::Object | TypeKind::Interface)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TypeKind::Scalar => "SCALAR",
            TypeKind::Object => "OBJECT",
            TypeKind::Interface => "INTERFACE",
            TypeKind::Union => "UNION",
            TypeKind::Enum => "ENUM",
            TypeKind::InputObject => "INPUT_OBJECT",
        }
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A reference to a type, with list and non-null wrappers
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "ofType")]
pub enum TypeRef {
    Named(String),
    List(Box<TypeRef>),
    NonNull(Box<TypeRef>),
}

impl TypeRef {
    pub fn named(name: impl Into<String>) -> Self {
        TypeRef::Named(name.into())
    }

    pub fn non_null(inner: TypeRef) -> Self {
        TypeRef::NonNull(Box::new(inner))
    }

    pub fn list(inner: TypeRef) -> Self {
        TypeRef::List(Box::new(inner))
    }

    pub fn is_non_null(&self) -> bool {
        matches!(self, TypeRef::NonNull(_))
    }

    /// Innermost named type
    pub fn base_name(&self) -> &str {
        match self {
            TypeRef::Named(name) => name,
            TypeRef::List(inner) | TypeRef::NonNull(inner) => inner.base_name(),
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Named(name) => write!(f, "{}", name),
            TypeRef::List(inner) => write!(f, "[{}]", inner),
            TypeRef::NonNull(inner) => write!(f, "{}!", inner),
        }
    }
}

/// An argument or input object field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputValueDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub ty: TypeRef,
    /// Default value in GraphQL literal syntax
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
}

impl InputValueDefinition {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            description: None,
            ty,
            default_value: None,
        }
    }

    /// Non-null with no default: callers must supply it
    pub fn is_required(&self) -> bool {
        self.ty.is_non_null() && self.default_value.is_none()
    }
}

/// An output field of an object or interface type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub ty: TypeRef,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub args: BTreeMap<String, InputValueDefinition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deprecation_reason: Option<String>,
}

impl FieldDefinition {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            description: None,
            ty,
            args: BTreeMap::new(),
            deprecation_reason: None,
        }
    }

    pub fn with_arg(mut self, arg: InputValueDefinition) -> Self {
        self.args.insert(arg.name.clone(), arg);
        self
    }

    pub fn is_deprecated(&self) -> bool {
        self.deprecation_reason.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumValueDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deprecation_reason: Option<String>,
}

/// A named type. Only the members matching its kind are populated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDefinition {
    pub name: String,
    pub kind: TypeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, FieldDefinition>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub input_fields: BTreeMap<String, InputValueDefinition>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub enum_values: BTreeMap<String, EnumValueDefinition>,
    /// Union members
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub possible_types: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub interfaces: BTreeSet<String>,
}

impl TypeDefinition {
    pub fn new(name: impl Into<String>, kind: TypeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            description: None,
            fields: BTreeMap::new(),
            input_fields: BTreeMap::new(),
            enum_values: BTreeMap::new(),
            possible_types: BTreeSet::new(),
            interfaces: BTreeSet::new(),
        }
    }

    pub fn with_field(mut self, field: FieldDefinition) -> Self {
        self.fields.insert(field.name.clone(), field);
        self
    }

    pub fn with_input_field(mut self, field: InputValueDefinition) -> Self {
        self.input_fields.insert(field.name.clone(), field);
        self
    }

    /// Names of output fields or input fields, whichever this kind has
    pub fn member_names(&self) -> Vec<&str> {
        match self.kind {
            TypeKind::InputObject => self.input_fields.keys().map(String::as_str).collect(),
            _ => self.fields.keys().map(String::as_str).collect(),
        }
    }
}

/// A fully resolved schema snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mutation_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_type: Option<String>,
    #[serde(default)]
    pub types: BTreeMap<String, TypeDefinition>,
}

impl SchemaDefinition {
    /// The empty-schema sentinel: the `before` of a first revision
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
            && self.query_type.is_none()
            && self.mutation_type.is_none()
            && self.subscription_type.is_none()
    }

    pub fn with_type(mut self, ty: TypeDefinition) -> Self {
        self.types.insert(ty.name.clone(), ty);
        self
    }

    pub fn get_type(&self, name: &str) -> Option<&TypeDefinition> {
        self.types.get(name)
    }

    pub fn get_type_mut(&mut self, name: &str) -> Option<&mut TypeDefinition> {
        self.types.get_mut(name)
    }

    pub fn get_field(&self, type_name: &str, field_name: &str) -> Option<&FieldDefinition> {
        self.types.get(type_name)?.fields.get(field_name)
    }

    /// Check the structural invariants the diff engine relies on.
    ///
    /// Dangling references to unknown types are allowed; only shape errors
    /// (mismatched keys, members on the wrong kind) are rejected.
    pub fn validate(&self) -> Result<()> {
        for (key, ty) in &self.types {
            if key != &ty.name {
                return Err(CatalogError::InvalidSchema(format!(
                    "type stored under '{}' is named '{}'",
                    key, ty.name
                )));
            }
            if ty.name.is_empty() {
                return Err(CatalogError::InvalidSchema("type with an empty name".to_string()));
            }
            if !ty.kind.has_fields() && !ty.fields.is_empty() {
                return Err(CatalogError::InvalidSchema(format!(
                    "{} type '{}' declares output fields",
                    ty.kind, ty.name
                )));
            }
            if ty.kind != TypeKind::InputObject && !ty.input_fields.is_empty() {
                return Err(CatalogError::InvalidSchema(format!(
                    "{} type '{}' declares input fields",
                    ty.kind, ty.name
                )));
            }
            for (field_key, field) in &ty.fields {
                if field_key != &field.name {
                    return Err(CatalogError::InvalidSchema(format!(
                        "field '{}.{}' stored under '{}'",
                        ty.name, field.name, field_key
                    )));
                }
            }
            for (field_key, field) in &ty.input_fields {
                if field_key != &field.name {
                    return Err(CatalogError::InvalidSchema(format!(
                        "input field '{}.{}' stored under '{}'",
                        ty.name, field.name, field_key
                    )));
                }
            }
        }
        for root in [&self.query_type, &self.mutation_type, &self.subscription_type]
            .into_iter()
            .flatten()
        {
            if let Some(ty) = self.types.get(root) {
                if ty.kind != TypeKind::Object {
                    return Err(CatalogError::InvalidSchema(format!(
                        "root operation type '{}' is {}, expected OBJECT",
                        root, ty.kind
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_ref_display() {
        let ty = TypeRef::non_null(TypeRef::list(TypeRef::non_null(TypeRef::named("String"))));
        assert_eq!(ty.to_string(), "[String!]!");
        assert_eq!(ty.base_name(), "String");
    }

    #[test]
    fn test_required_input() {
        let mut arg = InputValueDefinition::new("id", TypeRef::non_null(TypeRef::named("ID")));
        assert!(arg.is_required());
        arg.default_value = Some("\"1\"".to_string());
        assert!(!arg.is_required());
    }

    #[test]
    fn test_validate_rejects_misplaced_fields() {
        let mut ty = TypeDefinition::new("Color", TypeKind::Enum);
        ty.fields.insert(
            "red".to_string(),
            FieldDefinition::new("red", TypeRef::named("String")),
        );
        let schema = SchemaDefinition::empty().with_type(ty);
        assert!(matches!(schema.validate(), Err(CatalogError::InvalidSchema(_))));
    }

    #[test]
    fn test_empty_sentinel() {
        assert!(SchemaDefinition::empty().is_empty());
        assert!(SchemaDefinition::empty().validate().is_ok());
    }
}
