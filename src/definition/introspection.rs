//! Introspection result decoding
//!
//! Accepts the JSON produced by running [`INTROSPECTION_QUERY`] against a
//! server, either bare (`{"__schema": ...}`) or wrapped in a response
//! envelope (`{"data": {"__schema": ...}}`).

use serde::Deserialize;
use std::collections::BTreeMap;

use super::{
    is_builtin_type, EnumValueDefinition, FieldDefinition, InputValueDefinition, SchemaDefinition,
    TypeDefinition, TypeKind, TypeRef,
};
use crate::error::{CatalogError, Result};

pub const INTROSPECTION_QUERY: &str = r#"
query IntrospectionQuery {
  __schema {
    queryType { name }
    mutationType { name }
    subscriptionType { name }
    types { ...FullType }
  }
}
fragment FullType on __Type {
  kind
  name
  description
  fields(includeDeprecated: true) {
    name
    description
    args { ...InputValue }
    type { ...TypeRef }
    isDeprecated
    deprecationReason
  }
  inputFields { ...InputValue }
  interfaces { ...TypeRef }
  enumValues(includeDeprecated: true) {
    name
    description
    isDeprecated
    deprecationReason
  }
  possibleTypes { ...TypeRef }
}
fragment InputValue on __InputValue {
  name
  description
  type { ...TypeRef }
  defaultValue
}
fragment TypeRef on __Type {
  kind
  name
  ofType { kind name ofType { kind name ofType { kind name ofType { kind name
    ofType { kind name ofType { kind name ofType { kind name } } } } } } }
}
"#;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntrospectionSchema {
    query_type: Option<NamedRef>,
    mutation_type: Option<NamedRef>,
    subscription_type: Option<NamedRef>,
    types: Vec<IntrospectionType>,
}

#[derive(Debug, Deserialize)]
struct NamedRef {
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IntrospectionType {
    kind: TypeKind,
    name: String,
    description: Option<String>,
    fields: Option<Vec<IntrospectionField>>,
    input_fields: Option<Vec<IntrospectionInputValue>>,
    interfaces: Option<Vec<IntrospectionTypeRef>>,
    enum_values: Option<Vec<IntrospectionEnumValue>>,
    possible_types: Option<Vec<IntrospectionTypeRef>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IntrospectionField {
    name: String,
    description: Option<String>,
    #[serde(default)]
    args: Vec<IntrospectionInputValue>,
    #[serde(rename = "type")]
    ty: IntrospectionTypeRef,
    #[serde(default)]
    is_deprecated: bool,
    deprecation_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IntrospectionInputValue {
    name: String,
    description: Option<String>,
    #[serde(rename = "type")]
    ty: IntrospectionTypeRef,
    default_value: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IntrospectionEnumValue {
    name: String,
    description: Option<String>,
    #[serde(default)]
    is_deprecated: bool,
    deprecation_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IntrospectionTypeRef {
    kind: String,
    name: Option<String>,
    of_type: Option<Box<IntrospectionTypeRef>>,
}

impl IntrospectionTypeRef {
    fn lower(&self) -> Result<TypeRef> {
        let inner = || {
            self.of_type
                .as_deref()
                .ok_or_else(|| CatalogError::InvalidSchema(format!("{} type reference without ofType", self.kind)))
                .and_then(IntrospectionTypeRef::lower)
        };
        match self.kind.as_str() {
            "NON_NULL" => Ok(TypeRef::non_null(inner()?)),
            "LIST" => Ok(TypeRef::list(inner()?)),
            _ => self
                .name
                .clone()
                .map(TypeRef::Named)
                .ok_or_else(|| CatalogError::InvalidSchema(format!("{} type reference without a name", self.kind))),
        }
    }
}

fn deprecation(is_deprecated: bool, reason: Option<String>) -> Option<String> {
    is_deprecated.then(|| reason.unwrap_or_else(|| "No longer supported".to_string()))
}

impl IntrospectionSchema {
    /// Locate `__schema` in a raw introspection payload
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        let schema = value
            .get("__schema")
            .or_else(|| value.get("data").and_then(|d| d.get("__schema")))
            .ok_or_else(|| CatalogError::InvalidSchema("introspection result has no __schema".to_string()))?;
        Ok(serde_json::from_value(schema.clone())?)
    }

    pub fn into_definition(self) -> Result<SchemaDefinition> {
        let mut schema = SchemaDefinition {
            query_type: self.query_type.map(|r| r.name),
            mutation_type: self.mutation_type.map(|r| r.name),
            subscription_type: self.subscription_type.map(|r| r.name),
            types: BTreeMap::new(),
        };
        for t in self.types {
            if is_builtin_type(&t.name) {
                continue;
            }
            let mut ty = TypeDefinition::new(t.name, t.kind);
            ty.description = t.description;
            for f in t.fields.unwrap_or_default() {
                let mut field = FieldDefinition::new(f.name, f.ty.lower()?);
                field.description = f.description;
                field.deprecation_reason = deprecation(f.is_deprecated, f.deprecation_reason);
                for a in f.args {
                    field.args.insert(a.name.clone(), lower_input(a)?);
                }
                ty.fields.insert(field.name.clone(), field);
            }
            for v in t.input_fields.unwrap_or_default() {
                ty.input_fields.insert(v.name.clone(), lower_input(v)?);
            }
            for v in t.enum_values.unwrap_or_default() {
                ty.enum_values.insert(
                    v.name.clone(),
                    EnumValueDefinition {
                        deprecation_reason: deprecation(v.is_deprecated, v.deprecation_reason),
                        name: v.name,
                        description: v.description,
                    },
                );
            }
            for r in t.interfaces.unwrap_or_default() {
                ty.interfaces.insert(r.lower()?.base_name().to_string());
            }
            if ty.kind == TypeKind::Union {
                for r in t.possible_types.unwrap_or_default() {
                    ty.possible_types.insert(r.lower()?.base_name().to_string());
                }
            }
            schema.types.insert(ty.name.clone(), ty);
        }
        schema.validate()?;
        Ok(schema)
    }
}

fn lower_input(v: IntrospectionInputValue) -> Result<InputValueDefinition> {
    Ok(InputValueDefinition {
        ty: v.ty.lower()?,
        name: v.name,
        description: v.description,
        default_value: v.default_value,
    })
}

impl SchemaDefinition {
    /// Build a definition from a raw introspection payload
    pub fn from_introspection(value: &serde_json::Value) -> Result<Self> {
        IntrospectionSchema::from_json(value)?.into_definition()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload() -> serde_json::Value {
        json!({
            "data": {
                "__schema": {
                    "queryType": { "name": "Query" },
                    "mutationType": null,
                    "subscriptionType": null,
                    "types": [
                        {
                            "kind": "OBJECT",
                            "name": "Query",
                            "description": null,
                            "fields": [{
                                "name": "users",
                                "description": "All users",
                                "args": [{
                                    "name": "first",
                                    "description": null,
                                    "type": { "kind": "SCALAR", "name": "Int", "ofType": null },
                                    "defaultValue": "10"
                                }],
                                "type": {
                                    "kind": "NON_NULL", "name": null,
                                    "ofType": { "kind": "LIST", "name": null,
                                        "ofType": { "kind": "OBJECT", "name": "User", "ofType": null } }
                                },
                                "isDeprecated": false,
                                "deprecationReason": null
                            }],
                            "inputFields": null,
                            "interfaces": [],
                            "enumValues": null,
                            "possibleTypes": null
                        },
                        {
                            "kind": "OBJECT",
                            "name": "User",
                            "description": null,
                            "fields": [{
                                "name": "id",
                                "description": null,
                                "args": [],
                                "type": { "kind": "NON_NULL", "name": null,
                                    "ofType": { "kind": "SCALAR", "name": "ID", "ofType": null } },
                                "isDeprecated": false,
                                "deprecationReason": null
                            }],
                            "inputFields": null,
                            "interfaces": [],
                            "enumValues": null,
                            "possibleTypes": null
                        },
                        { "kind": "SCALAR", "name": "String", "description": null },
                        { "kind": "OBJECT", "name": "__Schema", "description": null, "fields": [] }
                    ]
                }
            }
        })
    }

    #[test]
    fn test_from_introspection() {
        let schema = SchemaDefinition::from_introspection(&payload()).unwrap();
        assert_eq!(schema.query_type.as_deref(), Some("Query"));
        assert_eq!(schema.types.len(), 2);
        let users = schema.get_field("Query", "users").unwrap();
        assert_eq!(users.ty.to_string(), "[User]!");
        assert_eq!(users.args["first"].default_value.as_deref(), Some("10"));
        assert_eq!(schema.get_field("User", "id").unwrap().ty.to_string(), "ID!");
    }

    #[test]
    fn test_missing_schema_is_invalid() {
        let err = SchemaDefinition::from_introspection(&json!({ "data": {} })).unwrap_err();
        assert!(matches!(err, CatalogError::InvalidSchema(_)));
    }
}
