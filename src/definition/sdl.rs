//! SDL parsing collaborator backed by `graphql-parser`

use graphql_parser::schema::{
    Definition, Directive, Document, EnumValue, Field, InputValue, Type, TypeDefinition as AstType,
    TypeExtension, Value,
};
use regex::Regex;
use std::collections::BTreeMap;

use super::{
    is_builtin_type, EnumValueDefinition, FieldDefinition, InputValueDefinition, SchemaDefinition,
    TypeDefinition, TypeKind, TypeRef,
};
use crate::error::{ParseError, ParseType, Result};

const DEFAULT_DEPRECATION_REASON: &str = "No longer supported";

/// Turns schema text into a [`SchemaDefinition`]
pub trait SchemaParser: Send + Sync {
    /// `origin` names where the text came from, for error reporting
    fn parse_sdl(&self, text: &str, origin: &str) -> Result<SchemaDefinition>;
}

/// Default parser for GraphQL SDL documents
#[derive(Debug, Clone, Copy, Default)]
pub struct SdlParser;

impl SchemaParser for SdlParser {
    fn parse_sdl(&self, text: &str, origin: &str) -> Result<SchemaDefinition> {
        let document = graphql_parser::parse_schema::<String>(text).map_err(|e| {
            let message = e.to_string();
            ParseError {
                parse_type: ParseType::Schema,
                origin: origin.to_string(),
                excerpt: excerpt_at(text, &message),
                message,
            }
        })?;
        Ok(lower_document(document))
    }
}

/// Pull the offending line (and its neighbours) out of `text`, using the
/// first `line:column` position found in the parser's message.
fn excerpt_at(text: &str, message: &str) -> String {
    let position = Regex::new(r"(\d+):(\d+)")
        .ok()
        .and_then(|re| re.captures(message))
        .and_then(|caps| caps[1].parse::<usize>().ok());
    let lines: Vec<&str> = text.lines().collect();
    let Some(line) = position.filter(|l| *l >= 1 && *l <= lines.len()) else {
        return lines.iter().take(3).copied().collect::<Vec<_>>().join("\n");
    };
    let start = line.saturating_sub(2);
    let end = (line + 1).min(lines.len());
    (start..end)
        .map(|i| {
            let marker = if i + 1 == line { ">" } else { " " };
            format!("{} {:>4} | {}", marker, i + 1, lines[i])
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn lower_document(document: Document<'_, String>) -> SchemaDefinition {
    let mut schema = SchemaDefinition::empty();
    let mut explicit_roots = false;
    let mut extensions = Vec::new();

    for definition in document.definitions {
        match definition {
            Definition::SchemaDefinition(def) => {
                explicit_roots = true;
                schema.query_type = def.query;
                schema.mutation_type = def.mutation;
                schema.subscription_type = def.subscription;
            }
            Definition::TypeDefinition(def) => {
                let ty = lower_type(def);
                if !is_builtin_type(&ty.name) {
                    schema.types.insert(ty.name.clone(), ty);
                }
            }
            Definition::TypeExtension(ext) => extensions.push(ext),
            Definition::DirectiveDefinition(_) => {}
        }
    }

    // Extensions may precede their base type in the document.
    for ext in extensions {
        apply_extension(&mut schema, ext);
    }

    if !explicit_roots {
        let root = |name: &str| {
            schema
                .types
                .get(name)
                .filter(|t| t.kind == TypeKind::Object)
                .map(|t| t.name.clone())
        };
        let (query, mutation, subscription) = (root("Query"), root("Mutation"), root("Subscription"));
        schema.query_type = query;
        schema.mutation_type = mutation;
        schema.subscription_type = subscription;
    }
    schema
}

fn lower_type(def: AstType<'_, String>) -> TypeDefinition {
    match def {
        AstType::Scalar(t) => {
            let mut ty = TypeDefinition::new(t.name, TypeKind::Scalar);
            ty.description = t.description;
            ty
        }
        AstType::Object(t) => {
            let mut ty = TypeDefinition::new(t.name, TypeKind::Object);
            ty.description = t.description;
            ty.interfaces = t.implements_interfaces.into_iter().collect();
            ty.fields = lower_fields(t.fields);
            ty
        }
        AstType::Interface(t) => {
            let mut ty = TypeDefinition::new(t.name, TypeKind::Interface);
            ty.description = t.description;
            ty.interfaces = t.implements_interfaces.into_iter().collect();
            ty.fields = lower_fields(t.fields);
            ty
        }
        AstType::Union(t) => {
            let mut ty = TypeDefinition::new(t.name, TypeKind::Union);
            ty.description = t.description;
            ty.possible_types = t.types.into_iter().collect();
            ty
        }
        AstType::Enum(t) => {
            let mut ty = TypeDefinition::new(t.name, TypeKind::Enum);
            ty.description = t.description;
            ty.enum_values = lower_enum_values(t.values);
            ty
        }
        AstType::InputObject(t) => {
            let mut ty = TypeDefinition::new(t.name, TypeKind::InputObject);
            ty.description = t.description;
            ty.input_fields = lower_input_values(t.fields);
            ty
        }
    }
}

fn apply_extension(schema: &mut SchemaDefinition, ext: TypeExtension<'_, String>) {
    match ext {
        TypeExtension::Scalar(_) => {}
        TypeExtension::Object(e) => {
            let ty = schema
                .types
                .entry(e.name.clone())
                .or_insert_with(|| TypeDefinition::new(e.name, TypeKind::Object));
            ty.interfaces.extend(e.implements_interfaces);
            ty.fields.extend(lower_fields(e.fields));
        }
        TypeExtension::Interface(e) => {
            let ty = schema
                .types
                .entry(e.name.clone())
                .or_insert_with(|| TypeDefinition::new(e.name, TypeKind::Interface));
            ty.interfaces.extend(e.implements_interfaces);
            ty.fields.extend(lower_fields(e.fields));
        }
        TypeExtension::Union(e) => {
            let ty = schema
                .types
                .entry(e.name.clone())
                .or_insert_with(|| TypeDefinition::new(e.name, TypeKind::Union));
            ty.possible_types.extend(e.types);
        }
        TypeExtension::Enum(e) => {
            let ty = schema
                .types
                .entry(e.name.clone())
                .or_insert_with(|| TypeDefinition::new(e.name, TypeKind::Enum));
            ty.enum_values.extend(lower_enum_values(e.values));
        }
        TypeExtension::InputObject(e) => {
            let ty = schema
                .types
                .entry(e.name.clone())
                .or_insert_with(|| TypeDefinition::new(e.name, TypeKind::InputObject));
            ty.input_fields.extend(lower_input_values(e.fields));
        }
    }
}

fn lower_fields(fields: Vec<Field<'_, String>>) -> BTreeMap<String, FieldDefinition> {
    fields
        .into_iter()
        .map(|f| {
            let field = FieldDefinition {
                deprecation_reason: deprecation(&f.directives),
                description: f.description,
                ty: lower_type_ref(f.field_type),
                args: lower_input_values(f.arguments),
                name: f.name,
            };
            (field.name.clone(), field)
        })
        .collect()
}

fn lower_input_values(values: Vec<InputValue<'_, String>>) -> BTreeMap<String, InputValueDefinition> {
    values
        .into_iter()
        .map(|v| {
            let value = InputValueDefinition {
                description: v.description,
                ty: lower_type_ref(v.value_type),
                default_value: v.default_value.as_ref().map(format_value),
                name: v.name,
            };
            (value.name.clone(), value)
        })
        .collect()
}

fn lower_enum_values(values: Vec<EnumValue<'_, String>>) -> BTreeMap<String, EnumValueDefinition> {
    values
        .into_iter()
        .map(|v| {
            let value = EnumValueDefinition {
                deprecation_reason: deprecation(&v.directives),
                description: v.description,
                name: v.name,
            };
            (value.name.clone(), value)
        })
        .collect()
}

fn lower_type_ref(ty: Type<'_, String>) -> TypeRef {
    match ty {
        Type::NamedType(name) => TypeRef::Named(name),
        Type::ListType(inner) => TypeRef::list(lower_type_ref(*inner)),
        Type::NonNullType(inner) => TypeRef::non_null(lower_type_ref(*inner)),
    }
}

fn deprecation(directives: &[Directive<'_, String>]) -> Option<String> {
    let directive = directives.iter().find(|d| d.name == "deprecated")?;
    let reason = directive
        .arguments
        .iter()
        .find(|(name, _)| name == "reason")
        .and_then(|(_, value)| match value {
            Value::String(s) => Some(s.clone()),
            _ => None,
        });
    Some(reason.unwrap_or_else(|| DEFAULT_DEPRECATION_REASON.to_string()))
}

/// Render a value back to GraphQL literal syntax
fn format_value(value: &Value<'_, String>) -> String {
    match value {
        Value::Variable(name) => format!("${}", name),
        Value::Int(n) => n.as_i64().map(|i| i.to_string()).unwrap_or_default(),
        Value::Float(f) => f.to_string(),
        Value::String(s) => serde_json::Value::String(s.clone()).to_string(),
        Value::Boolean(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Enum(name) => name.clone(),
        Value::List(items) => format!(
            "[{}]",
            items.iter().map(format_value).collect::<Vec<_>>().join(", ")
        ),
        Value::Object(fields) => format!(
            "{{{}}}",
            fields
                .iter()
                .map(|(k, v)| format!("{}: {}", k, format_value(v)))
                .collect::<Vec<_>>()
                .join(", ")
        ),
    }
}
