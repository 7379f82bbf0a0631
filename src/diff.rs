//! Schema diff engine
//!
//! Compares two snapshots and reports every change with its criticality.
//! Output order is deterministic: root operation changes, removed types,
//! added types, then member changes of the types present in both, each group
//! sorted by name.

use std::collections::{BTreeMap, BTreeSet};

use crate::change::{Change, ChangeKind, ChangeMeta, Criticality};
use crate::definition::{
    FieldDefinition, InputValueDefinition, SchemaDefinition, TypeDefinition, TypeKind, TypeRef,
};
use crate::error::Result;

/// Diff two snapshots. Either side may be the empty-schema sentinel.
///
/// Fails only when a snapshot is structurally invalid.
pub fn diff(before: &SchemaDefinition, after: &SchemaDefinition) -> Result<Vec<Change>> {
    before.validate()?;
    after.validate()?;
    let mut differ = Differ::default();
    differ.roots(before, after);
    differ.types(before, after);
    Ok(differ.changes)
}

/// Changing an output type from `old` to `new` cannot break a client that
/// handled `old`: adding non-null is safe, removing it is not.
pub fn is_safe_output_change(old: &TypeRef, new: &TypeRef) -> bool {
    match (old, new) {
        (TypeRef::Named(a), TypeRef::Named(b)) => a == b,
        (TypeRef::List(a), TypeRef::List(b)) => is_safe_output_change(a, b),
        (TypeRef::NonNull(a), TypeRef::NonNull(b)) => is_safe_output_change(a, b),
        (TypeRef::Named(_) | TypeRef::List(_), TypeRef::NonNull(inner)) => {
            is_safe_output_change(old, inner)
        }
        _ => false,
    }
}

/// Changing an input type from `old` to `new` cannot break a caller that
/// sent `old`: dropping non-null is safe, adding it is not.
pub fn is_safe_input_change(old: &TypeRef, new: &TypeRef) -> bool {
    match (old, new) {
        (TypeRef::Named(a), TypeRef::Named(b)) => a == b,
        (TypeRef::List(a), TypeRef::List(b)) => is_safe_input_change(a, b),
        (TypeRef::NonNull(a), TypeRef::NonNull(b)) => is_safe_input_change(a, b),
        (TypeRef::NonNull(inner), TypeRef::Named(_) | TypeRef::List(_)) => {
            is_safe_input_change(inner, new)
        }
        _ => false,
    }
}

fn kind_label(kind: TypeKind) -> &'static str {
    match kind {
        TypeKind::Scalar => "scalar",
        TypeKind::Object => "object type",
        TypeKind::Interface => "interface",
        TypeKind::Union => "union",
        TypeKind::Enum => "enum",
        TypeKind::InputObject => "input object type",
    }
}

/// Keys only in `a`, in order
fn only_in<'a, K: Ord, V, W>(a: &'a BTreeMap<K, V>, b: &'a BTreeMap<K, W>) -> impl Iterator<Item = (&'a K, &'a V)> {
    a.iter().filter(move |(k, _)| !b.contains_key(*k))
}

#[derive(Default)]
struct Differ {
    changes: Vec<Change>,
}

impl Differ {
    fn push(&mut self, kind: ChangeKind, path: String, criticality: Criticality, message: String, meta: ChangeMeta) {
        self.changes.push(Change { kind, path, criticality, message, meta });
    }

    fn roots(&mut self, before: &SchemaDefinition, after: &SchemaDefinition) {
        let roots = [
            ("query", &before.query_type, &after.query_type),
            ("mutation", &before.mutation_type, &after.mutation_type),
            ("subscription", &before.subscription_type, &after.subscription_type),
        ];
        // The first snapshot establishes the roots; that is not a change.
        if before.is_empty() {
            return;
        }
        for (operation, old, new) in roots {
            if old == new {
                continue;
            }
            let criticality = if old.is_none() {
                Criticality::non_breaking()
            } else {
                Criticality::breaking(format!("Operations against the {} root may no longer resolve", operation))
            };
            self.push(
                ChangeKind::SchemaRootTypeChanged,
                new.clone().or_else(|| old.clone()).unwrap_or_default(),
                criticality,
                format!(
                    "Schema {} root changed from '{}' to '{}'",
                    operation,
                    old.as_deref().unwrap_or("none"),
                    new.as_deref().unwrap_or("none")
                ),
                ChangeMeta::for_type(new.clone().or_else(|| old.clone()).unwrap_or_default())
                    .with_member(operation)
                    .with_values(old.clone(), new.clone()),
            );
        }
    }

    fn types(&mut self, before: &SchemaDefinition, after: &SchemaDefinition) {
        for (name, ty) in only_in(&before.types, &after.types) {
            self.push(
                ChangeKind::TypeRemoved,
                name.clone(),
                Criticality::breaking(format!("Removing {} '{}' breaks clients that use it", kind_label(ty.kind), name)),
                format!("Type '{}' was removed", name),
                ChangeMeta::for_type(name.clone()),
            );
        }
        for (name, _) in only_in(&after.types, &before.types) {
            self.push(
                ChangeKind::TypeAdded,
                name.clone(),
                Criticality::non_breaking(),
                format!("Type '{}' was added", name),
                ChangeMeta::for_type(name.clone()),
            );
        }
        for (name, old) in &before.types {
            if let Some(new) = after.types.get(name) {
                self.type_members(old, new);
            }
        }
    }

    fn type_members(&mut self, old: &TypeDefinition, new: &TypeDefinition) {
        let name = &old.name;
        if old.kind != new.kind {
            self.push(
                ChangeKind::TypeKindChanged,
                name.clone(),
                Criticality::breaking(format!("Changing the kind of '{}' breaks every query that uses it", name)),
                format!("'{}' kind changed from '{}' to '{}'", name, old.kind, new.kind),
                ChangeMeta::for_type(name.clone())
                    .with_values(Some(old.kind.to_string()), Some(new.kind.to_string())),
            );
            return;
        }
        if old.description != new.description {
            self.push(
                ChangeKind::TypeDescriptionChanged,
                name.clone(),
                Criticality::non_breaking(),
                format!("Description of type '{}' changed", name),
                ChangeMeta::for_type(name.clone()).with_values(old.description.clone(), new.description.clone()),
            );
        }
        match new.kind {
            TypeKind::Object | TypeKind::Interface => {
                self.fields(old, new);
                if new.kind == TypeKind::Object {
                    self.interfaces(old, new);
                }
            }
            TypeKind::InputObject => self.input_fields(old, new),
            TypeKind::Enum => self.enum_values(old, new),
            TypeKind::Union => self.union_members(old, new),
            TypeKind::Scalar => {}
        }
    }

    fn fields(&mut self, old: &TypeDefinition, new: &TypeDefinition) {
        let type_name = &old.name;
        let label = kind_label(old.kind);
        for (field_name, _) in only_in(&old.fields, &new.fields) {
            self.push(
                ChangeKind::FieldRemoved,
                format!("{}.{}", type_name, field_name),
                Criticality::breaking(format!("Removing field '{}' breaks queries that select it", field_name)),
                format!("Field '{}' was removed from {} '{}'", field_name, label, type_name),
                ChangeMeta::for_field(type_name.clone(), field_name.clone()),
            );
        }
        for (field_name, _) in only_in(&new.fields, &old.fields) {
            self.push(
                ChangeKind::FieldAdded,
                format!("{}.{}", type_name, field_name),
                Criticality::non_breaking(),
                format!("Field '{}' was added to {} '{}'", field_name, label, type_name),
                ChangeMeta::for_field(type_name.clone(), field_name.clone()),
            );
        }
        for (field_name, old_field) in &old.fields {
            if let Some(new_field) = new.fields.get(field_name) {
                self.field(type_name, old_field, new_field);
            }
        }
    }

    fn field(&mut self, type_name: &str, old: &FieldDefinition, new: &FieldDefinition) {
        let path = format!("{}.{}", type_name, old.name);
        let meta = || ChangeMeta::for_field(type_name, old.name.clone());

        if old.ty != new.ty {
            let criticality = if is_safe_output_change(&old.ty, &new.ty) {
                Criticality::non_breaking()
            } else {
                Criticality::breaking(format!("Clients may not handle '{}' where '{}' was returned", new.ty, old.ty))
            };
            self.push(
                ChangeKind::FieldTypeChanged,
                path.clone(),
                criticality,
                format!("Field '{}' changed type from '{}' to '{}'", path, old.ty, new.ty),
                meta().with_values(Some(old.ty.to_string()), Some(new.ty.to_string())),
            );
        }
        if old.description != new.description {
            self.push(
                ChangeKind::FieldDescriptionChanged,
                path.clone(),
                Criticality::non_breaking(),
                format!("Field '{}' description changed", path),
                meta().with_values(old.description.clone(), new.description.clone()),
            );
        }
        match (&old.deprecation_reason, &new.deprecation_reason) {
            (None, Some(reason)) => self.push(
                ChangeKind::FieldDeprecationAdded,
                path.clone(),
                Criticality::non_breaking(),
                format!("Field '{}' is deprecated", path),
                meta().with_values(None, Some(reason.clone())),
            ),
            (Some(reason), None) => self.push(
                ChangeKind::FieldDeprecationRemoved,
                path.clone(),
                Criticality::non_breaking(),
                format!("Field '{}' is no longer deprecated", path),
                meta().with_values(Some(reason.clone()), None),
            ),
            _ => {}
        }
        self.arguments(type_name, old, new);
    }

    fn arguments(&mut self, type_name: &str, old: &FieldDefinition, new: &FieldDefinition) {
        let field_name = &old.name;
        let path = |arg: &str| format!("{}.{}({})", type_name, field_name, arg);
        let meta = |arg: &str| ChangeMeta::for_field(type_name, field_name.clone()).with_argument(arg);

        for (arg_name, _) in only_in(&old.args, &new.args) {
            self.push(
                ChangeKind::FieldArgumentRemoved,
                path(arg_name),
                Criticality::breaking(format!("Queries passing '{}' will be rejected", arg_name)),
                format!("Argument '{}' was removed from field '{}.{}'", arg_name, type_name, field_name),
                meta(arg_name),
            );
        }
        for (arg_name, arg) in only_in(&new.args, &old.args) {
            self.push(
                ChangeKind::FieldArgumentAdded,
                path(arg_name),
                added_input_criticality(arg, "argument"),
                format!(
                    "{} argument '{}: {}' was added to field '{}.{}'",
                    if arg.is_required() { "Required" } else { "Optional" },
                    arg_name,
                    arg.ty,
                    type_name,
                    field_name
                ),
                meta(arg_name),
            );
        }
        for (arg_name, old_arg) in &old.args {
            let Some(new_arg) = new.args.get(arg_name) else { continue };
            if old_arg.ty != new_arg.ty {
                self.push(
                    ChangeKind::FieldArgumentTypeChanged,
                    path(arg_name),
                    changed_input_criticality(old_arg, new_arg),
                    format!(
                        "Type for argument '{}' on field '{}.{}' changed from '{}' to '{}'",
                        arg_name, type_name, field_name, old_arg.ty, new_arg.ty
                    ),
                    meta(arg_name).with_values(Some(old_arg.ty.to_string()), Some(new_arg.ty.to_string())),
                );
            }
            if old_arg.default_value != new_arg.default_value {
                self.push(
                    ChangeKind::FieldArgumentDefaultChanged,
                    path(arg_name),
                    Criticality::dangerous("Callers relying on the old default will see different behavior"),
                    format!("Default value for argument '{}' on field '{}.{}' changed", arg_name, type_name, field_name),
                    meta(arg_name).with_values(old_arg.default_value.clone(), new_arg.default_value.clone()),
                );
            }
        }
    }

    fn input_fields(&mut self, old: &TypeDefinition, new: &TypeDefinition) {
        let type_name = &old.name;
        for (field_name, _) in only_in(&old.input_fields, &new.input_fields) {
            self.push(
                ChangeKind::InputFieldRemoved,
                format!("{}.{}", type_name, field_name),
                Criticality::breaking(format!("Inputs still sending '{}' will be rejected", field_name)),
                format!("Input field '{}' was removed from input object type '{}'", field_name, type_name),
                ChangeMeta::for_field(type_name.clone(), field_name.clone()),
            );
        }
        for (field_name, field) in only_in(&new.input_fields, &old.input_fields) {
            self.push(
                ChangeKind::InputFieldAdded,
                format!("{}.{}", type_name, field_name),
                added_input_criticality(field, "input field"),
                format!(
                    "{} input field '{}' of type '{}' was added to input object type '{}'",
                    if field.is_required() { "Required" } else { "Optional" },
                    field_name,
                    field.ty,
                    type_name
                ),
                ChangeMeta::for_field(type_name.clone(), field_name.clone()),
            );
        }
        for (field_name, old_field) in &old.input_fields {
            let Some(new_field) = new.input_fields.get(field_name) else { continue };
            let path = format!("{}.{}", type_name, field_name);
            if old_field.ty != new_field.ty {
                self.push(
                    ChangeKind::InputFieldTypeChanged,
                    path.clone(),
                    changed_input_criticality(old_field, new_field),
                    format!(
                        "Input field '{}' changed type from '{}' to '{}'",
                        path, old_field.ty, new_field.ty
                    ),
                    ChangeMeta::for_field(type_name.clone(), field_name.clone())
                        .with_values(Some(old_field.ty.to_string()), Some(new_field.ty.to_string())),
                );
            }
            if old_field.default_value != new_field.default_value {
                self.push(
                    ChangeKind::InputFieldDefaultValueChanged,
                    path.clone(),
                    Criticality::dangerous("Inputs relying on the old default will see different behavior"),
                    format!("Input field '{}' default value changed", path),
                    ChangeMeta::for_field(type_name.clone(), field_name.clone())
                        .with_values(old_field.default_value.clone(), new_field.default_value.clone()),
                );
            }
        }
    }

    fn enum_values(&mut self, old: &TypeDefinition, new: &TypeDefinition) {
        let type_name = &old.name;
        for (value, _) in only_in(&old.enum_values, &new.enum_values) {
            self.push(
                ChangeKind::EnumValueRemoved,
                format!("{}.{}", type_name, value),
                Criticality::breaking(format!("Inputs or results using '{}' are no longer valid", value)),
                format!("Enum value '{}' was removed from enum '{}'", value, type_name),
                ChangeMeta::for_type(type_name.clone()).with_member(value.clone()),
            );
        }
        for (value, _) in only_in(&new.enum_values, &old.enum_values) {
            self.push(
                ChangeKind::EnumValueAdded,
                format!("{}.{}", type_name, value),
                Criticality::dangerous("Clients with exhaustive switches may not handle the new value"),
                format!("Enum value '{}' was added to enum '{}'", value, type_name),
                ChangeMeta::for_type(type_name.clone()).with_member(value.clone()),
            );
        }
    }

    fn union_members(&mut self, old: &TypeDefinition, new: &TypeDefinition) {
        self.set_members(
            &old.name,
            &old.possible_types,
            &new.possible_types,
            (ChangeKind::UnionMemberRemoved, ChangeKind::UnionMemberAdded),
            "union",
        );
    }

    fn interfaces(&mut self, old: &TypeDefinition, new: &TypeDefinition) {
        self.set_members(
            &old.name,
            &old.interfaces,
            &new.interfaces,
            (ChangeKind::ObjectTypeInterfaceRemoved, ChangeKind::ObjectTypeInterfaceAdded),
            "interface list of",
        );
    }

    fn set_members(
        &mut self,
        type_name: &str,
        old: &BTreeSet<String>,
        new: &BTreeSet<String>,
        (removed, added): (ChangeKind, ChangeKind),
        label: &str,
    ) {
        for member in old.difference(new) {
            self.push(
                removed,
                type_name.to_string(),
                Criticality::breaking(format!("Fragments spreading '{}' on '{}' become invalid", member, type_name)),
                format!("'{}' was removed from {} '{}'", member, label, type_name),
                ChangeMeta::for_type(type_name).with_member(member.clone()),
            );
        }
        for member in new.difference(old) {
            self.push(
                added,
                type_name.to_string(),
                Criticality::dangerous(format!("Clients may receive '{}' where they did not expect it", member)),
                format!("'{}' was added to {} '{}'", member, label, type_name),
                ChangeMeta::for_type(type_name).with_member(member.clone()),
            );
        }
    }
}

fn added_input_criticality(value: &InputValueDefinition, label: &str) -> Criticality {
    if value.is_required() {
        Criticality::breaking(format!("Existing callers do not send the new required {} '{}'", label, value.name))
    } else {
        Criticality::non_breaking()
    }
}

fn changed_input_criticality(old: &InputValueDefinition, new: &InputValueDefinition) -> Criticality {
    if is_safe_input_change(&old.ty, &new.ty) {
        Criticality::non_breaking()
    } else {
        Criticality::breaking(format!("Callers sending '{}' may not satisfy '{}'", old.ty, new.ty))
    }
}
