//! Schema lifecycle index
//!
//! Replays changesets oldest to newest and derives, for every type and
//! field, the dates it was added and removed. Each type or field is either
//! present or absent; `*_ADDED` makes it present and `*_REMOVED` absent.
//!
//! Everything in the oldest snapshot starts out present, recorded as an
//! implicit Added event without a changeset. Event lists are newest first.
//!
//! Events point back at the changeset and snapshot they came from through
//! [`Backref`], a weak handle. The index never keeps a catalog alive, and
//! back-references serialize as `null`.

use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::{debug, warn};

use crate::catalog::Catalog;
use crate::change::{Change, ChangeKind, Changeset};
use crate::date::DateOnly;
use crate::definition::{SchemaDefinition, TypeDefinition, TypeKind};
use crate::error::{CatalogError, Result};

// =============================================================================
// Back-references
// =============================================================================

/// Weak, read-only link to provenance data owned by a catalog
pub struct Backref<T>(Weak<T>);

impl<T> Backref<T> {
    pub fn new(target: &Arc<T>) -> Self {
        Self(Arc::downgrade(target))
    }

    pub fn none() -> Self {
        Self(Weak::new())
    }

    /// The target, while its catalog is alive
    pub fn get(&self) -> Option<Arc<T>> {
        self.0.upgrade()
    }

    pub fn is_set(&self) -> bool {
        self.0.strong_count() > 0
    }
}

impl<T> Clone for Backref<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> Default for Backref<T> {
    fn default() -> Self {
        Self::none()
    }
}

impl<T> fmt::Debug for Backref<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_set() {
            write!(f, "Backref(..)")
        } else {
            write!(f, "Backref(null)")
        }
    }
}

impl<T> Serialize for Backref<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_none()
    }
}

impl<'de, T> Deserialize<'de> for Backref<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Option::<IgnoredAny>::deserialize(deserializer)?;
        Ok(Self::none())
    }
}

// =============================================================================
// Events
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    Added,
    Removed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleEvent {
    pub kind: EventKind,
    pub date: DateOnly,
    /// Unset for the implicit events of the oldest snapshot
    pub changeset: Backref<Changeset>,
    /// Snapshot in which the entity was last seen present
    pub schema: Backref<SchemaDefinition>,
}

impl LifecycleEvent {
    fn seed(date: DateOnly, schema: &Arc<SchemaDefinition>) -> Self {
        Self { kind: EventKind::Added, date, changeset: Backref::none(), schema: Backref::new(schema) }
    }

    fn added(changeset: &Arc<Changeset>) -> Self {
        Self {
            kind: EventKind::Added,
            date: changeset.date,
            changeset: Backref::new(changeset),
            schema: Backref::new(&changeset.after),
        }
    }

    fn removed(changeset: &Arc<Changeset>) -> Self {
        Self {
            kind: EventKind::Removed,
            date: changeset.date,
            changeset: Backref::new(changeset),
            schema: Backref::new(&changeset.before),
        }
    }

    pub fn is_added(&self) -> bool {
        self.kind == EventKind::Added
    }
}

fn is_present(events: &[LifecycleEvent]) -> bool {
    events.first().map(LifecycleEvent::is_added).unwrap_or(false)
}

fn oldest(events: &[LifecycleEvent], kind: EventKind) -> Option<DateOnly> {
    events.iter().rev().find(|e| e.kind == kind).map(|e| e.date)
}

fn newest(events: &[LifecycleEvent], kind: EventKind) -> Option<DateOnly> {
    events.iter().find(|e| e.kind == kind).map(|e| e.date)
}

// =============================================================================
// Per-entity timelines
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldLifecycle {
    pub name: String,
    /// Newest first
    pub events: Vec<LifecycleEvent>,
}

impl FieldLifecycle {
    fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), events: Vec::new() }
    }

    pub fn is_present(&self) -> bool {
        is_present(&self.events)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeLifecycle {
    pub name: String,
    pub kind: TypeKind,
    /// Newest first
    pub events: Vec<LifecycleEvent>,
    /// Output or input fields; `None` for kinds without fields
    pub fields: Option<BTreeMap<String, FieldLifecycle>>,
}

fn tracks_fields(kind: TypeKind) -> bool {
    kind.has_fields() || kind == TypeKind::InputObject
}

fn member_fields(ty: &TypeDefinition) -> impl Iterator<Item = &String> {
    ty.fields.keys().chain(ty.input_fields.keys())
}

impl TypeLifecycle {
    fn new(name: impl Into<String>, kind: TypeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            events: Vec::new(),
            fields: tracks_fields(kind).then(BTreeMap::new),
        }
    }

    pub fn is_present(&self) -> bool {
        is_present(&self.events)
    }

    pub fn field(&self, name: &str) -> Option<&FieldLifecycle> {
        self.fields.as_ref().and_then(|f| f.get(name))
    }

    fn field_mut(&mut self, name: &str) -> &mut FieldLifecycle {
        self.fields
            .get_or_insert_with(BTreeMap::new)
            .entry(name.to_string())
            .or_insert_with(|| FieldLifecycle::new(name))
    }

    fn present_fields_mut(&mut self) -> impl Iterator<Item = &mut FieldLifecycle> {
        self.fields
            .iter_mut()
            .flat_map(|f| f.values_mut())
            .filter(|f| f.is_present())
    }
}

// =============================================================================
// Index
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaLifecycle {
    pub data: BTreeMap<String, TypeLifecycle>,
}

impl SchemaLifecycle {
    /// Replay changesets given oldest first
    pub fn from_changesets(changesets: &[Arc<Changeset>]) -> Result<Self> {
        let mut lifecycle = Self::default();
        let Some((first, rest)) = changesets.split_first() else {
            return Ok(lifecycle);
        };
        lifecycle.seed(first.date, &first.after);
        for changeset in rest {
            lifecycle.replay(changeset)?;
        }
        debug!(types = lifecycle.data.len(), changesets = changesets.len(), "built schema lifecycle");
        Ok(lifecycle)
    }

    /// Replay every changeset reachable from the catalog's revisions
    pub fn from_catalog(catalog: &Catalog) -> Result<Self> {
        Self::from_changesets(&catalog.changesets_ascending())
    }

    fn seed(&mut self, date: DateOnly, schema: &Arc<SchemaDefinition>) {
        for (name, ty) in &schema.types {
            let mut entry = TypeLifecycle::new(name, ty.kind);
            entry.events.push(LifecycleEvent::seed(date, schema));
            for field in member_fields(ty) {
                entry.field_mut(field).events.push(LifecycleEvent::seed(date, schema));
            }
            self.data.insert(name.clone(), entry);
        }
    }

    fn replay(&mut self, changeset: &Arc<Changeset>) -> Result<()> {
        for change in &changeset.changes {
            self.apply(changeset, change)?;
        }
        Ok(())
    }

    fn apply(&mut self, changeset: &Arc<Changeset>, change: &Change) -> Result<()> {
        let type_name = change.meta.type_name.as_str();
        match change.kind {
            ChangeKind::TypeAdded => {
                let ty = changeset
                    .after
                    .get_type(type_name)
                    .ok_or_else(|| CatalogError::InconsistentDiff { type_name: type_name.to_string() })?;
                let entry = self
                    .data
                    .entry(type_name.to_string())
                    .or_insert_with(|| TypeLifecycle::new(type_name, ty.kind));
                entry.kind = ty.kind;
                entry.events.insert(0, LifecycleEvent::added(changeset));
                for field in member_fields(ty) {
                    let field = entry.field_mut(field);
                    if !field.is_present() {
                        field.events.insert(0, LifecycleEvent::added(changeset));
                    }
                }
            }
            ChangeKind::TypeRemoved => match self.data.get_mut(type_name) {
                Some(entry) => {
                    entry.events.insert(0, LifecycleEvent::removed(changeset));
                    for field in entry.present_fields_mut() {
                        field.events.insert(0, LifecycleEvent::removed(changeset));
                    }
                }
                None => warn!(type_name, date = %changeset.date, "removal of a type with no lifecycle entry"),
            },
            ChangeKind::TypeKindChanged => {
                let ty = changeset
                    .after
                    .get_type(type_name)
                    .ok_or_else(|| CatalogError::InconsistentDiff { type_name: type_name.to_string() })?;
                let entry = self
                    .data
                    .entry(type_name.to_string())
                    .or_insert_with(|| TypeLifecycle::new(type_name, ty.kind));
                entry.kind = ty.kind;
                // Kind changes carry no member changes.
                let members: BTreeSet<&String> = member_fields(ty).collect();
                for field in entry.present_fields_mut().filter(|f| !members.contains(&f.name)) {
                    field.events.insert(0, LifecycleEvent::removed(changeset));
                }
                for name in members {
                    let field = entry.field_mut(name);
                    if !field.is_present() {
                        field.events.insert(0, LifecycleEvent::added(changeset));
                    }
                }
            }
            ChangeKind::FieldAdded | ChangeKind::InputFieldAdded => {
                let Some(field_name) = change.meta.field_name.as_deref() else {
                    warn!(path = %change.path, "field change without a field name");
                    return Ok(());
                };
                let kind = changeset
                    .after
                    .get_type(type_name)
                    .map(|t| t.kind)
                    .unwrap_or(TypeKind::Object);
                self.data
                    .entry(type_name.to_string())
                    .or_insert_with(|| TypeLifecycle::new(type_name, kind))
                    .field_mut(field_name)
                    .events
                    .insert(0, LifecycleEvent::added(changeset));
            }
            ChangeKind::FieldRemoved | ChangeKind::InputFieldRemoved => {
                let field = change.meta.field_name.as_deref().and_then(|field_name| {
                    self.data
                        .get_mut(type_name)
                        .and_then(|t| t.fields.as_mut())
                        .and_then(|f| f.get_mut(field_name))
                });
                match field {
                    Some(field) => field.events.insert(0, LifecycleEvent::removed(changeset)),
                    None => warn!(path = %change.path, date = %changeset.date, "removal of a field with no lifecycle entry"),
                }
            }
            _ => {}
        }
        Ok(())
    }

    pub fn get_type(&self, type_name: &str) -> Option<&TypeLifecycle> {
        self.data.get(type_name)
    }

    pub fn get_field(&self, type_name: &str, field_name: &str) -> Option<&FieldLifecycle> {
        self.get_type(type_name).and_then(|t| t.field(field_name))
    }

    pub fn is_type_currently_available(&self, type_name: &str) -> bool {
        self.get_type(type_name).map(TypeLifecycle::is_present).unwrap_or(false)
    }

    pub fn is_field_currently_available(&self, type_name: &str, field_name: &str) -> bool {
        self.get_field(type_name, field_name)
            .map(FieldLifecycle::is_present)
            .unwrap_or(false)
    }

    /// Date of the first Added event
    pub fn type_added_date(&self, type_name: &str) -> Option<DateOnly> {
        self.get_type(type_name).and_then(|t| oldest(&t.events, EventKind::Added))
    }

    pub fn field_added_date(&self, type_name: &str, field_name: &str) -> Option<DateOnly> {
        self.get_field(type_name, field_name)
            .and_then(|f| oldest(&f.events, EventKind::Added))
    }

    /// Date of the most recent Removed event
    pub fn type_removed_date(&self, type_name: &str) -> Option<DateOnly> {
        self.get_type(type_name).and_then(|t| newest(&t.events, EventKind::Removed))
    }

    pub fn field_removed_date(&self, type_name: &str, field_name: &str) -> Option<DateOnly> {
        self.get_field(type_name, field_name)
            .and_then(|f| newest(&f.events, EventKind::Removed))
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::change::{ChangeMeta, Criticality};
    use crate::definition::{SchemaParser, SdlParser};
    use crate::diff::diff;
    use crate::history::{build_history, Snapshot};

    fn changesets(snapshots: &[(&str, &str)]) -> Vec<Arc<Changeset>> {
        let snapshots = snapshots
            .iter()
            .map(|(date, sdl)| Snapshot::new(date.parse().unwrap(), SdlParser.parse_sdl(sdl, date).unwrap()))
            .collect();
        let mut revisions = build_history(snapshots, Arc::new(SchemaDefinition::empty())).unwrap();
        revisions.reverse();
        revisions.into_iter().filter_map(|r| r.changeset).collect()
    }

    fn date(s: &str) -> Option<DateOnly> {
        Some(s.parse().unwrap())
    }

    #[test]
    fn test_seeded_from_oldest_snapshot() {
        let history = changesets(&[("2024-01-01", "type Query { a: String } scalar Time")]);
        let lifecycle = SchemaLifecycle::from_changesets(&history).unwrap();
        assert!(lifecycle.is_type_currently_available("Query"));
        assert_eq!(lifecycle.type_added_date("Query"), date("2024-01-01"));
        assert_eq!(lifecycle.field_added_date("Query", "a"), date("2024-01-01"));
        assert!(lifecycle.get_type("Time").unwrap().fields.is_none());

        let seed = &lifecycle.get_type("Query").unwrap().events[0];
        assert!(!seed.changeset.is_set());
        assert!(seed.schema.is_set());
    }

    #[test]
    fn test_type_added_then_removed() {
        let history = changesets(&[
            ("2024-01-01", "type Query { a: String }"),
            ("2024-02-01", "type Query { a: String } type User { id: ID }"),
            ("2024-03-01", "type Query { a: String }"),
        ]);
        let lifecycle = SchemaLifecycle::from_changesets(&history).unwrap();
        assert!(!lifecycle.is_type_currently_available("User"));
        assert_eq!(lifecycle.type_added_date("User"), date("2024-02-01"));
        assert_eq!(lifecycle.type_removed_date("User"), date("2024-03-01"));
        assert!(!lifecycle.is_field_currently_available("User", "id"));
        assert_eq!(lifecycle.field_removed_date("User", "id"), date("2024-03-01"));

        let events = &lifecycle.get_type("User").unwrap().events;
        assert_eq!(events.iter().map(|e| e.kind).collect::<Vec<_>>(), vec![EventKind::Removed, EventKind::Added]);
    }

    #[test]
    fn test_kind_change_reconciles_members() {
        let history = changesets(&[
            ("2024-01-01", "type Query { a: String } type X { old: Int kept: Int }"),
            ("2024-02-01", "type Query { a: String } input X { new: Int kept: Int }"),
        ]);
        let lifecycle = SchemaLifecycle::from_changesets(&history).unwrap();
        assert_eq!(lifecycle.get_type("X").unwrap().kind, TypeKind::InputObject);
        assert!(lifecycle.is_type_currently_available("X"));

        assert!(!lifecycle.is_field_currently_available("X", "old"));
        assert_eq!(lifecycle.field_removed_date("X", "old"), date("2024-02-01"));
        assert!(lifecycle.is_field_currently_available("X", "new"));
        assert_eq!(lifecycle.field_added_date("X", "new"), date("2024-02-01"));
        assert!(lifecycle.is_field_currently_available("X", "kept"));
        assert_eq!(lifecycle.get_field("X", "kept").unwrap().events.len(), 1);
    }

    #[test]
    fn test_replay_after_add_is_available() {
        let history = changesets(&[
            ("2024-01-01", "type Query { a: String }"),
            ("2024-02-01", "type Query { a: String } type User { id: ID }"),
        ]);
        let lifecycle = SchemaLifecycle::from_changesets(&history).unwrap();
        assert!(lifecycle.is_type_currently_available("User"));
        assert_eq!(lifecycle.type_removed_date("User"), None);
        let event = &lifecycle.get_type("User").unwrap().events[0];
        assert!(Arc::ptr_eq(&event.changeset.get().unwrap(), &history[1]));
    }

    #[test]
    fn test_type_re_added_keeps_first_added_date() {
        let history = changesets(&[
            ("2024-01-01", "type Query { a: String } type User { id: ID }"),
            ("2024-02-01", "type Query { a: String }"),
            ("2024-03-01", "type Query { a: String } type User { id: ID }"),
        ]);
        let lifecycle = SchemaLifecycle::from_changesets(&history).unwrap();
        assert!(lifecycle.is_type_currently_available("User"));
        assert!(lifecycle.is_field_currently_available("User", "id"));
        assert_eq!(lifecycle.type_added_date("User"), date("2024-01-01"));
        assert_eq!(lifecycle.type_removed_date("User"), date("2024-02-01"));
    }

    #[test]
    fn test_field_add_and_remove() {
        let history = changesets(&[
            ("2024-01-01", "type Query { a: String b: Int }"),
            ("2024-02-01", "type Query { a: String c: Int }"),
        ]);
        let lifecycle = SchemaLifecycle::from_changesets(&history).unwrap();
        assert!(!lifecycle.is_field_currently_available("Query", "b"));
        assert_eq!(lifecycle.field_removed_date("Query", "b"), date("2024-02-01"));
        assert!(lifecycle.is_field_currently_available("Query", "c"));
        assert_eq!(lifecycle.field_added_date("Query", "c"), date("2024-02-01"));
        assert!(lifecycle.is_type_currently_available("Query"));
    }

    #[test]
    fn test_unknown_removal_is_a_no_op() {
        let base = Arc::new(SdlParser.parse_sdl("type Query { a: String }", "a").unwrap());
        let seed = Arc::new(Changeset {
            date: "2024-01-01".parse().unwrap(),
            before: Arc::new(SchemaDefinition::empty()),
            after: base.clone(),
            changes: diff(&SchemaDefinition::empty(), &base).unwrap(),
        });
        let bogus = Arc::new(Changeset {
            date: "2024-02-01".parse().unwrap(),
            before: base.clone(),
            after: base.clone(),
            changes: vec![
                Change {
                    kind: ChangeKind::TypeRemoved,
                    path: "Ghost".to_string(),
                    criticality: Criticality::breaking("gone"),
                    message: "Type 'Ghost' was removed".to_string(),
                    meta: ChangeMeta::for_type("Ghost"),
                },
                Change {
                    kind: ChangeKind::FieldRemoved,
                    path: "Query.ghost".to_string(),
                    criticality: Criticality::breaking("gone"),
                    message: "Field 'Query.ghost' was removed".to_string(),
                    meta: ChangeMeta::for_field("Query", "ghost"),
                },
            ],
        });
        let lifecycle = SchemaLifecycle::from_changesets(&[seed, bogus]).unwrap();
        assert!(lifecycle.get_type("Ghost").is_none());
        assert!(lifecycle.get_field("Query", "ghost").is_none());
        assert!(lifecycle.is_type_currently_available("Query"));
    }

    #[test]
    fn test_type_added_missing_from_after_is_fatal() {
        let base = Arc::new(SdlParser.parse_sdl("type Query { a: String }", "a").unwrap());
        let seed = Arc::new(Changeset {
            date: "2024-01-01".parse().unwrap(),
            before: Arc::new(SchemaDefinition::empty()),
            after: base.clone(),
            changes: Vec::new(),
        });
        let inconsistent = Arc::new(Changeset {
            date: "2024-02-01".parse().unwrap(),
            before: base.clone(),
            after: base,
            changes: vec![Change {
                kind: ChangeKind::TypeAdded,
                path: "User".to_string(),
                criticality: Criticality::non_breaking(),
                message: "Type 'User' was added".to_string(),
                meta: ChangeMeta::for_type("User"),
            }],
        });
        let err = SchemaLifecycle::from_changesets(&[seed, inconsistent]).unwrap_err();
        assert!(matches!(err, CatalogError::InconsistentDiff { ref type_name } if type_name == "User"));
    }

    #[test]
    fn test_serialization_nulls_backrefs() {
        let history = changesets(&[
            ("2024-01-01", "type Query { a: String }"),
            ("2024-02-01", "type Query { a: String b: Int }"),
        ]);
        let lifecycle = SchemaLifecycle::from_changesets(&history).unwrap();
        let json = serde_json::to_value(&lifecycle).unwrap();
        let event = &json["data"]["Query"]["fields"]["b"]["events"][0];
        assert_eq!(event["kind"], "ADDED");
        assert_eq!(event["date"], "2024-02-01");
        assert!(event["changeset"].is_null());
        assert!(event["schema"].is_null());

        let restored: SchemaLifecycle = serde_json::from_value(json).unwrap();
        assert_eq!(restored.field_added_date("Query", "b"), date("2024-02-01"));
        assert!(restored.is_field_currently_available("Query", "a"));
        assert!(!restored.get_type("Query").unwrap().events[0].schema.is_set());
    }
}
