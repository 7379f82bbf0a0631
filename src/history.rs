//! Revision history construction
//!
//! Snapshots are ordered ascending and diffed pairwise, each step's `before`
//! being the previous step's `after`. The resulting revisions are stored
//! newest first.

use std::sync::Arc;
use tracing::debug;

use crate::catalog::Catalog;
use crate::change::Changeset;
use crate::date::DateOnly;
use crate::definition::SchemaDefinition;
use crate::diff::diff;
use crate::error::Result;
use crate::schema::{Revision, UnversionedSchema, VersionedSchema};
use crate::version::Version;

/// A schema definition as of a date
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub date: DateOnly,
    pub definition: Arc<SchemaDefinition>,
}

impl Snapshot {
    pub fn new(date: DateOnly, definition: SchemaDefinition) -> Self {
        Self { date, definition: Arc::new(definition) }
    }
}

/// All snapshots of one version
#[derive(Debug, Clone)]
pub struct VersionSnapshots {
    pub version: Version,
    pub snapshots: Vec<Snapshot>,
}

/// Diff consecutive snapshots starting from `base`. Returns newest first.
pub fn build_history(mut snapshots: Vec<Snapshot>, base: Arc<SchemaDefinition>) -> Result<Vec<Revision>> {
    // Stable: snapshots sharing a date keep their input order.
    snapshots.sort_by_key(|s| s.date);

    let mut revisions = Vec::with_capacity(snapshots.len());
    let mut before = base;
    for snapshot in snapshots {
        let changes = diff(&before, &snapshot.definition)?;
        debug!(date = %snapshot.date, changes = changes.len(), "computed changeset");
        let changeset = Arc::new(Changeset {
            date: snapshot.date,
            before,
            after: snapshot.definition.clone(),
            changes,
        });
        revisions.push(Revision::from_changeset(changeset));
        before = snapshot.definition;
    }
    revisions.reverse();
    Ok(revisions)
}

/// Build an unversioned catalog; `None` when there are no snapshots
pub fn unversioned_catalog(snapshots: Vec<Snapshot>) -> Result<Option<Catalog>> {
    if snapshots.is_empty() {
        return Ok(None);
    }
    let revisions = build_history(snapshots, Arc::new(SchemaDefinition::empty()))?;
    let definition = revisions
        .first()
        .and_then(Revision::snapshot)
        .cloned()
        .unwrap_or_else(|| Arc::new(SchemaDefinition::empty()));
    Ok(Some(Catalog::unversioned(UnversionedSchema {
        definition,
        revisions,
        categories: Vec::new(),
    })))
}

/// Build a versioned catalog; `None` when no version has snapshots.
///
/// Versions are processed ascending. The first revision of each version is
/// diffed against its parent's newest snapshot.
pub fn versioned_catalog(mut versions: Vec<VersionSnapshots>) -> Result<Option<Catalog>> {
    versions.retain(|v| !v.snapshots.is_empty());
    if versions.is_empty() {
        return Ok(None);
    }
    versions.sort_by(|a, b| a.version.cmp(&b.version));

    let mut entries = Vec::with_capacity(versions.len());
    let mut parent: Option<(Version, Arc<SchemaDefinition>)> = None;
    for VersionSnapshots { version, snapshots } in versions {
        let base = parent
            .as_ref()
            .map(|(_, definition)| definition.clone())
            .unwrap_or_else(|| Arc::new(SchemaDefinition::empty()));
        let revisions = build_history(snapshots, base)?;
        let definition = revisions
            .first()
            .and_then(Revision::snapshot)
            .cloned()
            .unwrap_or_else(|| Arc::new(SchemaDefinition::empty()));
        debug!(version = %version, revisions = revisions.len(), "built version history");
        entries.push(VersionedSchema {
            version: version.clone(),
            definition: definition.clone(),
            parent: parent.as_ref().map(|(v, _)| v.clone()),
            revisions,
            categories: Vec::new(),
        });
        parent = Some((version, definition));
    }
    Ok(Some(Catalog::versioned(entries)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::change::ChangeKind;
    use crate::definition::{SchemaParser, SdlParser};

    fn snap(date: &str, sdl: &str) -> Snapshot {
        Snapshot::new(date.parse().unwrap(), SdlParser.parse_sdl(sdl, date).unwrap())
    }

    #[test]
    fn test_revisions_stored_newest_first() {
        let snapshots = vec![
            snap("2024-03-01", "type Query { a: String b: String c: String }"),
            snap("2024-01-01", "type Query { a: String }"),
            snap("2024-02-01", "type Query { a: String b: String }"),
        ];
        let revisions = build_history(snapshots, Arc::new(SchemaDefinition::empty())).unwrap();
        let dates: Vec<String> = revisions.iter().map(|r| r.date.to_string()).collect();
        assert_eq!(dates, vec!["2024-03-01", "2024-02-01", "2024-01-01"]);

        assert_eq!(revisions[0].changes.len(), 1);
        assert_eq!(revisions[0].changes[0].path, "Query.c");
        assert_eq!(revisions[2].changes[0].kind, ChangeKind::TypeAdded);
        assert!(revisions[2].changeset.as_ref().unwrap().is_initial());
    }

    #[test]
    fn test_consecutive_changesets_share_snapshots() {
        let snapshots = vec![
            snap("2024-01-01", "type Query { a: String }"),
            snap("2024-02-01", "type Query { a: String b: String }"),
        ];
        let revisions = build_history(snapshots, Arc::new(SchemaDefinition::empty())).unwrap();
        let newer = revisions[0].changeset.as_ref().unwrap();
        let older = revisions[1].changeset.as_ref().unwrap();
        assert!(Arc::ptr_eq(&newer.before, &older.after));
    }

    #[test]
    fn test_versioned_parent_chain() {
        let catalog = versioned_catalog(vec![
            VersionSnapshots {
                version: Version::decode("2.0.0"),
                snapshots: vec![snap("2024-02-01", "type Query { a: String b: Int }")],
            },
            VersionSnapshots {
                version: Version::decode("1.0.0"),
                snapshots: vec![snap("2024-01-01", "type Query { a: String }")],
            },
        ])
        .unwrap()
        .unwrap();

        let versioned = catalog.fold(|c| c, |_| panic!("expected versioned"));
        let latest = versioned.latest().unwrap();
        assert_eq!(latest.version.encode(), "2.0.0");
        assert_eq!(latest.parent.as_ref().map(Version::encode), Some("1.0.0"));
        assert_eq!(latest.revisions[0].changes.len(), 1);
        assert_eq!(latest.revisions[0].changes[0].kind, ChangeKind::FieldAdded);
        assert!(versioned.parent_of(latest).unwrap().parent.is_none());
    }

    #[test]
    fn test_empty_input_yields_none() {
        assert!(unversioned_catalog(Vec::new()).unwrap().is_none());
        assert!(versioned_catalog(Vec::new()).unwrap().is_none());
    }
}
