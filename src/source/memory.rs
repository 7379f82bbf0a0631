//! In-memory SDL source

use std::collections::BTreeMap;

use super::{InputSource, LoadContext, SourceName};
use crate::catalog::Catalog;
use crate::date::DateOnly;
use crate::error::{CatalogError, Result};
use crate::history::{unversioned_catalog, versioned_catalog, Snapshot, VersionSnapshots};
use crate::version::Version;

/// SDL strings supplied through configuration. If any revision names a
/// version, every revision must, and the result is a versioned catalog.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemorySource;

impl InputSource for MemorySource {
    fn name(&self) -> &str {
        SourceName::Memory.as_str()
    }

    fn is_applicable(&self, ctx: &LoadContext<'_>) -> bool {
        ctx.config
            .memory
            .as_ref()
            .map(|m| !m.revisions.is_empty())
            .unwrap_or(false)
    }

    fn read_if_applicable_or_throw(&self, ctx: &LoadContext<'_>) -> Result<Option<Catalog>> {
        let Some(memory) = ctx.config.memory.as_ref().filter(|m| !m.revisions.is_empty()) else {
            return Ok(None);
        };

        let versioned = memory.revisions.iter().any(|r| r.version.is_some());
        let mut unversioned = Vec::new();
        let mut by_version: BTreeMap<Version, Vec<Snapshot>> = BTreeMap::new();
        for (i, revision) in memory.revisions.iter().enumerate() {
            let origin = format!("memory[{}]", i);
            let definition = ctx.parser.parse_sdl(&revision.sdl, &origin)?;
            let date = revision.date.unwrap_or_else(DateOnly::today);
            let snapshot = Snapshot::new(date, definition);
            match (&revision.version, versioned) {
                (Some(version), _) => by_version.entry(Version::decode(version)).or_default().push(snapshot),
                (None, false) => unversioned.push(snapshot),
                (None, true) => {
                    return Err(CatalogError::InvalidConfig(format!(
                        "{} has no version while other memory revisions do",
                        origin
                    )))
                }
            }
        }

        if versioned {
            versioned_catalog(
                by_version
                    .into_iter()
                    .map(|(version, snapshots)| VersionSnapshots { version, snapshots })
                    .collect(),
            )
        } else {
            unversioned_catalog(unversioned)
        }
    }
}
