//! Directory of version subfolders
//!
//! Each subfolder name is decoded as a [`Version`]. Inside, dated
//! `YYYY-MM-DD.graphql` files give the version's revisions; a lone
//! `schema.graphql` gives a single revision.

use std::path::PathBuf;
use tracing::debug;

use super::{dated_file_stem, read_all_sdl, InputSource, LoadContext, SourceName};
use crate::catalog::Catalog;
use crate::date::DateOnly;
use crate::error::{CatalogError, Result};
use crate::history::{versioned_catalog, Snapshot, VersionSnapshots};
use crate::version::Version;

const VERSION_SCHEMA_FILE: &str = "schema.graphql";

#[derive(Debug, Clone, Copy, Default)]
pub struct VersionedDirectorySource;

impl InputSource for VersionedDirectorySource {
    fn name(&self) -> &str {
        SourceName::VersionedDirectory.as_str()
    }

    fn is_applicable(&self, ctx: &LoadContext<'_>) -> bool {
        let dir = ctx.resolve(&ctx.config.versioned_directory);
        ctx.fs
            .list_dir(&dir)
            .map(|entries| entries.iter().any(|e| e.is_dir))
            .unwrap_or(false)
    }

    fn read_if_applicable_or_throw(&self, ctx: &LoadContext<'_>) -> Result<Option<Catalog>> {
        let dir = ctx.resolve(&ctx.config.versioned_directory);

        // Plan every file first so that all reads can fan out together.
        let mut planned: Vec<(usize, DateOnly, PathBuf)> = Vec::new();
        let mut versions: Vec<VersionSnapshots> = Vec::new();
        for entry in ctx.fs.list_dir(&dir)?.into_iter().filter(|e| e.is_dir) {
            let version = Version::decode(&entry.name);
            if let Some(existing) = versions.iter().find(|v| v.version == version) {
                return Err(CatalogError::InvalidConfig(format!(
                    "version folders '{}' and '{}' in {} name the same version",
                    existing.version,
                    entry.name,
                    dir.display()
                )));
            }
            let files = ctx.fs.list_dir(&entry.path)?;
            let index = versions.len();
            let dated: Vec<_> = files
                .iter()
                .filter(|f| !f.is_dir)
                .filter_map(|f| dated_file_stem(&f.name).map(|date| (index, date, f.path.clone())))
                .collect();
            if !dated.is_empty() {
                planned.extend(dated);
            } else if let Some(single) = files.iter().find(|f| !f.is_dir && f.name == VERSION_SCHEMA_FILE) {
                let date = version.as_date().unwrap_or_else(DateOnly::today);
                planned.push((index, date, single.path.clone()));
            } else {
                debug!(version = %version, "version folder has no schema files");
                continue;
            }
            versions.push(VersionSnapshots { version, snapshots: Vec::new() });
        }
        if planned.is_empty() {
            return Ok(None);
        }

        let paths: Vec<PathBuf> = planned.iter().map(|(_, _, path)| path.clone()).collect();
        let definitions = read_all_sdl(ctx, &paths)?;
        for ((index, date, _), definition) in planned.into_iter().zip(definitions) {
            if let Some(definition) = definition {
                versions[index].snapshots.push(Snapshot::new(date, definition));
            }
        }
        versioned_catalog(versions)
    }
}
