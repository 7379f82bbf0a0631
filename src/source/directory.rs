//! Directory of dated SDL files

use tracing::debug;

use super::{dated_file_stem, read_all_sdl, InputSource, LoadContext, SourceName};
use crate::catalog::Catalog;
use crate::error::Result;
use crate::history::{unversioned_catalog, Snapshot};

/// `schema/YYYY-MM-DD.graphql` files, one snapshot per file
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectorySource;

impl InputSource for DirectorySource {
    fn name(&self) -> &str {
        SourceName::Directory.as_str()
    }

    fn is_applicable(&self, ctx: &LoadContext<'_>) -> bool {
        let dir = ctx.resolve(&ctx.config.directory);
        ctx.fs
            .list_dir(&dir)
            .map(|entries| entries.iter().any(|e| !e.is_dir && dated_file_stem(&e.name).is_some()))
            .unwrap_or(false)
    }

    fn read_if_applicable_or_throw(&self, ctx: &LoadContext<'_>) -> Result<Option<Catalog>> {
        let dir = ctx.resolve(&ctx.config.directory);
        let dated: Vec<_> = ctx
            .fs
            .list_dir(&dir)?
            .into_iter()
            .filter(|e| !e.is_dir)
            .filter_map(|e| dated_file_stem(&e.name).map(|date| (date, e.path)))
            .collect();
        if dated.is_empty() {
            return Ok(None);
        }

        let paths: Vec<_> = dated.iter().map(|(_, path)| path.clone()).collect();
        let definitions = read_all_sdl(ctx, &paths)?;
        let snapshots: Vec<Snapshot> = dated
            .into_iter()
            .zip(definitions)
            .filter_map(|((date, _), definition)| definition.map(|d| Snapshot::new(date, d)))
            .collect();
        debug!(dir = %dir.display(), snapshots = snapshots.len(), "read dated schema files");
        unversioned_catalog(snapshots)
    }
}
