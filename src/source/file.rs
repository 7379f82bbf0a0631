//! Single SDL file source

use tracing::debug;

use super::{InputSource, LoadContext, SourceName};
use crate::catalog::Catalog;
use crate::date::DateOnly;
use crate::error::Result;
use crate::history::{unversioned_catalog, Snapshot};

/// One `schema.graphql` file, loaded as a single revision dated today
#[derive(Debug, Clone, Copy, Default)]
pub struct FileSource;

impl InputSource for FileSource {
    fn name(&self) -> &str {
        SourceName::File.as_str()
    }

    fn is_applicable(&self, ctx: &LoadContext<'_>) -> bool {
        ctx.fs.exists(&ctx.resolve(&ctx.config.file))
    }

    fn read_if_applicable_or_throw(&self, ctx: &LoadContext<'_>) -> Result<Option<Catalog>> {
        let path = ctx.resolve(&ctx.config.file);
        let Some(text) = ctx.reader.get(&path)? else {
            debug!(path = %path.display(), "schema file vanished before read");
            return Ok(None);
        };
        let definition = ctx.parser.parse_sdl(&text, &path.display().to_string())?;
        unversioned_catalog(vec![Snapshot::new(DateOnly::today(), definition)])
    }
}
