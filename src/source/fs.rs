//! Filesystem collaborator and memoized reads

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use walkdir::WalkDir;

use crate::error::Result;

/// One entry of a directory listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub path: PathBuf,
    pub is_dir: bool,
}

/// Filesystem primitives used by the built-in sources.
///
/// A missing file is `Ok(None)` from [`FileSystem::read`], never an error.
pub trait FileSystem: Send + Sync {
    fn read(&self, path: &Path) -> Result<Option<String>>;
    fn write(&self, path: &Path, content: &str) -> Result<()>;
    fn exists(&self, path: &Path) -> bool;
    /// Immediate children sorted by name; empty if `path` does not exist
    fn list_dir(&self, path: &Path) -> Result<Vec<DirEntry>>;
}

/// The real filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFileSystem;

impl FileSystem for OsFileSystem {
    fn read(&self, path: &Path) -> Result<Option<String>> {
        match fs::read_to_string(path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, path: &Path, content: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn list_dir(&self, path: &Path) -> Result<Vec<DirEntry>> {
        if !path.is_dir() {
            return Ok(Vec::new());
        }
        let mut entries = Vec::new();
        for entry in WalkDir::new(path).min_depth(1).max_depth(1).sort_by_file_name() {
            let entry = entry.map_err(|e| std::io::Error::new(ErrorKind::Other, e))?;
            entries.push(DirEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                is_dir: entry.file_type().is_dir(),
                path: entry.into_path(),
            });
        }
        Ok(entries)
    }
}

/// Memoized reader owned by whoever constructs it. Each load builds its own,
/// so no cached content outlives a load unless the caller keeps the reader.
pub struct CachedReader<'a> {
    fs: &'a dyn FileSystem,
    cache: Mutex<HashMap<PathBuf, Option<String>>>,
}

impl<'a> CachedReader<'a> {
    pub fn new(fs: &'a dyn FileSystem) -> Self {
        Self { fs, cache: Mutex::new(HashMap::new()) }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<PathBuf, Option<String>>> {
        self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Read through the cache. Absent files are cached as `None` too.
    pub fn get(&self, path: &Path) -> Result<Option<String>> {
        if let Some(hit) = self.entries().get(path) {
            return Ok(hit.clone());
        }
        // The lock is not held across the read so parallel reads proceed.
        let content = self.fs.read(path)?;
        self.entries().insert(path.to_path_buf(), content.clone());
        Ok(content)
    }

    pub fn clear(&self) {
        self.entries().clear();
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    struct CountingFs {
        reads: AtomicUsize,
    }

    impl FileSystem for CountingFs {
        fn read(&self, path: &Path) -> Result<Option<String>> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            Ok(Some(path.display().to_string()))
        }
        fn write(&self, _: &Path, _: &str) -> Result<()> {
            Ok(())
        }
        fn exists(&self, _: &Path) -> bool {
            true
        }
        fn list_dir(&self, _: &Path) -> Result<Vec<DirEntry>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_cached_reader_memoizes_until_cleared() {
        let fs = CountingFs { reads: AtomicUsize::new(0) };
        let reader = CachedReader::new(&fs);
        let path = Path::new("a.graphql");
        reader.get(path).unwrap();
        reader.get(path).unwrap();
        assert_eq!(fs.reads.load(Ordering::SeqCst), 1);
        reader.clear();
        reader.get(path).unwrap();
        assert_eq!(fs.reads.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_independent_readers() {
        let fs = CountingFs { reads: AtomicUsize::new(0) };
        let path = Path::new("a.graphql");
        CachedReader::new(&fs).get(path).unwrap();
        CachedReader::new(&fs).get(path).unwrap();
        assert_eq!(fs.reads.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_os_missing_file_is_none() {
        let dir = tempdir().unwrap();
        assert_eq!(OsFileSystem.read(&dir.path().join("nope")).unwrap(), None);
        assert!(OsFileSystem.list_dir(&dir.path().join("nope")).unwrap().is_empty());
    }

    #[test]
    fn test_os_write_creates_parents_and_lists() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("nested/b.txt");
        OsFileSystem.write(&target, "hi").unwrap();
        OsFileSystem.write(&dir.path().join("a.txt"), "first").unwrap();
        let names: Vec<String> = OsFileSystem
            .list_dir(dir.path())
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["a.txt", "nested"]);
        assert_eq!(OsFileSystem.read(&target).unwrap().as_deref(), Some("hi"));
    }
}
