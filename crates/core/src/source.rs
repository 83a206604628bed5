//! Source provider abstraction for filesystem-independent compilation.
//!
//! The [`SourceProvider`] trait abstracts manifest I/O so the front-end can
//! work without `std::fs`; [`InMemoryProvider`] backs the test suites.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Trait that abstracts manifest file access for the compilation pipeline.
pub trait SourceProvider {
    /// Read the source text for a given manifest path.
    fn read_source(&self, path: &Path) -> Result<String, std::io::Error>;

    /// Resolve a relative manifest reference against a base directory.
    fn resolve_import(&self, from: &Path, target: &str) -> Result<PathBuf, std::io::Error>;

    /// Canonicalize a path for identity comparisons.
    fn canonicalize(&self, path: &Path) -> Result<PathBuf, std::io::Error>;
}

/// Default filesystem-backed source provider.
pub struct FileSystemProvider;

impl SourceProvider for FileSystemProvider {
    fn read_source(&self, path: &Path) -> Result<String, std::io::Error> {
        std::fs::read_to_string(path)
    }

    fn resolve_import(&self, from: &Path, target: &str) -> Result<PathBuf, std::io::Error> {
        Ok(from.join(target))
    }

    fn canonicalize(&self, path: &Path) -> Result<PathBuf, std::io::Error> {
        path.canonicalize()
    }
}

/// In-memory source provider for testing without filesystem access.
///
/// Maps paths to manifest text. Lookup normalizes `.` and `..` components
/// without touching the filesystem.
pub struct InMemoryProvider {
    files: HashMap<PathBuf, String>,
}

impl InMemoryProvider {
    /// Create a new in-memory provider from a map of paths to manifest text.
    pub fn new(files: HashMap<PathBuf, String>) -> Self {
        Self { files }
    }

    /// Create a provider holding a single manifest.
    pub fn single(path: impl Into<PathBuf>, source: impl Into<String>) -> Self {
        let mut files = HashMap::new();
        files.insert(path.into(), source.into());
        Self { files }
    }

    fn normalize_path(path: &Path) -> PathBuf {
        let mut components = Vec::new();
        for component in path.components() {
            match component {
                std::path::Component::CurDir => {}
                std::path::Component::ParentDir => {
                    if !components.is_empty() {
                        components.pop();
                    }
                }
                other => components.push(other),
            }
        }
        components.iter().collect()
    }
}

impl SourceProvider for InMemoryProvider {
    fn read_source(&self, path: &Path) -> Result<String, std::io::Error> {
        let normalized = Self::normalize_path(path);
        self.files.get(&normalized).cloned().ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("manifest not found in memory: {}", normalized.display()),
            )
        })
    }

    fn resolve_import(&self, from: &Path, target: &str) -> Result<PathBuf, std::io::Error> {
        Ok(Self::normalize_path(&from.join(target)))
    }

    fn canonicalize(&self, path: &Path) -> Result<PathBuf, std::io::Error> {
        let normalized = Self::normalize_path(path);
        if self.files.contains_key(&normalized) {
            return Ok(normalized);
        }
        // A directory exists if any stored manifest lives under it
        if self.files.keys().any(|k| k.starts_with(&normalized)) {
            return Ok(normalized);
        }
        Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("path not found in memory: {}", normalized.display()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_path_resolves_dot_and_dotdot() {
        let p = Path::new("/a/b/../c/./d");
        let normalized = InMemoryProvider::normalize_path(p);
        assert_eq!(normalized, PathBuf::from("/a/c/d"));
    }

    #[test]
    fn in_memory_read_source_found() {
        let provider = InMemoryProvider::single("/site.cn", "notice 'hello'");
        let content = provider.read_source(Path::new("/site.cn")).unwrap();
        assert_eq!(content, "notice 'hello'");
    }

    #[test]
    fn in_memory_read_source_not_found() {
        let provider = InMemoryProvider::new(HashMap::new());
        let err = provider.read_source(Path::new("/missing.cn")).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
    }

    #[test]
    fn in_memory_resolve_import_normalizes() {
        let provider = InMemoryProvider::single("/env/sub.cn", "notice 'sub'");
        let resolved = provider
            .resolve_import(Path::new("/env/other/.."), "sub.cn")
            .unwrap();
        assert_eq!(resolved, PathBuf::from("/env/sub.cn"));
        assert!(provider.read_source(&resolved).is_ok());
    }

    #[test]
    fn in_memory_canonicalize_existing_file() {
        let provider = InMemoryProvider::single("/a/b/site.cn", "notice 'x'");
        let canonical = provider
            .canonicalize(Path::new("/a/b/../b/site.cn"))
            .unwrap();
        assert_eq!(canonical, PathBuf::from("/a/b/site.cn"));
    }

    #[test]
    fn in_memory_canonicalize_directory_prefix() {
        let provider = InMemoryProvider::single("/env/site.cn", "notice 'x'");
        let canonical = provider.canonicalize(Path::new("/env")).unwrap();
        assert_eq!(canonical, PathBuf::from("/env"));
    }

    #[test]
    fn in_memory_canonicalize_missing_returns_error() {
        let provider = InMemoryProvider::new(HashMap::new());
        let err = provider.canonicalize(Path::new("/nonexistent")).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
    }
}
