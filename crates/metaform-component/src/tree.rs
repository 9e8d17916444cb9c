//! Tree containers
//!
//! The [`TreeContainer`] trait is the only way components touch storage.
//! [`FsTreeContainer`] reads the real filesystem with `tokio::fs`;
//! [`VirtualTreeContainer`] keeps files in memory and counts reads, which is
//! how tests observe that a file was parsed once.

use crate::error::ComponentError;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt::Debug;
use std::path::{Path, PathBuf};

/// Read-only view over a file tree
#[async_trait]
pub trait TreeContainer: Send + Sync + Debug {
    /// Read a file as UTF-8
    async fn read_file(&self, path: &Path) -> Result<String, ComponentError>;

    /// Check if path exists (file or directory)
    async fn exists(&self, path: &Path) -> bool;

    /// Check if path is a directory
    async fn is_directory(&self, path: &Path) -> bool;

    /// Immediate entries of a directory as full paths, sorted
    async fn read_directory(&self, path: &Path) -> Result<Vec<PathBuf>, ComponentError>;
}

/// Tree backed by the local filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct FsTreeContainer;

impl FsTreeContainer {
    /// Create filesystem tree
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TreeContainer for FsTreeContainer {
    async fn read_file(&self, path: &Path) -> Result<String, ComponentError> {
        tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ComponentError::NotFound(path.to_path_buf())
            } else {
                ComponentError::io_error(path, e)
            }
        })
    }

    async fn exists(&self, path: &Path) -> bool {
        tokio::fs::try_exists(path).await.unwrap_or(false)
    }

    async fn is_directory(&self, path: &Path) -> bool {
        tokio::fs::metadata(path)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
    }

    async fn read_directory(&self, path: &Path) -> Result<Vec<PathBuf>, ComponentError> {
        let mut entries = tokio::fs::read_dir(path)
            .await
            .map_err(|e| ComponentError::io_error(path, e))?;

        let mut paths = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| ComponentError::io_error(path, e))?
        {
            paths.push(entry.path());
        }
        paths.sort();
        Ok(paths)
    }
}

/// In-memory tree
///
/// Directories are implied by file paths.
#[derive(Debug, Default)]
pub struct VirtualTreeContainer {
    files: BTreeMap<PathBuf, String>,
    reads: Mutex<HashMap<PathBuf, usize>>,
}

impl VirtualTreeContainer {
    /// Create empty tree
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With a file
    #[must_use]
    pub fn with_file(mut self, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        self.insert(path, content);
        self
    }

    /// Add or replace a file
    pub fn insert(&mut self, path: impl Into<PathBuf>, content: impl Into<String>) {
        self.files.insert(path.into(), content.into());
    }

    /// Number of times `path` has been read
    #[must_use]
    pub fn read_count(&self, path: &Path) -> usize {
        self.reads.lock().get(path).copied().unwrap_or(0)
    }

    /// Number of reads across all files
    #[must_use]
    pub fn total_reads(&self) -> usize {
        self.reads.lock().values().sum()
    }
}

#[async_trait]
impl TreeContainer for VirtualTreeContainer {
    async fn read_file(&self, path: &Path) -> Result<String, ComponentError> {
        let content = self
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| ComponentError::NotFound(path.to_path_buf()))?;
        *self.reads.lock().entry(path.to_path_buf()).or_insert(0) += 1;
        Ok(content)
    }

    async fn exists(&self, path: &Path) -> bool {
        self.files.contains_key(path) || self.is_directory(path).await
    }

    async fn is_directory(&self, path: &Path) -> bool {
        self.files
            .keys()
            .any(|file| file != path && file.starts_with(path))
    }

    async fn read_directory(&self, path: &Path) -> Result<Vec<PathBuf>, ComponentError> {
        let entries: BTreeSet<PathBuf> = self
            .files
            .keys()
            .filter_map(|file| file.strip_prefix(path).ok())
            .filter_map(|rest| rest.components().next())
            .map(|first| path.join(first))
            .collect();

        if entries.is_empty() {
            return Err(ComponentError::NotFound(path.to_path_buf()));
        }
        Ok(entries.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> VirtualTreeContainer {
        VirtualTreeContainer::new()
            .with_file("force-app/labels/CustomLabels.labels-meta.xml", "<CustomLabels/>")
            .with_file("force-app/objects/Account/Account.object-meta.xml", "<CustomObject/>")
            .with_file("force-app/objects/Account/fields/Name.field-meta.xml", "<CustomField/>")
    }

    #[tokio::test]
    async fn virtual_read_counts() {
        let tree = tree();
        let path = Path::new("force-app/labels/CustomLabels.labels-meta.xml");

        assert_eq!(tree.read_file(path).await.unwrap(), "<CustomLabels/>");
        tree.read_file(path).await.unwrap();

        assert_eq!(tree.read_count(path), 2);
        assert_eq!(tree.total_reads(), 2);
    }

    #[tokio::test]
    async fn virtual_missing_file() {
        let err = tree().read_file(Path::new("nope.xml")).await.unwrap_err();
        assert!(matches!(err, ComponentError::NotFound(_)));
    }

    #[tokio::test]
    async fn virtual_directories_are_implied() {
        let tree = tree();
        assert!(tree.is_directory(Path::new("force-app/objects")).await);
        assert!(!tree.is_directory(Path::new("force-app/labels/CustomLabels.labels-meta.xml")).await);
        assert!(tree.exists(Path::new("force-app")).await);

        let entries = tree.read_directory(Path::new("force-app")).await.unwrap();
        assert_eq!(
            entries,
            vec![PathBuf::from("force-app/labels"), PathBuf::from("force-app/objects")]
        );
    }

    #[tokio::test]
    async fn fs_tree_reads_and_lists() {
        let dir = tempfile::tempdir().unwrap();
        let labels = dir.path().join("labels");
        std::fs::create_dir_all(&labels).unwrap();
        std::fs::write(labels.join("CustomLabels.labels-meta.xml"), "<CustomLabels/>").unwrap();

        let tree = FsTreeContainer::new();
        assert!(tree.is_directory(&labels).await);
        assert_eq!(
            tree.read_directory(&labels).await.unwrap(),
            vec![labels.join("CustomLabels.labels-meta.xml")]
        );
        assert_eq!(
            tree.read_file(&labels.join("CustomLabels.labels-meta.xml")).await.unwrap(),
            "<CustomLabels/>"
        );
        assert!(matches!(
            tree.read_file(&labels.join("missing.xml")).await,
            Err(ComponentError::NotFound(_))
        ));
    }
}
