//! Project package directories
//!
//! Read from an `sfdx-project.json`-shaped file:
//!
//! ```json
//! { "packageDirectories": [{ "path": "force-app", "default": true }] }
//! ```

use crate::error::ComponentError;
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

/// One package directory entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageDirectory {
    /// Path relative to the project root
    pub path: PathBuf,
    /// Whether this is the default package
    #[serde(default)]
    pub default: bool,
}

/// Project layout: a root and its package directories
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectConfig {
    /// Directory containing the project file
    #[serde(skip)]
    pub root: PathBuf,
    /// Declared package directories
    pub package_directories: Vec<PackageDirectory>,
}

impl ProjectConfig {
    /// Create config from a root and package directories
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, package_directories: Vec<PackageDirectory>) -> Self {
        Self {
            root: root.into(),
            package_directories,
        }
    }

    /// Parse config JSON for a project rooted at `root`
    ///
    /// # Errors
    /// Returns `ComponentError::InvalidProject` on malformed JSON or an empty
    /// package list
    pub fn from_json(root: impl Into<PathBuf>, json: &str) -> Result<Self, ComponentError> {
        let root = root.into();
        let mut config: Self = serde_json::from_str(json).map_err(|e| ComponentError::InvalidProject {
            path: root.clone(),
            message: e.to_string(),
        })?;
        if config.package_directories.is_empty() {
            return Err(ComponentError::InvalidProject {
                path: root,
                message: "packageDirectories is empty".to_string(),
            });
        }
        config.root = root;
        Ok(config)
    }

    /// Load config from a project file; the root is the file's directory
    ///
    /// # Errors
    /// - `ComponentError::Io` if the file cannot be read
    /// - `ComponentError::InvalidProject` if it cannot be decoded
    pub async fn load(project_file: &Path) -> Result<Self, ComponentError> {
        let json = tokio::fs::read_to_string(project_file)
            .await
            .map_err(|e| ComponentError::io_error(project_file, e))?;
        let root = project_file.parent().unwrap_or_else(|| Path::new("")).to_path_buf();
        let config = Self::from_json(root, &json)?;
        tracing::debug!(
            project = %project_file.display(),
            packages = config.package_directories.len(),
            "loaded project config"
        );
        Ok(config)
    }

    /// Full paths of all package directories
    #[must_use]
    pub fn package_paths(&self) -> Vec<PathBuf> {
        self.package_directories
            .iter()
            .map(|pkg| normalize_path(&self.root.join(&pkg.path)))
            .collect()
    }

    /// Full path of the default package (first entry when none is marked)
    #[must_use]
    pub fn default_package(&self) -> Option<PathBuf> {
        self.package_directories
            .iter()
            .find(|pkg| pkg.default)
            .or_else(|| self.package_directories.first())
            .map(|pkg| normalize_path(&self.root.join(&pkg.path)))
    }
}

/// Lexically normalize `path`: drop `.` segments and trailing separators,
/// fold `name/..` pairs
///
/// Does not touch the filesystem, so symlinks are not resolved.
#[must_use]
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match normalized.components().next_back() {
                Some(Component::Normal(_)) => {
                    normalized.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => normalized.push(".."),
            },
            other => normalized.push(other.as_os_str()),
        }
    }
    if normalized.as_os_str().is_empty() {
        normalized.push(".");
    }
    normalized
}
