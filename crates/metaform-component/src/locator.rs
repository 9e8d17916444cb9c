//! Component discovery
//!
//! [`ComponentLocator`] answers the two questions the non-decomposition
//! finalizer asks of a project: which package directories exist, and which
//! components of a type already live under them.

use crate::component::MetadataComponent;
use crate::error::ComponentError;
use crate::project::ProjectConfig;
use crate::tree::TreeContainer;
use async_trait::async_trait;
use metaform_registry::MetadataType;
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Suffix appended to metadata XML files in source format
pub const META_XML_SUFFIX: &str = "-meta.xml";

/// Discovers existing components in a project
#[async_trait]
pub trait ComponentLocator: Send + Sync + Debug {
    /// Full paths of the project's package directories
    fn package_directories(&self) -> Vec<PathBuf>;

    /// All components of `type_` under `roots`, ordered by path
    async fn components_of_type(
        &self,
        roots: &[PathBuf],
        type_: &Arc<MetadataType>,
    ) -> Result<Vec<MetadataComponent>, ComponentError>;
}

/// Locator walking a project's package directories through a tree container
#[derive(Debug, Clone)]
pub struct ProjectLocator {
    project: ProjectConfig,
    tree: Arc<dyn TreeContainer>,
}

impl ProjectLocator {
    /// Create locator over `project`, reading through `tree`
    #[must_use]
    pub fn new(project: ProjectConfig, tree: Arc<dyn TreeContainer>) -> Self {
        Self { project, tree }
    }

    /// Project configuration
    #[inline]
    #[must_use]
    pub fn project(&self) -> &ProjectConfig {
        &self.project
    }

    /// Full name of `file` if it is a `type_` component file
    ///
    /// Matches `<name>.<suffix>-meta.xml` and `<name>.<suffix>` inside a
    /// directory named after the type.
    fn match_file(file: &Path, type_: &MetadataType) -> Option<String> {
        let suffix = type_.suffix.as_deref()?;
        let dir_name = file.parent()?.file_name()?.to_str()?;
        if dir_name != type_.directory_name {
            return None;
        }

        let file_name = file.file_name()?.to_str()?;
        let stem = file_name.strip_suffix(META_XML_SUFFIX).unwrap_or(file_name);
        let full_name = stem.strip_suffix(suffix)?.strip_suffix('.')?;
        (!full_name.is_empty()).then(|| full_name.to_string())
    }
}

#[async_trait]
impl ComponentLocator for ProjectLocator {
    fn package_directories(&self) -> Vec<PathBuf> {
        self.project.package_paths()
    }

    async fn components_of_type(
        &self,
        roots: &[PathBuf],
        type_: &Arc<MetadataType>,
    ) -> Result<Vec<MetadataComponent>, ComponentError> {
        let mut found = Vec::new();
        let mut pending: Vec<PathBuf> = roots.to_vec();

        while let Some(dir) = pending.pop() {
            if !self.tree.exists(&dir).await {
                continue;
            }
            for entry in self.tree.read_directory(&dir).await? {
                if self.tree.is_directory(&entry).await {
                    pending.push(entry);
                } else if let Some(full_name) = Self::match_file(&entry, type_) {
                    found.push(MetadataComponent::resolved(
                        full_name,
                        Arc::clone(type_),
                        entry,
                        Arc::clone(&self.tree),
                    ));
                }
            }
        }

        found.sort_by(|a, b| a.xml_path().cmp(b.xml_path()));
        tracing::debug!(
            type_name = %type_.name,
            roots = roots.len(),
            found = found.len(),
            "located existing components"
        );
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::PackageDirectory;
    use crate::tree::VirtualTreeContainer;
    use metaform_registry::Registry;

    fn locator() -> ProjectLocator {
        let tree = VirtualTreeContainer::new()
            .with_file("proj/force-app/main/default/labels/CustomLabels.labels-meta.xml", "<CustomLabels/>")
            .with_file("proj/extra/labels/More.labels-meta.xml", "<CustomLabels/>")
            .with_file("proj/extra/labels/readme.md", "notes")
            .with_file("proj/force-app/main/default/objects/Account/Account.object-meta.xml", "<CustomObject/>");
        let project = ProjectConfig::new(
            "proj",
            vec![
                PackageDirectory {
                    path: PathBuf::from("force-app"),
                    default: true,
                },
                PackageDirectory {
                    path: PathBuf::from("extra"),
                    default: false,
                },
            ],
        );
        ProjectLocator::new(project, Arc::new(tree))
    }

    #[tokio::test]
    async fn finds_components_across_packages() {
        let locator = locator();
        let labels = Registry::with_defaults().unwrap().get_type_by_name("CustomLabels").unwrap();

        let found = locator
            .components_of_type(&locator.package_directories(), &labels)
            .await
            .unwrap();

        let names: Vec<_> = found.iter().map(MetadataComponent::full_name).collect();
        assert_eq!(names, vec!["More", "CustomLabels"]);
        assert!(found.iter().all(MetadataComponent::is_resolved));
    }

    #[tokio::test]
    async fn missing_roots_are_skipped() {
        let locator = locator();
        let labels = Registry::with_defaults().unwrap().get_type_by_name("CustomLabels").unwrap();

        let found = locator
            .components_of_type(&[PathBuf::from("nowhere")], &labels)
            .await
            .unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn match_file_requires_type_directory() {
        let registry = Registry::with_defaults().unwrap();
        let object = registry.get_type_by_name("CustomObject").unwrap();

        assert_eq!(
            ProjectLocator::match_file(Path::new("x/objects/Account.object-meta.xml"), &object),
            Some("Account".to_string())
        );
        assert_eq!(
            ProjectLocator::match_file(Path::new("x/objects/Account.object"), &object),
            Some("Account".to_string())
        );
        assert_eq!(
            ProjectLocator::match_file(Path::new("x/other/Account.object-meta.xml"), &object),
            None
        );
    }
}
