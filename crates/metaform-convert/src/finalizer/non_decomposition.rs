//! Children merged into whichever project file already owns them
//!
//! Types handled here keep their children as repeated elements in a shared
//! file, and a project may hold several such files. Ownership is decided by
//! content: an incoming child goes back to the file that already declares its
//! unique key, and unclaimed children go to a default file derived from the
//! type's conventions.

use super::{Finalizer, TransactionFinalizer};
use crate::config::ConvertConfig;
use crate::error::{ConvertError, ConvertResult};
use crate::write::{WriteInfo, WriterFormat};
use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use indexmap::{IndexMap, IndexSet};
use metaform_component::{normalize_path, ComponentLocator, MetadataComponent, META_XML_SUFFIX};
use metaform_document::{wrap_with_ns, JsonMap, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Incoming children plus a representative component of their type
#[derive(Debug, Clone, Default)]
pub struct NonDecompositionState {
    /// Any incoming child; supplies the type, parent type and default file
    pub example_component: Option<MetadataComponent>,
    /// Child content keyed by unique id, in arrival order
    pub children_by_unique_id: IndexMap<String, Value>,
}

/// Routes children to their owning file or to the default file
#[derive(Debug, Default)]
pub struct NonDecompositionFinalizer {
    state: NonDecompositionState,
    config: ConvertConfig,
    locator: Option<Arc<dyn ComponentLocator>>,
}

/// Physical files and which children they hold
#[derive(Debug, Default)]
struct MergeMaps {
    children: IndexMap<PathBuf, IndexMap<String, Value>>,
    parent_of: HashMap<PathBuf, MetadataComponent>,
    owner_of: HashMap<String, PathBuf>,
}

impl NonDecompositionFinalizer {
    /// Create empty finalizer
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With conversion config
    #[inline]
    #[must_use]
    pub fn with_config(mut self, config: ConvertConfig) -> Self {
        self.config = config;
        self
    }

    /// With locator used to discover existing files
    #[inline]
    #[must_use]
    pub fn with_locator(mut self, locator: Arc<dyn ComponentLocator>) -> Self {
        self.locator = Some(locator);
        self
    }

    /// Add an incoming child; the first one also becomes the example component
    pub fn insert_child(&mut self, component: &MetadataComponent, content: Value) {
        if self.state.example_component.is_none() {
            self.state.example_component = Some(component.clone());
        }
        let key = component.full_name().to_string();
        if self.state.children_by_unique_id.insert(key, content).is_some() {
            tracing::warn!(full_name = component.full_name(), "duplicate incoming child replaced");
        }
    }

    /// Existing components of `owner_type` across the project's packages
    ///
    /// Only scanned when the output directory is itself a package directory;
    /// `default_directory` must already be normalized.
    async fn discover(
        &self,
        default_directory: Option<&Path>,
        owner: &MetadataComponent,
    ) -> ConvertResult<Vec<MetadataComponent>> {
        let (Some(locator), Some(default_directory)) = (&self.locator, default_directory) else {
            return Ok(Vec::new());
        };
        let packages = locator.package_directories();
        if !packages.iter().any(|pkg| normalize_path(pkg) == default_directory) {
            tracing::debug!(
                output = %default_directory.display(),
                "output directory is not a package directory, skipping scan"
            );
            return Ok(Vec::new());
        }
        Ok(locator.components_of_type(&packages, owner.type_()).await?)
    }

    async fn build_merge_maps(&self, existing: Vec<MetadataComponent>, group: &str) -> ConvertResult<MergeMaps> {
        let parsed: Vec<(MetadataComponent, Vec<(MetadataComponent, Value)>)> = stream::iter(existing)
            .map(|component| async move {
                let children = component.parse_children().await?;
                Ok::<_, ConvertError>((component, children))
            })
            .buffered(self.config.read_concurrency())
            .try_collect()
            .await?;

        let mut maps = MergeMaps::default();
        for (component, children) in parsed {
            let file = component.xml_path().to_path_buf();
            let entries = maps.children.entry(file.clone()).or_default();
            for (child, content) in children {
                if child.type_().group_name() != group {
                    continue;
                }
                let key = child.full_name().to_string();
                match maps.owner_of.get(&key) {
                    Some(owner) => tracing::warn!(
                        full_name = key.as_str(),
                        owner = %owner.display(),
                        also_in = %file.display(),
                        "child declared in more than one file"
                    ),
                    None => {
                        maps.owner_of.insert(key.clone(), file.clone());
                    }
                }
                entries.insert(key, content);
            }
            maps.parent_of.insert(file, component);
        }
        Ok(maps)
    }
}

/// Default file for the example's owning type, relative to the output root
fn default_output(owner: &MetadataComponent) -> PathBuf {
    let ty = owner.type_();
    let base = owner.full_name().split('.').next().unwrap_or_default();
    PathBuf::from(&ty.directory_name).join(format!("{base}.{}{META_XML_SUFFIX}", ty.suffix_or_empty()))
}

#[async_trait]
impl Finalizer for NonDecompositionFinalizer {
    fn name(&self) -> &'static str {
        "non-decomposition"
    }

    fn pending(&self) -> usize {
        self.state.children_by_unique_id.len()
    }

    fn clear(&mut self) {
        self.reset();
    }

    async fn finalize(&self, default_directory: Option<&Path>) -> ConvertResult<Vec<WriterFormat>> {
        if self.state.children_by_unique_id.is_empty() {
            return Ok(Vec::new());
        }
        let example = self.state.example_component.as_ref().ok_or_else(|| {
            ConvertError::missing_precondition(self.name(), "no example component for incoming children")
        })?;
        let owner = example.parent().map_or(example, |p| &**p);
        let owner_type = owner.type_();
        let group = if example.parent().is_some() {
            example.type_().group_name().to_string()
        } else {
            owner_type
                .children
                .first()
                .map(|child| child.group_name().to_string())
                .ok_or_else(|| {
                    ConvertError::missing_configuration(&owner_type.name, "type declares no child types")
                })?
        };

        let default_directory = default_directory.map(normalize_path);
        let default_directory = default_directory.as_deref();
        let existing = self.discover(default_directory, owner).await?;
        let mut maps = self.build_merge_maps(existing, &group).await?;

        let relative_default = default_output(owner);
        let default_key = default_directory.map_or_else(|| relative_default.clone(), |dir| dir.join(&relative_default));
        maps.children.entry(default_key.clone()).or_default();
        maps.parent_of.entry(default_key.clone()).or_insert_with(|| {
            let base = owner.full_name().split('.').next().unwrap_or_default();
            MetadataComponent::synthetic(base, Arc::clone(owner_type), default_key.clone())
        });

        let mut dirty: IndexSet<PathBuf> = IndexSet::new();
        for (key, content) in &self.state.children_by_unique_id {
            let file = maps.owner_of.get(key).unwrap_or(&default_key).clone();
            tracing::debug!(full_name = key.as_str(), path = %file.display(), "routing child");
            maps.children.entry(file.clone()).or_default().insert(key.clone(), content.clone());
            dirty.insert(file);
        }

        let mut plan = Vec::with_capacity(dirty.len());
        for (file, children) in &maps.children {
            if !dirty.contains(file) {
                continue;
            }
            let Some(component) = maps.parent_of.get(file) else {
                continue;
            };
            let mut body = JsonMap::new();
            body.insert(group.clone(), Value::Array(children.values().cloned().collect()));

            let output = default_directory
                .and_then(|dir| file.strip_prefix(dir).ok())
                .map_or_else(|| file.clone(), Path::to_path_buf);
            plan.push(WriterFormat::new(
                component.clone(),
                vec![WriteInfo::document(
                    output,
                    wrap_with_ns(&owner_type.name, body),
                    self.config.codec(),
                )],
            ));
        }

        tracing::info!(
            type_name = %owner_type.name,
            children = self.state.children_by_unique_id.len(),
            files = plan.len(),
            "non-decomposition finalized"
        );
        Ok(plan)
    }
}

impl TransactionFinalizer for NonDecompositionFinalizer {
    type State = NonDecompositionState;

    fn state(&self) -> &Self::State {
        &self.state
    }

    fn state_mut(&mut self) -> &mut Self::State {
        &mut self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metaform_component::{PackageDirectory, ProjectConfig, ProjectLocator, VirtualTreeContainer};
    use metaform_document::json;
    use metaform_registry::Registry;

    fn label(name: &str) -> MetadataComponent {
        let registry = Registry::with_defaults().unwrap();
        let parent = Arc::new(MetadataComponent::synthetic(
            "CustomLabels",
            registry.get_type_by_name("CustomLabels").unwrap(),
            "labels/CustomLabels.labels",
        ));
        MetadataComponent::synthetic(name, registry.get_type_by_name("CustomLabel").unwrap(), "labels/CustomLabels.labels")
            .with_parent(parent)
    }

    #[tokio::test]
    async fn empty_state_is_noop() {
        let plan = NonDecompositionFinalizer::new().finalize(None).await.unwrap();
        assert!(plan.is_empty());
    }

    #[tokio::test]
    async fn children_without_example_rejected() {
        let mut finalizer = NonDecompositionFinalizer::new();
        finalizer
            .state_mut()
            .children_by_unique_id
            .insert("Foo".to_string(), json!({ "fullName": "Foo" }));

        let err = finalizer.finalize(None).await.unwrap_err();
        assert!(matches!(err, ConvertError::MissingPrecondition { .. }));
    }

    #[tokio::test]
    async fn no_locator_routes_to_default() {
        let mut finalizer = NonDecompositionFinalizer::new();
        finalizer.insert_child(&label("Foo"), json!({ "fullName": "Foo", "value": "Bar" }));

        let plan = finalizer.finalize(Some(Path::new("out"))).await.unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].write_infos[0].output, PathBuf::from("labels/CustomLabels.labels-meta.xml"));
        assert_eq!(plan[0].component.xml_path(), Path::new("out/labels/CustomLabels.labels-meta.xml"));
        assert!(!plan[0].component.is_resolved());
    }

    #[tokio::test]
    async fn export_directory_skips_scan() {
        let tree = Arc::new(VirtualTreeContainer::new().with_file(
            "proj/force-app/labels/CustomLabels.labels-meta.xml",
            "<CustomLabels><labels><fullName>Foo</fullName><value>Old</value></labels></CustomLabels>",
        ));
        let project = ProjectConfig::new(
            "proj",
            vec![PackageDirectory {
                path: PathBuf::from("force-app"),
                default: true,
            }],
        );
        let mut finalizer =
            NonDecompositionFinalizer::new().with_locator(Arc::new(ProjectLocator::new(project, tree.clone())));
        finalizer.insert_child(&label("Foo"), json!({ "fullName": "Foo", "value": "New" }));

        let plan = finalizer.finalize(Some(Path::new("export"))).await.unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].component.xml_path(), Path::new("export/labels/CustomLabels.labels-meta.xml"));
        assert_eq!(tree.total_reads(), 0);
    }
}
