//! Recomposition of children into their parent document
//!
//! Each state entry is one parent and the children to fold back into it.
//! The output document is:
//!
//! ```text
//! { <Type>: { xmlns, ...starting document, ...sorted groups } }
//! ```
//!
//! Group names are sorted, and entries within a group are sorted by their
//! unique-id value, so identical inputs always serialize identically.

use super::{Finalizer, TransactionFinalizer};
use crate::cache::XmlCache;
use crate::config::ConvertConfig;
use crate::error::{ConvertError, ConvertResult};
use crate::write::{WriteInfo, WriterFormat};
use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use indexmap::IndexMap;
use metaform_component::{extract_child, ComponentSet, MetadataComponent};
use metaform_document::{string_field, unwrap_and_omit_ns, wrap_with_ns, JsonMap, Value};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// One parent awaiting recomposition
#[derive(Debug, Clone, Default)]
pub struct RecompositionEntry {
    /// Parent component; required by the time `finalize` runs
    pub component: Option<Arc<MetadataComponent>>,
    /// Children to fold into the parent
    pub children: ComponentSet,
}

/// Parent key to entry, in arrival order
pub type RecompositionState = IndexMap<String, RecompositionEntry>;

/// Rebuilds parent documents from their children
#[derive(Debug, Default)]
pub struct RecompositionFinalizer {
    state: RecompositionState,
    config: ConvertConfig,
}

impl RecompositionFinalizer {
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

    /// Record the parent of an entry
    pub fn set_parent(&mut self, parent: Arc<MetadataComponent>) {
        let key = parent.full_name().to_string();
        self.state.entry(key).or_default().component = Some(parent);
    }

    /// Add a child under its parent's key
    ///
    /// # Errors
    /// Returns `ConvertError::MissingParent` if the child has no parent reference
    pub fn add_child(&mut self, child: MetadataComponent) -> ConvertResult<()> {
        let parent = child.parent().cloned().ok_or_else(|| {
            ConvertError::missing_parent(child.full_name(), &child.type_().name, Vec::new())
        })?;
        let entry = self.state.entry(parent.full_name().to_string()).or_default();
        entry.component.get_or_insert(parent);
        entry.children.add(child);
        Ok(())
    }

    async fn recompose(
        &self,
        key: &str,
        entry: &RecompositionEntry,
        cache: &XmlCache,
    ) -> ConvertResult<WriterFormat> {
        let parent = entry.component.as_ref().ok_or_else(|| {
            let type_name = entry
                .children
                .iter()
                .find_map(MetadataComponent::parent)
                .map_or_else(String::new, |p| p.type_().name.clone());
            ConvertError::missing_parent(
                key,
                type_name,
                entry.children.iter().map(|c| c.full_name().to_string()).collect(),
            )
        })?;
        let parent_type = parent.type_();

        if parent_type.starts_empty() && parent_type.holds_children_inline() {
            self.prime_real_parents(&entry.children, cache).await?;
        }

        let starting = if parent_type.starts_empty() {
            JsonMap::new()
        } else {
            unwrap_and_omit_ns(&parent_type.name, &*cache.get_or_load(parent).await?)
        };

        let shared = cache.clone();
        let contents: Vec<(String, String, Value)> = stream::iter(entry.children.to_vec())
            .map(move |child| {
                let cache = shared.clone();
                async move {
                    let content = child_content(&child, &cache).await?;
                    let sort_key = child
                        .type_()
                        .unique_id_element
                        .as_deref()
                        .and_then(|id| string_field(&content, id))
                        .unwrap_or_default();
                    Ok::<_, ConvertError>((child.type_().group_name().to_string(), sort_key, content))
                }
            })
            .buffered(self.config.read_concurrency())
            .try_collect()
            .await?;

        let mut groups: BTreeMap<String, Vec<(String, Value)>> = BTreeMap::new();
        for (group, sort_key, content) in contents {
            groups.entry(group).or_default().push((sort_key, content));
        }

        let mut body = starting;
        for (group, mut items) in groups {
            items.sort_by(|a, b| a.0.cmp(&b.0));
            body.insert(group, Value::Array(items.into_iter().map(|(_, v)| v).collect()));
        }

        let output = PathBuf::from(&parent_type.directory_name)
            .join(format!("{}.{}", parent.full_name(), parent_type.suffix_or_empty()));
        tracing::debug!(
            full_name = parent.full_name(),
            type_name = %parent_type.name,
            children = entry.children.len(),
            output = %output.display(),
            "recomposed parent"
        );

        Ok(WriterFormat::new(
            parent.as_ref().clone(),
            vec![WriteInfo::document(
                output,
                wrap_with_ns(&parent_type.name, body),
                self.config.codec(),
            )],
        ))
    }

    /// Load each distinct physical parent of `children` once
    ///
    /// Under a synthetic recomposition key the nominal parent may not be a
    /// real file; the children's own parents are.
    async fn prime_real_parents(&self, children: &ComponentSet, cache: &XmlCache) -> ConvertResult<()> {
        let mut parents: HashMap<PathBuf, Arc<MetadataComponent>> = HashMap::new();
        for child in children {
            if let Some(parent) = child.parent().filter(|p| p.is_resolved()) {
                parents
                    .entry(parent.xml_path().to_path_buf())
                    .or_insert_with(|| Arc::clone(parent));
            }
        }

        let shared = cache.clone();
        stream::iter(parents.into_values())
            .map(move |parent| {
                let cache = shared.clone();
                async move { cache.get_or_load(&parent).await }
            })
            .buffer_unordered(self.config.read_concurrency())
            .try_for_each(|_| async { Ok(()) })
            .await
    }
}

/// Inner content of one child, read through the cache
async fn child_content(child: &MetadataComponent, cache: &XmlCache) -> ConvertResult<Value> {
    let parent = child
        .parent()
        .ok_or_else(|| ConvertError::missing_parent(child.full_name(), &child.type_().name, Vec::new()))?;

    if child.content_in_parent() {
        let parent_doc = cache.get_or_load(parent).await?;
        return Ok(extract_child(parent, &parent_doc, child).unwrap_or_else(|| Value::Object(JsonMap::new())));
    }

    let doc = cache.get_or_load(child).await?;
    Ok(Value::Object(unwrap_and_omit_ns(&child.type_().name, &doc)))
}

#[async_trait]
impl Finalizer for RecompositionFinalizer {
    fn name(&self) -> &'static str {
        "recomposition"
    }

    fn pending(&self) -> usize {
        self.state.len()
    }

    fn clear(&mut self) {
        self.reset();
    }

    async fn finalize(&self, _default_directory: Option<&Path>) -> ConvertResult<Vec<WriterFormat>> {
        let cache = self.config.new_cache();
        let mut plan = Vec::with_capacity(self.state.len());
        for (key, entry) in &self.state {
            plan.push(self.recompose(key, entry, &cache).await?);
        }

        tracing::info!(
            parents = plan.len(),
            parsed_files = cache.load_count(),
            "recomposition finalized"
        );
        Ok(plan)
    }
}

impl TransactionFinalizer for RecompositionFinalizer {
    type State = RecompositionState;

    fn state(&self) -> &Self::State {
        &self.state
    }

    fn state_mut(&mut self) -> &mut Self::State {
        &mut self.state
    }
}
