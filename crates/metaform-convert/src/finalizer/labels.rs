//! Labels folded into one labels file

use super::{Finalizer, TransactionFinalizer};
use crate::config::ConvertConfig;
use crate::error::{ConvertError, ConvertResult};
use crate::write::{WriteInfo, WriterFormat};
use async_trait::async_trait;
use indexmap::IndexMap;
use metaform_component::{MetadataComponent, META_XML_SUFFIX};
use metaform_document::{wrap_with_ns, JsonMap, Value};
use metaform_registry::MetadataType;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Element grouping labels when the bound type declares no child type
const LABELS_GROUP: &str = "labels";

/// Labels seen in this transaction
#[derive(Debug, Clone, Default)]
pub struct LabelsState {
    /// Type of the aggregate labels file
    pub parent_type: Option<Arc<MetadataType>>,
    /// Label content keyed by full name
    pub labels: IndexMap<String, Value>,
}

/// Aggregates every label into a single `CustomLabels` document
#[derive(Debug, Default)]
pub struct LabelsFinalizer {
    state: LabelsState,
    config: ConvertConfig,
}

impl LabelsFinalizer {
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

    /// Add a label; its parent (if any) binds the aggregate type
    pub fn insert_label(&mut self, component: &MetadataComponent, content: Value) {
        if self.state.parent_type.is_none() {
            self.state.parent_type = component.parent().map(|p| Arc::clone(p.type_()));
        }
        self.state.labels.insert(component.full_name().to_string(), content);
    }
}

#[async_trait]
impl Finalizer for LabelsFinalizer {
    fn name(&self) -> &'static str {
        "labels"
    }

    fn pending(&self) -> usize {
        self.state.labels.len()
    }

    fn clear(&mut self) {
        self.reset();
    }

    async fn finalize(&self, default_directory: Option<&Path>) -> ConvertResult<Vec<WriterFormat>> {
        if self.state.labels.is_empty() {
            return Ok(Vec::new());
        }
        let parent_type = self
            .state
            .parent_type
            .as_ref()
            .ok_or_else(|| ConvertError::missing_precondition(self.name(), "labels have no parent type"))?;

        let mut labels: Vec<(&String, &Value)> = self.state.labels.iter().collect();
        labels.sort_by(|a, b| a.0.cmp(b.0));

        let output = PathBuf::from(&parent_type.directory_name).join(format!(
            "{}.{}{META_XML_SUFFIX}",
            parent_type.name,
            parent_type.suffix_or_empty()
        ));
        let xml = default_directory.map_or_else(|| output.clone(), |dir| dir.join(&output));
        let component = MetadataComponent::synthetic(&parent_type.name, Arc::clone(parent_type), xml);

        let group = parent_type
            .children
            .first()
            .map_or(LABELS_GROUP, MetadataType::group_name);
        let mut body = JsonMap::new();
        body.insert(
            group.to_string(),
            Value::Array(labels.into_iter().map(|(_, v)| v.clone()).collect()),
        );

        tracing::info!(labels = self.state.labels.len(), output = %output.display(), "labels finalized");
        Ok(vec![WriterFormat::new(
            component,
            vec![WriteInfo::document(
                output,
                wrap_with_ns(&parent_type.name, body),
                self.config.codec(),
            )],
        )])
    }
}

impl TransactionFinalizer for LabelsFinalizer {
    type State = LabelsState;

    fn state(&self) -> &Self::State {
        &self.state
    }

    fn state_mut(&mut self) -> &mut Self::State {
        &mut self.state
    }
}
