//! Permission-set fragments merged per owning set

use super::{Finalizer, TransactionFinalizer};
use crate::config::ConvertConfig;
use crate::error::{ConvertError, ConvertResult};
use crate::write::{WriteInfo, WriterFormat};
use async_trait::async_trait;
use indexmap::IndexMap;
use metaform_component::MetadataComponent;
use metaform_document::{wrap_with_ns, JsonMap, Value, XML_NS_KEY};
use metaform_registry::MetadataType;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Fragments grouped by owning permission set
#[derive(Debug, Clone, Default)]
pub struct PermissionSetState {
    /// Permission-set type binding
    pub permission_set_type: Option<Arc<MetadataType>>,
    /// Owning set name to the fragments seen for it, in arrival order
    pub fragments: IndexMap<String, Vec<JsonMap>>,
}

/// Emits one permission set per owner, merging fragments field by field
#[derive(Debug, Default)]
pub struct PermissionSetFinalizer {
    state: PermissionSetState,
    config: ConvertConfig,
}

impl PermissionSetFinalizer {
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

    /// Bind the permission-set type
    pub fn set_type(&mut self, permission_set_type: Arc<MetadataType>) {
        self.state.permission_set_type = Some(permission_set_type);
    }

    /// Add a fragment for permission set `owner`
    pub fn add_fragment(&mut self, owner: impl Into<String>, fragment: JsonMap) {
        self.state.fragments.entry(owner.into()).or_default().push(fragment);
    }
}

/// Fold fragments into one object
///
/// The first value of a field is kept as-is. A repeated field becomes an
/// array: arrays are extended, scalars are collected.
fn merge_fragments(fragments: &[JsonMap]) -> JsonMap {
    let mut merged = JsonMap::new();
    for fragment in fragments {
        for (field, value) in fragment {
            if field == XML_NS_KEY {
                continue;
            }
            match merged.get_mut(field) {
                None => {
                    merged.insert(field.clone(), value.clone());
                }
                Some(Value::Array(existing)) => match value {
                    Value::Array(items) => existing.extend(items.iter().cloned()),
                    other => existing.push(other.clone()),
                },
                Some(existing) => {
                    let first = existing.take();
                    let mut items = vec![first];
                    match value {
                        Value::Array(more) => items.extend(more.iter().cloned()),
                        other => items.push(other.clone()),
                    }
                    *existing = Value::Array(items);
                }
            }
        }
    }
    merged
}

#[async_trait]
impl Finalizer for PermissionSetFinalizer {
    fn name(&self) -> &'static str {
        "permission-set"
    }

    fn pending(&self) -> usize {
        self.state.fragments.len()
    }

    fn clear(&mut self) {
        self.reset();
    }

    async fn finalize(&self, default_directory: Option<&Path>) -> ConvertResult<Vec<WriterFormat>> {
        if self.state.fragments.is_empty() {
            return Ok(Vec::new());
        }
        let ty = self.state.permission_set_type.as_ref().ok_or_else(|| {
            ConvertError::missing_precondition(self.name(), "fragments present but no permission set type bound")
        })?;

        let plan: Vec<WriterFormat> = self
            .state
            .fragments
            .iter()
            .map(|(owner, fragments)| {
                let output = PathBuf::from(&ty.directory_name).join(format!("{owner}.{}", ty.suffix_or_empty()));
                let xml = default_directory.map_or_else(|| output.clone(), |dir| dir.join(&output));
                tracing::debug!(
                    full_name = owner.as_str(),
                    fragments = fragments.len(),
                    "merging permission set"
                );
                WriterFormat::new(
                    MetadataComponent::synthetic(owner, Arc::clone(ty), xml),
                    vec![WriteInfo::document(
                        output,
                        wrap_with_ns(&ty.name, merge_fragments(fragments)),
                        self.config.codec(),
                    )],
                )
            })
            .collect();

        tracing::info!(permission_sets = plan.len(), "permission sets finalized");
        Ok(plan)
    }
}

impl TransactionFinalizer for PermissionSetFinalizer {
    type State = PermissionSetState;

    fn state(&self) -> &Self::State {
        &self.state
    }

    fn state_mut(&mut self) -> &mut Self::State {
        &mut self.state
    }
}
