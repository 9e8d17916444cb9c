//! Node-level merge with an existing document
//!
//! Some types must be combined with what is already on disk because a
//! conversion may only carry a few of the document's sections. Each top-level
//! node category of the incoming document is merged according to the type's
//! [`MergePolicyTable`] entry:
//!
//! - `Replace`: incoming entries replace the existing category
//! - `Merge`: existing entries survive unless an incoming entry shares their
//!   mapping key; the combined list is stably sorted by that key
//!
//! Categories absent from the incoming document are kept as they are. A
//! category that became empty upstream therefore cannot be told apart from
//! one that was not touched, and is never pruned.

use crate::config::ConvertConfig;
use crate::error::{ConvertError, ConvertResult};
use crate::write::{WriteInfo, WriterFormat};
use metaform_component::{MetadataComponent, META_XML_SUFFIX};
use metaform_document::{ensure_array, string_field, unwrap_and_omit_ns, wrap_with_ns, JsonMap, Value, XML_NS_KEY};
use metaform_registry::{MergePolicyTable, NodeMergeStrategy};
use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

/// Merges incoming documents into existing ones using a policy table
#[derive(Debug, Clone)]
pub struct NodeMergeTransformer {
    policies: Arc<MergePolicyTable>,
    config: ConvertConfig,
}

impl NodeMergeTransformer {
    /// Create transformer over `policies`
    #[must_use]
    pub fn new(policies: Arc<MergePolicyTable>) -> Self {
        Self {
            policies,
            config: ConvertConfig::default(),
        }
    }

    /// With conversion config
    #[inline]
    #[must_use]
    pub fn with_config(mut self, config: ConvertConfig) -> Self {
        self.config = config;
        self
    }

    /// Merge two unwrapped documents of `type_name`
    ///
    /// Output keys are sorted. Node categories without a policy entry are
    /// replaced.
    ///
    /// # Errors
    /// - `ConvertError::MissingConfiguration` if the table has no entry for the type
    /// - `ConvertError::MergeConfiguration` if a policy is unusable
    pub fn merge(&self, type_name: &str, incoming: &JsonMap, existing: &JsonMap) -> ConvertResult<JsonMap> {
        let policies = self
            .policies
            .policies_for(type_name)
            .ok_or_else(|| ConvertError::missing_configuration(type_name, "no merge policies configured"))?;

        let mut merged: BTreeMap<String, Value> = existing
            .iter()
            .filter(|(key, _)| key.as_str() != XML_NS_KEY)
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        for (node, value) in incoming {
            if node == XML_NS_KEY {
                continue;
            }
            let strategy = match policies.get(node) {
                Some(policy) => policy
                    .resolve(type_name, node)
                    .map_err(ConvertError::MergeConfiguration)?,
                None => NodeMergeStrategy::Replace,
            };

            let result = match strategy {
                NodeMergeStrategy::Replace => value.clone(),
                NodeMergeStrategy::Merge { mapping_key } => {
                    merge_entries(&mapping_key, merged.get(node), value)
                }
            };
            tracing::trace!(type_name, node = node.as_str(), "merged node category");
            merged.insert(node.clone(), result);
        }

        Ok(merged.into_iter().collect())
    }

    /// Merge `incoming` (a wrapped document) into `component`'s file
    ///
    /// A synthetic component has nothing on disk and merges against an empty
    /// document.
    ///
    /// # Errors
    /// Returns `ConvertError` if the existing file cannot be read or the
    /// policies for the type are unusable
    pub async fn merge_with_existing(
        &self,
        component: &MetadataComponent,
        incoming: &JsonMap,
    ) -> ConvertResult<WriterFormat> {
        let ty = component.type_();
        let existing = unwrap_and_omit_ns(&ty.name, &component.parse_xml().await?);
        let incoming = unwrap_and_omit_ns(&ty.name, incoming);
        let merged = self.merge(&ty.name, &incoming, &existing)?;

        let output = PathBuf::from(&ty.directory_name).join(format!(
            "{}.{}{META_XML_SUFFIX}",
            component.full_name(),
            ty.suffix_or_empty()
        ));
        tracing::debug!(
            full_name = component.full_name(),
            type_name = %ty.name,
            output = %output.display(),
            "merged with existing document"
        );
        Ok(WriterFormat::new(
            component.clone(),
            vec![WriteInfo::document(output, wrap_with_ns(&ty.name, merged), self.config.codec())],
        ))
    }
}

/// Combine existing and incoming entries of one `Merge` category
fn merge_entries(mapping_key: &str, existing: Option<&Value>, incoming: &Value) -> Value {
    let incoming = ensure_array(Some(incoming));
    let incoming_keys: HashSet<Option<String>> = incoming
        .iter()
        .map(|entry| string_field(entry, mapping_key))
        .collect();

    let mut combined: Vec<Value> = ensure_array(existing)
        .into_iter()
        .filter(|entry| !incoming_keys.contains(&string_field(entry, mapping_key)))
        .collect();
    combined.extend(incoming);
    combined.sort_by_cached_key(|entry| string_field(entry, mapping_key).unwrap_or_default());
    Value::Array(combined)
}
