//! Node merge policies
//!
//! A [`MergePolicyTable`] says, per metadata type and per child-node name,
//! whether incoming entries replace or merge with the existing ones.
//! Policies are stored raw and validated on use, so a bad table surfaces
//! as a configuration error at the node that needs it.

use crate::error::RegistryError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

const DEFAULT_POLICIES: &str = include_str!("default_merge_policies.json");

/// Raw policy for one node category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergePolicy {
    /// `replace` or `merge`
    pub strategy: String,
    /// Field matching entries across documents (required for `merge`)
    #[serde(default)]
    pub mapping_key: Option<String>,
}

/// Validated node merge strategy
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeMergeStrategy {
    /// Incoming entries replace the existing category wholesale
    Replace,

    /// Existing entries survive unless an incoming entry shares their key
    Merge {
        /// Field compared between entries and used for ordering
        mapping_key: String,
    },
}

impl MergePolicy {
    /// Replace policy
    #[must_use]
    pub fn replace() -> Self {
        Self {
            strategy: "replace".to_string(),
            mapping_key: None,
        }
    }

    /// Merge policy keyed on `mapping_key`
    #[must_use]
    pub fn merge(mapping_key: impl Into<String>) -> Self {
        Self {
            strategy: "merge".to_string(),
            mapping_key: Some(mapping_key.into()),
        }
    }

    /// Validate into a [`NodeMergeStrategy`]
    ///
    /// # Errors
    /// Returns `RegistryError::InvalidMergePolicy` for an unknown strategy or
    /// a `merge` policy without a mapping key
    pub fn resolve(&self, type_name: &str, node: &str) -> Result<NodeMergeStrategy, RegistryError> {
        match self.strategy.as_str() {
            "replace" => Ok(NodeMergeStrategy::Replace),
            "merge" => match self.mapping_key.as_deref() {
                Some(key) if !key.is_empty() => Ok(NodeMergeStrategy::Merge {
                    mapping_key: key.to_string(),
                }),
                _ => Err(RegistryError::invalid_merge_policy(
                    type_name,
                    node,
                    "merge strategy requires a mappingKey",
                )),
            },
            other => Err(RegistryError::invalid_merge_policy(
                type_name,
                node,
                format!("unknown strategy '{other}'"),
            )),
        }
    }
}

/// Merge policies per type name, then per node name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MergePolicyTable {
    types: HashMap<String, BTreeMap<String, MergePolicy>>,
}

impl MergePolicyTable {
    /// Create empty table
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create table with the built-in policies
    ///
    /// # Errors
    /// Only if the embedded policies are malformed
    pub fn with_defaults() -> Result<Self, RegistryError> {
        Self::from_json(DEFAULT_POLICIES)
    }

    /// Load table from `{ "<Type>": { "<node>": { "strategy": ..., "mappingKey": ... } } }`
    ///
    /// # Errors
    /// Returns `RegistryError::InvalidJson` on decode failure
    pub fn from_json(json: &str) -> Result<Self, RegistryError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Set the policy for one node of one type
    pub fn insert(&mut self, type_name: impl Into<String>, node: impl Into<String>, policy: MergePolicy) {
        self.types
            .entry(type_name.into())
            .or_default()
            .insert(node.into(), policy);
    }

    /// All node policies for a type
    #[must_use]
    pub fn policies_for(&self, type_name: &str) -> Option<&BTreeMap<String, MergePolicy>> {
        self.types.get(type_name)
    }

    /// Check if the table configures a type
    #[inline]
    #[must_use]
    pub fn contains_type(&self, type_name: &str) -> bool {
        self.types.contains_key(type_name)
    }
}
