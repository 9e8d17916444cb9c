//! Metadata type declarations
//!
//! A [`MetadataType`] tells the conversion engine where a type lives on disk,
//! how its children are laid out, and which finalizer strategy applies.

use serde::{Deserialize, Serialize};

/// How a parent type stores its children on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DecompositionStrategy {
    /// One file per child, under the parent's directory
    Decomposed,

    /// Children are repeated elements inside a shared parent file
    #[default]
    NonDecomposed,
}

/// Where recomposition starts from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RecompositionStrategy {
    /// Build the parent document from the children alone
    StartEmpty,

    /// Start from the parent's existing XML and overlay the children
    #[default]
    MergeWithExisting,
}

/// Which per-component transformer (and therefore finalizer) handles the type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TransformerStrategy {
    /// Written as-is, no finalizer involvement
    #[default]
    Standard,

    /// Children split into their own files (decomposition / recomposition)
    Decomposed,

    /// Children merged into whichever project file already owns them
    NonDecomposed,

    /// Labels folded into a single synthetic labels file
    DecomposedLabels,

    /// Permission-set fragments merged field by field per owning set
    DecomposedPermissionSet,

    /// One pre-merged registration record per file
    DecomposeExternalServiceRegistration,

    /// Node-level merge against the existing on-disk document
    MergeWithExisting,
}

/// Strategy bundle declared by a type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Strategies {
    /// Child layout
    pub decomposition: DecompositionStrategy,
    /// Recomposition starting point
    pub recomposition: RecompositionStrategy,
    /// Transformer / finalizer routing
    pub transformer: TransformerStrategy,
}

/// Immutable registry entry for one metadata kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataType {
    /// Lowercase identifier, unique across the registry
    pub id: String,
    /// XML root element name, e.g. `CustomObject`
    pub name: String,
    /// Directory the type lives in; for child types, the group element name
    pub directory_name: String,
    /// File suffix without the leading dot
    #[serde(default)]
    pub suffix: Option<String>,
    /// Child element holding each entry's unique identifier
    #[serde(default)]
    pub unique_id_element: Option<String>,
    /// Conversion strategies
    #[serde(default)]
    pub strategies: Strategies,
    /// Child types, declared inline
    #[serde(default)]
    pub children: Vec<MetadataType>,
}

impl MetadataType {
    /// Create a bare type with no strategies or children
    #[must_use]
    pub fn new(name: impl Into<String>, directory_name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: name.to_lowercase(),
            name,
            directory_name: directory_name.into(),
            suffix: None,
            unique_id_element: None,
            strategies: Strategies::default(),
            children: Vec::new(),
        }
    }

    /// With file suffix
    #[inline]
    #[must_use]
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = Some(suffix.into());
        self
    }

    /// With unique-id element
    #[inline]
    #[must_use]
    pub fn with_unique_id(mut self, element: impl Into<String>) -> Self {
        self.unique_id_element = Some(element.into());
        self
    }

    /// With strategies
    #[inline]
    #[must_use]
    pub fn with_strategies(mut self, strategies: Strategies) -> Self {
        self.strategies = strategies;
        self
    }

    /// With an additional child type
    #[inline]
    #[must_use]
    pub fn with_child(mut self, child: MetadataType) -> Self {
        self.children.push(child);
        self
    }

    /// Element name grouping entries of this (child) type inside its parent
    #[inline]
    #[must_use]
    pub fn group_name(&self) -> &str {
        &self.directory_name
    }

    /// Suffix, or empty string when the type declares none
    #[inline]
    #[must_use]
    pub fn suffix_or_empty(&self) -> &str {
        self.suffix.as_deref().unwrap_or("")
    }

    /// Whether children are persisted as standalone files
    #[inline]
    #[must_use]
    pub fn is_decomposed(&self) -> bool {
        self.strategies.decomposition == DecompositionStrategy::Decomposed
    }

    /// Whether recomposition ignores the parent's existing XML
    #[inline]
    #[must_use]
    pub fn starts_empty(&self) -> bool {
        self.strategies.recomposition == RecompositionStrategy::StartEmpty
    }

    /// Whether this parent keeps its children's content inside its own file
    #[inline]
    #[must_use]
    pub fn holds_children_inline(&self) -> bool {
        !self.children.is_empty() && !self.is_decomposed()
    }

    /// Find a direct child type by id or name
    #[must_use]
    pub fn child_type(&self, id_or_name: &str) -> Option<&MetadataType> {
        self.children
            .iter()
            .find(|c| c.id.eq_ignore_ascii_case(id_or_name) || c.name == id_or_name)
    }
}
