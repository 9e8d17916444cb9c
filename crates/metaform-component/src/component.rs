//! Metadata components
//!
//! A [`MetadataComponent`] is one resolved instance of a [`MetadataType`].
//! Whether it is backed by a real file is fixed at construction by its
//! [`ComponentSource`]; nothing downstream probes for it at runtime.
//!
//! A child refers to its parent through a shared, immutable handle. Parents
//! never point back at their children, so the graph stays acyclic.

use crate::error::ComponentError;
use crate::tree::TreeContainer;
use metaform_document::{ensure_array, string_field, unwrap_and_omit_ns, JsonMap, Value, XmlCodec};
use metaform_registry::MetadataType;
use std::fmt::{self, Display, Formatter};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Identity of a component: type id plus full name
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ComponentKey {
    /// Lowercase type id
    pub type_id: String,
    /// Component full name
    pub full_name: String,
}

impl Display for ComponentKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.type_id, self.full_name)
    }
}

/// Where a component's content comes from
#[derive(Debug, Clone)]
pub enum ComponentSource {
    /// Backed by a file readable through `tree`
    Resolved {
        /// Metadata XML file
        xml: PathBuf,
        /// Companion content file, if any
        content: Option<PathBuf>,
        /// Tree the files are read from
        tree: Arc<dyn TreeContainer>,
    },

    /// Placeholder that only knows where it would be written
    Synthetic {
        /// Output location of the XML file
        xml: PathBuf,
    },
}

/// A resolved instance of a metadata type
#[derive(Debug, Clone)]
pub struct MetadataComponent {
    full_name: String,
    type_: Arc<MetadataType>,
    parent: Option<Arc<MetadataComponent>>,
    source: ComponentSource,
}

impl MetadataComponent {
    /// Create a file-backed component
    #[must_use]
    pub fn resolved(
        full_name: impl Into<String>,
        type_: Arc<MetadataType>,
        xml: impl Into<PathBuf>,
        tree: Arc<dyn TreeContainer>,
    ) -> Self {
        Self {
            full_name: full_name.into(),
            type_,
            parent: None,
            source: ComponentSource::Resolved {
                xml: xml.into(),
                content: None,
                tree,
            },
        }
    }

    /// Create a placeholder component with an output path only
    #[must_use]
    pub fn synthetic(full_name: impl Into<String>, type_: Arc<MetadataType>, xml: impl Into<PathBuf>) -> Self {
        Self {
            full_name: full_name.into(),
            type_,
            parent: None,
            source: ComponentSource::Synthetic { xml: xml.into() },
        }
    }

    /// With parent reference
    #[inline]
    #[must_use]
    pub fn with_parent(mut self, parent: Arc<MetadataComponent>) -> Self {
        self.parent = Some(parent);
        self
    }

    /// With companion content file (ignored for synthetic components)
    #[inline]
    #[must_use]
    pub fn with_content(mut self, path: impl Into<PathBuf>) -> Self {
        if let ComponentSource::Resolved { content, .. } = &mut self.source {
            *content = Some(path.into());
        }
        self
    }

    /// Full name, e.g. `Account.Name`
    #[inline]
    #[must_use]
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    /// Last `.`-separated segment of the full name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        self.full_name
            .rsplit_once('.')
            .map_or(self.full_name.as_str(), |(_, name)| name)
    }

    /// Metadata type
    #[inline]
    #[must_use]
    pub fn type_(&self) -> &Arc<MetadataType> {
        &self.type_
    }

    /// Parent component, if this is a child
    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<&Arc<MetadataComponent>> {
        self.parent.as_ref()
    }

    /// Content source
    #[inline]
    #[must_use]
    pub fn source(&self) -> &ComponentSource {
        &self.source
    }

    /// Path of the component's XML file
    #[must_use]
    pub fn xml_path(&self) -> &Path {
        match &self.source {
            ComponentSource::Resolved { xml, .. } | ComponentSource::Synthetic { xml } => xml,
        }
    }

    /// Companion content file
    #[must_use]
    pub fn content_path(&self) -> Option<&Path> {
        match &self.source {
            ComponentSource::Resolved { content, .. } => content.as_deref(),
            ComponentSource::Synthetic { .. } => None,
        }
    }

    /// Whether the component is backed by a real file
    #[inline]
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        matches!(self.source, ComponentSource::Resolved { .. })
    }

    /// Identity key
    #[must_use]
    pub fn key(&self) -> ComponentKey {
        ComponentKey {
            type_id: self.type_.id.to_lowercase(),
            full_name: self.full_name.clone(),
        }
    }

    /// Whether this child's content lives inside its parent's file
    #[must_use]
    pub fn content_in_parent(&self) -> bool {
        self.parent
            .as_ref()
            .is_some_and(|p| p.type_().holds_children_inline())
    }

    /// Parse the component's XML
    ///
    /// Synthetic components parse to an empty document. A child whose content
    /// lives in its parent's file is extracted from the parsed parent and
    /// returned wrapped in its own type name.
    ///
    /// # Errors
    /// Returns `ComponentError` if the file cannot be read or parsed
    pub async fn parse_xml(&self) -> Result<JsonMap, ComponentError> {
        if self.content_in_parent() {
            if let Some(parent) = &self.parent {
                let parent_doc = parent.read_own_xml().await?;
                let entry = extract_child(parent, &parent_doc, self).unwrap_or(Value::Object(JsonMap::new()));
                let mut doc = JsonMap::new();
                doc.insert(self.type_.name.clone(), entry);
                return Ok(doc);
            }
        }

        self.read_own_xml().await
    }

    async fn read_own_xml(&self) -> Result<JsonMap, ComponentError> {
        match &self.source {
            ComponentSource::Resolved { xml, tree, .. } => {
                let text = tree.read_file(xml).await?;
                XmlCodec::default()
                    .parse(&text)
                    .map_err(|e| ComponentError::parse_error(xml, e))
            }
            ComponentSource::Synthetic { .. } => Ok(JsonMap::new()),
        }
    }

    /// Child components of a parent that keeps children inline
    ///
    /// # Errors
    /// Returns `ComponentError` if the parent file cannot be read or parsed
    pub async fn children(&self) -> Result<Vec<MetadataComponent>, ComponentError> {
        Ok(self
            .parse_children()
            .await?
            .into_iter()
            .map(|(child, _)| child)
            .collect())
    }

    /// Child components paired with their parsed entries, from one parse of the parent
    ///
    /// Entries without a unique-id value are skipped. Children of decomposed
    /// parents live in their own files and are not discovered here.
    ///
    /// # Errors
    /// Returns `ComponentError` if the parent file cannot be read or parsed
    pub async fn parse_children(&self) -> Result<Vec<(MetadataComponent, Value)>, ComponentError> {
        if !self.type_.holds_children_inline() {
            return Ok(Vec::new());
        }

        let doc = self.parse_xml().await?;
        let inner = unwrap_and_omit_ns(&self.type_.name, &doc);
        let parent = Arc::new(self.clone());
        let mut children = Vec::new();

        for child_type in &self.type_.children {
            let Some(id_element) = child_type.unique_id_element.as_deref() else {
                continue;
            };
            let child_type = Arc::new(child_type.clone());
            for entry in ensure_array(inner.get(child_type.group_name())) {
                let Some(name) = string_field(&entry, id_element) else {
                    tracing::warn!(
                        path = %self.xml_path().display(),
                        group = child_type.group_name(),
                        "skipping child entry without {id_element}"
                    );
                    continue;
                };
                let child = Self {
                    full_name: name,
                    type_: Arc::clone(&child_type),
                    parent: Some(Arc::clone(&parent)),
                    source: self.source.clone(),
                };
                children.push((child, entry));
            }
        }
        Ok(children)
    }

    /// XML path relative to whichever package directory contains it
    ///
    /// Falls back to the full path when no package directory matches.
    #[must_use]
    pub fn package_relative_path(&self, package_dirs: &[PathBuf]) -> PathBuf {
        let xml = self.xml_path();
        package_dirs
            .iter()
            .find_map(|dir| xml.strip_prefix(dir).ok())
            .map_or_else(|| xml.to_path_buf(), Path::to_path_buf)
    }
}

/// Find `child`'s entry inside its parent's parsed document
#[must_use]
pub fn extract_child(parent: &MetadataComponent, parent_doc: &JsonMap, child: &MetadataComponent) -> Option<Value> {
    let id_element = child.type_().unique_id_element.as_deref()?;
    let inner = unwrap_and_omit_ns(&parent.type_().name, parent_doc);
    ensure_array(inner.get(child.type_().group_name()))
        .into_iter()
        .find(|entry| string_field(entry, id_element).as_deref() == Some(child.name()))
}
