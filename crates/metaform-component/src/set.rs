//! Component sets
//!
//! Ordered, de-duplicated collection of components keyed by
//! [`ComponentKey`], with optional discovery through a locator.

use crate::component::{ComponentKey, MetadataComponent};
use crate::error::ComponentError;
use crate::locator::ComponentLocator;
use indexmap::IndexMap;
use metaform_registry::MetadataType;
use regex::Regex;
use std::path::PathBuf;
use std::sync::Arc;

/// Selects components by type and optional full-name glob
#[derive(Debug, Clone)]
pub struct ComponentFilter {
    type_: Arc<MetadataType>,
    name_pattern: Option<Regex>,
}

impl ComponentFilter {
    /// Match every component of `type_`
    #[must_use]
    pub fn new(type_: Arc<MetadataType>) -> Self {
        Self {
            type_,
            name_pattern: None,
        }
    }

    /// Restrict full names to a glob (`*` and `?` wildcards)
    ///
    /// # Errors
    /// Returns `ComponentError::InvalidPattern` if the glob cannot be compiled
    pub fn with_glob(mut self, glob: &str) -> Result<Self, ComponentError> {
        let mut pattern = String::with_capacity(glob.len() + 2);
        pattern.push('^');
        for ch in glob.chars() {
            match ch {
                '*' => pattern.push_str(".*"),
                '?' => pattern.push('.'),
                other => pattern.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
            }
        }
        pattern.push('$');

        let regex = Regex::new(&pattern).map_err(|e| ComponentError::InvalidPattern {
            pattern: glob.to_string(),
            message: e.to_string(),
        })?;
        self.name_pattern = Some(regex);
        Ok(self)
    }

    /// Type being selected
    #[inline]
    #[must_use]
    pub fn type_(&self) -> &Arc<MetadataType> {
        &self.type_
    }

    /// Check if a component passes the filter
    #[must_use]
    pub fn matches(&self, component: &MetadataComponent) -> bool {
        component.type_().id == self.type_.id
            && self
                .name_pattern
                .as_ref()
                .map_or(true, |re| re.is_match(component.full_name()))
    }
}

/// Insertion-ordered set of components
#[derive(Debug, Clone, Default)]
pub struct ComponentSet {
    components: IndexMap<ComponentKey, MetadataComponent>,
}

impl ComponentSet {
    /// Create empty set
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a component; returns false if its key was already present
    ///
    /// A duplicate replaces the stored component but keeps its position.
    pub fn add(&mut self, component: MetadataComponent) -> bool {
        self.components.insert(component.key(), component).is_none()
    }

    /// Get component by key
    #[must_use]
    pub fn get(&self, key: &ComponentKey) -> Option<&MetadataComponent> {
        self.components.get(key)
    }

    /// Check if key is present
    #[must_use]
    pub fn contains(&self, key: &ComponentKey) -> bool {
        self.components.contains_key(key)
    }

    /// Number of components
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Check if empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Iterate in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &MetadataComponent> {
        self.components.values()
    }

    /// Components in insertion order
    #[must_use]
    pub fn to_vec(&self) -> Vec<MetadataComponent> {
        self.components.values().cloned().collect()
    }

    /// Discover components under `roots` that pass `filter`
    ///
    /// # Errors
    /// Returns `ComponentError` if the locator fails to walk a root
    pub async fn from_locator(
        locator: &dyn ComponentLocator,
        roots: &[PathBuf],
        filter: &ComponentFilter,
    ) -> Result<Self, ComponentError> {
        let mut set = Self::new();
        for component in locator.components_of_type(roots, filter.type_()).await? {
            if filter.matches(&component) {
                set.add(component);
            }
        }
        Ok(set)
    }
}

impl FromIterator<MetadataComponent> for ComponentSet {
    fn from_iter<I: IntoIterator<Item = MetadataComponent>>(iter: I) -> Self {
        let mut set = Self::new();
        for component in iter {
            set.add(component);
        }
        set
    }
}

impl<'a> IntoIterator for &'a ComponentSet {
    type Item = &'a MetadataComponent;
    type IntoIter = indexmap::map::Values<'a, ComponentKey, MetadataComponent>;

    fn into_iter(self) -> Self::IntoIter {
        self.components.values()
    }
}
