//! Metadata type registry
//!
//! Provides [`Registry`] for looking up type declarations by id or XML name.
//! Child types are indexed alongside top-level types so components can hold
//! a shared handle to either.

use crate::error::RegistryError;
use crate::metadata_type::MetadataType;
use indexmap::IndexMap;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;

const DEFAULT_REGISTRY: &str = include_str!("default_registry.json");

#[derive(Deserialize)]
struct RegistryFile {
    types: Vec<MetadataType>,
}

/// Registry of metadata types
#[derive(Debug, Clone, Default)]
pub struct Registry {
    /// All types (top-level and children) by lowercase id
    types: IndexMap<String, Arc<MetadataType>>,

    /// Child type id -> parent type id
    parents: HashMap<String, String>,
}

impl Registry {
    /// Create empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create registry with the built-in type declarations
    ///
    /// # Errors
    /// Only if the embedded declarations are malformed
    pub fn with_defaults() -> Result<Self, RegistryError> {
        Self::from_json(DEFAULT_REGISTRY)
    }

    /// Load registry from `{ "types": [...] }` JSON
    ///
    /// # Errors
    /// - `RegistryError::InvalidJson` on decode failure
    /// - `RegistryError::DuplicateType` if two types share an id
    pub fn from_json(json: &str) -> Result<Self, RegistryError> {
        let file: RegistryFile = serde_json::from_str(json)?;
        let mut registry = Self::new();
        for ty in file.types {
            registry.register(ty)?;
        }
        Ok(registry)
    }

    /// Register a top-level type and its children
    ///
    /// # Errors
    /// Returns `RegistryError::DuplicateType` if any id is already taken
    pub fn register(&mut self, ty: MetadataType) -> Result<Arc<MetadataType>, RegistryError> {
        let parent_id = ty.id.to_lowercase();
        for child in &ty.children {
            let child_id = child.id.to_lowercase();
            if self.types.contains_key(&child_id) {
                return Err(RegistryError::DuplicateType(child_id));
            }
        }
        if self.types.contains_key(&parent_id) {
            return Err(RegistryError::DuplicateType(parent_id));
        }

        for child in &ty.children {
            let child_id = child.id.to_lowercase();
            self.parents.insert(child_id.clone(), parent_id.clone());
            self.types.insert(child_id, Arc::new(child.clone()));
        }
        let ty = Arc::new(ty);
        self.types.insert(parent_id, Arc::clone(&ty));
        Ok(ty)
    }

    /// Look up a type by id (case-insensitive)
    ///
    /// # Errors
    /// Returns `RegistryError::UnknownType` if absent
    pub fn get_type_by_id(&self, id: &str) -> Result<Arc<MetadataType>, RegistryError> {
        self.types
            .get(&id.to_lowercase())
            .cloned()
            .ok_or_else(|| RegistryError::UnknownType(id.to_string()))
    }

    /// Look up a type by its XML name
    ///
    /// # Errors
    /// Returns `RegistryError::UnknownType` if absent
    pub fn get_type_by_name(&self, name: &str) -> Result<Arc<MetadataType>, RegistryError> {
        self.types
            .values()
            .find(|t| t.name == name)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownType(name.to_string()))
    }

    /// Parent type of a child type, if the type is a child
    #[must_use]
    pub fn get_parent_type(&self, child_id: &str) -> Option<Arc<MetadataType>> {
        let parent_id = self.parents.get(&child_id.to_lowercase())?;
        self.types.get(parent_id).cloned()
    }

    /// Check if type id is registered
    #[inline]
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.types.contains_key(&id.to_lowercase())
    }

    /// Number of registered types, children included
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Check if registry is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Iterate over all types in registration order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<MetadataType>> {
        self.types.values()
    }
}
