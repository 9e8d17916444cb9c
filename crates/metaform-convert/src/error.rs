//! Error types for conversion finalizers
//!
//! Every variant is fatal for the finalizer that raised it; the driver
//! abandons the whole write plan rather than committing partial output.

use metaform_component::ComponentError;
use metaform_document::DocumentError;
use metaform_registry::RegistryError;
use std::sync::Arc;

/// Result alias for conversion operations
pub type ConvertResult<T> = Result<T, ConvertError>;

/// Errors raised while finalizing a conversion
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    /// A component needs a parent reference it does not have
    #[error("{type_name} '{full_name}' has no parent component{}", list_children(.children))]
    MissingParent {
        full_name: String,
        type_name: String,
        /// Children known for the missing parent, for diagnosis
        children: Vec<String>,
    },

    /// A type lacks configuration a finalizer or transformer requires
    #[error("missing configuration for {type_name}: {message}")]
    MissingConfiguration { type_name: String, message: String },

    /// A finalizer was invoked without a required binding
    #[error("{finalizer} finalizer cannot run: {message}")]
    MissingPrecondition { finalizer: String, message: String },

    /// A merge policy exists but cannot be applied
    #[error("merge configuration error: {0}")]
    MergeConfiguration(#[source] RegistryError),

    /// Conversion settings could not be decoded
    #[error("invalid convert config: {0}")]
    InvalidConfig(#[from] serde_json::Error),

    /// Registry lookup failed
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Component could not be read
    #[error("component error: {0}")]
    Component(#[from] ComponentError),

    /// Cached load of a component's XML failed
    #[error("failed to load xml of {type_name} '{full_name}': {source}")]
    CacheLoad {
        full_name: String,
        type_name: String,
        #[source]
        source: Arc<ComponentError>,
    },

    /// Document could not be parsed or serialized
    #[error("document error: {0}")]
    Document(#[from] DocumentError),

    /// Embedded schema content could not be converted
    #[error("invalid schema for '{full_name}': {message}")]
    Schema { full_name: String, message: String },
}

fn list_children(children: &[String]) -> String {
    if children.is_empty() {
        String::new()
    } else {
        format!(" (children: {})", children.join(", "))
    }
}

impl ConvertError {
    /// Create missing-parent error for a component and the children waiting on it
    pub fn missing_parent(
        full_name: impl Into<String>,
        type_name: impl Into<String>,
        children: Vec<String>,
    ) -> Self {
        Self::MissingParent {
            full_name: full_name.into(),
            type_name: type_name.into(),
            children,
        }
    }

    /// Create missing-configuration error
    pub fn missing_configuration(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MissingConfiguration {
            type_name: type_name.into(),
            message: message.into(),
        }
    }

    /// Create missing-precondition error
    pub fn missing_precondition(finalizer: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MissingPrecondition {
            finalizer: finalizer.into(),
            message: message.into(),
        }
    }
}
