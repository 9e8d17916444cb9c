//! Metaform Registry
//!
//! Static configuration consumed by the conversion engine.
//!
//! # Core Concepts
//!
//! - [`MetadataType`]: Directory, suffix, grouping and unique-id conventions of a type
//! - [`Strategies`]: Decomposition, recomposition and transformer strategy of a type
//! - [`Registry`]: Lookup of types by id or XML name, children included
//! - [`MergePolicyTable`]: Per-node `replace` / `merge` policies for node-level merges
//!
//! # Example
//!
//! ```rust,ignore
//! use metaform_registry::{Registry, MergePolicyTable};
//!
//! let registry = Registry::with_defaults()?;
//! let object = registry.get_type_by_name("CustomObject")?;
//! let field = object.child_type("CustomField").unwrap();
//! assert_eq!(field.group_name(), "fields");
//! ```

#![warn(unreachable_pub)]

mod error;
mod merge_policy;
mod metadata_type;
mod registry;

pub use error::RegistryError;
pub use merge_policy::{MergePolicy, MergePolicyTable, NodeMergeStrategy};
pub use metadata_type::{
    DecompositionStrategy, MetadataType, RecompositionStrategy, Strategies, TransformerStrategy,
};
pub use registry::Registry;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
