//! Metaform Component
//!
//! Provides metadata components and the storage they are read from:
//! - [`MetadataComponent`] - resolved or synthetic instance of a type
//! - [`TreeContainer`] - async file access (filesystem or in-memory)
//! - [`ComponentLocator`] - discovery of existing components in a project
//! - [`ComponentSet`] - ordered, de-duplicated component collection

#![warn(unreachable_pub)]

pub mod component;
pub mod error;
pub mod locator;
pub mod project;
pub mod set;
pub mod tree;

pub use component::{extract_child, ComponentKey, ComponentSource, MetadataComponent};
pub use error::ComponentError;
pub use locator::{ComponentLocator, ProjectLocator, META_XML_SUFFIX};
pub use project::{normalize_path, PackageDirectory, ProjectConfig};
pub use set::{ComponentFilter, ComponentSet};
pub use tree::{FsTreeContainer, TreeContainer, VirtualTreeContainer};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
