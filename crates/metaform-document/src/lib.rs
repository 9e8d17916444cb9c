//! Metaform Document Model
//!
//! Parsed metadata documents as order-preserving JSON trees, plus the XML
//! codec that moves them to and from disk.
//!
//! # Core Concepts
//!
//! - [`JsonMap`]: An insertion-ordered object; every parsed document is one
//! - [`XmlCodec`]: `quick-xml` based parser and serializer
//! - [`ContentHash`]: Blake3 digest of serialized output
//! - [`unwrap_and_omit_ns`]: Strip the root element and its namespace declaration
//!
//! # Example
//!
//! ```rust,ignore
//! use metaform_document::{XmlCodec, unwrap_and_omit_ns};
//!
//! let codec = XmlCodec::default();
//! let doc = codec.parse(&xml)?;
//! let object = unwrap_and_omit_ns("CustomObject", &doc);
//! let xml = codec.serialize(&doc)?;
//! ```

#![warn(unreachable_pub)]

mod document;
mod error;
mod hash;
mod xml;

pub use document::{
    ensure_array, string_field, unwrap_and_omit_ns, wrap_with_ns, JsonMap, XML_NS_KEY, XML_NS_URL,
};
pub use error::DocumentError;
pub use hash::ContentHash;
pub use xml::{XmlCodec, ATTRIBUTE_PREFIX, DEFAULT_INDENT, TEXT_KEY};

/// Re-exported so downstream crates build documents with the same `Value`
pub use serde_json::{json, Value};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
