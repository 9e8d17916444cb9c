//! Conversion settings

use crate::cache::XmlCache;
use crate::error::ConvertResult;
use metaform_document::{XmlCodec, DEFAULT_INDENT};
use serde::{Deserialize, Serialize};

/// Settings shared by every finalizer in a conversion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConvertConfig {
    /// Maximum parsed documents held by the per-finalize XML cache
    ///
    /// `None` (the default) keeps every document for the whole pass. With a
    /// bound, a document evicted before its last use is parsed again.
    pub cache_capacity: Option<u64>,
    /// Maximum component files parsed concurrently
    pub max_concurrent_reads: usize,
    /// Indent width of serialized XML
    pub xml_indent: usize,
}

impl ConvertConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode from JSON; missing fields take their defaults
    ///
    /// # Errors
    /// Returns `ConvertError::InvalidConfig` on malformed JSON
    pub fn from_json(json: &str) -> ConvertResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// With a bounded cache; see [`Self::cache_capacity`]
    #[inline]
    #[must_use]
    pub fn with_cache_capacity(mut self, capacity: u64) -> Self {
        self.cache_capacity = Some(capacity);
        self
    }

    /// Fresh XML cache for one finalize pass
    #[must_use]
    pub(crate) fn new_cache(&self) -> XmlCache {
        self.cache_capacity.map_or_else(XmlCache::unbounded, XmlCache::new)
    }

    /// With concurrent read limit (at least 1)
    #[inline]
    #[must_use]
    pub fn with_max_concurrent_reads(mut self, max: usize) -> Self {
        self.max_concurrent_reads = max.max(1);
        self
    }

    /// With XML indent width
    #[inline]
    #[must_use]
    pub fn with_xml_indent(mut self, indent: usize) -> Self {
        self.xml_indent = indent;
        self
    }

    /// Codec configured for output documents
    #[inline]
    #[must_use]
    pub fn codec(&self) -> XmlCodec {
        XmlCodec::new(self.xml_indent)
    }

    /// Concurrent read limit, never zero
    #[inline]
    #[must_use]
    pub(crate) fn read_concurrency(&self) -> usize {
        self.max_concurrent_reads.max(1)
    }
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            cache_capacity: None,
            max_concurrent_reads: 16,
            xml_indent: DEFAULT_INDENT,
        }
    }
}
