//! Write plan
//!
//! Finalizers never touch the filesystem. They return [`WriterFormat`]
//! entries: a target component plus the files to produce for it. Document
//! sources stay as trees until [`WriteInfo::render`] is called, so an external
//! writer decides when serialization happens.

use crate::error::ConvertResult;
use metaform_component::MetadataComponent;
use metaform_document::{ContentHash, JsonMap, XmlCodec};
use std::path::{Path, PathBuf};

/// Content of one output file
#[derive(Debug, Clone, PartialEq)]
pub enum WriteSource {
    /// Document tree, serialized on demand
    Document {
        /// Wrapped document (`{ Root: { ... } }`)
        document: JsonMap,
        /// Codec used to serialize it
        codec: XmlCodec,
    },

    /// Ready-made text (e.g. an extracted schema file)
    Text(String),
}

/// One file to write
#[derive(Debug, Clone, PartialEq)]
pub struct WriteInfo {
    /// Output path, relative to the conversion's output directory unless absolute
    pub output: PathBuf,
    /// What to write there
    pub source: WriteSource,
}

impl WriteInfo {
    /// Document write info
    #[must_use]
    pub fn document(output: impl Into<PathBuf>, document: JsonMap, codec: XmlCodec) -> Self {
        Self {
            output: output.into(),
            source: WriteSource::Document { document, codec },
        }
    }

    /// Plain-text write info
    #[must_use]
    pub fn text(output: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            source: WriteSource::Text(text.into()),
        }
    }

    /// Output path
    #[inline]
    #[must_use]
    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Document tree, if this is a document source
    #[must_use]
    pub fn document_tree(&self) -> Option<&JsonMap> {
        match &self.source {
            WriteSource::Document { document, .. } => Some(document),
            WriteSource::Text(_) => None,
        }
    }

    /// Serialize the content
    ///
    /// # Errors
    /// Returns `ConvertError::Document` if the document cannot be serialized
    pub fn render(&self) -> ConvertResult<String> {
        match &self.source {
            WriteSource::Document { document, codec } => Ok(codec.serialize(document)?),
            WriteSource::Text(text) => Ok(text.clone()),
        }
    }

    /// Hash of the rendered content
    ///
    /// # Errors
    /// Returns `ConvertError::Document` if the document cannot be serialized
    pub fn content_hash(&self) -> ConvertResult<ContentHash> {
        Ok(ContentHash::compute(self.render()?.as_bytes()))
    }
}

/// Write-plan entry: a component and the files it produces
#[derive(Debug, Clone)]
pub struct WriterFormat {
    /// Component the files belong to
    pub component: MetadataComponent,
    /// Files to write
    pub write_infos: Vec<WriteInfo>,
}

impl WriterFormat {
    /// Create entry for `component`
    #[must_use]
    pub fn new(component: MetadataComponent, write_infos: Vec<WriteInfo>) -> Self {
        Self {
            component,
            write_infos,
        }
    }

    /// Output paths of all files, in order
    #[must_use]
    pub fn outputs(&self) -> Vec<&Path> {
        self.write_infos.iter().map(WriteInfo::output).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metaform_document::{json, wrap_with_ns};

    fn labels_doc() -> JsonMap {
        let inner = json!({ "labels": { "fullName": "Foo", "value": "Bar" } });
        let serde_json::Value::Object(inner) = inner else {
            unreachable!()
        };
        wrap_with_ns("CustomLabels", inner)
    }

    #[test]
    fn render_document() {
        let info = WriteInfo::document("labels/CustomLabels.labels-meta.xml", labels_doc(), XmlCodec::default());
        let xml = info.render().unwrap();

        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains("<fullName>Foo</fullName>"));
        assert!(info.document_tree().is_some());
    }

    #[test]
    fn render_text() {
        let info = WriteInfo::text("schema.yaml", "openapi: 3.0.0\n");
        assert_eq!(info.render().unwrap(), "openapi: 3.0.0\n");
        assert!(info.document_tree().is_none());
    }

    #[test]
    fn hash_is_stable() {
        let a = WriteInfo::document("a.xml", labels_doc(), XmlCodec::default());
        let b = WriteInfo::document("b.xml", labels_doc(), XmlCodec::default());
        assert_eq!(a.content_hash().unwrap(), b.content_hash().unwrap());

        let narrow = WriteInfo::document("a.xml", labels_doc(), XmlCodec::new(2));
        assert_ne!(a.content_hash().unwrap(), narrow.content_hash().unwrap());
    }
}
