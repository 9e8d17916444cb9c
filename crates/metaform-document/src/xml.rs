//! XML codec
//!
//! Maps metadata XML onto [`JsonMap`] trees and back:
//!
//! - element children become object keys, in document order
//! - repeated siblings collapse into an array, a lone sibling stays a bare value
//! - attributes become `@_<name>` keys, mixed text becomes `#text`
//! - leaf text is always kept as a string so documents round-trip unchanged

use crate::document::JsonMap;
use crate::error::DocumentError;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use serde_json::Value;

/// Key prefix for XML attributes
pub const ATTRIBUTE_PREFIX: &str = "@_";

/// Key for text content of an element that also has attributes or children
pub const TEXT_KEY: &str = "#text";

/// Default indentation width of serialized documents
pub const DEFAULT_INDENT: usize = 4;

/// XML parser and serializer for metadata documents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XmlCodec {
    indent: usize,
}

impl Default for XmlCodec {
    fn default() -> Self {
        Self::new(DEFAULT_INDENT)
    }
}

/// Element being built while its end tag has not been seen yet
struct OpenElement {
    name: String,
    fields: JsonMap,
    text: String,
}

impl OpenElement {
    fn document() -> Self {
        Self {
            name: String::new(),
            fields: JsonMap::new(),
            text: String::new(),
        }
    }

    fn open(start: &BytesStart<'_>) -> Result<Self, DocumentError> {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let mut fields = JsonMap::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| DocumentError::malformed(0, e.to_string()))?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr
                .unescape_value()
                .map_err(|e| DocumentError::malformed(0, e.to_string()))?
                .into_owned();
            fields.insert(format!("{ATTRIBUTE_PREFIX}{key}"), Value::String(value));
        }
        Ok(Self {
            name,
            fields,
            text: String::new(),
        })
    }

    fn close(self) -> (String, Value) {
        if self.fields.is_empty() {
            return (self.name, Value::String(self.text));
        }
        let mut fields = self.fields;
        if !self.text.is_empty() {
            fields.insert(TEXT_KEY.to_string(), Value::String(self.text));
        }
        (self.name, Value::Object(fields))
    }

    fn append(&mut self, name: String, value: Value) {
        match self.fields.get_mut(&name) {
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                self.fields.insert(name, value);
            }
        }
    }
}

impl XmlCodec {
    /// Create codec with the given indentation width
    #[inline]
    #[must_use]
    pub const fn new(indent: usize) -> Self {
        Self { indent }
    }

    /// Indentation width used when serializing
    #[inline]
    #[must_use]
    pub const fn indent(&self) -> usize {
        self.indent
    }

    /// Parse an XML document
    ///
    /// # Errors
    /// - `DocumentError::Malformed` if the input is not well-formed
    /// - `DocumentError::Unbalanced` if elements are left open
    pub fn parse(&self, input: &str) -> Result<JsonMap, DocumentError> {
        let mut reader = Reader::from_str(input);
        reader.config_mut().trim_text(true);

        let mut stack = vec![OpenElement::document()];

        loop {
            match reader.read_event() {
                Ok(Event::Start(start)) => stack.push(OpenElement::open(&start)?),
                Ok(Event::Empty(start)) => {
                    let (name, value) = OpenElement::open(&start)?.close();
                    current(&mut stack)?.append(name, value);
                }
                Ok(Event::Text(text)) => {
                    let text = text
                        .unescape()
                        .map_err(|e| DocumentError::malformed(reader.error_position() as u64, e.to_string()))?;
                    current(&mut stack)?.text.push_str(&text);
                }
                Ok(Event::CData(data)) => {
                    let text = String::from_utf8(data.into_inner().into_owned())?;
                    current(&mut stack)?.text.push_str(&text);
                }
                Ok(Event::End(_)) => {
                    if stack.len() < 2 {
                        return Err(DocumentError::Unbalanced("unexpected closing tag".to_string()));
                    }
                    if let Some(element) = stack.pop() {
                        let (name, value) = element.close();
                        current(&mut stack)?.append(name, value);
                    }
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => {
                    return Err(DocumentError::malformed(
                        reader.error_position() as u64,
                        e.to_string(),
                    ));
                }
            }
        }

        if stack.len() != 1 {
            let open = stack.last().map(|e| e.name.clone()).unwrap_or_default();
            return Err(DocumentError::Unbalanced(format!("element '{open}' is never closed")));
        }
        Ok(stack.pop().map(|doc| doc.fields).unwrap_or_default())
    }

    /// Serialize a document, XML declaration first and a trailing newline
    ///
    /// # Errors
    /// Returns `DocumentError::Serialize` if the writer fails
    pub fn serialize(&self, document: &JsonMap) -> Result<String, DocumentError> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', self.indent);
        emit(&mut writer, Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

        for (name, value) in document {
            write_value(&mut writer, name, value)?;
        }

        let mut xml = String::from_utf8(writer.into_inner())?;
        xml.push('\n');
        Ok(xml)
    }
}

fn current(stack: &mut [OpenElement]) -> Result<&mut OpenElement, DocumentError> {
    stack
        .last_mut()
        .ok_or_else(|| DocumentError::Unbalanced("no open element".to_string()))
}

fn emit(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<(), DocumentError> {
    writer
        .write_event(event)
        .map_err(|e| DocumentError::serialize(e.to_string()))
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn write_value(writer: &mut Writer<Vec<u8>>, name: &str, value: &Value) -> Result<(), DocumentError> {
    match value {
        Value::Array(items) => {
            for item in items {
                write_value(writer, name, item)?;
            }
        }
        Value::Object(fields) => {
            let mut start = BytesStart::new(name);
            for (key, field) in fields {
                if let Some(attr) = key.strip_prefix(ATTRIBUTE_PREFIX) {
                    start.push_attribute((attr, scalar_text(field).as_str()));
                }
            }

            let children: Vec<_> = fields
                .iter()
                .filter(|(key, _)| !key.starts_with(ATTRIBUTE_PREFIX))
                .collect();
            if children.is_empty() {
                return emit(writer, Event::Empty(start));
            }

            emit(writer, Event::Start(start))?;
            for (key, child) in children {
                if key == TEXT_KEY {
                    emit(writer, Event::Text(BytesText::new(&scalar_text(child))))?;
                } else {
                    write_value(writer, key, child)?;
                }
            }
            emit(writer, Event::End(BytesEnd::new(name)))?;
        }
        scalar => {
            let text = scalar_text(scalar);
            if text.is_empty() {
                return emit(writer, Event::Empty(BytesStart::new(name)));
            }
            emit(writer, Event::Start(BytesStart::new(name)))?;
            emit(writer, Event::Text(BytesText::new(&text)))?;
            emit(writer, Event::End(BytesEnd::new(name)))?;
        }
    }
    Ok(())
}
