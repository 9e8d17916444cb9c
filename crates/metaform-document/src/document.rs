//! Document tree helpers
//!
//! A parsed document is a [`JsonMap`] whose single key is the root element
//! name. Helpers here move between that wrapped shape and the inner object.

use serde_json::Value;

/// Insertion-ordered JSON object (`serde_json` is built with `preserve_order`)
pub type JsonMap = serde_json::Map<String, Value>;

/// Attribute key holding the metadata namespace declaration
pub const XML_NS_KEY: &str = "@_xmlns";

/// Namespace every metadata document is written with
pub const XML_NS_URL: &str = "http://soap.sforce.com/2006/04/metadata";

/// Return the root element's object with the namespace declaration removed
///
/// Yields an empty map when the root is missing or is not an object
/// (an empty `<Root/>` parses to a string).
#[must_use]
pub fn unwrap_and_omit_ns(root_name: &str, document: &JsonMap) -> JsonMap {
    match document.get(root_name) {
        Some(Value::Object(inner)) => inner
            .iter()
            .filter(|(key, _)| key.as_str() != XML_NS_KEY)
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect(),
        _ => JsonMap::new(),
    }
}

/// Wrap `inner` under `root_name`, placing the namespace declaration first
///
/// An `@_xmlns` already present in `inner` is replaced in place by the
/// leading declaration.
#[must_use]
pub fn wrap_with_ns(root_name: &str, inner: JsonMap) -> JsonMap {
    let mut body = JsonMap::with_capacity(inner.len() + 1);
    body.insert(XML_NS_KEY.to_string(), Value::String(XML_NS_URL.to_string()));
    for (key, value) in inner {
        if key != XML_NS_KEY {
            body.insert(key, value);
        }
    }

    let mut document = JsonMap::with_capacity(1);
    document.insert(root_name.to_string(), Value::Object(body));
    document
}

/// Normalise a repeated-element value to a slice of items
///
/// The codec collapses a single occurrence to a bare value, so readers of
/// repeated groups go through this.
#[must_use]
pub fn ensure_array(value: Option<&Value>) -> Vec<Value> {
    match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.clone(),
        Some(other) => vec![other.clone()],
    }
}

/// String value of `field` on an object entry
///
/// Numbers and booleans are rendered with `to_string`; anything else is `None`.
#[must_use]
pub fn string_field(entry: &Value, field: &str) -> Option<String> {
    match entry.get(field)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn as_map(value: Value) -> JsonMap {
        match value {
            Value::Object(map) => map,
            _ => unreachable!("fixture is an object"),
        }
    }

    #[test]
    fn unwrap_strips_namespace() {
        let doc = as_map(json!({
            "CustomObject": { "@_xmlns": XML_NS_URL, "label": "Account" }
        }));

        let inner = unwrap_and_omit_ns("CustomObject", &doc);
        assert_eq!(inner.len(), 1);
        assert_eq!(inner["label"], "Account");
    }

    #[test]
    fn unwrap_missing_root_is_empty() {
        let doc = as_map(json!({ "Other": { "label": "x" } }));
        assert!(unwrap_and_omit_ns("CustomObject", &doc).is_empty());
    }

    #[test]
    fn unwrap_string_root_is_empty() {
        let doc = as_map(json!({ "CustomObject": "" }));
        assert!(unwrap_and_omit_ns("CustomObject", &doc).is_empty());
    }

    #[test]
    fn wrap_puts_namespace_first() {
        let inner = as_map(json!({ "label": "Account", "@_xmlns": "stale" }));
        let doc = wrap_with_ns("CustomObject", inner);

        let body = doc["CustomObject"].as_object().unwrap();
        let keys: Vec<_> = body.keys().map(String::as_str).collect();
        assert_eq!(keys, vec![XML_NS_KEY, "label"]);
        assert_eq!(body[XML_NS_KEY], XML_NS_URL);
    }

    #[test]
    fn ensure_array_shapes() {
        assert!(ensure_array(None).is_empty());
        assert_eq!(ensure_array(Some(&json!({"a": 1}))).len(), 1);
        assert_eq!(ensure_array(Some(&json!([1, 2, 3]))).len(), 3);
    }

    #[test]
    fn string_field_renders_scalars() {
        let entry = json!({ "fullName": "Name", "length": 80, "required": true, "nested": {} });
        assert_eq!(string_field(&entry, "fullName").as_deref(), Some("Name"));
        assert_eq!(string_field(&entry, "length").as_deref(), Some("80"));
        assert_eq!(string_field(&entry, "required").as_deref(), Some("true"));
        assert_eq!(string_field(&entry, "nested"), None);
        assert_eq!(string_field(&entry, "missing"), None);
    }
}
