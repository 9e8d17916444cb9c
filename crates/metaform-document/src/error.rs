//! Error types for document parsing and serialization

/// Errors raised while moving documents between XML and [`crate::JsonMap`]
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    /// Input is not well-formed XML
    #[error("malformed xml at byte {position}: {message}")]
    Malformed { position: u64, message: String },

    /// An element was opened but never closed, or closed twice
    #[error("unbalanced xml: {0}")]
    Unbalanced(String),

    /// Writing the XML stream failed
    #[error("xml serialization failed: {0}")]
    Serialize(String),

    /// Serialized output was not valid UTF-8
    #[error("invalid utf-8 in document: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

impl DocumentError {
    /// Create malformed-input error
    pub fn malformed(position: u64, message: impl Into<String>) -> Self {
        Self::Malformed {
            position,
            message: message.into(),
        }
    }

    /// Create serialization error
    pub fn serialize(message: impl Into<String>) -> Self {
        Self::Serialize(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_display_includes_position() {
        let err = DocumentError::malformed(42, "unexpected end");
        assert_eq!(err.to_string(), "malformed xml at byte 42: unexpected end");
    }

    #[test]
    fn serialize_display() {
        let err = DocumentError::serialize("broken pipe");
        assert_eq!(err.to_string(), "xml serialization failed: broken pipe");
    }
}
