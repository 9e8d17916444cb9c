//! Content hashing for serialized documents
//!
//! Two rendered outputs with equal [`ContentHash`] values are byte-identical
//! on disk.

/// Blake3 digest of rendered output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    /// Hash `data`
    #[inline]
    #[must_use]
    pub fn compute(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    /// Raw digest bytes
    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compute_is_deterministic() {
        let a = ContentHash::compute(b"<Workflow/>");
        let b = ContentHash::compute(b"<Workflow/>");
        assert_eq!(a, b);
        assert_ne!(a, ContentHash::compute(b"<Workflow />"));
    }

    #[test]
    fn digest_matches_blake3() {
        let hash = ContentHash::compute(b"labels");
        assert_eq!(hash.as_bytes(), blake3::hash(b"labels").as_bytes());
    }
}
