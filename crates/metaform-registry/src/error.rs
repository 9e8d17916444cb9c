//! Error types for registry and merge-policy lookups

/// Registry configuration errors
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// Type id or name not present in the registry
    #[error("unknown metadata type: '{0}'")]
    UnknownType(String),

    /// Two types share an id
    #[error("duplicate metadata type id: '{0}'")]
    DuplicateType(String),

    /// Registry or policy JSON could not be decoded
    #[error("invalid registry json: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// A merge-policy entry cannot be used
    #[error("invalid merge policy for {type_name}.{node}: {reason}")]
    InvalidMergePolicy {
        type_name: String,
        node: String,
        reason: String,
    },
}

impl RegistryError {
    /// Create invalid merge-policy error
    pub fn invalid_merge_policy(
        type_name: impl Into<String>,
        node: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidMergePolicy {
            type_name: type_name.into(),
            node: node.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_type_display() {
        let err = RegistryError::UnknownType("Flow".to_string());
        assert_eq!(err.to_string(), "unknown metadata type: 'Flow'");
    }

    #[test]
    fn merge_policy_display_names_type_and_node() {
        let err = RegistryError::invalid_merge_policy("Profile", "fieldPermissions", "missing mappingKey");
        assert_eq!(
            err.to_string(),
            "invalid merge policy for Profile.fieldPermissions: missing mappingKey"
        );
    }
}
