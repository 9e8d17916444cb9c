//! Decomposed-child flush

use super::{Finalizer, TransactionFinalizer};
use crate::error::ConvertResult;
use crate::write::{WriteInfo, WriterFormat};
use async_trait::async_trait;
use indexmap::IndexMap;
use metaform_component::MetadataComponent;
use std::path::Path;
use std::sync::Arc;

/// What is known about one decomposed child
#[derive(Debug, Clone, Default)]
pub struct DecompositionEntry {
    /// Set when an equivalent file already exists on disk
    pub found_merge: bool,
    /// File the child would be written to
    pub pending_write: Option<WriteInfo>,
    /// Component the child was split out of
    pub origin: Option<Arc<MetadataComponent>>,
}

impl DecompositionEntry {
    /// Entry ready to be flushed unless a merge was found
    #[must_use]
    fn actionable(&self) -> Option<(&WriteInfo, &Arc<MetadataComponent>)> {
        if self.found_merge {
            return None;
        }
        Some((self.pending_write.as_ref()?, self.origin.as_ref()?))
    }
}

/// Child key to entry, in arrival order
pub type DecompositionState = IndexMap<String, DecompositionEntry>;

/// Flushes decomposed children that were not merged into an existing file
#[derive(Debug, Default)]
pub struct DecompositionFinalizer {
    state: DecompositionState,
}

impl DecompositionFinalizer {
    /// Create empty finalizer
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the file a child would be written to
    pub fn set_pending_write(&mut self, key: impl Into<String>, write: WriteInfo) {
        self.state.entry(key.into()).or_default().pending_write = Some(write);
    }

    /// Record the component a child came from
    pub fn set_origin(&mut self, key: impl Into<String>, origin: Arc<MetadataComponent>) {
        self.state.entry(key.into()).or_default().origin = Some(origin);
    }

    /// Mark a child as already present on disk
    pub fn mark_found_merge(&mut self, key: impl Into<String>) {
        self.state.entry(key.into()).or_default().found_merge = true;
    }
}

#[async_trait]
impl Finalizer for DecompositionFinalizer {
    fn name(&self) -> &'static str {
        "decomposition"
    }

    fn pending(&self) -> usize {
        self.state.len()
    }

    fn clear(&mut self) {
        self.reset();
    }

    async fn finalize(&self, _default_directory: Option<&Path>) -> ConvertResult<Vec<WriterFormat>> {
        let plan: Vec<WriterFormat> = self
            .state
            .iter()
            .filter_map(|(key, entry)| {
                let (write, origin) = entry.actionable()?;
                let target = origin.parent().unwrap_or(origin);
                tracing::debug!(
                    key = key.as_str(),
                    full_name = target.full_name(),
                    output = %write.output.display(),
                    "flushing decomposed child"
                );
                Some(WriterFormat::new(target.as_ref().clone(), vec![write.clone()]))
            })
            .collect();

        tracing::info!(
            entries = self.state.len(),
            written = plan.len(),
            "decomposition finalized"
        );
        Ok(plan)
    }
}

impl TransactionFinalizer for DecompositionFinalizer {
    type State = DecompositionState;

    fn state(&self) -> &Self::State {
        &self.state
    }

    fn state_mut(&mut self) -> &mut Self::State {
        &mut self.state
    }
}
