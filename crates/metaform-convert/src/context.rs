//! Conversion context
//!
//! [`ConvertContext`] owns one instance of every finalizer for a single
//! conversion. The per-component pass pushes into their state through the
//! public fields; the driver then calls [`ConvertContext::finalize_all`].

use crate::config::ConvertConfig;
use crate::error::ConvertResult;
use crate::finalizer::{
    DecompositionFinalizer, ExternalServiceRegistrationFinalizer, Finalizer, LabelsFinalizer,
    NonDecompositionFinalizer, PermissionSetFinalizer, RecompositionFinalizer,
};
use crate::merge::NodeMergeTransformer;
use crate::write::WriterFormat;
use metaform_component::ComponentLocator;
use metaform_registry::{MergePolicyTable, MetadataType, TransformerStrategy};
use std::path::Path;
use std::sync::Arc;

/// Direction of a conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConvertDirection {
    /// Deployable layout to source layout (children split out)
    ToSource,
    /// Source layout to deployable layout (children folded back)
    ToMetadata,
}

/// Which finalizer a type's components feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FinalizerKind {
    /// [`DecompositionFinalizer`]
    Decomposition,
    /// [`RecompositionFinalizer`]
    Recomposition,
    /// [`NonDecompositionFinalizer`]
    NonDecomposition,
    /// [`LabelsFinalizer`]
    Labels,
    /// [`PermissionSetFinalizer`]
    PermissionSet,
    /// [`ExternalServiceRegistrationFinalizer`]
    ExternalServiceRegistration,
}

/// Every finalizer of one conversion
#[derive(Debug)]
pub struct ConvertContext {
    config: ConvertConfig,
    /// Decomposed children written individually
    pub decomposition: DecompositionFinalizer,
    /// Parents rebuilt from their children
    pub recomposition: RecompositionFinalizer,
    /// Children routed into existing project files
    pub non_decomposition: NonDecompositionFinalizer,
    /// Labels folded into one file
    pub labels: LabelsFinalizer,
    /// Permission-set fragments per owner
    pub permission_set: PermissionSetFinalizer,
    /// External service registrations
    pub external_service: ExternalServiceRegistrationFinalizer,
}

impl ConvertContext {
    /// Create context with default config and no locator
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(ConvertConfig::default())
    }

    /// Create context with `config`
    #[must_use]
    pub fn with_config(config: ConvertConfig) -> Self {
        Self {
            decomposition: DecompositionFinalizer::new(),
            recomposition: RecompositionFinalizer::new().with_config(config.clone()),
            non_decomposition: NonDecompositionFinalizer::new().with_config(config.clone()),
            labels: LabelsFinalizer::new().with_config(config.clone()),
            permission_set: PermissionSetFinalizer::new().with_config(config.clone()),
            external_service: ExternalServiceRegistrationFinalizer::new().with_config(config.clone()),
            config,
        }
    }

    /// With locator for discovering existing project files
    #[must_use]
    pub fn with_locator(mut self, locator: Arc<dyn ComponentLocator>) -> Self {
        self.non_decomposition = NonDecompositionFinalizer::new()
            .with_config(self.config.clone())
            .with_locator(locator);
        self
    }

    /// Conversion config
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ConvertConfig {
        &self.config
    }

    /// Node-merge transformer sharing this context's config
    #[must_use]
    pub fn merge_transformer(&self, policies: Arc<MergePolicyTable>) -> NodeMergeTransformer {
        NodeMergeTransformer::new(policies).with_config(self.config.clone())
    }

    /// All finalizers, in a fixed order
    #[must_use]
    pub fn finalizers(&self) -> [&dyn Finalizer; 6] {
        [
            &self.decomposition,
            &self.recomposition,
            &self.non_decomposition,
            &self.labels,
            &self.permission_set,
            &self.external_service,
        ]
    }

    /// All finalizers, mutable, in the same order as [`Self::finalizers`]
    pub fn finalizers_mut(&mut self) -> [&mut dyn Finalizer; 6] {
        [
            &mut self.decomposition,
            &mut self.recomposition,
            &mut self.non_decomposition,
            &mut self.labels,
            &mut self.permission_set,
            &mut self.external_service,
        ]
    }

    /// Finalizer of a given kind
    #[must_use]
    pub fn finalizer(&self, kind: FinalizerKind) -> &dyn Finalizer {
        match kind {
            FinalizerKind::Decomposition => &self.decomposition,
            FinalizerKind::Recomposition => &self.recomposition,
            FinalizerKind::NonDecomposition => &self.non_decomposition,
            FinalizerKind::Labels => &self.labels,
            FinalizerKind::PermissionSet => &self.permission_set,
            FinalizerKind::ExternalServiceRegistration => &self.external_service,
        }
    }

    /// Finalizer fed by components of `type_` in `direction`
    ///
    /// `None` for types written as-is and for node-merge types, which go
    /// through [`NodeMergeTransformer`] instead.
    #[must_use]
    pub fn finalizer_kind(type_: &MetadataType, direction: ConvertDirection) -> Option<FinalizerKind> {
        use ConvertDirection::{ToMetadata, ToSource};
        match (type_.strategies.transformer, direction) {
            (TransformerStrategy::Standard | TransformerStrategy::MergeWithExisting, _) => None,
            (
                TransformerStrategy::Decomposed
                | TransformerStrategy::NonDecomposed
                | TransformerStrategy::DecomposedLabels,
                ToMetadata,
            ) => Some(FinalizerKind::Recomposition),
            (TransformerStrategy::Decomposed | TransformerStrategy::DecomposedPermissionSet, ToSource) => {
                Some(FinalizerKind::Decomposition)
            }
            (TransformerStrategy::NonDecomposed, ToSource) => Some(FinalizerKind::NonDecomposition),
            (TransformerStrategy::DecomposedLabels, ToSource) => Some(FinalizerKind::Labels),
            (TransformerStrategy::DecomposedPermissionSet, ToMetadata) => Some(FinalizerKind::PermissionSet),
            (TransformerStrategy::DecomposeExternalServiceRegistration, ToSource) => {
                Some(FinalizerKind::ExternalServiceRegistration)
            }
            (TransformerStrategy::DecomposeExternalServiceRegistration, ToMetadata) => None,
        }
    }

    /// Total entries awaiting finalization
    #[must_use]
    pub fn pending(&self) -> usize {
        self.finalizers().iter().map(|f| f.pending()).sum()
    }

    /// Finalize every finalizer and concatenate their write plans
    ///
    /// Runs the finalizers concurrently; output keeps the order of
    /// [`Self::finalizers`]. The first error aborts the whole plan.
    ///
    /// # Errors
    /// Returns the first `ConvertError` raised by any finalizer
    pub async fn finalize_all(&self, default_directory: Option<&Path>) -> ConvertResult<Vec<WriterFormat>> {
        let plans = futures::future::try_join_all(
            self.finalizers()
                .into_iter()
                .map(|finalizer| finalizer.finalize(default_directory)),
        )
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "conversion finalize failed");
            e
        })?;

        let plan: Vec<WriterFormat> = plans.into_iter().flatten().collect();
        tracing::info!(entries = plan.len(), "conversion finalized");
        Ok(plan)
    }

    /// Discard all accumulated state, keeping config and locator
    pub fn reset(&mut self) {
        for finalizer in self.finalizers_mut() {
            finalizer.clear();
        }
    }
}

impl Default for ConvertContext {
    fn default() -> Self {
        Self::new()
    }
}
