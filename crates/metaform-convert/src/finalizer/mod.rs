//! Transaction finalizers
//!
//! A finalizer accumulates partial knowledge while components stream through
//! a conversion, then turns it into write-plan entries exactly once.
//!
//! # Architecture
//!
//! ```text
//! per-component pass ──state_mut()──► TransactionFinalizer::State
//!                                            │
//!                     finalize(default_dir) ─┘──► Vec<WriterFormat>
//! ```
//!
//! [`Finalizer`] is the object-safe face used by `ConvertContext` to drive all
//! of them uniformly; [`TransactionFinalizer`] adds typed access to the state.

mod decomposition;
mod external_service;
mod labels;
mod non_decomposition;
mod permission_set;
mod recomposition;

pub use decomposition::{DecompositionEntry, DecompositionFinalizer, DecompositionState};
pub use external_service::{
    ExternalServiceRegistrationFinalizer, ExternalServiceState, RegistrationEntry,
};
pub use labels::{LabelsFinalizer, LabelsState};
pub use non_decomposition::{NonDecompositionFinalizer, NonDecompositionState};
pub use permission_set::{PermissionSetFinalizer, PermissionSetState};
pub use recomposition::{RecompositionEntry, RecompositionFinalizer, RecompositionState};

use crate::error::ConvertResult;
use crate::write::WriterFormat;
use async_trait::async_trait;
use std::fmt::Debug;
use std::path::Path;

/// Object-safe finalizer interface
#[async_trait]
pub trait Finalizer: Send + Sync + Debug {
    /// Short name used in logs and errors
    fn name(&self) -> &'static str;

    /// Number of accumulated entries awaiting finalization
    fn pending(&self) -> usize;

    /// Discard accumulated state
    fn clear(&mut self);

    /// Produce the write plan for everything accumulated
    ///
    /// `default_directory` is the conversion's output root; finalizers that
    /// synthesize new files place them relative to it.
    async fn finalize(&self, default_directory: Option<&Path>) -> ConvertResult<Vec<WriterFormat>>;
}

/// Finalizer owning a typed piece of per-transaction state
pub trait TransactionFinalizer: Finalizer {
    /// Accumulated state, empty at the start of a conversion
    type State: Default;

    /// Read state
    fn state(&self) -> &Self::State;

    /// Mutate state
    fn state_mut(&mut self) -> &mut Self::State;

    /// Replace state with a fresh empty one
    fn reset(&mut self) {
        *self.state_mut() = Self::State::default();
    }
}
