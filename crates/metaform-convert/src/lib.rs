//! Metaform Convert
//!
//! Transaction-scoped decomposition and recomposition of metadata documents.
//!
//! # Core Operations
//!
//! - **Accumulate**: a per-component pass pushes partial knowledge into the
//!   finalizers owned by a [`ConvertContext`]
//! - **Finalize**: each finalizer turns its state into [`WriterFormat`]
//!   entries, exactly once
//! - **Merge**: [`NodeMergeTransformer`] combines an incoming document with
//!   the one already on disk, node category by node category
//!
//! # Architecture
//!
//! ```text
//! components ─► ConvertContext ─┬─ DecompositionFinalizer ──────┐
//!                               ├─ RecompositionFinalizer ─┐    │
//!                               │        XmlCache ◄────────┘    ├─► write plan
//!                               ├─ NonDecompositionFinalizer ───┤
//!                               └─ labels / permission set / …──┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use metaform_convert::prelude::*;
//!
//! let mut context = ConvertContext::new();
//! context.recomposition.set_parent(account.clone());
//! context.recomposition.add_child(field.with_parent(account))?;
//!
//! for entry in context.finalize_all(None).await? {
//!     for info in &entry.write_infos {
//!         std::fs::write(&info.output, info.render()?)?;
//!     }
//! }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

// Core modules
pub mod cache;
pub mod config;
pub mod context;
pub mod error;
pub mod finalizer;
pub mod merge;
pub mod write;

// Re-exports for convenience
pub use cache::{CacheKey, XmlCache};
pub use config::ConvertConfig;
pub use context::{ConvertContext, ConvertDirection, FinalizerKind};
pub use error::{ConvertError, ConvertResult};
pub use finalizer::{
    DecompositionFinalizer, ExternalServiceRegistrationFinalizer, Finalizer, LabelsFinalizer,
    NonDecompositionFinalizer, PermissionSetFinalizer, RecompositionFinalizer, TransactionFinalizer,
};
pub use merge::NodeMergeTransformer;
pub use write::{WriteInfo, WriteSource, WriterFormat};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for driving a conversion
    pub use crate::context::{ConvertContext, ConvertDirection, FinalizerKind};
    pub use crate::error::{ConvertError, ConvertResult};
    pub use crate::finalizer::{Finalizer, TransactionFinalizer};
    pub use crate::merge::NodeMergeTransformer;
    pub use crate::write::{WriteInfo, WriterFormat};
    pub use metaform_component::{MetadataComponent, VirtualTreeContainer};
    pub use metaform_registry::{MergePolicyTable, Registry};
}
