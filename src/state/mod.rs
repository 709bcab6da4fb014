//! Persisted sync state.
//!
//! Two tables survive across runs: the bundle index (bundle name to content
//! hash — the authoritative record of what is on disk) and the asset index
//! (classified path to bundle — derived, rebuilt in full every sync). Both
//! are plain tabular files so that state changes diff cleanly.

pub mod error;
pub mod store;
pub mod types;

pub use error::StateError;
pub use store::StateStore;
pub use types::{AssetRecord, BundleIndex, EnvInfo, FileSignature, SyncStats};
