//! Error types for the persisted-state module.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur reading or writing the persisted tables.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A persisted table exists but does not have the expected shape.
    /// The store never guesses at partial data.
    #[error("malformed state table {path}, line {line}: {reason}")]
    Malformed {
        path: PathBuf,
        line: usize,
        reason: &'static str,
    },

    /// A value about to be persisted would corrupt the tabular layout.
    /// Bundle and output names never legitimately contain separators, so
    /// hitting this means an upstream classification or manifest bug.
    #[error("value {value:?} cannot be stored in a tabular field")]
    UnencodableField { value: String },
}
