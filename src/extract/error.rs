//! Error types for extraction.
//!
//! Everything here is fatal: a signature that resolves to zero or multiple
//! objects, an unknown category, or a structurally broken scripted entry
//! means the rule table and the published data disagree, which needs a
//! mapping fix, not a retry.

use thiserror::Error;

use crate::classify::{Category, ClassifyError};

#[derive(Debug, Error)]
pub enum ExtractError {
    /// No object in the bundle matches the record's file signature.
    #[error("no object matching signature {signature} in bundle {bundle}")]
    SignatureNotFound { signature: String, bundle: String },

    /// More than one object matches — the signature no longer uniquely
    /// identifies a single object.
    #[error("multiple objects matching signature {signature} in bundle {bundle}")]
    DuplicateSignature { signature: String, bundle: String },

    /// A category outside the image and scripted ranges reached the
    /// dispatcher. The supported-category allow-list and the dispatcher
    /// must always agree.
    #[error("unknown file type {category}")]
    UnknownCategory { category: Category },

    /// The scripted entry object carries no decoded typetree.
    #[error("object {path_id} has no decoded typetree")]
    MissingTypetree { path_id: i64 },

    /// The scripted entry object has neither order-list spelling.
    #[error("no order list on scripted entry {name:?}")]
    MissingOrderList { name: String },

    /// An order-list element lacks its object reference.
    #[error("order-list element without m_PathID on entry {name:?}")]
    MissingChildReference { name: String },

    /// An order-list reference points at an object the bundle lacks.
    #[error("order list references missing object {path_id}")]
    MissingChild { path_id: i64 },

    /// A child script object has no script class name to key its document.
    #[error("object {path_id} has no script name")]
    MissingScriptName { path_id: i64 },

    #[error(transparent)]
    Classify(#[from] ClassifyError),

    /// The external bundle ripper is not installed or not on PATH.
    #[error("bundle ripper executable not found: {0}")]
    RipperNotFound(#[source] which::Error),

    /// The external bundle ripper ran but reported failure.
    #[error("bundle ripper failed (status {status:?}): {stderr}")]
    RipperFailed {
        status: Option<i32>,
        stderr: String,
    },

    /// The ripper's dump output was not the expected document shape.
    #[error("malformed ripper dump: {0}")]
    MalformedDump(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
