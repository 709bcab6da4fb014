//! The bundle-reading capability boundary.
//!
//! The container binary format, image codecs, and typetree decoding are
//! owned by an external ripper; this module only defines the decoded shape
//! the dispatcher consumes and the trait a provider implements.

use std::path::Path;

use serde::Deserialize;

use super::error::ExtractError;

/// Decoded listing of one bundle's objects.
#[derive(Debug, Clone, Deserialize)]
pub struct BundleDump {
    pub objects: Vec<ObjectDump>,
}

/// One decoded object inside a bundle.
#[derive(Debug, Clone, Deserialize)]
pub struct ObjectDump {
    /// Bundle-local object id, referenced by order lists.
    pub path_id: i64,
    /// Engine type name, e.g. `Texture2D`, `Sprite`, `MonoBehaviour`.
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub name: Option<String>,
    /// The asset path this object is published under, when it is a
    /// container entry.
    #[serde(default)]
    pub container: Option<String>,
    /// Script class name for scripted objects.
    #[serde(default)]
    pub script: Option<String>,
    /// Decoded typed tree for scripted objects.
    #[serde(default)]
    pub typetree: Option<serde_json::Value>,
}

impl BundleDump {
    /// Look up an object by its bundle-local id.
    pub fn object(&self, path_id: i64) -> Option<&ObjectDump> {
        self.objects.iter().find(|o| o.path_id == path_id)
    }
}

/// Capability for reading bundles and exporting their decoded content.
///
/// `read` enumerates a bundle's objects; `export_image` decodes one image
/// object straight to a file. Implemented by [`RipperCommand`]
/// (crate::extract::ripper::RipperCommand) in production and by an
/// in-memory fake in tests.
pub trait BundleReader {
    fn read(&self, bundle: &Path) -> Result<BundleDump, ExtractError>;

    fn export_image(
        &self,
        bundle: &Path,
        path_id: i64,
        out: &Path,
    ) -> Result<(), ExtractError>;
}
