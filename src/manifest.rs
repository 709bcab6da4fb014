//! Remote manifest model and parsing.
//!
//! The manifest is the remote library's index: one descriptor per published
//! bundle, carrying the bundle name, its content hash, and the internal
//! asset paths it contains. Parsing is total and order-preserving; all
//! selection happens later in the planner.

use serde::Deserialize;
use thiserror::Error;

/// The parsed remote manifest.
#[derive(Debug, Clone, Deserialize)]
pub struct Manifest {
    #[serde(rename = "AssetInfos")]
    pub bundles: Vec<BundleInfo>,
}

/// One bundle descriptor, uniquely keyed by `name`.
///
/// `hash` is an opaque change-detection token; it is never recomputed or
/// interpreted locally, only compared for equality.
#[derive(Debug, Clone, Deserialize)]
pub struct BundleInfo {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Hash")]
    pub hash: String,
    #[serde(rename = "AssetPaths")]
    pub asset_paths: Vec<String>,
}

/// A structurally invalid manifest aborts the run before any side effect.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("malformed manifest: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Parse raw manifest bytes.
///
/// Missing or mistyped required fields are fatal; the caller must not
/// operate on partial data.
pub fn parse(bytes: &[u8]) -> Result<Manifest, ManifestError> {
    Ok(serde_json::from_slice(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_well_formed() {
        let raw = br#"{
            "AssetInfos": [
                {
                    "Name": "unit1003.ab",
                    "Hash": "aabbcc",
                    "AssetPaths": ["Assets/East/Units/1003/01/Thumbnail/Square.png"]
                },
                {
                    "Name": "bgm.ab",
                    "Hash": "ddeeff",
                    "AssetPaths": []
                }
            ]
        }"#;
        let manifest = parse(raw).unwrap();
        assert_eq!(manifest.bundles.len(), 2);
        assert_eq!(manifest.bundles[0].name, "unit1003.ab");
        assert_eq!(manifest.bundles[0].hash, "aabbcc");
        assert_eq!(manifest.bundles[0].asset_paths.len(), 1);
        assert_eq!(manifest.bundles[1].asset_paths.len(), 0);
    }

    #[test]
    fn test_parse_preserves_descriptor_order() {
        let raw = br#"{"AssetInfos": [
            {"Name": "zzz.ab", "Hash": "1", "AssetPaths": []},
            {"Name": "aaa.ab", "Hash": "2", "AssetPaths": []},
            {"Name": "mmm.ab", "Hash": "3", "AssetPaths": []}
        ]}"#;
        let names: Vec<String> = parse(raw)
            .unwrap()
            .bundles
            .into_iter()
            .map(|b| b.name)
            .collect();
        assert_eq!(names, ["zzz.ab", "aaa.ab", "mmm.ab"]);
    }

    #[test]
    fn test_parse_missing_field_is_fatal() {
        // No Hash field on the descriptor.
        let raw = br#"{"AssetInfos": [{"Name": "a.ab", "AssetPaths": []}]}"#;
        assert!(parse(raw).is_err());
    }

    #[test]
    fn test_parse_missing_top_level_key_is_fatal() {
        assert!(parse(br#"{"Bundles": []}"#).is_err());
    }

    #[test]
    fn test_parse_garbage_is_fatal() {
        assert!(parse(b"not json at all").is_err());
    }
}
