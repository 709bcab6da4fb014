//! Pure sync planning: diff the freshly fetched manifest against the
//! previous persisted index and the actual cache-directory contents.
//!
//! No I/O happens here; the engine in the parent module executes the plan.

use std::collections::BTreeSet;

use crate::classify::{self, Category, ClassifyError};
use crate::manifest::Manifest;
use crate::state::{AssetRecord, BundleIndex};

/// The computed reconciliation for one run. Never persisted itself; the
/// `bundles`/`assets` outputs are committed only after every side effect
/// the plan implies has completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncPlan {
    /// Local files to remove, lexicographic order.
    pub to_delete: Vec<String>,
    /// Bundles to download, lexicographic order.
    pub to_fetch: Vec<String>,
    /// The next bundle index (every manifest bundle, interesting or not).
    pub bundles: BundleIndex,
    /// Classified, supported asset records in persisted order.
    pub assets: Vec<AssetRecord>,
}

impl SyncPlan {
    /// True when the local mirror already matches the manifest.
    pub fn is_noop(&self) -> bool {
        self.to_delete.is_empty() && self.to_fetch.is_empty()
    }
}

/// Compute the minimal set of deletions and fetches reconciling the local
/// cache with the manifest.
///
/// - `previous` is `None` on first run, which sends every bundle to
///   `to_fetch`.
/// - `local_files` is the actual cache-directory listing; files the
///   manifest no longer mentions are deleted even if no index ever
///   recorded them (crash leftovers reconcile like anything else).
/// - The content hash is the sole change-detection signal. A bundle is
///   fetched iff it is new or its hash changed; a local file is deleted
///   iff it left the manifest or its recorded hash went stale.
///
/// Classification failures (inconsistent captures) abort planning.
pub fn plan(
    manifest: &Manifest,
    previous: Option<&BundleIndex>,
    local_files: &[String],
    supported: &BTreeSet<Category>,
) -> Result<SyncPlan, ClassifyError> {
    let mut bundles = BundleIndex::new();
    let mut assets = Vec::new();

    for info in &manifest.bundles {
        // Hash bookkeeping is independent of whether anything inside the
        // bundle is of interest: it drives deletion and fetching, while
        // the records below drive extraction.
        bundles.insert(info.name.clone(), info.hash.clone());

        for path in &info.asset_paths {
            if let Some(classification) = classify::classify(path)? {
                if supported.contains(&classification.category) {
                    assets.push(AssetRecord::new(classification, &info.name));
                }
            }
        }
    }
    assets.sort();

    let mut to_delete: Vec<String> = local_files
        .iter()
        .filter(|name| match bundles.get(name.as_str()) {
            None => true,
            Some(new_hash) => previous
                .and_then(|prev| prev.get(name.as_str()))
                .is_some_and(|old_hash| old_hash != new_hash),
        })
        .cloned()
        .collect();
    to_delete.sort_unstable();

    let to_fetch: Vec<String> = bundles
        .iter()
        .filter(|(name, hash)| {
            previous
                .and_then(|prev| prev.get(name.as_str()))
                .is_none_or(|old_hash| old_hash != *hash)
        })
        .map(|(name, _)| name.clone())
        .collect();

    Ok(SyncPlan {
        to_delete,
        to_fetch,
        bundles,
        assets,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::BundleInfo;

    fn manifest(bundles: &[(&str, &str, &[&str])]) -> Manifest {
        Manifest {
            bundles: bundles
                .iter()
                .map(|(name, hash, paths)| BundleInfo {
                    name: name.to_string(),
                    hash: hash.to_string(),
                    asset_paths: paths.iter().map(|p| p.to_string()).collect(),
                })
                .collect(),
        }
    }

    fn index(entries: &[(&str, &str)]) -> BundleIndex {
        entries
            .iter()
            .map(|(n, h)| (n.to_string(), h.to_string()))
            .collect()
    }

    fn names(entries: &[&str]) -> Vec<String> {
        entries.iter().map(|s| s.to_string()).collect()
    }

    fn supported() -> BTreeSet<u16> {
        crate::config::SUPPORTED_CATEGORIES.iter().copied().collect()
    }

    #[test]
    fn test_first_run_fetches_everything() {
        let m = manifest(&[("a.ab", "h1", &[]), ("b.ab", "h2", &[])]);
        let plan = plan(&m, None, &[], &supported()).unwrap();
        assert_eq!(plan.to_fetch, names(&["a.ab", "b.ab"]));
        assert!(plan.to_delete.is_empty());
    }

    #[test]
    fn test_identical_state_is_noop() {
        let m = manifest(&[("a.ab", "h1", &[]), ("b.ab", "h2", &[])]);
        let prev = index(&[("a.ab", "h1"), ("b.ab", "h2")]);
        let local = names(&["a.ab", "b.ab"]);
        let plan = plan(&m, Some(&prev), &local, &supported()).unwrap();
        assert!(plan.is_noop());
        assert_eq!(plan.bundles, prev);
    }

    #[test]
    fn test_hash_change_deletes_and_fetches() {
        let m = manifest(&[("a.ab", "h2", &[])]);
        let prev = index(&[("a.ab", "h1")]);
        let local = names(&["a.ab"]);
        let plan = plan(&m, Some(&prev), &local, &supported()).unwrap();
        assert_eq!(plan.to_delete, names(&["a.ab"]));
        assert_eq!(plan.to_fetch, names(&["a.ab"]));
    }

    #[test]
    fn test_unchanged_hash_is_untouched() {
        let m = manifest(&[("a.ab", "h1", &[])]);
        let prev = index(&[("a.ab", "h1")]);
        let local = names(&["a.ab"]);
        let plan = plan(&m, Some(&prev), &local, &supported()).unwrap();
        assert!(!plan.to_delete.contains(&"a.ab".to_string()));
        assert!(!plan.to_fetch.contains(&"a.ab".to_string()));
    }

    #[test]
    fn test_disappeared_bundle_is_deleted_not_fetched() {
        let m = manifest(&[("b.ab", "h2", &[])]);
        let prev = index(&[("a.ab", "h1"), ("b.ab", "h2")]);
        let local = names(&["a.ab", "b.ab"]);
        let plan = plan(&m, Some(&prev), &local, &supported()).unwrap();
        assert_eq!(plan.to_delete, names(&["a.ab"]));
        assert!(plan.to_fetch.is_empty());
    }

    #[test]
    fn test_stray_local_file_is_deleted() {
        // On disk but in neither the previous index nor the manifest:
        // a leftover from an interrupted run.
        let m = manifest(&[("a.ab", "h1", &[])]);
        let prev = index(&[("a.ab", "h1")]);
        let local = names(&["a.ab", "stray.ab"]);
        let plan = plan(&m, Some(&prev), &local, &supported()).unwrap();
        assert_eq!(plan.to_delete, names(&["stray.ab"]));
    }

    #[test]
    fn test_plan_twice_is_idempotent() {
        let m = manifest(&[("a.ab", "h1", &["Assets/East/Pictures/319/Efuda.png"])]);
        let first = plan(&m, None, &[], &supported()).unwrap();
        let local = names(&["a.ab"]);
        let second = plan(&m, Some(&first.bundles), &local, &supported()).unwrap();
        assert!(second.is_noop());
        assert_eq!(second.assets, first.assets);
    }

    #[test]
    fn test_uninteresting_bundle_still_indexed() {
        let m = manifest(&[("audio.ab", "h9", &["Assets/East/Audio/bgm01.ogg"])]);
        let plan = plan(&m, None, &[], &supported()).unwrap();
        assert_eq!(plan.bundles.get("audio.ab").map(String::as_str), Some("h9"));
        assert!(plan.assets.is_empty());
        assert_eq!(plan.to_fetch, names(&["audio.ab"]));
    }

    #[test]
    fn test_unsupported_category_is_dropped() {
        let mut allowed = supported();
        allowed.remove(&8);
        let m = manifest(&[("pic.ab", "h1", &["Assets/East/Pictures/319/Efuda.png"])]);
        let plan = plan(&m, None, &[], &allowed).unwrap();
        assert!(plan.assets.is_empty());
        // The bundle itself is still mirrored.
        assert_eq!(plan.to_fetch, names(&["pic.ab"]));
    }

    #[test]
    fn test_outputs_are_sorted_regardless_of_input_order() {
        let m = manifest(&[
            ("zzz.ab", "h1", &["Assets/East/Pictures/2/Efuda.png"]),
            ("aaa.ab", "h2", &["Assets/East/Pictures/1/Efuda.png"]),
        ]);
        let local = names(&["zzz.old", "aaa.old"]);
        let plan = plan(&m, None, &local, &supported()).unwrap();
        assert_eq!(plan.to_fetch, names(&["aaa.ab", "zzz.ab"]));
        assert_eq!(plan.to_delete, names(&["aaa.old", "zzz.old"]));
        assert_eq!(plan.assets[0].bundle, "aaa.ab");
        assert_eq!(plan.assets[1].bundle, "zzz.ab");
    }

    #[test]
    fn test_classification_failure_aborts_planning() {
        let m = manifest(&[(
            "bad.ab",
            "h1",
            &["Assets/East/Units/1003/03/G999903/G100303.png"],
        )]);
        assert!(plan(&m, None, &[], &supported()).is_err());
    }

    #[test]
    fn test_multiple_assets_per_bundle() {
        let m = manifest(&[(
            "unit1003.ab",
            "h1",
            &[
                "Assets/East/Units/1003/01/Thumbnail/Square.png",
                "Assets/East/Units/1003/01/Thumbnail/Costume.png",
                "Assets/East/Audio/ignored.ogg",
            ],
        )]);
        let plan = plan(&m, None, &[], &supported()).unwrap();
        assert_eq!(plan.assets.len(), 2);
        assert!(plan.assets.iter().all(|r| r.bundle == "unit1003.ab"));
    }
}
