//! Types for the persisted sync state.

use std::collections::BTreeMap;

use crate::classify::{Category, Classification};

/// Persisted mapping of bundle name to content hash, one entry per
/// locally-held bundle. After a successful sync its keys correspond 1:1
/// with the files in the cache directory.
///
/// A BTreeMap so that iteration (and the persisted table) is always in
/// lexicographic bundle order.
pub type BundleIndex = BTreeMap<String, String>;

/// One row of the persisted asset index: a classified asset path and the
/// bundle it lives in.
///
/// Field order is the persisted column order and the sort key; the derived
/// `Ord` gives the fixed total order the tables are written in.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AssetRecord {
    pub category: Category,
    pub out_dir: String,
    pub out_subdir: String,
    pub file_name: String,
    pub bundle: String,
}

impl AssetRecord {
    pub fn new(classification: Classification, bundle: &str) -> Self {
        Self {
            category: classification.category,
            out_dir: classification.out_dir.to_string(),
            out_subdir: classification.out_subdir,
            file_name: classification.file_name,
            bundle: bundle.to_string(),
        }
    }

    /// The signature used to locate this record's one object inside its
    /// bundle at extraction time.
    pub fn signature(&self) -> FileSignature<'_> {
        FileSignature {
            category: self.category,
            out_dir: &self.out_dir,
            out_subdir: &self.out_subdir,
            file_name: &self.file_name,
        }
    }
}

/// The `(category, dir, subdir, filename)` tuple identifying exactly one
/// object inside a given bundle. Zero or multiple matches at extraction
/// time is a consistency bug, not a recoverable condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileSignature<'a> {
    pub category: Category,
    pub out_dir: &'a str,
    pub out_subdir: &'a str,
    pub file_name: &'a str,
}

impl FileSignature<'_> {
    /// Whether a freshly classified container path denotes this signature.
    pub fn matches(&self, c: &Classification) -> bool {
        self.category == c.category
            && self.out_dir == c.out_dir
            && self.out_subdir == c.out_subdir
            && self.file_name == c.file_name
    }
}

/// Audit record of the inputs a run was executed with.
#[derive(Debug, Clone)]
pub struct EnvInfo {
    pub base_url: String,
    pub supported_categories: Vec<Category>,
}

impl EnvInfo {
    /// Render the persisted `env_info.txt` form.
    pub fn render(&self) -> String {
        let mut categories = self.supported_categories.clone();
        categories.sort_unstable();
        let listed: Vec<String> = categories.iter().map(|c| c.to_string()).collect();
        format!(
            "download_url_prefix={}\nsupported_asset_types=[{}]\n",
            self.base_url,
            listed.join(", ")
        )
    }
}

/// Counters reported at the end of a run.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncStats {
    pub deleted: u64,
    pub fetched: u64,
    pub extracted: u64,
}
