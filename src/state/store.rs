//! Tabular persisted state: the asset index, the bundle index, and the
//! per-run artifacts.
//!
//! The layout is deliberately plain text with header rows so that state
//! diffs between runs are reviewable. Both tables are rewritten in full on
//! every commit; there is no incremental patching.

use std::fs;
use std::path::{Path, PathBuf};

use super::error::StateError;
use super::types::{AssetRecord, BundleIndex, EnvInfo};

const ASSET_LIST_FILE: &str = "asset_list.csv";
const BUNDLE_DICT_FILE: &str = "bundle_dict.csv";
const NEW_DOWNLOADS_FILE: &str = "new_download_files.txt";
const ENV_INFO_FILE: &str = "env_info.txt";

const ASSET_HEADER: &str = "type,out_dir,out_subdir,file_name,bundle_file_name";
const BUNDLE_HEADER: &str = "bundle_file_name,bundle_file_hash";

/// Store for the persisted sync state, rooted at a metadata directory.
#[derive(Debug, Clone)]
pub struct StateStore {
    dir: PathBuf,
}

impl StateStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn bundle_index_path(&self) -> PathBuf {
        self.dir.join(BUNDLE_DICT_FILE)
    }

    fn asset_list_path(&self) -> PathBuf {
        self.dir.join(ASSET_LIST_FILE)
    }

    /// Load the previous bundle index.
    ///
    /// Returns `Ok(None)` when no index has been persisted yet — the normal
    /// first-run condition that makes the planner fetch everything.
    pub fn load(&self) -> Result<Option<BundleIndex>, StateError> {
        let path = self.bundle_index_path();
        let Some(text) = read_if_exists(&path)? else {
            return Ok(None);
        };

        let mut lines = text.lines().enumerate();
        expect_header(&mut lines, &path, BUNDLE_HEADER)?;

        let mut index = BundleIndex::new();
        for (idx, line) in lines {
            if line.is_empty() {
                continue;
            }
            let mut fields = line.split(',');
            match (fields.next(), fields.next(), fields.next()) {
                (Some(name), Some(hash), None) => {
                    index.insert(name.to_string(), hash.to_string());
                }
                _ => {
                    return Err(StateError::Malformed {
                        path,
                        line: idx + 1,
                        reason: "expected exactly 2 fields",
                    })
                }
            }
        }
        Ok(Some(index))
    }

    /// Load the persisted asset index, if any. Used for status reporting;
    /// the sync pipeline itself always rebuilds the index from the manifest.
    pub fn load_assets(&self) -> Result<Option<Vec<AssetRecord>>, StateError> {
        let path = self.asset_list_path();
        let Some(text) = read_if_exists(&path)? else {
            return Ok(None);
        };

        let mut lines = text.lines().enumerate();
        expect_header(&mut lines, &path, ASSET_HEADER)?;

        let mut records = Vec::new();
        for (idx, line) in lines {
            if line.is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split(',').collect();
            let malformed = |reason| StateError::Malformed {
                path: path.clone(),
                line: idx + 1,
                reason,
            };
            let &[category, out_dir, out_subdir, file_name, bundle] = &fields[..] else {
                return Err(malformed("expected exactly 5 fields"));
            };
            let category = category
                .parse()
                .map_err(|_| malformed("non-numeric category"))?;
            records.push(AssetRecord {
                category,
                out_dir: out_dir.to_string(),
                out_subdir: out_subdir.to_string(),
                file_name: file_name.to_string(),
                bundle: bundle.to_string(),
            });
        }
        Ok(Some(records))
    }

    /// Load the persisted environment-info record, if any.
    pub fn load_env(&self) -> Result<Option<String>, StateError> {
        read_if_exists(&self.dir.join(ENV_INFO_FILE))
    }

    /// Persist the outcome of a completed sync run, replacing all tables.
    ///
    /// Must only be called after every deletion, fetch, and extraction in
    /// the plan has succeeded: this is the single durable write point, and
    /// an interrupted run must leave the previous state untouched.
    pub fn commit(
        &self,
        assets: &[AssetRecord],
        bundles: &BundleIndex,
        fetched: &[String],
        env: &EnvInfo,
    ) -> Result<(), StateError> {
        fs::create_dir_all(&self.dir).map_err(|e| StateError::Write {
            path: self.dir.clone(),
            source: e,
        })?;

        let mut rows: Vec<&AssetRecord> = assets.iter().collect();
        rows.sort();
        let mut asset_table = String::with_capacity(rows.len() * 64);
        asset_table.push_str(ASSET_HEADER);
        asset_table.push('\n');
        for record in rows {
            asset_table.push_str(&record.category.to_string());
            for field in [
                &record.out_dir,
                &record.out_subdir,
                &record.file_name,
                &record.bundle,
            ] {
                asset_table.push(',');
                asset_table.push_str(field_checked(field)?);
            }
            asset_table.push('\n');
        }

        let mut bundle_table = String::with_capacity(bundles.len() * 48);
        bundle_table.push_str(BUNDLE_HEADER);
        bundle_table.push('\n');
        for (name, hash) in bundles {
            bundle_table.push_str(field_checked(name)?);
            bundle_table.push(',');
            bundle_table.push_str(field_checked(hash)?);
            bundle_table.push('\n');
        }

        let mut fetched = fetched.to_vec();
        fetched.sort_unstable();
        let mut fetched_list = String::new();
        for name in &fetched {
            fetched_list.push_str(name);
            fetched_list.push('\n');
        }

        write_atomic(&self.asset_list_path(), &asset_table)?;
        write_atomic(&self.bundle_index_path(), &bundle_table)?;
        write_atomic(&self.dir.join(NEW_DOWNLOADS_FILE), &fetched_list)?;
        write_atomic(&self.dir.join(ENV_INFO_FILE), &env.render())?;

        tracing::info!(
            assets = assets.len(),
            bundles = bundles.len(),
            dir = %self.dir.display(),
            "Persisted sync state"
        );
        Ok(())
    }
}

fn read_if_exists(path: &Path) -> Result<Option<String>, StateError> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(StateError::Read {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

fn expect_header<'a>(
    lines: &mut impl Iterator<Item = (usize, &'a str)>,
    path: &Path,
    expected: &'static str,
) -> Result<(), StateError> {
    match lines.next() {
        Some((_, header)) if header == expected => Ok(()),
        Some((idx, _)) => Err(StateError::Malformed {
            path: path.to_path_buf(),
            line: idx + 1,
            reason: "unexpected header row",
        }),
        None => Err(StateError::Malformed {
            path: path.to_path_buf(),
            line: 1,
            reason: "missing header row",
        }),
    }
}

/// Reject values that would corrupt the comma/newline-delimited layout.
fn field_checked(value: &str) -> Result<&str, StateError> {
    if value.contains([',', '\n', '\r']) {
        return Err(StateError::UnencodableField {
            value: value.to_string(),
        });
    }
    Ok(value)
}

/// Write via a temp file and rename so a crash mid-write can never leave a
/// half-written table behind.
fn write_atomic(path: &Path, contents: &str) -> Result<(), StateError> {
    let write_err = |source| StateError::Write {
        path: path.to_path_buf(),
        source,
    };
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, contents).map_err(write_err)?;
    fs::rename(&tmp, path).map_err(write_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::classify;

    fn record(path: &str, bundle: &str) -> AssetRecord {
        AssetRecord::new(classify(path).unwrap().unwrap(), bundle)
    }

    fn env() -> EnvInfo {
        EnvInfo {
            base_url: "http://cdn.example.com/b/".to_string(),
            supported_categories: vec![0, 8, 100],
        }
    }

    #[test]
    fn test_load_absent_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path());
        assert!(store.load().unwrap().is_none());
        assert!(store.load_assets().unwrap().is_none());
    }

    #[test]
    fn test_commit_then_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path().join("meta"));

        let assets = vec![
            record("Assets/East/Pictures/319/Efuda.png", "pic319.ab"),
            record("Assets/East/Units/1003/03/Thumbnail/Square.png", "unit1003.ab"),
        ];
        let mut bundles = BundleIndex::new();
        bundles.insert("unit1003.ab".to_string(), "h1".to_string());
        bundles.insert("pic319.ab".to_string(), "h2".to_string());

        store
            .commit(&assets, &bundles, &["unit1003.ab".to_string()], &env())
            .unwrap();

        assert_eq!(store.load().unwrap().unwrap(), bundles);
        let mut expected = assets.clone();
        expected.sort();
        assert_eq!(store.load_assets().unwrap().unwrap(), expected);
    }

    #[test]
    fn test_commit_output_is_sorted_and_exact() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path());

        // Deliberately unsorted input; persisted form must not depend on it.
        let assets = vec![
            record("Assets/East/Units/1025/Timeline/Barrage10.asset", "tl.ab"),
            record("Assets/East/Pictures/319/Efuda.png", "pic319.ab"),
        ];
        let mut bundles = BundleIndex::new();
        bundles.insert("tl.ab".to_string(), "zz".to_string());
        bundles.insert("pic319.ab".to_string(), "aa".to_string());

        store.commit(&assets, &bundles, &[], &env()).unwrap();

        let asset_csv = fs::read_to_string(dir.path().join("asset_list.csv")).unwrap();
        assert_eq!(
            asset_csv,
            "type,out_dir,out_subdir,file_name,bundle_file_name\n\
             8,PictureEfuda,,PE319.png,pic319.ab\n\
             100,Timeline,,TB102510.json,tl.ab\n"
        );

        let bundle_csv = fs::read_to_string(dir.path().join("bundle_dict.csv")).unwrap();
        assert_eq!(
            bundle_csv,
            "bundle_file_name,bundle_file_hash\npic319.ab,aa\ntl.ab,zz\n"
        );
    }

    #[test]
    fn test_commit_is_byte_identical_across_runs() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path());
        let assets = vec![record("Assets/East/Pictures/1/Efuda.png", "p1.ab")];
        let mut bundles = BundleIndex::new();
        bundles.insert("p1.ab".to_string(), "h".to_string());

        store.commit(&assets, &bundles, &[], &env()).unwrap();
        let first = fs::read_to_string(dir.path().join("asset_list.csv")).unwrap();
        store.commit(&assets, &bundles, &[], &env()).unwrap();
        let second = fs::read_to_string(dir.path().join("asset_list.csv")).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_commit_writes_run_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path());
        let fetched = vec!["b.ab".to_string(), "a.ab".to_string()];

        store.commit(&[], &BundleIndex::new(), &fetched, &env()).unwrap();

        let downloads = fs::read_to_string(dir.path().join("new_download_files.txt")).unwrap();
        assert_eq!(downloads, "a.ab\nb.ab\n");
        let env_info = fs::read_to_string(dir.path().join("env_info.txt")).unwrap();
        assert_eq!(
            env_info,
            "download_url_prefix=http://cdn.example.com/b/\nsupported_asset_types=[0, 8, 100]\n"
        );
        assert_eq!(store.load_env().unwrap().unwrap(), env_info);
    }

    #[test]
    fn test_load_rejects_wrong_header() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("bundle_dict.csv"), "name,hash\na.ab,h1\n").unwrap();
        let store = StateStore::new(dir.path());
        assert!(matches!(
            store.load().unwrap_err(),
            StateError::Malformed { line: 1, .. }
        ));
    }

    #[test]
    fn test_load_rejects_wrong_field_count() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("bundle_dict.csv"),
            "bundle_file_name,bundle_file_hash\na.ab,h1,extra\n",
        )
        .unwrap();
        let store = StateStore::new(dir.path());
        assert!(matches!(
            store.load().unwrap_err(),
            StateError::Malformed { line: 2, .. }
        ));
    }

    #[test]
    fn test_commit_rejects_separator_in_field() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path());
        let mut bundles = BundleIndex::new();
        bundles.insert("evil,name.ab".to_string(), "h".to_string());
        assert!(matches!(
            store.commit(&[], &bundles, &[], &env()).unwrap_err(),
            StateError::UnencodableField { .. }
        ));
    }

    #[test]
    fn test_commit_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path());
        store.commit(&[], &BundleIndex::new(), &[], &env()).unwrap();
        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }
}
