use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::classify::Category;
use crate::cli::{FetchArgs, MirrorArgs, SyncArgs};
use crate::retry::RetryConfig;
use crate::state::EnvInfo;

/// Default remote bundle library.
pub const DEFAULT_BASE_URL: &str =
    "http://thcdn.gggamedownload.com/source/Assetbundle_Android_v5016/";

/// Categories the pipeline downloads and extracts. Must stay coordinated
/// with the rule table in [`crate::classify`]: every category listed here
/// is produced by some rule, and the dispatcher understands its range.
pub const SUPPORTED_CATEGORIES: &[Category] = &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 100, 101];

/// Resolved application configuration for one run.
#[derive(Debug, Clone)]
pub struct Config {
    pub base_url: String,
    pub cache_dir: PathBuf,
    pub state_dir: PathBuf,
    /// `None` for mirror-only runs; extraction is skipped entirely.
    pub output_dir: Option<PathBuf>,
    /// Explicit ripper executable; discovered on PATH when `None`.
    pub ripper: Option<String>,
    pub concurrent_fetches: usize,
    pub retry: RetryConfig,
    pub supported_categories: Vec<Category>,
}

impl Config {
    pub fn for_sync(args: SyncArgs) -> Self {
        Self::from_parts(
            args.fetch,
            args.cache_dir,
            args.state_dir,
            Some(args.output_dir),
            args.ripper,
        )
    }

    pub fn for_mirror(args: MirrorArgs) -> Self {
        Self::from_parts(args.fetch, args.cache_dir, args.state_dir, None, None)
    }

    fn from_parts(
        fetch: FetchArgs,
        cache_dir: PathBuf,
        state_dir: PathBuf,
        output_dir: Option<PathBuf>,
        ripper: Option<String>,
    ) -> Self {
        Self {
            base_url: fetch.base_url,
            cache_dir,
            state_dir,
            output_dir,
            ripper,
            concurrent_fetches: fetch.concurrency.max(1),
            retry: RetryConfig {
                max_retries: fetch.max_retries,
                base_delay_secs: fetch.retry_delay,
                max_delay_secs: 60,
            },
            supported_categories: SUPPORTED_CATEGORIES.to_vec(),
        }
    }

    /// The allow-list as a set, for planner lookups.
    pub fn supported_set(&self) -> BTreeSet<Category> {
        self.supported_categories.iter().copied().collect()
    }

    /// The audit record persisted alongside the state tables.
    pub fn env_info(&self) -> EnvInfo {
        EnvInfo {
            base_url: self.base_url.clone(),
            supported_categories: self.supported_categories.clone(),
        }
    }
}
