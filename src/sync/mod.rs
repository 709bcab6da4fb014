//! Sync engine — drives one full reconciliation run.
//!
//! Order is load-bearing: manifest fetch → plan → deletions → fetches →
//! extraction → commit. Deletions run before fetches so a replacement
//! bundle can reuse a stale name, and the state tables are rewritten only
//! after every other side effect has succeeded. An aborted run therefore
//! leaves the previous persisted state intact and is always safe to rerun.

pub mod plan;

pub use plan::SyncPlan;

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::Context;
use futures_util::{stream, TryStreamExt};

use crate::config::Config;
use crate::extract::{self, RipperCommand};
use crate::fetch::Fetcher;
use crate::manifest;
use crate::state::{StateStore, SyncStats};

/// Run the pipeline described by `config`: mirror the remote library into
/// the cache directory and, when an output directory is configured,
/// extract the supported assets of every bundle fetched this run.
pub async fn run(config: &Config) -> anyhow::Result<SyncStats> {
    // Resolve the ripper before any side effect so a missing executable
    // fails the run while the cache is still untouched.
    let reader = match &config.output_dir {
        Some(_) => Some(RipperCommand::discover(config.ripper.as_deref())?),
        None => None,
    };

    let fetcher = Fetcher::new(config.base_url.clone(), config.retry.clone());
    tracing::info!(url = %config.base_url, "Fetching manifest");
    let manifest_bytes = fetcher
        .fetch_manifest()
        .await
        .context("manifest fetch failed")?;
    let manifest = manifest::parse(&manifest_bytes)?;
    tracing::info!(bundles = manifest.bundles.len(), "Parsed manifest");

    let store = StateStore::new(&config.state_dir);
    let previous = store.load()?;
    if previous.is_none() {
        tracing::info!("No previous state, mirroring the full library");
    }

    let local_files = list_cache_dir(&config.cache_dir).await?;
    let plan = plan::plan(
        &manifest,
        previous.as_ref(),
        &local_files,
        &config.supported_set(),
    )?;
    tracing::info!(
        delete = plan.to_delete.len(),
        fetch = plan.to_fetch.len(),
        assets = plan.assets.len(),
        "Computed sync plan"
    );
    if plan.is_noop() {
        tracing::info!("Local mirror already matches the manifest");
    }

    let mut stats = SyncStats::default();

    for name in &plan.to_delete {
        let path = config.cache_dir.join(name);
        tokio::fs::remove_file(&path)
            .await
            .with_context(|| format!("failed to remove {}", path.display()))?;
        tracing::info!(bundle = %name, "Removed stale bundle");
        stats.deleted += 1;
    }

    stats.fetched = fetch_bundles(
        &fetcher,
        &plan.to_fetch,
        &config.cache_dir,
        config.concurrent_fetches,
    )
    .await?;

    if let (Some(output_dir), Some(reader)) = (&config.output_dir, reader) {
        let assets = plan.assets.clone();
        let new_bundles: BTreeSet<String> = plan.to_fetch.iter().cloned().collect();
        let cache_dir = config.cache_dir.clone();
        let output_dir = output_dir.clone();
        stats.extracted = tokio::task::spawn_blocking(move || {
            extract::extract_new_assets(&reader, &assets, &new_bundles, &cache_dir, &output_dir)
        })
        .await??;
    }

    store.commit(
        &plan.assets,
        &plan.bundles,
        &plan.to_fetch,
        &config.env_info(),
    )?;
    Ok(stats)
}

/// Download every planned bundle with bounded concurrency. Any single
/// failure aborts the whole run (after its retry budget); a half-updated
/// cache is recoverable precisely because commit never ran.
async fn fetch_bundles(
    fetcher: &Fetcher,
    names: &[String],
    cache_dir: &Path,
    concurrency: usize,
) -> anyhow::Result<u64> {
    tracing::info!(count = names.len(), "Bundles to download this run");
    let downloaded = AtomicU64::new(0);
    stream::iter(names.iter().map(Ok::<_, anyhow::Error>))
        .try_for_each_concurrent(concurrency, |name| {
            let dest = cache_dir.join(name);
            let downloaded = &downloaded;
            async move {
                // Present means a previous run fetched it but crashed
                // before commit; stale-hash files were already deleted.
                if tokio::fs::try_exists(&dest).await? {
                    tracing::debug!(bundle = %name, "Already present, skipping download");
                    return Ok(());
                }
                tracing::info!(bundle = %name, "Downloading bundle");
                fetcher
                    .fetch_bundle(name, &dest)
                    .await
                    .with_context(|| format!("failed to download {name}"))?;
                downloaded.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
        })
        .await?;
    Ok(downloaded.load(Ordering::Relaxed))
}

/// List the cache directory's files (creating it on first run), sorted.
async fn list_cache_dir(cache_dir: &Path) -> anyhow::Result<Vec<String>> {
    tokio::fs::create_dir_all(cache_dir)
        .await
        .with_context(|| format!("failed to create {}", cache_dir.display()))?;
    let mut names = Vec::new();
    let mut entries = tokio::fs::read_dir(cache_dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_file() {
            match entry.file_name().into_string() {
                Ok(name) => names.push(name),
                Err(other) => anyhow::bail!("non-UTF-8 file name in cache directory: {other:?}"),
            }
        }
    }
    names.sort_unstable();
    Ok(names)
}
