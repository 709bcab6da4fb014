//! abmirror — manifest-driven mirror of a remote asset-bundle library.
//!
//! Fetches the remote manifest, diffs it against the persisted state and
//! the local cache directory, deletes stale bundles, downloads new or
//! changed ones, routes their classified assets to the right extractor,
//! and only then rewrites the persisted state tables.

#![warn(clippy::all)]

mod classify;
mod cli;
mod config;
mod extract;
mod fetch;
mod manifest;
mod retry;
mod state;
mod sync;

use std::collections::BTreeMap;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Command, StatusArgs};
use config::Config;
use state::{StateStore, SyncStats};

/// Print the persisted-state summary.
fn run_status(args: StatusArgs) -> anyhow::Result<()> {
    let store = StateStore::new(&args.state_dir);

    let Some(bundles) = store.load()? else {
        println!("No persisted state in {}", args.state_dir.display());
        println!("Run a sync or mirror first to create it.");
        return Ok(());
    };

    println!("State directory: {}", args.state_dir.display());
    println!();
    println!("Bundles tracked: {}", bundles.len());

    if let Some(assets) = store.load_assets()? {
        println!("Asset records:   {}", assets.len());
        let mut per_dir: BTreeMap<&str, usize> = BTreeMap::new();
        for record in &assets {
            *per_dir.entry(record.out_dir.as_str()).or_default() += 1;
        }
        if !per_dir.is_empty() {
            println!();
            for (dir, count) in per_dir {
                println!("  {dir:<16} {count}");
            }
        }
    }

    if let Some(env) = store.load_env()? {
        println!();
        print!("{env}");
    }

    Ok(())
}

fn report(stats: SyncStats) {
    println!(
        "Sync complete: {} removed, {} downloaded, {} extracted",
        stats.deleted, stats.fetched, stats.extracted
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    let filter = match cli.log_level {
        cli::LogLevel::Debug => "debug",
        cli::LogLevel::Info => "info",
        cli::LogLevel::Warn => "warn",
        cli::LogLevel::Error => "error",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .init();

    match cli.command {
        Command::Sync(args) => {
            let config = Config::for_sync(args);
            report(sync::run(&config).await?);
        }
        Command::Mirror(args) => {
            let config = Config::for_mirror(args);
            report(sync::run(&config).await?);
        }
        Command::Status(args) => run_status(args)?,
    }

    Ok(())
}
