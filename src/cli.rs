use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::config::DEFAULT_BASE_URL;

#[derive(Parser, Debug)]
#[command(
    name = "abmirror",
    about = "Mirror and extract game asset bundles from a remote content manifest"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Log level
    #[arg(long, value_enum, default_value = "info", global = true)]
    pub log_level: LogLevel,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Reconcile the local bundle cache and extract newly fetched assets
    Sync(SyncArgs),
    /// Reconcile the local bundle cache without extracting anything
    Mirror(MirrorArgs),
    /// Print a summary of the persisted sync state
    Status(StatusArgs),
}

#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Local bundle cache directory
    pub cache_dir: PathBuf,

    /// Directory holding the persisted state tables
    pub state_dir: PathBuf,

    /// Directory extracted assets are written to
    pub output_dir: PathBuf,

    /// Bundle ripper executable (looked up on PATH when omitted)
    #[arg(long)]
    pub ripper: Option<String>,

    #[command(flatten)]
    pub fetch: FetchArgs,
}

#[derive(Args, Debug)]
pub struct MirrorArgs {
    /// Local bundle cache directory
    pub cache_dir: PathBuf,

    /// Directory holding the persisted state tables
    pub state_dir: PathBuf,

    #[command(flatten)]
    pub fetch: FetchArgs,
}

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Directory holding the persisted state tables
    pub state_dir: PathBuf,
}

#[derive(Args, Debug)]
pub struct FetchArgs {
    /// Base URL of the remote bundle library
    #[arg(long, env = "ABMIRROR_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Maximum concurrent bundle downloads
    #[arg(long, default_value_t = 4)]
    pub concurrency: usize,

    /// Retries per transfer before the run aborts
    #[arg(long, default_value_t = 2)]
    pub max_retries: u32,

    /// Base delay between retries, in seconds
    #[arg(long, default_value_t = 5)]
    pub retry_delay: u64,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}
