//! Manifest Synchronizer - Main entry point
//!
//! Rescans the repository and rewrites every `<device>.manifest.json`.
//! Exits non-zero if any device failed (or, with `--check`, is out of date).

use anyhow::{Context, Result};
use clap::Parser;
use manifest_sync::{config::Config, utils, Synchronizer};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Repository root (defaults to the current directory)
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    root: PathBuf,

    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Base URL for artifact links (overrides config and environment)
    #[arg(long, value_name = "URL")]
    base_url: Option<String>,

    /// Report out-of-date manifests without writing anything
    #[arg(long)]
    check: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();

    // Load configuration
    let mut config = match &args.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => Config::default(),
    }
    .with_env_overrides();

    if let Some(url) = args.base_url {
        config.publish.base_url = url;
    }
    let config = config.validate()?;

    // Initialize logging
    let log_level = args.log_level.as_deref().unwrap_or(&config.log.level);
    utils::logger::init(log_level)?;

    tracing::info!(
        "Starting manifest-sync v{} (root: {}, base url: {})",
        env!("CARGO_PKG_VERSION"),
        args.root.display(),
        config.publish.base_url
    );

    let report = Synchronizer::new(args.root.clone(), config)?
        .check_only(args.check)
        .run()
        .with_context(|| format!("synchronizing {}", args.root.display()))?;

    println!("{}", report);

    if !report.is_success() {
        tracing::error!(
            "{} device(s) failed, {} manifest(s) stale",
            report.count("failed"),
            report.count("stale")
        );
    }

    Ok(ExitCode::from(report.exit_code() as u8))
}
