// src/main.rs

use anyhow::{Context, Result};
use clap::Parser;
use notices::batch::{BatchReport, resolve_all};
use notices::cli::{Cli, Commands};
use notices::config::{NoticesConfig, TOKEN_ENV};
use notices::progress;
use notices::record::ResolvedFile;
use notices::{LicenseCache, scan};
use regex::Regex;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Resolve `records` and write the notices file
async fn run(config: &NoticesConfig, records: Vec<ResolvedFile>, output: &Path) -> Result<BatchReport> {
    let cancel = CancellationToken::new();
    let cache = Arc::new(LicenseCache::new());
    let pipeline = config.build_pipeline(Arc::clone(&cache), cancel.clone())?;

    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, canceling outstanding lookups");
            on_ctrl_c.cancel();
        }
    });

    let progress = progress::tracker(std::io::stderr().is_terminal(), records.len() as u64);
    let report = resolve_all(&pipeline, records, config.concurrency, progress.as_ref()).await;

    let written = notices::notices::write(output, &report)
        .with_context(|| format!("Failed to write notices file: {}", output.display()))?;
    if written {
        println!("Wrote {}", output.display());
    } else {
        println!("No licenses resolved; nothing written");
    }
    if !report.unresolved.is_empty() {
        println!(
            "{} files need manual review (see log for details)",
            report.unresolved.len()
        );
    }

    cache.clear();
    Ok(report)
}

fn output_path(output: Option<PathBuf>, dir: &Path, config: &NoticesConfig) -> PathBuf {
    output.unwrap_or_else(|| dir.join(&config.output_filename))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.global.verbose);

    let mut config = NoticesConfig::load_or_default(cli.global.config.as_deref())?;
    config.apply_overrides(
        cli.global.github_token.clone(),
        std::env::var(TOKEN_ENV).ok(),
        cli.global.concurrency,
    );
    config.validate()?;
    if config.github_token.is_none() {
        info!("No GitHub token configured; API lookups are rate limited");
    }

    let report = match cli.command {
        Commands::Scan {
            dir,
            filter,
            output,
        } => {
            let filter = filter
                .as_deref()
                .map(Regex::new)
                .transpose()
                .context("Invalid --filter regex")?;
            let records = scan::scan_directory(&dir, filter.as_ref())
                .with_context(|| format!("Failed to scan {}", dir.display()))?;
            if records.is_empty() {
                anyhow::bail!("No scannable binaries found in {}", dir.display());
            }
            let output = output_path(output, &dir, &config);
            run(&config, records, &output).await?
        }
        Commands::Resolve { records, output } => {
            let loaded = scan::load_records(&records)
                .with_context(|| format!("Failed to read records file: {}", records.display()))?;
            if loaded.is_empty() {
                anyhow::bail!("No records in {}", records.display());
            }
            let dir = records.parent().unwrap_or(Path::new("."));
            let output = output_path(output, dir, &config);
            run(&config, loaded, &output).await?
        }
    };

    if report.was_canceled() {
        anyhow::bail!("Canceled with {} files outstanding", report.canceled.len());
    }
    Ok(())
}
