//! bof-indexer CLI — extracts BOF names and descriptions from the
//! repositories listed in a markdown catalog and writes a JSON index.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

use bof_indexer::acquire::{self, GitFetcher};
use bof_indexer::{catalog, index, pipeline};

/// Index BOF repositories and extract BOF names/descriptions.
#[derive(Parser)]
#[command(name = "bof-indexer", version, about)]
struct Cli {
    /// Path to the catalog markdown file
    #[arg(long, default_value = "BOF-CATALOG.md")]
    catalog: PathBuf,

    /// Directory repositories are fetched into
    #[arg(long, default_value = "repos")]
    repos_dir: PathBuf,

    /// Output JSON file path
    #[arg(long, default_value = "bof-index.json")]
    output: PathBuf,

    /// Only analyze documentation formats, skip extraction
    #[arg(long)]
    analyze_only: bool,

    /// Skip fetching, assume the repository store is already populated
    #[arg(long)]
    skip_fetch: bool,

    /// Maximum parallel fetch operations
    #[arg(long, default_value_t = 8)]
    max_workers: usize,

    /// Per-repository fetch timeout in seconds
    #[arg(long, default_value_t = 60)]
    fetch_timeout: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let repos = catalog::extract_repos(&cli.catalog)
        .context("extracting repository URLs from catalog")?;
    info!(repos = repos.len(), catalog = %cli.catalog.display(), "catalog scan complete");

    let handles = if cli.skip_fetch {
        let handles = acquire::probe_store(repos, &cli.repos_dir);
        let present = handles.iter().filter(|h| h.fetched).count();
        info!(present, total = handles.len(), "skip-fetch: probed local store");
        handles
    } else {
        let fetcher = Arc::new(GitFetcher::new(Duration::from_secs(cli.fetch_timeout)));
        acquire::fetch_all(fetcher, repos, &cli.repos_dir, cli.max_workers)
            .await
            .context("acquiring repositories")?
    };

    let census = pipeline::analyze(&handles);
    for (format, count) in &census.parseable_by_format {
        info!(format = %format, repos = count, "format coverage");
    }

    if cli.analyze_only {
        info!("analyze-only mode, stopping before extraction");
        return Ok(());
    }

    let mut report = pipeline::extract_all(&handles);
    let entries = pipeline::deduplicate(std::mem::take(&mut report.entries));
    info!(unique = entries.len(), "deduplication complete");

    let artifact = index::BofIndex::assemble(&census, &report, entries);
    index::write_index(&artifact, &cli.output).context("writing index artifact")?;

    Ok(())
}
