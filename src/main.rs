use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

use castdrop::config::Config;
use castdrop::import::{ImportJob, ImportScheduler};
use castdrop::seed::{seed_catalog, SeedCatalog};
use castdrop::storage::{Database, DatabaseError};

#[derive(Parser, Debug)]
#[command(name = "castdrop", about = "Podcast catalog with drop-folder episode import and RSS publishing")]
struct Args {
    /// Configuration file
    #[arg(long, value_name = "FILE", default_value = "castdrop.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Import on a schedule until interrupted (default)
    Run,
    /// Run a single import batch and exit
    Import,
    /// Rebuild the feed of one podcast
    Regenerate {
        /// Podcast key
        #[arg(long)]
        podcast: String,
    },
    /// Show every podcast in the catalog
    List,
    /// Create podcasts, owners and seasons from a TOML catalog
    Seed {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = Config::load(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    for dir in [&config.pull_dir, &config.podcast_dir] {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory {}", dir.display()))?;
    }
    let db = open_database(&config.database_path).await?;

    match args.command.unwrap_or(Command::Run) {
        Command::Run => run(db, &config).await,
        Command::Import => {
            let job = ImportJob::new(Arc::new(db), &config);
            let report = job.run_batch(&CancellationToken::new()).await?;
            println!(
                "Imported {} episode(s), {} failed ({} inconsistent); {} feed(s) published, {} failed",
                report.imported,
                report.failed,
                report.inconsistent,
                report.feeds_published,
                report.feeds_failed
            );
            Ok(())
        }
        Command::Regenerate { podcast } => {
            let podcast = db
                .get_podcast_by_key(&podcast)
                .await?
                .with_context(|| format!("No podcast with key {podcast:?}"))?;
            let job = ImportJob::new(Arc::new(db), &config);
            let path = job
                .publisher()
                .publish(podcast.id)
                .await
                .with_context(|| format!("Failed to regenerate feed for {}", podcast.key))?;
            println!("Wrote {}", path.display());
            Ok(())
        }
        Command::List => {
            for podcast in db.list_podcasts().await? {
                println!(
                    "{:>4}  {:<20}  {}  {}",
                    podcast.id, podcast.key, podcast.title, podcast.feed_link
                );
            }
            Ok(())
        }
        Command::Seed { file } => {
            let catalog = SeedCatalog::load(&file)
                .with_context(|| format!("Failed to load seed file {}", file.display()))?;
            let report = seed_catalog(&db, &catalog, &config.static_content_url).await?;
            println!(
                "Created {} podcast(s) with {} season(s), skipped {} existing",
                report.podcasts_created, report.seasons_created, report.podcasts_skipped
            );
            Ok(())
        }
    }
}

async fn open_database(path: &Path) -> Result<Database> {
    let path_str = path
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("Invalid UTF-8 in database path"))?;
    match Database::open(path_str).await {
        Ok(db) => Ok(db),
        Err(DatabaseError::InstanceLocked) => {
            eprintln!("Error: the catalog database is locked by another process.");
            std::process::exit(1);
        }
        Err(e) => Err(anyhow::anyhow!("Failed to open database: {}", e)),
    }
}

async fn run(db: Database, config: &Config) -> Result<()> {
    let job = ImportJob::new(Arc::new(db), config);
    let handle = ImportScheduler::new(job, config.import_interval()).start();

    // On non-Unix platforms only Ctrl-C is available
    #[cfg(unix)]
    {
        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;
        tokio::select! {
            _ = sigterm.recv() => tracing::info!("Received SIGTERM, shutting down gracefully"),
            _ = sigint.recv() => tracing::info!("Received SIGINT, shutting down gracefully"),
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        tracing::info!("Received Ctrl-C, shutting down gracefully");
    }

    handle
        .shutdown()
        .await
        .context("Import scheduler panicked")?;
    Ok(())
}
