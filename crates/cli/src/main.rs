mod config;
mod progress;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use content_migrate_core::config::default_sources;
use content_migrate_core::ndjson::{read_ndjson, write_ndjson};
use content_migrate_core::repair::repair_site_references;
use content_migrate_core::store::{HttpStore, MemoryStore};
use content_migrate_core::{
    EventBus, Exporter, HttpStoreProvider, Importer, MigrationBatch, MigrationConfig,
    Orchestrator, SiteTag, SourceConfig,
};

use crate::config::{AppConfig, LogFormat};

#[derive(Parser)]
#[command(name = "content-migrate")]
#[command(version)]
#[command(about = "Consolidate legacy CMS datasets into one multi-site dataset", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export one source project to `<out-dir>/<site>.ndjson`
    Export {
        /// Source project id
        project_id: String,

        /// Site tag the documents belong to
        #[arg(value_parser = SiteTag::parse)]
        site: SiteTag,

        /// Source dataset
        #[arg(long, default_value = content_migrate_core::config::DEFAULT_DATASET)]
        dataset: String,

        /// Output directory
        #[arg(long, default_value = "exports")]
        out_dir: PathBuf,

        /// Read token, for private source datasets
        #[arg(long, env = "SOURCE_TOKEN", hide_env_values = true)]
        token: Option<String>,
    },

    /// Import a file written by `export` into the target dataset
    Import {
        /// NDJSON file of consolidated documents
        file: PathBuf,
    },

    /// Export and import every source into the target dataset
    MigrateAll {
        /// JSON array of sources; defaults to the built-in legacy sites
        #[arg(long, value_name = "FILE")]
        sources: Option<PathBuf>,

        /// Run against an in-memory target instead of writing
        #[arg(long)]
        dry_run: bool,

        /// Also write the report as JSON
        #[arg(long, value_name = "FILE")]
        report: Option<PathBuf>,
    },

    /// Re-point stale references of one site into its namespace
    Repair {
        #[arg(value_parser = SiteTag::parse)]
        site: SiteTag,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (dev convenience)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let config = AppConfig::from_env().context("failed to load config")?;
    init_tracing(&config);

    match cli.command {
        Commands::Export {
            project_id,
            site,
            dataset,
            out_dir,
            token,
        } => export(&config, project_id, site, dataset, &out_dir, token).await,
        Commands::Import { file } => import(&config, &file).await,
        Commands::MigrateAll {
            sources,
            dry_run,
            report,
        } => migrate_all(&config, sources.as_deref(), dry_run, report.as_deref()).await,
        Commands::Repair { site } => repair(&config, &site).await,
    }
}

fn init_tracing(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match config.log_format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Human => builder.with_target(false).init(),
    }
}

async fn export(
    config: &AppConfig,
    project_id: String,
    site: SiteTag,
    dataset: String,
    out_dir: &Path,
    token: Option<String>,
) -> anyhow::Result<()> {
    let mut settings = config.project(project_id.clone());
    settings.dataset = dataset;
    settings.token = token;
    let store = HttpStore::new(&settings)?;
    let source = SourceConfig {
        name: project_id,
        site,
        project: settings,
    };

    let events = EventBus::default();
    let printer = progress::spawn_printer(&events);
    let outcome = Exporter::new(&store, &events).export(&source).await;
    drop(events);
    printer.await?;

    let path = out_dir.join(format!("{}.ndjson", source.site));
    let written = write_ndjson(&path, outcome.batch.iter())
        .with_context(|| format!("failed to write {}", path.display()))?;
    println!(
        "Exported {written} documents to {} ({} rejected, {} types skipped)",
        path.display(),
        outcome.rejected.len(),
        outcome.skipped_types.len()
    );
    Ok(())
}

async fn import(config: &AppConfig, file: &Path) -> anyhow::Result<()> {
    let target = config.target();
    target.require_write_access()?;

    let mut invalid = 0;
    let mut batch = MigrationBatch::new();
    for line in read_ndjson(file).with_context(|| format!("failed to read {}", file.display()))? {
        match line {
            Ok(document) => batch.push(document),
            Err(error) => {
                tracing::warn!(%error, "skipping invalid line");
                invalid += 1;
            }
        }
    }

    let store = HttpStore::new(&target)?;
    let events = EventBus::default();
    let printer = progress::spawn_printer(&events);
    let stats = Importer::new(&store, &events).import(&batch).await;
    drop(events);
    printer.await?;

    println!(
        "Imported {} documents into {}, {} failed, {} invalid lines",
        stats.imported,
        store_label(&target),
        stats.failed,
        invalid
    );
    Ok(())
}

async fn migrate_all(
    config: &AppConfig,
    sources_file: Option<&Path>,
    dry_run: bool,
    report_file: Option<&Path>,
) -> anyhow::Result<()> {
    let target = config.target();
    target.require_write_access()?;

    let sources: Vec<SourceConfig> = match sources_file {
        Some(path) => SourceConfig::load_all(path, &config.project(""))
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => default_sources()
            .into_iter()
            .map(|source| SourceConfig {
                project: config.project(source.project.project_id.clone()),
                ..source
            })
            .collect(),
    };
    let label = store_label(&target);

    let scratch = Arc::new(MemoryStore::new());
    let provider = if dry_run {
        HttpStoreProvider::dry_run(scratch.clone())
    } else {
        HttpStoreProvider::new()
    };
    let orchestrator = Orchestrator::new(MigrationConfig::new(target, sources), provider)?;

    let printer = progress::spawn_printer(orchestrator.events());
    let report = orchestrator.run().await;
    drop(orchestrator);
    printer.await?;

    println!("\n{report}");
    if let Some(path) = report_file {
        let file = std::fs::File::create(path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        serde_json::to_writer_pretty(file, &report)?;
    }
    if dry_run {
        println!(
            "Dry run: {} documents staged in memory, nothing written to {label}",
            scratch.len().await
        );
    }
    Ok(())
}

async fn repair(config: &AppConfig, site: &SiteTag) -> anyhow::Result<()> {
    let target = config.target();
    target.require_write_access()?;

    let store = HttpStore::new(&target)?;
    let stats = repair_site_references(&store, site).await?;
    for (id, error) in &stats.failures {
        println!("  failed {id}: {error}");
    }
    println!(
        "Repaired {} of {} documents for {site} ({} failed)",
        stats.updated,
        stats.scanned,
        stats.failures.len()
    );
    Ok(())
}

fn store_label(settings: &content_migrate_core::ProjectSettings) -> String {
    format!("{}/{}", settings.project_id, settings.dataset)
}
