//! Command-line interface for castkeep.
//!
//! Provides commands for creating productions, applying show/episode/asset
//! documents, validating, building feeds, deleting resources, and running
//! the import worker.

use std::io::{self, BufRead, Read};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use crate::assets::Importer;
use crate::config::Config;
use crate::domain::{Document, ResourceKind};
use crate::http::ReqwestClient;
use crate::queue::{run_worker, ImportTask, LocalQueue, NoopQueue, TaskQueue};
use crate::service::{Caller, CatalogService};
use crate::store::{Catalog, FsBlobStore, SqliteKv};

/// castkeep - Podcast catalog and feed publication engine
#[derive(Parser, Debug)]
#[command(name = "castkeep")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Owner account for mutations
    #[arg(long, env = "CASTKEEP_OWNER", default_value = "default", global = true)]
    pub owner: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a production
    Create {
        /// Production name (normalized to a slug, unique per owner)
        name: String,

        /// Display title
        #[arg(short, long)]
        title: Option<String>,

        /// Short summary
        #[arg(short, long, default_value = "")]
        summary: String,
    },

    /// Show production details
    Show {
        /// Production GUID
        guid: String,
    },

    /// List the resources of a production
    Resources {
        /// Production GUID
        guid: String,

        /// Filter by resource kind
        #[arg(short, long, value_enum)]
        kind: Option<KindArg>,
    },

    /// Check whether a production is buildable
    Validate {
        /// Production GUID
        guid: String,
    },

    /// Build and publish the feed
    Build {
        /// Production GUID
        guid: String,

        /// Run the full pipeline but write nothing
        #[arg(long)]
        validate_only: bool,
    },

    /// Apply a show/episode/asset document to a production
    Apply {
        /// Production GUID
        guid: String,

        /// YAML document file (reads from stdin if not provided)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Delete a resource (and invalidate its production if needed)
    Delete {
        /// Resource GUID
        guid: String,
    },

    /// Run the import worker over tasks read from stdin (JSON lines)
    Worker,

    /// Show resolved configuration (debug)
    Config,
}

/// Resource kind for CLI filtering
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum KindArg {
    Show,
    Episode,
    Asset,
}

impl From<KindArg> for ResourceKind {
    fn from(k: KindArg) -> Self {
        match k {
            KindArg::Show => ResourceKind::Show,
            KindArg::Episode => ResourceKind::Episode,
            KindArg::Asset => ResourceKind::Asset,
        }
    }
}

/// Everything a command needs, wired from the resolved config.
struct Runtime {
    catalog: Arc<Catalog>,
    blob: Arc<FsBlobStore>,
    http: Arc<ReqwestClient>,
    config: Config,
}

impl Runtime {
    fn open() -> Result<Self> {
        let config = Config::load()?;
        let catalog = Arc::new(Catalog::new(Arc::new(SqliteKv::open(
            &config.catalog_path(),
        )?)));
        let blob = Arc::new(FsBlobStore::open(&config.storage_dir)?);
        Ok(Self {
            catalog,
            blob,
            http: Arc::new(ReqwestClient::new()),
            config,
        })
    }

    fn service(&self, queue: Arc<dyn TaskQueue>) -> CatalogService {
        CatalogService::new(
            self.catalog.clone(),
            self.blob.clone(),
            self.http.clone(),
            queue,
            self.config.cdn_url.clone(),
        )
    }

    fn importer(&self) -> Arc<Importer> {
        Arc::new(Importer::new(
            self.catalog.clone(),
            self.blob.clone(),
            self.http.clone(),
        ))
    }
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        let caller = Caller::new(&self.owner);
        match self.command {
            Commands::Create {
                name,
                title,
                summary,
            } => create_production(&caller, &name, title, &summary).await,
            Commands::Show { guid } => show_production(&guid).await,
            Commands::Resources { guid, kind } => list_resources(&guid, kind).await,
            Commands::Validate { guid } => validate(&guid).await,
            Commands::Build {
                guid,
                validate_only,
            } => build(&guid, validate_only).await,
            Commands::Apply { guid, file } => apply(&caller, &guid, file).await,
            Commands::Delete { guid } => delete(&caller, &guid).await,
            Commands::Worker => worker().await,
            Commands::Config => show_config().await,
        }
    }
}

async fn create_production(
    caller: &Caller,
    name: &str,
    title: Option<String>,
    summary: &str,
) -> Result<()> {
    let runtime = Runtime::open()?;
    let service = runtime.service(Arc::new(NoopQueue));

    let title = title.unwrap_or_else(|| name.to_string());
    let production = service.create_production(caller, name, &title, summary)?;

    println!("{}", production.guid);
    eprintln!("Created production '{}' ({})", production.name, production.guid);
    Ok(())
}

async fn show_production(guid: &str) -> Result<()> {
    let runtime = Runtime::open()?;
    let service = runtime.service(Arc::new(NoopQueue));

    let p = service.get_production(guid)?;
    println!("GUID:      {}", p.guid);
    println!("Name:      {}", p.name);
    println!("Owner:     {}", p.owner);
    println!("Title:     {}", p.title);
    println!("Summary:   {}", p.summary);
    println!("Published: {}", p.published);
    println!("Build:     {}", p.build_date);
    println!("Latest:    {}", p.latest_publish_date);
    Ok(())
}

async fn list_resources(guid: &str, kind: Option<KindArg>) -> Result<()> {
    let runtime = Runtime::open()?;
    let service = runtime.service(Arc::new(NoopQueue));

    let rows = service.list_resources(guid, kind.map(ResourceKind::from))?;
    if rows.is_empty() {
        println!("No resources found for production {}", guid);
        return Ok(());
    }

    println!("{:<34} {:<8} {:<30} {:<12}", "GUID", "KIND", "NAME", "PUBLISHED");
    println!("{}", "-".repeat(86));
    for row in rows {
        println!(
            "{:<34} {:<8} {:<30} {:<12}",
            row.guid,
            row.kind.to_string(),
            row.name,
            row.published
        );
    }
    Ok(())
}

async fn validate(guid: &str) -> Result<()> {
    let runtime = Runtime::open()?;
    let service = runtime.service(Arc::new(NoopQueue));

    match service.validate_production(guid) {
        Ok(()) => {
            println!("Production {} is buildable", guid);
            Ok(())
        }
        Err(e) => {
            eprintln!("Production {} is not buildable: {}", guid, e);
            std::process::exit(1);
        }
    }
}

async fn build(guid: &str, validate_only: bool) -> Result<()> {
    let runtime = Runtime::open()?;
    let service = runtime.service(Arc::new(NoopQueue));

    let xml = service.build_feed(guid, validate_only).await?;
    println!("{}", xml);
    if validate_only {
        eprintln!("[Feed for {} validated, nothing written]", guid);
    } else {
        eprintln!("[Feed for {} published]", guid);
    }
    Ok(())
}

/// Apply a document, then service any imports it scheduled before
/// returning, so the command leaves the blob store complete.
async fn apply(caller: &Caller, guid: &str, file: Option<PathBuf>) -> Result<()> {
    let text = if let Some(path) = file {
        std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read document: {}", path.display()))?
    } else {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read from stdin")?;
        buffer
    };
    if text.trim().is_empty() {
        anyhow::bail!("No document provided. Use --file <path> or pipe to stdin");
    }
    let doc = Document::from_yaml(&text)?;

    let runtime = Runtime::open()?;
    let (queue, rx) = LocalQueue::new();
    let service = runtime.service(queue.clone());

    let row = service.update_resource(caller, guid, doc).await?;
    eprintln!("Applied {} '{}' ({})", row.kind, row.name, row.guid);

    // Drop every sender so the worker stops once the queue drains.
    drop(service);
    drop(queue);
    run_worker(rx, runtime.importer()).await;
    Ok(())
}

async fn delete(caller: &Caller, guid: &str) -> Result<()> {
    let runtime = Runtime::open()?;
    let service = runtime.service(Arc::new(NoopQueue));

    let row = service.delete_resource(caller, guid).await?;
    eprintln!("Deleted {} '{}' ({})", row.kind, row.name, row.guid);
    Ok(())
}

/// Read `ImportTask` JSON lines from stdin and run them to completion.
async fn worker() -> Result<()> {
    let runtime = Runtime::open()?;
    let (queue, rx) = LocalQueue::new();

    let mut count = 0usize;
    for line in io::stdin().lock().lines() {
        let line = line.context("Failed to read from stdin")?;
        if line.trim().is_empty() {
            continue;
        }
        let task: ImportTask =
            serde_json::from_str(&line).context("Invalid import task line")?;
        queue.enqueue(task).await?;
        count += 1;
    }
    drop(queue);

    eprintln!("Processing {} import task(s)", count);
    run_worker(rx, runtime.importer()).await;
    Ok(())
}

/// Show the resolved configuration (for debugging)
async fn show_config() -> Result<()> {
    let config = Config::load()?;

    println!("castkeep configuration");
    println!();
    println!(
        "Config file: {}",
        config
            .config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!();
    println!("Paths:");
    println!("  Home:    {}", config.home.display());
    println!("  Catalog: {}", config.catalog_path().display());
    println!("  Storage: {}", config.storage_dir.display());
    println!();
    println!("CDN base URL: {}", config.cdn_url);
    Ok(())
}
