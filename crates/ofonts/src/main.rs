//! The `ofonts` CLI: serves font bundles over HTTP, or builds one bundle to a
//! local file.

use anyhow::{Context, Result};
use async_std::fs::File;
use async_std::io::WriteExt;
use clap::{Args, Parser, Subcommand};
use colored::*;
use fontbundle_core::config::ServiceConfig;
use fontbundle_core::ItemStatus;
use fontbundle_stem::{ArchiveAssembler, RequestHandler};
use futures::channel::mpsc;
use futures::StreamExt;
use ofonts::api::ApiState;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use typecrab::{AssetCache, AssetResolver, FamilyCatalog, SurfUpstream, Upstream};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
struct SourceArgs {
    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,
    /// API key for the family directory service
    #[arg(long, env = "FONTBUNDLE_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
    /// Asset cache directory
    #[arg(long, env = "FONTBUNDLE_CACHE")]
    cache_dir: Option<PathBuf>,
    /// Load the family catalog from a TOML file instead of the directory service
    #[arg(long)]
    catalog_file: Option<PathBuf>,
    /// Cache fills in flight per request
    #[arg(long)]
    parallelism: Option<usize>,
}

impl SourceArgs {
    fn resolve(&self) -> Result<ServiceConfig> {
        let base = match &self.config {
            Some(path) => ServiceConfig::load(path)?,
            None => ServiceConfig::default(),
        };
        let mut config = base.apply_env();
        if let Some(key) = &self.api_key {
            config.api_key = Some(key.clone());
        }
        if let Some(dir) = &self.cache_dir {
            config.cache_dir = Some(dir.clone());
        }
        if let Some(file) = &self.catalog_file {
            config.catalog_file = Some(file.clone());
        }
        if let Some(parallelism) = self.parallelism {
            config.parallelism = parallelism;
        }
        Ok(config)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// HTTP server address
        #[arg(long, default_value = "127.0.0.1:8080")]
        addr: String,
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Build one bundle for a family and write it to a file
    Fetch {
        /// Family name, e.g. "Open Sans"
        #[arg(long)]
        family: String,
        /// Asset format (woff2 or ttf)
        #[arg(long, default_value = "woff2")]
        format: String,
        /// Comma separated weights; all nine when omitted
        #[arg(long)]
        weights: Option<String>,
        /// Output zip file; defaults to the bundle's download name
        #[arg(long)]
        out: Option<PathBuf>,
        #[command(flatten)]
        source: SourceArgs,
    },
    /// List catalog families
    Families {
        /// Show at most this many
        #[arg(long, default_value = "50")]
        limit: usize,
        #[command(flatten)]
        source: SourceArgs,
    },
}

#[async_std::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = log::LevelFilter::from_str(&cli.log_level)
        .with_context(|| format!("Unknown log level '{}'", cli.log_level))?;
    tide::log::with_level(level);

    match cli.command {
        Commands::Serve { addr, source } => {
            let config = source.resolve()?;
            let handler = build_handler(&config).await?;

            println!(
                "🚀 Serving {} families at {}",
                handler.catalog().len().to_string().cyan(),
                addr.cyan()
            );
            let app = ofonts::server(ApiState {
                handler,
                stream_capacity: config.stream_capacity,
            });
            app.listen(addr).await?;
        }
        Commands::Fetch {
            family,
            format,
            weights,
            out,
            source,
        } => {
            let config = source.resolve()?;
            let handler = build_handler(&config).await?;
            let job = handler.download_by_name(Some(&format), Some(&family), weights.as_deref())?;
            let out = out.unwrap_or_else(|| PathBuf::from(&job.file_name));

            println!("📥 Bundling {} into {}", family.cyan(), out.display());
            let (mut tx, mut rx) = mpsc::channel::<Vec<u8>>(config.stream_capacity.max(1));
            let target = out.clone();
            let writer = async_std::task::spawn(async move {
                let mut file = File::create(async_std::path::Path::new(&target)).await?;
                while let Some(chunk) = rx.next().await {
                    file.write_all(&chunk).await?;
                }
                file.flush().await?;
                Ok::<_, std::io::Error>(())
            });

            let report = handler.stream(&job, &mut tx).await?;
            drop(tx);
            writer
                .await
                .with_context(|| format!("Could not write {}", out.display()))?;

            for outcome in &report.outcomes {
                match &outcome.status {
                    ItemStatus::Stored { entry_name, bytes } => {
                        println!("  ✅ {} ({} bytes)", entry_name, bytes)
                    }
                    ItemStatus::Failed { kind, reason } => {
                        println!("  ❌ {} [{}] {}", outcome.weight, kind, reason.red())
                    }
                }
            }
            println!(
                "{} stored, {} failed",
                report.stored().to_string().green(),
                report.failed().to_string().red()
            );
        }
        Commands::Families { limit, source } => {
            let config = source.resolve()?;
            let catalog = load_catalog(&config, &SurfUpstream::new()).await?;
            for (i, family) in catalog.families().iter().take(limit).enumerate() {
                println!("{:>4}  {}", i + 1, family.upstream);
            }
            println!("({} families in catalog)", catalog.len());
        }
    }

    Ok(())
}

async fn load_catalog(config: &ServiceConfig, upstream: &dyn Upstream) -> Result<FamilyCatalog> {
    match &config.catalog_file {
        Some(path) => FamilyCatalog::from_file(path),
        None => FamilyCatalog::load(
            upstream,
            &config.directory_url,
            config.api_key.as_deref(),
        )
        .await
        .context("Could not load the family catalog"),
    }
}

/// Wires catalog, resolver, cache and assembler. The catalog loads exactly
/// once; a failure here stops the process.
async fn build_handler(config: &ServiceConfig) -> Result<RequestHandler> {
    let upstream: Arc<dyn Upstream> = Arc::new(SurfUpstream::new());
    let catalog = load_catalog(config, upstream.as_ref()).await?;

    let cache_dir = config.resolved_cache_dir()?;
    std::fs::create_dir_all(&cache_dir)
        .with_context(|| format!("Could not create cache directory {:?}", cache_dir))?;
    log::info!("Asset cache at {:?}", cache_dir);

    let resolver = AssetResolver::new(upstream.clone(), config.manifest_url.clone());
    let cache = AssetCache::new(cache_dir, resolver, upstream);
    Ok(RequestHandler::new(
        Arc::new(catalog),
        ArchiveAssembler::new(cache, config.parallelism),
    ))
}
