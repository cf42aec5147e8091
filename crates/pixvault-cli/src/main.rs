//! Operator CLI: create libraries, import media through the full pipeline,
//! and inspect folder statistics.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use uuid::Uuid;

use pixvault_core::models::LibraryAdd;
use pixvault_core::{file_types, Config};
use pixvault_db::PgMetadataStore;
use pixvault_processing::{FfmpegService, StandardProber};
use pixvault_services::{IngestionCoordinator, JobProcessor};
use pixvault_storage::LocalBlobStore;
use pixvault_worker::{InMemoryJobQueue, WorkerPool, WorkerPoolConfig};

#[derive(Parser, Debug)]
#[command(name = "pixvault")]
#[command(about = "Pixvault media library tooling")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a new library (and its root folder).
    InitLibrary {
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: Option<String>,
        /// IANA time zone name, e.g. Europe/Paris.
        #[arg(long, default_value = "UTC")]
        time_zone: String,
    },
    /// Import a local picture or video and wait for processing to settle.
    Import {
        #[arg(long, value_name = "UUID")]
        library: Uuid,
        /// Target folder; defaults to the library root.
        #[arg(long, value_name = "UUID")]
        folder: Option<Uuid>,
        /// File to import.
        path: PathBuf,
    },
    /// Print a folder's aggregate statistics.
    Stats {
        #[arg(long, value_name = "UUID")]
        library: Uuid,
        /// Folder to report on; defaults to the library root.
        #[arg(long, value_name = "UUID")]
        folder: Option<Uuid>,
    },
    /// List the files in a folder.
    List {
        #[arg(long, value_name = "UUID")]
        library: Uuid,
        #[arg(long, value_name = "UUID")]
        folder: Option<Uuid>,
    },
}

struct App {
    coordinator: IngestionCoordinator,
    queue: Arc<InMemoryJobQueue>,
    pool: WorkerPool,
}

impl App {
    async fn build(config: &Config) -> Result<Self> {
        let store = Arc::new(
            PgMetadataStore::connect(&config.database_url)
                .await
                .context("Failed to connect to the metadata database")?,
        );
        store
            .run_migrations()
            .await
            .context("Failed to run database migrations")?;

        let blobs = Arc::new(
            LocalBlobStore::new(&config.blob_root)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to open blob store: {}", e))?,
        );

        let prober = Arc::new(StandardProber::new(config.ffprobe_path.clone()));
        let transcoder = Arc::new(FfmpegService::new(config.ffmpeg_path.clone()));
        let queue = Arc::new(InMemoryJobQueue::new(
            config.queue_capacity,
            config.max_redeliveries,
        ));

        let coordinator =
            IngestionCoordinator::new(store.clone(), blobs.clone(), prober, queue.clone());

        let processor = Arc::new(JobProcessor::new(store, blobs, queue.clone(), transcoder));
        let pool = WorkerPool::start(
            queue.clone(),
            processor,
            WorkerPoolConfig {
                prefetch: config.worker_prefetch,
            },
        );

        Ok(Self {
            coordinator,
            queue,
            pool,
        })
    }

    async fn resolve_folder(&self, library: Uuid, folder: Option<Uuid>) -> Result<Uuid> {
        match folder {
            Some(folder) => Ok(folder),
            None => {
                let root = self
                    .coordinator
                    .get_root_folder(library)
                    .await?
                    .context("Library has no root folder; does the library exist?")?;
                Ok(root.id)
            }
        }
    }

    async fn shutdown(&self) {
        self.pool.shutdown().await;
    }
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
    let config = Config::from_env()?;
    let app = App::build(&config).await?;

    let result = run(&app, args.command).await;
    app.shutdown().await;
    result
}

async fn run(app: &App, command: Command) -> Result<()> {
    match command {
        Command::InitLibrary {
            name,
            description,
            time_zone,
        } => {
            let time_zone = time_zone
                .parse()
                .map_err(|e| anyhow::anyhow!("Invalid time zone: {}", e))?;
            let library = app
                .coordinator
                .create_library(LibraryAdd {
                    name,
                    description,
                    time_zone,
                })
                .await?;
            let root = app
                .coordinator
                .get_root_folder(library.id)
                .await?
                .context("Root folder missing after creation")?;

            println!("Library created");
            println!("  id:          {}", library.id);
            println!("  root folder: {}", root.id);
        }

        Command::Import {
            library,
            folder,
            path,
        } => {
            let folder = app.resolve_folder(library, folder).await?;

            let filename = path
                .file_name()
                .and_then(|n| n.to_str())
                .context("Path has no usable file name")?
                .to_string();
            let ext = file_types::file_extension(&filename)
                .with_context(|| format!("No file extension on {}", filename))?;
            let mime_type = file_types::mime_for_extension(&ext)
                .with_context(|| format!("Unsupported file type: {}", ext))?;
            let size_bytes = tokio::fs::metadata(&path).await?.len() as i64;

            let file = app
                .coordinator
                .import_file(library, folder, &path, &filename, mime_type, size_bytes)
                .await?;

            println!("Imported {} ({} bytes), processing...", file.name, size_bytes);

            if !app.queue.settled(Duration::from_secs(600)).await {
                bail!("Processing did not settle within 10 minutes");
            }

            let file = app
                .coordinator
                .get_file(library, file.id)
                .await?
                .context("File row disappeared while processing")?;

            println!("Done");
            println!("  id:         {}", file.id);
            println!("  name:       {}", file.name);
            println!("  dimensions: {}x{}", file.width, file.height);
            println!(
                "  thumbnails: sm={} md={} lg={} bytes",
                file.thumb_sm_bytes, file.thumb_md_bytes, file.thumb_lg_bytes
            );
            if file.converted_bytes > 0 {
                println!("  converted:  {} bytes (mp4)", file.converted_bytes);
            }
            if let Some(make) = &file.camera_make {
                println!(
                    "  camera:     {} {}",
                    make,
                    file.camera_model.as_deref().unwrap_or("")
                );
            }
        }

        Command::Stats { library, folder } => {
            let folder = app.resolve_folder(library, folder).await?;
            let folder = app
                .coordinator
                .get_folder(library, folder)
                .await?
                .context("Folder not found")?;

            println!("Folder: {} ({})", folder.name, folder.id);
            println!("  files:           {}", folder.stats.file_count);
            println!("  original bytes:  {}", folder.stats.total_bytes);
            println!(
                "  thumbnail bytes: sm={} md={} lg={}",
                folder.stats.thumb_sm_bytes,
                folder.stats.thumb_md_bytes,
                folder.stats.thumb_lg_bytes
            );
            println!("  converted bytes: {}", folder.stats.converted_bytes);
        }

        Command::List { library, folder } => {
            let folder = app.resolve_folder(library, folder).await?;
            let files = app.coordinator.list_files(library, folder).await?;

            if files.is_empty() {
                println!("No files");
                return Ok(());
            }

            for file in files {
                let status = if file.is_processing {
                    "processing"
                } else {
                    "ready"
                };
                println!(
                    "{}  {:>10}  {}x{}  {}  {}",
                    file.id, file.original_bytes, file.width, file.height, status, file.name
                );
            }
        }
    }

    Ok(())
}
