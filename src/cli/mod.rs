use anyhow::Context;
use clap::{Parser, Subcommand};
use env_logger::Env;
use std::{fs::File, path::Path, path::PathBuf};

use crate::cancel::Cancellation;
use crate::config::{self, Config};
use crate::domain::track::{TrackId, TrackRecord};
use crate::ingest::{FileUpload, TrackIngestor, TrackUpload, error::IngestError};
use crate::storage::{content::FsContentStore, records::SqliteTrackStore, records::TrackOrder};
use crate::view::TrackView;

type Ingestor = TrackIngestor<SqliteTrackStore, FsContentStore>;

#[derive(Parser)]
#[command(name = "trackdeck")]
#[command(version = "0.1")]
#[command(about = "Audio track catalog with consistent file and metadata storage")]
pub struct Cli {
    /// Path to the config TOML file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Upload a new track
    Add {
        #[arg(short, long)]
        name: String,
        /// Release date, YYYY-MM-DD
        #[arg(short, long)]
        release: String,
        /// Audio file to upload
        #[arg(short, long)]
        file: PathBuf,
    },
    /// Change a track's metadata, optionally replacing its file
    Update {
        id: String,
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        release: String,
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Delete a track and its file
    Delete { id: String },
    /// Show one track
    Show {
        id: String,
        #[arg(long)]
        json: bool,
    },
    /// List all tracks
    List {
        /// Sort by release date instead of upload order
        #[arg(long)]
        by_release: bool,
        #[arg(long)]
        json: bool,
    },
}

/// Entrypoint for CLI, returns the process exit code
pub fn run() -> i32 {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match execute(cli) {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("Error: {e:#}");
            exit_code(&e)
        }
    }
}

/// 1 for errors caused by the input, 2 for everything else
fn exit_code(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<IngestError>() {
        Some(e) if e.is_client_error() => 1,
        _ => 2,
    }
}

fn execute(cli: Cli) -> anyhow::Result<()> {
    let cfg = Config::load(&cli.config.to_string_lossy())?;
    let ingestor = open_ingestor(&cfg)?;
    let cancel = || match cfg.ingest.timeout() {
        Some(timeout) => Cancellation::with_timeout(timeout),
        None => Cancellation::none(),
    };

    match cli.command {
        Commands::Add {
            name,
            release,
            file,
        } => {
            let upload = TrackUpload::new(name, release, file_upload(&file)?);
            let track = ingestor.create(upload, &cancel())?;
            println!("Track added:");
            print_track(&track);
        }

        Commands::Update {
            id,
            name,
            release,
            file,
        } => {
            let id = parse_id(&id)?;
            let upload = TrackUpload {
                name,
                release,
                file: file.as_deref().map(file_upload).transpose()?,
            };
            let track = ingestor.update(id, upload, &cancel())?;
            println!("Track updated:");
            print_track(&track);
        }

        Commands::Delete { id } => {
            let id = parse_id(&id)?;
            ingestor.delete(id)?;
            println!("Track {id} deleted");
        }

        Commands::Show { id, json } => {
            let track = ingestor.get(parse_id(&id)?)?;
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&TrackView::from_domain(&track))?
                );
            } else {
                print_track(&track);
            }
        }

        Commands::List { by_release, json } => {
            let order = if by_release {
                TrackOrder::Release
            } else {
                TrackOrder::Added
            };
            let tracks = ingestor.list(order)?;

            if json {
                let views = tracks.iter().map(TrackView::from_domain).collect::<Vec<_>>();
                println!("{}", serde_json::to_string_pretty(&views)?);
            } else if tracks.is_empty() {
                println!("No tracks yet");
            } else {
                for track in &tracks {
                    print_track(track);
                }
            }
        }
    }

    Ok(())
}

fn open_ingestor(cfg: &Config) -> anyhow::Result<Ingestor> {
    let records =
        SqliteTrackStore::new(&cfg.database).context("Failed to open track database")?;
    let content = open_content_store(&cfg.content_store)?;
    Ok(TrackIngestor::new(records, content))
}

fn open_content_store(cfg: &config::ContentStoreConfig) -> anyhow::Result<FsContentStore> {
    FsContentStore::new(&cfg.root).with_context(|| {
        format!(
            "Failed to prepare content store at {}",
            cfg.root.to_string_lossy()
        )
    })
}

fn parse_id(id: &str) -> Result<TrackId, IngestError> {
    TrackId::parse(id).map_err(|e| IngestError::Validation(format!("{e:#}")))
}

/// Opens a local file as an upload, its current length is the declared length
fn file_upload(path: &Path) -> anyhow::Result<FileUpload<File>> {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let reader = File::open(path)
        .with_context(|| format!("Failed to open {}", path.to_string_lossy()))?;
    let len = reader.metadata()?.len();

    Ok(FileUpload {
        file_name,
        len,
        reader,
    })
}

fn print_track(track: &TrackRecord) {
    let view = TrackView::from_domain(track);
    println!("  [{}]  {}", view.id, view.name);
    println!("    released: {}", view.release);
    println!("    size:     {}", view.size);
    println!("    duration: {}", view.duration);
}
