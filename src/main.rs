use clap::{Parser, Subcommand};
use photo_veil::annotation::VisionClient;
use photo_veil::config::{self, ServiceConfig};
use photo_veil::imaging::RustBackend;
use photo_veil::pipeline::{PhotoService, PipelineConfig};
use photo_veil::storage::{JsonPhotoStore, LocalBlobStore};
use photo_veil::types::{FaceOperation, Filters, LogoDetection, Operation, TextFilter};
use photo_veil::version::Upload;
use photo_veil::{output, sweep};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "photo-veil")]
#[command(about = "Annotation-driven privacy masking for photographs")]
#[command(long_about = "\
Annotation-driven privacy masking for photographs

Each upload is sent to a vision service, the detected faces, logos, and text
matching your filters become a mask, and the photo is republished as a new
version with the mask applied:

  Redact   paint the selected regions black
  Focus    keep the selected regions sharp, blur everything else
  Blur     blur the selected regions, keep everything else sharp

Every version stores three artifacts, named {id}_{version}-{kind}.jpeg:
the untouched original, the masked full-size image, and a thumbnail.
Editing a photo without a new file reprocesses its stored original.

The vision API key is read from the environment variable named in
[annotation] api_key_env (VISION_API_KEY by default).

Run 'photo-veil gen-config' to generate a documented photo-veil.toml.")]
#[command(version)]
struct Cli {
    /// Config file (defaults to ./photo-veil.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

/// Filter settings for a publish.
#[derive(clap::Args, Clone)]
struct FilterArgs {
    /// Redact, Focus, or Blur (anything else means Blur)
    #[arg(long, default_value = "Blur")]
    operation: Operation,

    /// Text to mask: a substring, or `*` for all text
    #[arg(long, default_value = "*")]
    text: TextFilter,

    /// Mask detected logos: Yes or No
    #[arg(long, default_value = "Yes")]
    logo: LogoDetection,

    /// Faces to mask: All, Happy, Sad, Angry, Surprised, or None
    #[arg(long, default_value = "All")]
    face: FaceOperation,
}

impl From<FilterArgs> for Filters {
    fn from(args: FilterArgs) -> Self {
        Filters {
            operation: args.operation,
            text_of_interest: args.text,
            logo_detection: args.logo,
            face_operation: args.face,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// List published photos, newest first
    List,
    /// Show one photo record and its artifact URLs
    Show { id: String },
    /// Publish a new photo, or republish an existing one with new filters
    Upload {
        /// Existing photo to edit
        #[arg(long)]
        id: Option<String>,
        /// JPEG to upload (optional when editing)
        #[arg(long)]
        file: Option<PathBuf>,
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Delete a photo record (artifacts are left for `sweep`)
    Delete { id: String },
    /// Find artifacts no record points to
    Sweep {
        /// Delete them instead of only listing them
        #[arg(long)]
        apply: bool,
    },
    /// Print a stock photo-veil.toml with all options documented
    GenConfig,
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let command = match cli.command {
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
            return Ok(());
        }
        command => command,
    };

    let config = load_config(cli.config.as_deref())?;
    init_thread_pool(&config.processing);
    let store = JsonPhotoStore::open(&config.storage.records_path)?;
    let blobs = LocalBlobStore::new(&config.storage.blob_dir, &config.storage.public_base_url);

    if let Command::Sweep { apply } = command {
        let plan = sweep::run_sweep(&store, &blobs, apply)?;
        output::print_sweep_plan(&plan);
        return Ok(());
    }

    let annotator = VisionClient::from_env(
        config.annotation.endpoint.as_str(),
        &config.annotation.api_key_env,
        config.annotation.timeout(),
    )?;
    let service = PhotoService::new(
        store,
        blobs,
        annotator,
        RustBackend::new(),
        PipelineConfig::from(&config),
    );

    match command {
        Command::List => output::print_photo_list(&service.list_uploaded_photos()?),
        Command::Show { id } => output::print_photo(&service.get_photo(&id)?),
        Command::Upload { id, file, filters } => {
            let upload = file.map(|path| Upload {
                filename: client_filename(&path),
                path,
            });
            let published =
                service.create_or_update_photo(id.as_deref(), filters.into(), upload)?;
            output::print_published(&published);
        }
        Command::Delete { id } => {
            service.delete_photo(&id)?;
            println!("Deleted {}", id);
        }
        Command::Sweep { .. } | Command::GenConfig => {}
    }

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "photo_veil=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// An explicit `--config` must exist; the default file is optional.
fn load_config(path: Option<&Path>) -> Result<ServiceConfig, Box<dyn std::error::Error>> {
    match path {
        Some(path) if !path.exists() => {
            Err(format!("config file not found: {}", path.display()).into())
        }
        Some(path) => Ok(config::load_config(path)?),
        None => Ok(config::load_config(Path::new(config::DEFAULT_CONFIG_FILE))?),
    }
}

/// Initialize the rayon pool. Caps at the number of available cores.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}

fn client_filename(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
