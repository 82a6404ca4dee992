use clap::Parser;
use lai_estimator::{AppError, Configuration, InMemoryRecordStore, Upload, UploadHandler};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::Level;

#[derive(Parser, Debug)]
#[command(author, version, about = "Estimate leaf area index from a field photo and write a heatmap")]
struct Args {
    /// Photo to analyse (JPEG, PNG or any format the image crate decodes)
    image: PathBuf,

    /// wheat, corn, sunflower or mixed
    #[arg(short, long)]
    crop_type: Option<String>,

    /// Optional TOML/YAML/JSON configuration file; LAI__* env vars override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory the heatmap PNG is written to
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt().with_max_level(level).init();
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    if let Err(e) = run(args).await {
        eprintln!("error [{}]: {}", e.user_code(), e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), AppError> {
    let configuration = Configuration::load(args.config.as_deref())?;
    let handler = UploadHandler::new(&configuration, Arc::new(InMemoryRecordStore::new()))?;

    let bytes = tokio::fs::read(&args.image).await?;
    let mut upload = Upload::new(bytes);
    if let Some(name) = args.image.file_name() {
        upload = upload.filename(name.to_string_lossy());
    }
    if let Some(crop_type) = args.crop_type {
        upload = upload.crop_type(crop_type);
    }

    let id = handler.submit(upload).await?;
    let record = handler.view(id).await?;

    tokio::fs::create_dir_all(&args.output_dir).await?;
    let heatmap_path = args.output_dir.join(&record.lai_heatmap_filename);
    tokio::fs::write(&heatmap_path, &record.lai_heatmap).await?;
    tracing::info!("Heatmap written to {}", heatmap_path.display());

    let summary = json!({
        "id": record.id,
        "name": record.name,
        "image_filename": record.image_filename,
        "crop_type": record.crop_type,
        "lai_avg": record.lai_avg,
        "lai_heatmap": heatmap_path,
        "calculated_at": record.calculated_at,
    });
    println!("{summary:#}");
    Ok(())
}
