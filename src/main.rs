use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod acquire;
mod aggregate;
mod pocketbase;

use acquire::acquire;
use aggregate::{aggregate, parse_batch, DEFAULT_OUTPUT_PATH};
use pocketbase::PocketBase;

/// Default PocketBase instance for local development.
const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8090";

#[derive(Parser, Debug)]
#[command(
    name = "shorts",
    version,
    about = "Photo acquisition and subtitle-manifest tooling for shorts production",
    subcommand_required = true,
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Download a group's photos into a local staging directory
    Fetch(FetchArgs),
    /// Merge subtitle annotations into an ordered manifest
    Save(SaveArgs),
}

#[derive(Parser, Debug)]
struct FetchArgs {
    /// Group identifier whose photos should be downloaded
    #[arg(value_parser = parse_group_id)]
    group_id: String,

    /// Maximum number of photos to request from the store
    #[arg(long, default_value_t = 50, value_parser = clap::value_parser!(u32).range(1..))]
    limit: u32,

    /// PocketBase base URL
    #[arg(long, value_name = "URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Staging directory for downloaded photos
    #[arg(long, value_name = "DIR", default_value = "temp")]
    temp_dir: PathBuf,
}

#[derive(Parser, Debug)]
struct SaveArgs {
    /// Serialized annotation batch ({"subtitles":[...]})
    #[arg(long, value_name = "JSON")]
    input: String,

    /// Output path for the manifest
    #[arg(long, value_name = "PATH")]
    output: Option<PathBuf>,
}

fn parse_group_id(raw: &str) -> Result<String, String> {
    if raw.trim().is_empty() {
        return Err("group id must not be empty".to_string());
    }
    Ok(raw.to_string())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Fetch(args) => cmd_fetch(args),
        Commands::Save(args) => cmd_save(args),
    }
}

fn cmd_fetch(args: FetchArgs) -> Result<()> {
    println!(
        "Fetching photos for group {} (limit {}).",
        args.group_id, args.limit
    );

    let store = PocketBase::new(&args.base_url);
    let result = acquire(&store, &args.group_id, args.limit as usize, &args.temp_dir)?;

    // Machine-parseable summary for the annotation producer.
    println!("Result JSON:");
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn cmd_save(args: SaveArgs) -> Result<()> {
    let batch = parse_batch(&args.input)?;
    let output_path = args
        .output
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_PATH));

    let manifest = aggregate(batch, &output_path)?;

    println!("Wrote manifest to {}", output_path.display());
    println!();
    println!("Phase distribution:");
    println!("  overview: {}", manifest.phase_summary.overview);
    println!("  before:   {}", manifest.phase_summary.before);
    println!("  process:  {}", manifest.phase_summary.process);
    println!("  after:    {}", manifest.phase_summary.after);
    println!();
    println!("{} subtitles total", manifest.total_count);
    Ok(())
}
