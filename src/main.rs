//! CLI entry point for the dendrite pipeline.
//!
//! Provides subcommands for building the augmented record table, the
//! current-time and sweep joins, generating per-sensor crop images, and
//! tabulating mean colours of a folder of images.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dendrite_pipeline::imaging::channel_mean_table;
use dendrite_pipeline::records::SweepFamily;
use dendrite_pipeline::{
    DataLayout, FileResolver, RecordStore, augment, generate::generate_sensor_crops, join_sweep,
    join_time_series, output,
};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "dendrite_pipeline")]
#[command(about = "Correlate IDC sensor measurements with dendrite growth in board scans", long_about = None)]
struct Cli {
    /// Data root containing the master sheet and satellite directories
    /// (defaults to $DENDRITE_DATA_ROOT, then the current directory)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// JSON file overriding the data layout
    #[arg(long, global = true)]
    layout: Option<PathBuf>,

    /// Number of parallel workers (default: number of CPUs)
    #[arg(short, long, global = true)]
    jobs: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the master sheet, score every sensor and write the record table
    Augment {
        /// CSV file to write the augmented records to
        #[arg(short, long, default_value = "augmented.csv")]
        output: PathBuf,
    },
    /// Join records with their current-vs-time traces
    CurrentTime {
        /// CSV file to write the joined samples to
        #[arg(short, long, default_value = "current_time.csv")]
        output: PathBuf,
    },
    /// Join records with their CF or CV sweep files
    Sweep {
        /// Sweep family: CF or CV
        #[arg(short, long)]
        family: SweepFamily,

        /// CSV file to write the joined samples to (default: sweep_<family>.csv)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Crop every board scan per sensor into the Imgscans_*_sensors directories
    GenerateCrops,
    /// Tabulate mean R/G/B of every image in a directory
    ChannelMeans {
        /// Directory of images
        #[arg(value_name = "DIR")]
        dir: PathBuf,

        /// CSV file to write the table to
        #[arg(short, long, default_value = "rgb_analysis.csv")]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/dendrite_pipeline.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("dendrite_pipeline.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    if let Some(jobs) = cli.jobs {
        rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build_global()
            .context("failed to configure worker pool")?;
    }

    let layout = load_layout(cli.layout.as_deref(), cli.root)?;
    info!(root = %layout.root.display(), "Using data root");
    let resolver = FileResolver::new(layout);

    match cli.command {
        Commands::Augment { output } => {
            let mut store = load_store(&resolver)?;
            let summary = augment(&mut store, &resolver);
            info!(
                records = summary.records,
                boards = summary.boards,
                scored = summary.scored,
                missing_images = summary.missing_images,
                geometry_errors = summary.geometry_errors,
                other_errors = summary.other_errors,
                mean_score = ?summary.mean_score,
                "Augment summary"
            );
            output::write_records(&output, store.records())
                .with_context(|| format!("failed to write {}", output.display()))?;
        }
        Commands::CurrentTime { output } => {
            let mut store = load_store(&resolver)?;
            augment(&mut store, &resolver);
            let rows = join_time_series(store.records(), &resolver);
            output::write_time_series(&output, &rows)
                .with_context(|| format!("failed to write {}", output.display()))?;
        }
        Commands::Sweep { family, output } => {
            let output = output
                .unwrap_or_else(|| PathBuf::from(format!("sweep_{}.csv", family.as_str().to_lowercase())));
            let mut store = load_store(&resolver)?;
            augment(&mut store, &resolver);
            let rows = join_sweep(store.records(), &resolver, family);
            output::write_sweep(&output, &rows)
                .with_context(|| format!("failed to write {}", output.display()))?;
        }
        Commands::GenerateCrops => {
            let store = load_store(&resolver)?;
            generate_sensor_crops(&store, &resolver).context("crop generation failed")?;
        }
        Commands::ChannelMeans { dir, output } => {
            let rows = channel_mean_table(&dir)
                .with_context(|| format!("failed to read images in {}", dir.display()))?;
            info!(images = rows.len(), "Channel means computed");
            output::write_csv(&output, rows)
                .with_context(|| format!("failed to write {}", output.display()))?;
        }
    }

    Ok(())
}

/// Resolves the data layout from `--layout`, then `--root` or `DENDRITE_DATA_ROOT`.
fn load_layout(layout_file: Option<&Path>, root: Option<PathBuf>) -> Result<DataLayout> {
    let mut layout = match layout_file {
        Some(path) => DataLayout::load(path)
            .with_context(|| format!("failed to load layout {}", path.display()))?,
        None => DataLayout::default(),
    };

    if let Some(root) = root.or_else(|| std::env::var_os("DENDRITE_DATA_ROOT").map(PathBuf::from)) {
        layout.root = root;
    }
    Ok(layout)
}

fn load_store(resolver: &FileResolver) -> Result<RecordStore> {
    let path = resolver.layout().master_path();
    let store = RecordStore::load(&path)
        .with_context(|| format!("failed to load master sheet {}", path.display()))?;

    let loaded = store.load_summary();
    let summary = store.summary();
    info!(
        rows_read = loaded.rows_read,
        kept = loaded.kept,
        incomplete_status = loaded.incomplete_status,
        missing_solution = loaded.missing_solution,
        missing_voltage = loaded.missing_voltage,
        unkeyed = loaded.unkeyed,
        duplicates = loaded.duplicates,
        boards = summary.boards,
        with_current_file = summary.with_current_file,
        "Record store ready"
    );
    Ok(store)
}
