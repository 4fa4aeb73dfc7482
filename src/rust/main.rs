use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use log::{error, info, warn};

use grainbench::split::{self, OutStrategy, SplitMode};
use grainbench::{ingestion, scoring, ClassifierKind, GrainModel, HarnessPaths, IngestionContext, ScoringContext};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Train the sample model and write result.json / ingestion_duration.json
    Ingest(IngestArgs),
    /// Score result.json against reference_data.csv and write scores.json
    Score(ScoreArgs),
    /// Split .npz files into per-year directories
    Split(SplitArgs),
}

#[derive(Args)]
struct IngestArgs {
    /// Directory with input_data.csv and the .npz samples [default: $GRAINBENCH_ROOT/input_data]
    #[arg(long)]
    input_dir: Option<PathBuf>,
    /// Directory for result.json and ingestion_duration.json [default: $GRAINBENCH_ROOT/output]
    #[arg(long)]
    output_dir: Option<PathBuf>,
    /// Histogram bins per channel
    #[arg(long, default_value_t = 32)]
    bins: usize,
    /// Downsampling grid edge length
    #[arg(long, default_value_t = 16)]
    grid: usize,
    /// Use k-nearest-neighbours with this k instead of the nearest-centroid classifier
    #[arg(long)]
    knn: Option<usize>,
    /// Skip feature standardization
    #[arg(long)]
    no_standardize: bool,
}

#[derive(Args)]
struct ScoreArgs {
    /// Directory with reference_data.csv [default: $GRAINBENCH_ROOT/input/ref]
    #[arg(long)]
    reference_dir: Option<PathBuf>,
    /// Directory with result.json [default: $GRAINBENCH_ROOT/input/res]
    #[arg(long)]
    predictions_dir: Option<PathBuf>,
    /// Directory for scores.json [default: $GRAINBENCH_ROOT/output]
    #[arg(long)]
    output_dir: Option<PathBuf>,
}

#[derive(Args)]
struct SplitArgs {
    /// Source directories containing .npz files
    #[arg(long, num_args = 1.., required = true)]
    dirs: Vec<PathBuf>,
    /// Where to place year-split outputs
    #[arg(long, value_enum, default_value_t = OutStrategy::Inplace)]
    out_strategy: OutStrategy,
    /// How to materialize split files
    #[arg(long, value_enum, default_value_t = SplitMode::Symlink)]
    mode: SplitMode,
    /// Restrict to specific years (default: detect from filenames)
    #[arg(long, num_args = 1..)]
    years: Option<Vec<String>>,
    /// Print actions without making changes
    #[arg(long)]
    dry_run: bool,
}

fn run_ingest(args: IngestArgs, paths: &HarnessPaths) -> anyhow::Result<()> {
    let ctx = IngestionContext::new(
        args.input_dir.unwrap_or_else(|| paths.input_data_dir()),
        args.output_dir.unwrap_or_else(|| paths.output_dir()),
    );
    info!("=== Ingestion ===");
    info!("Input directory: {:?}", ctx.input_dir);
    info!("Output directory: {:?}", ctx.output_dir);

    let classifier = match args.knn {
        Some(k) => ClassifierKind::KNearest { k },
        None => ClassifierKind::NearestCentroid,
    };
    let report = ingestion::run(&ctx, || {
        GrainModel::builder()
            .with_histogram_bins(args.bins)?
            .with_downsample(args.grid, args.grid)?
            .with_classifier(classifier)
            .with_standardization(!args.no_standardize)
            .build()
    })
    .context("ingestion failed")?;

    if report.test_is_train_fallback {
        warn!("This run evaluated on its own training data and must not be used as a score");
    }
    match report.duration_minutes {
        Some(minutes) => info!("Ingestion duration: {} minutes", minutes),
        None => warn!("Ingestion duration unavailable"),
    }
    info!(
        "=== Ingestion complete: {} train / {} test samples, {} predictions ===",
        report.train_samples, report.test_samples, report.result.num_predictions
    );
    Ok(())
}

fn run_score(args: ScoreArgs, paths: &HarnessPaths) -> anyhow::Result<()> {
    let ctx = ScoringContext::new(
        args.reference_dir.unwrap_or_else(|| paths.reference_dir()),
        args.predictions_dir.unwrap_or_else(|| paths.predictions_dir()),
        args.output_dir.unwrap_or_else(|| paths.output_dir()),
    );
    info!("=== Scoring ===");
    let started = std::time::Instant::now();
    let scores = scoring::run(&ctx).context("scoring failed")?;
    info!(
        "=== Scoring complete (took {:.2?}): score={} ({}/{}) ===",
        started.elapsed(),
        scores.record.score,
        scores.record.correct,
        scores.record.total
    );
    Ok(())
}

fn run_split(args: SplitArgs) -> anyhow::Result<()> {
    for dir in &args.dirs {
        split::split_one_directory(dir, args.out_strategy, args.mode, args.years.as_deref(), args.dry_run)
            .with_context(|| format!("failed to split {:?}", dir))?;
    }
    Ok(())
}

fn main() -> ExitCode {
    grainbench::init_logger();
    let cli = Cli::parse();
    let paths = HarnessPaths::from_env();

    let result = match cli.command {
        Command::Ingest(args) => run_ingest(args, &paths),
        Command::Score(args) => run_score(args, &paths),
        Command::Split(args) => run_split(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
