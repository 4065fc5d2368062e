use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use tsdiscord_core::{
    DiscordConfig, DistanceMetric, Euclidean, Manhattan, Normalization, Threshold, reference,
};
use tsdiscord_io::{ExperimentName, ResultWriter, SeriesReader};

#[derive(Parser)]
#[command(name = "tsdiscord")]
#[command(about = "Brute-force time series discord detection")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable verbose (debug-level) logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Number of threads for parallel computation (defaults to all cores)
    #[arg(long, global = true)]
    threads: Option<usize>,
}

#[derive(Subcommand)]
enum Command {
    /// Find the window(s) whose nearest non-self match is farthest away
    Detect {
        /// Path to the input CSV file (`value` or `time,value`)
        #[arg(long)]
        data: PathBuf,

        /// Window length n
        #[arg(long)]
        window: usize,

        /// Maximum distance for a pair to count as a match
        #[arg(long)]
        threshold: Option<f64>,

        /// Distance metric: "euclidean" or "manhattan"
        #[arg(long, default_value = "euclidean")]
        metric: String,

        /// Experiment name for output files (must match [a-zA-Z0-9_-]+)
        #[arg(long)]
        experiment: String,

        /// Output directory for result files
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,
    },

    /// List every non-self match of one window
    Matches {
        /// Path to the input CSV file (`value` or `time,value`)
        #[arg(long)]
        data: PathBuf,

        /// 1-based start position of the query window
        #[arg(long)]
        start: usize,

        /// Window length n
        #[arg(long)]
        window: usize,

        /// Maximum distance for a pair to count as a match
        #[arg(long)]
        threshold: Option<f64>,

        /// Compare z-normalized windows instead of raw values
        #[arg(long, default_value_t = false)]
        normalize: bool,

        /// Distance metric: "euclidean" or "manhattan"
        #[arg(long, default_value = "euclidean")]
        metric: String,

        /// Experiment name for output files (must match [a-zA-Z0-9_-]+)
        #[arg(long)]
        experiment: String,

        /// Output directory for result files
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,
    },
}

// --- JSON stdout output structs ---

#[derive(Serialize)]
struct DetectOutput {
    experiment: String,
    series_len: usize,
    window_len: usize,
    threshold: Option<f64>,
    score: f64,
    discord_starts: Vec<usize>,
    output: PathBuf,
}

#[derive(Serialize)]
struct MatchesOutput {
    experiment: String,
    query_start: usize,
    window_len: usize,
    normalize: bool,
    threshold: Option<f64>,
    match_starts: Vec<usize>,
    output: PathBuf,
}

fn parse_metric(s: &str) -> Result<&'static dyn DistanceMetric> {
    match s {
        "euclidean" => Ok(&Euclidean),
        "manhattan" => Ok(&Manhattan),
        other => anyhow::bail!("unknown metric: {other} (expected euclidean or manhattan)"),
    }
}

fn parse_threshold(h: Option<f64>) -> Result<Option<Threshold>> {
    h.map(Threshold::new)
        .transpose()
        .context("invalid --threshold")
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match (cli.verbose, cli.quiet) {
        (true, _) => "debug",
        (_, true) => "error",
        _ => "info",
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure thread pool")?;
        info!(threads, "thread pool configured");
    }

    match cli.command {
        Command::Detect {
            data,
            window,
            threshold,
            metric,
            experiment,
            output_dir,
        } => {
            let experiment_name = ExperimentName::new(experiment.clone())?;
            let metric = parse_metric(&metric)?;
            let threshold = parse_threshold(threshold)?;

            let series = SeriesReader::new(&data)
                .read()
                .context("failed to read input CSV")?;

            let mut config = DiscordConfig::new(window).context("invalid --window")?;
            if let Some(h) = threshold {
                config = config.with_threshold(h);
            }
            let discords = config
                .find_with(&series, metric)
                .context("discord search failed")?;

            let writer = ResultWriter::new(&output_dir, experiment_name)?;
            let path = writer.write_discords(&discords)?;

            let output = DetectOutput {
                experiment,
                series_len: series.len(),
                window_len: window,
                threshold: threshold.map(Threshold::value),
                score: discords.score.value(),
                discord_starts: discords.starts(),
                output: path,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Matches {
            data,
            start,
            window,
            threshold,
            normalize,
            metric,
            experiment,
            output_dir,
        } => {
            let experiment_name = ExperimentName::new(experiment.clone())?;
            let metric = parse_metric(&metric)?;
            let threshold = parse_threshold(threshold)?;
            let mode = if normalize {
                Normalization::ZNormalized
            } else {
                Normalization::Raw
            };

            let series = SeriesReader::new(&data)
                .read()
                .context("failed to read input CSV")?;
            let query = series
                .window(start, window)
                .context("invalid query window")?;

            let matches = reference::find_non_self_matches(&query, threshold, metric, mode)
                .context("match search failed")?;
            info!(n_matches = matches.len(), "matches found");

            let writer = ResultWriter::new(&output_dir, experiment_name)?;
            let path = writer.write_matches(&query, &matches, threshold, mode)?;

            let output = MatchesOutput {
                experiment,
                query_start: start,
                window_len: window,
                normalize,
                threshold: threshold.map(Threshold::value),
                match_starts: matches.iter().map(|w| w.start()).collect(),
                output: path,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
