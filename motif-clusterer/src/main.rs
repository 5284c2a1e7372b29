use clap::Parser;
use motif_cluster_rs::meme::read_ppm_file_with_pseudocount;
use motif_cluster_rs::{cluster_labels, ClusterConfig, MotifCollection, MotifError, Partition};
use polars::prelude::*;
use std::fs::{self, File};
use std::path::Path;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(thiserror::Error, Debug)]
pub enum ClustererError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),

    #[error("Invalid config file: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Motif error: {0}")]
    Motif(#[from] MotifError),
}

#[derive(Parser)]
#[command(
    name = "motif-clusterer",
    about = "Groups DNA binding motifs into clusters by ungapped alignment distance",
    long_about = "Reads position probability matrices from a MEME file, computes every pairwise \
                  motif distance by sliding the motifs past each other, builds an agglomerative \
                  merge tree and cuts it into the requested number of clusters. Writes one \
                  motif,cluster row per motif.",
    version,
    after_help = "Example usage:\n    \
                  motif-clusterer motifs.meme clusters.csv --k 8 --linkage UPGMA\n    \
                  motif-clusterer motifs.meme clusters.csv --metric js --mode overlap --pseudocount 0.5\n    \
                  motif-clusterer motifs.meme clusters.csv --config clustering.toml",
    color = clap::ColorChoice::Always
)]
#[derive(Debug)]
struct Args {
    /// Path to .meme format file containing the motifs' letter-probability matrices
    #[arg(value_name = "PWM_FILE")]
    pwm_file: String,

    /// Path for the output CSV file
    /// Will create output directory if it doesn't exist
    #[arg(value_name = "OUTPUT_FILE")]
    output_file: String,

    /// TOML file with clustering settings; command line options take precedence
    #[arg(long)]
    config: Option<String>,

    /// Number of clusters to produce
    #[arg(long)]
    k: Option<usize>,

    /// Linkage rule: single, complete, UPGMA or WPGMA
    #[arg(long)]
    linkage: Option<String>,

    /// Column metric: euclidean, pearson, kl or js
    #[arg(long)]
    metric: Option<String>,

    /// Alignment mode: expand (pad with background) or overlap
    #[arg(long)]
    mode: Option<String>,

    /// Reduction of per-position distances: mean, median or max
    #[arg(long)]
    aggregator: Option<String>,

    /// Pseudocount added to every probability before comparison
    #[arg(long)]
    pseudocount: Option<f64>,
}

fn load_config(args: &Args) -> Result<ClusterConfig, ClustererError> {
    let mut config = match &args.config {
        Some(path) => toml::from_str(&fs::read_to_string(path)?)?,
        None => ClusterConfig::default(),
    };

    if let Some(k) = args.k {
        config.k = k;
    }
    if let Some(linkage) = &args.linkage {
        config.linkage = linkage.parse()?;
    }
    if let Some(metric) = &args.metric {
        config.distance.metric = metric.parse()?;
    }
    if let Some(mode) = &args.mode {
        config.distance.mode = mode.parse()?;
    }
    if let Some(aggregator) = &args.aggregator {
        config.distance.aggregator = aggregator.parse()?;
    }
    if let Some(pseudocount) = args.pseudocount {
        config.pseudocount = pseudocount;
    }
    Ok(config)
}

/// Reads the motifs already smoothed, which also renormalises rows printed
/// with rounded probabilities
fn load_motifs(path: &str, config: &ClusterConfig) -> Result<MotifCollection, ClustererError> {
    Ok(read_ppm_file_with_pseudocount(path, config.pseudocount)?)
}

fn partition_frame(partition: &Partition) -> Result<DataFrame, ClustererError> {
    let mut labels: Vec<(String, u32)> = cluster_labels(partition)
        .into_iter()
        .map(|(id, label)| (id, label as u32))
        .collect();
    labels.sort();
    let (motifs, clusters): (Vec<String>, Vec<u32>) = labels.into_iter().unzip();

    let df = DataFrame::new(vec![
        Column::new("motif".into(), motifs),
        Column::new("cluster".into(), clusters),
    ])?;
    Ok(df)
}

fn main() -> Result<(), ClustererError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let start_time = std::time::Instant::now();

    let args = Args::parse();
    let config = load_config(&args)?;
    info!(
        k = config.k,
        linkage = %config.linkage,
        metric = %config.distance.metric,
        mode = %config.distance.mode,
        pseudocount = config.pseudocount,
        "clustering settings"
    );

    // Create output directory if it doesn't exist
    if let Some(parent) = Path::new(&args.output_file).parent() {
        fs::create_dir_all(parent)?;
    }

    let motifs = load_motifs(&args.pwm_file, &config)?;
    info!("{} motifs to cluster", motifs.len());

    let partition = config.run_smoothed(&motifs)?;
    for (label, members) in partition.iter().enumerate() {
        info!(cluster = label, size = members.len(), "{}", members.join(", "));
    }

    let mut df = partition_frame(&partition)?;
    let mut file = File::create(&args.output_file)?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(&mut df)?;

    let elapsed = start_time.elapsed();
    info!(
        "Total execution time: {:.4} minutes",
        elapsed.as_secs_f64() / 60.0
    );

    Ok(())
}
