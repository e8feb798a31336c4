//! forge-meanshift CLI
//!
//! # Commands
//!
//! - `cluster <MATRIX>`: cluster a comma-separated distance matrix and print
//!   the center indices in ascending order
//! - `generate <N> <OUT>`: write a random symmetric N x N distance matrix
//!
//! Exit code 0 on success, 1 on any error.

use clap::{Parser, Subcommand};
use forge_meanshift::persistence::Persistable;
use forge_meanshift::{DenseMatrix, MeanShift, MeanShiftConfig, PoolSize, SeedSelection};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::{fmt, EnvFilter};

/// Mean-shift clustering over precomputed distance matrices
#[derive(Parser)]
#[command(name = "forge-meanshift")]
#[command(version)]
#[command(about = "Flat-kernel mean-shift clustering over precomputed distance matrices")]
#[command(propagate_version = true)]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Cluster a distance matrix file
    Cluster(ClusterArgs),
    /// Write a random symmetric distance matrix
    Generate {
        /// Number of points
        n: usize,
        /// Output file
        out: PathBuf,
        /// RNG seed for reproducible output
        #[arg(long)]
        seed: Option<u64>,
    },
}

#[derive(clap::Args)]
struct ClusterArgs {
    /// Comma-separated distance matrix, one row per line
    matrix: PathBuf,

    /// JSON configuration file; command-line flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Quantile for bandwidth estimation, in [0, 1]
    #[arg(short, long)]
    quantile: Option<f32>,

    /// Maximum hill-climb iterations per seed
    #[arg(short = 'i', long)]
    max_iterations: Option<usize>,

    /// Maximum number of random seeds; 0 or negative uses every point
    #[arg(short = 's', long, allow_hyphen_values = true)]
    max_seeds: Option<i64>,

    /// Fixed bandwidth; skips estimation
    #[arg(short, long)]
    bandwidth: Option<f32>,

    /// Worker threads; 0 uses the global pool
    #[arg(short, long, conflicts_with = "sequential")]
    threads: Option<usize>,

    /// Run everything on the main thread
    #[arg(long)]
    sequential: bool,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,
}

impl ClusterArgs {
    fn to_config(&self) -> forge_meanshift::Result<MeanShiftConfig> {
        let mut config = match &self.config {
            Some(path) => MeanShiftConfig::from_json_file(path)?,
            None => MeanShiftConfig::default(),
        };

        if let Some(quantile) = self.quantile {
            config = config.with_quantile(quantile);
        }
        if let Some(max_iterations) = self.max_iterations {
            config = config.with_max_iterations(max_iterations);
        }
        if let Some(max_seeds) = self.max_seeds {
            config = config.with_seeds(SeedSelection::from_max_seeds(max_seeds));
        }
        if let Some(bandwidth) = self.bandwidth {
            config = config.with_bandwidth(bandwidth);
        }
        if self.sequential {
            config = config.with_pool(PoolSize::Sequential);
        } else if let Some(threads) = self.threads {
            let pool = if threads == 0 {
                PoolSize::Global
            } else {
                PoolSize::Fixed(threads)
            };
            config = config.with_pool(pool);
        }

        Ok(config)
    }
}

fn run_cluster(args: &ClusterArgs) -> forge_meanshift::Result<()> {
    let config = args.to_config()?;
    let matrix = DenseMatrix::load(&args.matrix)?;
    let clustering = MeanShift::new(config).cluster(&matrix)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&clustering)?);
    } else {
        println!("Cluster centers: {:?}", clustering.sorted_indices());
        println!("{}", clustering.stats.summary());
    }
    Ok(())
}

fn run_generate(n: usize, out: &Path, seed: Option<u64>) -> forge_meanshift::Result<()> {
    use rand::SeedableRng;

    let matrix = match seed {
        Some(seed) => DenseMatrix::random_symmetric(n, &mut rand::rngs::StdRng::seed_from_u64(seed)),
        None => DenseMatrix::random_symmetric(n, &mut rand::thread_rng()),
    };
    matrix.save(out)?;
    println!("Wrote {}x{} matrix to {}", n, n, out.display());
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    let filter = match cli.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();

    let result = match &cli.command {
        Commands::Cluster(args) => run_cluster(args),
        Commands::Generate { n, out, seed } => run_generate(*n, out, *seed),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(%err, "command failed");
            eprintln!("error: {}", err);
            ExitCode::FAILURE
        }
    }
}
