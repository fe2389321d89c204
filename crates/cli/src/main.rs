//! GeoWeights CLI - spatial weights matrices and global autocorrelation

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use geoweights_algorithms::statistics::{
    run_from_builder, run_from_swm, GlobalStatistic, StatisticKind, StatisticRun,
};
use geoweights_algorithms::weights::{generate_swm, BuildParams, NeighborTopologyBuilder, SwmOptions};
use geoweights_core::config::NeighborConfig;
use geoweights_core::diagnostics::Diagnostics;
use geoweights_core::feature::FeatureCollection;
use geoweights_core::io::{swm_to_table, ContiguityTable, SwmReader, WeightTable};
use geoweights_core::weights::{
    Conceptualization, ContiguityKind, DistanceMethod, MatrixShape, TimeUnit, TimeWindow,
};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "geoweights")]
#[command(author, version, about = "Spatial weights matrices and global autocorrelation", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a spatial weights matrix file from features
    Generate {
        /// Input features (JSON array)
        input: PathBuf,
        /// Output SWM file
        output: PathBuf,
        /// Name of the unique id field recorded in the header
        #[arg(long, default_value = "ID")]
        id_field: String,
        /// Spatial reference name recorded in the header
        #[arg(long)]
        spatial_ref: Option<String>,
        #[command(flatten)]
        weights: WeightsArgs,
    },
    /// Print the header and a row summary of an SWM file
    Describe {
        /// Input SWM file
        input: PathBuf,
        /// Print the header as JSON
        #[arg(long)]
        json: bool,
    },
    /// Export an SWM file to flat text weights
    ToTable {
        /// Input SWM file
        input: PathBuf,
        /// Output text file
        output: PathBuf,
    },
    /// Global Moran's I
    MoransI(StatisticArgs),
    /// Global General G
    GeneralG(StatisticArgs),
}

#[derive(Args)]
struct StatisticArgs {
    /// Input features (JSON array)
    input: PathBuf,
    /// Numeric attribute to test
    #[arg(short, long)]
    field: String,
    /// Replay an existing SWM file instead of building weights
    #[arg(long)]
    swm: Option<PathBuf>,
    #[command(flatten)]
    weights: WeightsArgs,
}

#[derive(Args)]
struct WeightsArgs {
    /// Conceptualization of spatial relationships
    #[arg(short, long, value_enum, default_value = "fixed")]
    concept: Concept,
    /// Distance threshold (default: every feature gets a neighbor)
    #[arg(short, long)]
    threshold: Option<f64>,
    /// Inverse distance exponent
    #[arg(short, long, default_value = "1.0")]
    exponent: f64,
    /// Number of neighbors for k-nearest
    #[arg(short, long, default_value = "8")]
    k: usize,
    /// Distance method: euclidean, manhattan
    #[arg(short, long, default_value = "euclidean")]
    distance: String,
    /// Keep raw weights instead of row-standardizing
    #[arg(long)]
    no_standardize: bool,
    /// Distances are chordal; a threshold clamped to the extent is not expanded
    #[arg(long)]
    chordal: bool,
    /// Polygon adjacency records (JSON) for rook/queen
    #[arg(long)]
    adjacency: Option<PathBuf>,
    /// Give polygons without contiguous neighbors their k nearest features
    #[arg(long)]
    island_k: Option<usize>,
    /// Flat text weights for the table conceptualization
    #[arg(long)]
    table: Option<PathBuf>,
    /// Space-time window size
    #[arg(long, default_value = "1")]
    time_value: u32,
    /// Space-time window unit: seconds, minutes, hours, days, weeks, months, years
    #[arg(long, default_value = "days")]
    time_unit: String,
    /// Warn about features with more neighbors than this
    #[arg(long)]
    warn_neighbors: Option<usize>,
    /// Keep at most this many neighbors per feature
    #[arg(long)]
    max_neighbors: Option<usize>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Concept {
    Inverse,
    Fixed,
    Zone,
    Knn,
    Delaunay,
    Rook,
    Queen,
    SpaceTime,
    Table,
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("logging already initialized");
    }
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn read_features(path: &Path) -> Result<FeatureCollection> {
    let pb = spinner("Reading features...");
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let features = FeatureCollection::from_json(&text).context("Failed to parse features")?;
    pb.finish_and_clear();
    info!("Input: {} features", features.len());
    Ok(features)
}

/// Conceptualization plus the side tables it needs.
struct WeightsInput {
    concept: Conceptualization,
    params: BuildParams,
    row_standardize: bool,
    contiguity: Option<ContiguityTable>,
    table: Option<WeightTable>,
}

impl WeightsInput {
    fn builder<'a>(&'a self, features: &'a FeatureCollection) -> NeighborTopologyBuilder<'a> {
        let mut builder = NeighborTopologyBuilder::new(features, self.concept, self.params);
        if let Some(contiguity) = &self.contiguity {
            builder = builder.with_contiguity(contiguity);
        }
        if let Some(table) = &self.table {
            builder = builder.with_weight_table(table);
        }
        builder
    }
}

fn parse_weights(args: &WeightsArgs) -> Result<WeightsInput> {
    let concept = match args.concept {
        Concept::Inverse => Conceptualization::InverseDistance {
            exponent: args.exponent,
            threshold: args.threshold,
        },
        Concept::Fixed => Conceptualization::FixedDistance {
            threshold: args.threshold,
        },
        Concept::Zone => Conceptualization::ZoneOfIndifference {
            threshold: args.threshold,
        },
        Concept::Knn => Conceptualization::KNearest { k: args.k },
        Concept::Delaunay => Conceptualization::Delaunay,
        Concept::Rook => Conceptualization::PolygonContiguity(ContiguityKind::Rook),
        Concept::Queen => Conceptualization::PolygonContiguity(ContiguityKind::Queen),
        Concept::SpaceTime => {
            let unit: TimeUnit = args.time_unit.parse()?;
            Conceptualization::SpaceTimeWindow {
                threshold: args.threshold,
                window: TimeWindow::new(args.time_value, unit),
            }
        }
        Concept::Table => Conceptualization::ExternalTable,
    };

    let contiguity = match (&args.adjacency, args.concept) {
        (Some(path), Concept::Rook | Concept::Queen) => Some(
            ContiguityTable::open(path)
                .with_context(|| format!("Failed to read adjacency {}", path.display()))?,
        ),
        (None, Concept::Rook | Concept::Queen) => bail!("--adjacency is required for rook/queen"),
        _ => None,
    };
    let table = match (&args.table, args.concept) {
        (Some(path), Concept::Table) => Some(
            WeightTable::open(path)
                .with_context(|| format!("Failed to read weights table {}", path.display()))?,
        ),
        (None, Concept::Table) => bail!("--table is required for the table conceptualization"),
        _ => None,
    };

    let mut neighbor_config = NeighborConfig::default();
    if let Some(warn) = args.warn_neighbors {
        neighbor_config.warn_threshold = warn;
    }
    neighbor_config.max_threshold = args.max_neighbors;

    let distance_method: DistanceMethod = args.distance.parse()?;
    Ok(WeightsInput {
        concept,
        params: BuildParams {
            distance_method,
            use_chordal: args.chordal,
            neighbor_config,
            island_neighbors: args.island_k,
        },
        row_standardize: !args.no_standardize,
        contiguity,
        table,
    })
}

fn print_shape(shape: &MatrixShape) {
    println!("  Features: {}", shape.num_features);
    println!(
        "  Non-zero links: {} ({:.4}%)",
        shape.non_zero_links,
        shape.percent_non_zero()
    );
    println!(
        "  Neighbors: min {}, max {}, avg {:.2}",
        shape.min_neighbors,
        shape.max_neighbors,
        shape.avg_neighbors()
    );
}

fn print_diagnostics(diagnostics: &Diagnostics) {
    if diagnostics.is_empty() {
        return;
    }
    println!("\nWarnings:");
    for d in diagnostics.iter() {
        println!("  {}", d);
    }
}

fn print_statistic(stat: &GlobalStatistic) {
    let symbol = match stat.kind {
        StatisticKind::MoransI => "I",
        StatisticKind::GeneralG => "G",
    };
    println!("{}", stat.kind);
    println!("  {}: {:.6}", symbol, stat.index);
    println!("  Expected: {:.6}", stat.expected);
    println!("  Variance: {:.6}", stat.variance);
    println!("  z-score: {:.6}", stat.z_score);
    println!("  p-value: {:.6}", stat.p_value);
    println!("  S0: {:.6}  S1: {:.6}  S2: {:.6}", stat.s0, stat.s1, stat.s2);
    if let Some(b2) = stat.b2 {
        println!("  Kurtosis (b2): {:.6}", b2);
    }
    print_shape(&stat.shape);
}

fn run_statistic(kind: StatisticKind, args: StatisticArgs) -> Result<()> {
    let features = read_features(&args.input)?;
    let start = Instant::now();
    let pb = spinner(&format!("Computing {}...", kind));
    let run: StatisticRun = match &args.swm {
        Some(path) => run_from_swm(kind, path, &features, &args.field, None)
            .with_context(|| format!("Failed to replay {}", path.display()))?,
        None => {
            let input = parse_weights(&args.weights)?;
            run_from_builder(
                kind,
                input.builder(&features),
                &args.field,
                input.row_standardize,
                None,
            )
            .with_context(|| format!("Failed to compute {}", kind))?
        }
    };
    pb.finish_and_clear();

    print_statistic(&run.statistic);
    if run.skipped_rows > 0 {
        println!("  Rows skipped (not in input): {}", run.skipped_rows);
    }
    print_diagnostics(&run.diagnostics);
    println!("  Processing time: {:.2?}", start.elapsed());
    Ok(())
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match cli.command {
        Commands::Generate {
            input,
            output,
            id_field,
            spatial_ref,
            weights,
        } => {
            let features = read_features(&input)?;
            let weights_input = parse_weights(&weights)?;
            let options = SwmOptions {
                unique_id: id_field,
                row_standardize: weights_input.row_standardize,
                spatial_ref,
                input_name: input
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned()),
                input_table: weights
                    .table
                    .as_ref()
                    .map(|p| p.display().to_string()),
                time_field: None,
            };

            let start = Instant::now();
            let pb = spinner("Building weights...");
            let report = generate_swm(weights_input.builder(&features), &options, &output)
                .context("Failed to generate weights matrix")?;
            pb.finish_and_clear();

            println!("Weights matrix saved to: {}", output.display());
            if let Some(t) = report.build.threshold {
                println!("  Threshold: {:.6}", t);
            }
            print_shape(&report.swm.shape);
            print_diagnostics(&report.diagnostics());
            println!("  Processing time: {:.2?}", start.elapsed());
        }

        Commands::Describe { input, json } => {
            let mut reader = SwmReader::open(&input)
                .with_context(|| format!("Failed to open {}", input.display()))?;
            if json {
                let text = serde_json::to_string_pretty(reader.header())
                    .context("Failed to serialize header")?;
                println!("{}", text);
                return Ok(());
            }

            println!("File: {}", input.display());
            for (label, value) in reader.header().describe() {
                println!("  {}: {}", label, value);
            }
            let pb = spinner("Reading rows...");
            let mut shape = MatrixShape::default();
            let mut isolated = 0usize;
            while let Some(row) = reader.read_row().context("Failed to read rows")? {
                if row.row.is_empty() {
                    isolated += 1;
                }
                shape.observe(row.row.len());
            }
            pb.finish_and_clear();
            println!("\nRows:");
            print_shape(&shape);
            println!("  Isolated: {}", isolated);
        }

        Commands::ToTable { input, output } => {
            let start = Instant::now();
            let pb = spinner("Exporting weights...");
            let export = swm_to_table(&input, &output).context("Failed to export weights")?;
            pb.finish_and_clear();
            println!("Weights table saved to: {}", output.display());
            print_shape(&export.shape);
            print_diagnostics(&export.diagnostics);
            println!("  Processing time: {:.2?}", start.elapsed());
        }

        Commands::MoransI(args) => run_statistic(StatisticKind::MoransI, args)?,
        Commands::GeneralG(args) => run_statistic(StatisticKind::GeneralG, args)?,
    }

    Ok(())
}
