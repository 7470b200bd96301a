#![deny(unused_variables)]
#![deny(dead_code)]
#![deny(unused_imports)]
#![deny(clippy::no_effect_underscore_binding)]

// ========================================================================================
//
//                              Connectome command line
//
// ========================================================================================
//
// Thin orchestration over the library. Each subcommand resolves a `PipelineConfig`
// (an optional TOML file with command-line flags layered on top), runs one stage
// of the pipeline and reports errors as `Error: ...` with exit status 1.
//
//   correlate   scans -> time series + correlation matrices in the cache
//   filter      one cached subject -> filtered edge list
//   export      cached (or recomputed) correlations -> one feature table per value

use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use std::error::Error;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process;

use connectome::atlas::load_atlas;
use connectome::config::PipelineConfig;
use connectome::correlate::CorrelationEstimator;
use connectome::features::FeatureExporter;
use connectome::scans::{
    CacheKind, DataType, ScanCache, ScanLoadOptions, list_scans, load_scans,
    subject_name,
};
use connectome::{FilterPolicy, Graph, build_graph, filter};

#[derive(Clone, Copy, ValueEnum)]
enum EstimatorCli {
    Empirical,
    LedoitWolf,
}

impl From<EstimatorCli> for CorrelationEstimator {
    fn from(value: EstimatorCli) -> Self {
        match value {
            EstimatorCli::Empirical => CorrelationEstimator::Empirical,
            EstimatorCli::LedoitWolf => CorrelationEstimator::LedoitWolf,
        }
    }
}

/// Flags shared by every pipeline subcommand. Anything given here overrides
/// the config file.
#[derive(Args)]
struct PipelineArgs {
    /// TOML pipeline configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Atlas TSV with x, y and z columns
    #[arg(long)]
    atlas: Option<PathBuf>,

    /// Directory of per-subject time series TSV files
    #[arg(long)]
    scans_dir: Option<PathBuf>,

    /// Root of the time series and correlation cache
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Use the magnitude of negative correlations instead of clipping them.
    /// `--absolute false` turns it off when the config file enables it.
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    absolute: Option<bool>,

    #[arg(long, value_enum)]
    estimator: Option<EstimatorCli>,
}

impl PipelineArgs {
    fn resolve(&self) -> Result<PipelineConfig, Box<dyn Error>> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::load(path)?,
            None => PipelineConfig::default(),
        };
        if let Some(atlas) = &self.atlas {
            config.atlas = atlas.clone();
        }
        if let Some(scans_dir) = &self.scans_dir {
            config.scans_dir = scans_dir.clone();
        }
        if let Some(cache_dir) = &self.cache_dir {
            config.cache_dir = cache_dir.clone();
        }
        if let Some(absolute) = self.absolute {
            config.use_absolute = absolute;
        }
        if let Some(estimator) = self.estimator {
            config.estimator = estimator.into();
        }
        Ok(config)
    }
}

#[derive(Parser)]
#[command(
    name = "connectome",
    version,
    about = "Functional-connectivity graphs and graph features",
    long_about = "Builds region-by-region correlation graphs from resting-state time series, \
                 sparsifies them by density, threshold or PMFG, and exports graph features."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Compute and cache time series and correlation matrices")]
    Correlate {
        #[command(flatten)]
        pipeline: PipelineArgs,
    },

    #[command(about = "Filter one cached subject and write its edge list (TSV)")]
    Filter {
        #[command(flatten)]
        pipeline: PipelineArgs,

        /// Subject name, i.e. the scan file name
        #[arg(long)]
        subject: String,

        /// density, threshold or pmfg
        #[arg(long)]
        policy: Option<String>,

        /// Density or threshold value; ignored by pmfg
        #[arg(long, default_value = "0.1")]
        value: f64,

        /// Output edge list
        #[arg(long)]
        out: PathBuf,
    },

    #[command(about = "Export one feature table per filter value")]
    Export {
        #[command(flatten)]
        pipeline: PipelineArgs,

        /// density, threshold or pmfg
        #[arg(long)]
        policy: Option<String>,

        /// Comma-separated parameter sweep
        #[arg(long, value_delimiter = ',')]
        thresholds: Vec<f64>,

        /// Recompute correlations from the scans instead of reading the cache
        #[arg(long)]
        recompute: bool,

        #[arg(long)]
        output_dir: Option<PathBuf>,
    },

    #[command(about = "Write a default pipeline configuration")]
    InitConfig {
        path: PathBuf,
    },
}

fn main() {
    env_logger::init();
    let Cli { command } = Cli::parse();

    let result = match command {
        Some(Commands::Correlate { pipeline }) => run_correlate(&pipeline),
        Some(Commands::Filter {
            pipeline,
            subject,
            policy,
            value,
            out,
        }) => run_filter(&pipeline, &subject, policy.as_deref(), value, &out),
        Some(Commands::Export {
            pipeline,
            policy,
            thresholds,
            recompute,
            output_dir,
        }) => run_export(&pipeline, policy.as_deref(), thresholds, recompute, output_dir),
        Some(Commands::InitConfig { path }) => PipelineConfig::default()
            .save(&path)
            .map_err(Into::into),
        None => Cli::command().print_help().map_err(Into::into),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn resolve_policy(name: Option<&str>, config: &PipelineConfig) -> Result<FilterPolicy, Box<dyn Error>> {
    match name {
        Some(name) => Ok(name.parse::<FilterPolicy>()?),
        None => Ok(config.policy),
    }
}

fn run_correlate(pipeline: &PipelineArgs) -> Result<(), Box<dyn Error>> {
    let config = pipeline.resolve()?;
    let scans = list_scans(&config.scans_dir)?;
    let cache = ScanCache::new(&config.cache_dir);
    let options = ScanLoadOptions {
        recompute: true,
        use_absolute: config.use_absolute,
        estimator: config.estimator,
    };

    load_scans(&scans, &cache, DataType::Correlation, &options)?;
    println!(
        "Cached {} subjects under {}",
        scans.len(),
        cache.root().display()
    );
    Ok(())
}

fn run_filter(
    pipeline: &PipelineArgs,
    subject: &str,
    policy: Option<&str>,
    value: f64,
    out: &Path,
) -> Result<(), Box<dyn Error>> {
    let config = pipeline.resolve()?;
    let policy = resolve_policy(policy, &config)?;
    let labels = load_atlas(&config.atlas)?.labels();
    let matrix = ScanCache::new(&config.cache_dir).load(CacheKind::Correlation, subject)?;

    let complete = build_graph(&matrix, &labels)?;
    let filtered = filter(&complete, policy, value);
    log::info!(
        "{subject}: {policy} kept {} of {} edges",
        filtered.edge_count(),
        complete.edge_count()
    );
    write_edge_list(&filtered, out)?;
    println!("Wrote {} edges to {}", filtered.edge_count(), out.display());
    Ok(())
}

fn run_export(
    pipeline: &PipelineArgs,
    policy: Option<&str>,
    thresholds: Vec<f64>,
    recompute: bool,
    output_dir: Option<PathBuf>,
) -> Result<(), Box<dyn Error>> {
    let mut config = pipeline.resolve()?;
    if recompute {
        config.recompute = true;
    }
    if !thresholds.is_empty() {
        config.thresholds = thresholds;
    }
    if let Some(output_dir) = output_dir {
        config.output_dir = output_dir;
    }
    let policy = resolve_policy(policy, &config)?;

    let labels = load_atlas(&config.atlas)?.labels();
    let scans = list_scans(&config.scans_dir)?;
    let subjects = scans
        .iter()
        .map(|path| subject_name(path))
        .collect::<Result<Vec<_>, _>>()?;
    let options = ScanLoadOptions {
        recompute: config.recompute,
        use_absolute: config.use_absolute,
        estimator: config.estimator,
    };

    let cache = ScanCache::new(&config.cache_dir);
    let correlations = load_scans(&scans, &cache, DataType::Correlation, &options)?
        .into_correlations()
        .ok_or("scan loader returned no correlation matrices")?;

    let written = FeatureExporter::new(&config.output_dir, labels)
        .with_subjects(subjects)
        .export(policy, &correlations, &config.thresholds)?;
    println!(
        "Wrote {} feature tables under {}",
        written.len(),
        config.output_dir.join(policy.name()).display()
    );
    Ok(())
}

/// Writes `graph` as `source target weight source_label target_label`, one edge
/// per line in insertion order, through a temporary file.
fn write_edge_list(graph: &Graph, path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let temp_path = path.with_extension("tmp");

    let write_result = (|| -> io::Result<()> {
        let mut writer = BufWriter::new(File::create(&temp_path)?);
        let mut weight_buffer = ryu::Buffer::new();
        writeln!(writer, "source\ttarget\tweight\tsource_label\ttarget_label")?;
        for edge in graph.edges() {
            writeln!(
                writer,
                "{}\t{}\t{}\t{}\t{}",
                edge.source,
                edge.target,
                weight_buffer.format(edge.weight),
                graph.label(edge.source).unwrap_or_default(),
                graph.label(edge.target).unwrap_or_default()
            )?;
        }
        writer.flush()
    })();

    if let Err(err) = write_result {
        let _ = fs::remove_file(&temp_path);
        return Err(err);
    }

    fs::rename(&temp_path, path).inspect_err(|_| {
        let _ = fs::remove_file(&temp_path);
    })
}
