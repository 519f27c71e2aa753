//! Tabular data anonymization tool.
//!
//! This binary reads a JSON array of row objects, anonymizes it with the
//! Mondrian algorithm, measures the privacy of released data, or
//! pseudonymizes individual columns.
//!
//! # Security Guarantees
//! - Input files are never modified
//! - Logs carry counts, sizes and distances only, never record values
//! - Offline operation, no network access

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use tabanon_core::{
    AnonymizationConfig, Anonymizer, CategoricalAggregation, Dataset, LogFormat,
    PrivacyThresholds, QuasiIdentifier, RunContext, TabAnonError, init_logging, metrics,
    pseudonymize_column,
};
use tracing::{info, trace, warn};

#[derive(Parser)]
#[command(name = "tabanon")]
#[command(about = "Tabular data anonymization tool")]
#[command(version)]
#[command(long_about = "
tabanon - Mondrian anonymization for tabular data

Input datasets are JSON arrays of flat row objects. Records are grouped into
partitions whose quasi-identifiers are replaced by a shared value so that
every partition satisfies:
- k-anonymity (at least k records)
- l-diversity (at least l distinct sensitive values), optional
- t-closeness (sensitive distribution within t of the global one), optional

EXAMPLES:
  tabanon anonymize -i patients.json -o released.json \\
      --qi age:numeric --qi zip:categorical --sensitive disease -k 5 -l 2
  tabanon metrics -i released.json --qi age,zip --sensitive disease
  tabanon pseudonymize -i patients.json --column name -o out.json --mapping map.json
")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Anonymize a dataset
    Anonymize(AnonymizeArgs),
    /// Measure k-anonymity, l-diversity and t-closeness of a dataset
    Metrics(MetricsArgs),
    /// Replace a column's values with SHA-256 pseudonyms
    Pseudonymize(PseudonymizeArgs),
}

#[derive(Args)]
struct AnonymizeArgs {
    /// Input dataset
    #[arg(short, long, help = "Input JSON file (array of row objects)")]
    input: PathBuf,

    /// Output dataset
    #[arg(short, long, help = "Output JSON file for the anonymized rows")]
    output: PathBuf,

    /// Configuration file
    #[arg(
        long,
        env = "TABANON_CONFIG",
        help = "JSON configuration file; command-line flags override its fields"
    )]
    config: Option<PathBuf>,

    /// Quasi-identifier columns
    #[arg(
        long = "qi",
        value_name = "NAME[:KIND]",
        help = "Quasi-identifier column, kind is numeric (default) or categorical; repeatable"
    )]
    quasi_identifiers: Vec<QuasiIdentifier>,

    /// Sensitive column
    #[arg(
        long,
        env = "TABANON_SENSITIVE",
        help = "Sensitive column for l-diversity and t-closeness"
    )]
    sensitive: Option<String>,

    /// Minimum partition size
    #[arg(short, env = "TABANON_K", help = "Minimum partition size (k-anonymity)")]
    k: Option<usize>,

    /// Minimum distinct sensitive values
    #[arg(
        short,
        env = "TABANON_L",
        help = "Minimum distinct sensitive values per partition (0 disables)"
    )]
    l: Option<usize>,

    /// Maximum distribution distance
    #[arg(
        short,
        env = "TABANON_T",
        help = "Maximum distance from the global sensitive distribution (0 disables)"
    )]
    t: Option<f64>,

    /// Categorical aggregation policy
    #[arg(
        long,
        value_name = "POLICY",
        help = "Categorical aggregation: generalize (default) or most-frequent"
    )]
    categorical: Option<CategoricalAggregation>,

    /// Worker threads
    #[arg(
        long,
        env = "TABANON_WORKERS",
        help = "Number of partitioning worker threads"
    )]
    workers: Option<usize>,

    /// Partitioning deadline (ms)
    #[arg(
        long,
        help = "Stop splitting after this many milliseconds, keeping unfinished partitions whole"
    )]
    timeout_ms: Option<u64>,

    /// Random seed
    #[arg(
        long,
        default_value_t = 0,
        help = "Seed for the diagnostic partition sample"
    )]
    seed: u64,

    /// Report file
    #[arg(long, help = "Write the anonymization report as JSON to this file")]
    report: Option<PathBuf>,
}

#[derive(Args)]
struct MetricsArgs {
    /// Input dataset
    #[arg(short, long, help = "Input JSON file (array of row objects)")]
    input: PathBuf,

    /// Quasi-identifier columns
    #[arg(
        long = "qi",
        value_delimiter = ',',
        required = true,
        help = "Comma-separated quasi-identifier columns"
    )]
    quasi_identifiers: Vec<String>,

    /// Sensitive column
    #[arg(long, help = "Sensitive column for l-diversity and t-closeness")]
    sensitive: Option<String>,
}

#[derive(Args)]
struct PseudonymizeArgs {
    /// Input dataset
    #[arg(short, long, help = "Input JSON file (array of row objects)")]
    input: PathBuf,

    /// Column to pseudonymize
    #[arg(short, long, help = "Column whose values are replaced")]
    column: String,

    /// Output dataset
    #[arg(short, long, help = "Output JSON file")]
    output: PathBuf,

    /// Mapping file
    #[arg(long, help = "Write the original-to-pseudonym mapping to this file")]
    mapping: Option<PathBuf>,
}

#[derive(Args)]
struct GlobalArgs {
    /// Increase verbosity
    #[arg(
        short,
        long,
        action = clap::ArgAction::Count,
        help = "Increase verbosity (-v, -vv)"
    )]
    verbose: u8,

    /// Suppress output
    #[arg(short, long, help = "Suppress all output except errors")]
    quiet: bool,

    /// Log format
    #[arg(
        long,
        default_value_t = LogFormat::Text,
        help = "Log line format on stderr: text or json"
    )]
    log_format: LogFormat,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.global.verbose, cli.global.quiet, cli.global.log_format)?;

    match cli.command {
        Command::Anonymize(args) => anonymize(&args).await,
        Command::Metrics(args) => measure(&args).await,
        Command::Pseudonymize(args) => pseudonymize(&args).await,
    }
}

/// Anonymizes the input file and writes the result
async fn anonymize(args: &AnonymizeArgs) -> anyhow::Result<()> {
    info!("Input: {}", args.input.display());
    info!("Output: {}", args.output.display());

    let config = build_config(args).await?;
    let dataset = load_dataset(&args.input).await?;

    let mut ctx = RunContext::new()
        .with_seed(args.seed)
        .with_progress(|progress| {
            trace!(
                "Iteration {}: {} splits, {} queued, {} finished",
                progress.iterations, progress.splits, progress.queued, progress.finished
            );
        });
    if let Some(ms) = args.timeout_ms {
        ctx = ctx.with_timeout(Duration::from_millis(ms));
    }

    let result = Anonymizer::new(config)
        .anonymize(&dataset, &ctx)
        .with_context(|| format!("Failed to anonymize {}", args.input.display()))?;

    let report = &result.report;
    if let Some(ref violation) = report.root_violation {
        warn!(
            "Output does not meet the requested thresholds: {}",
            violation
        );
    }
    if report.timed_out {
        warn!(
            "Deadline reached with {} partitions unfinished",
            report.unfinished_count
        );
    }

    write_text(&args.output, &result.dataset.to_json_string_pretty()?).await?;
    info!("✓ Anonymized rows saved to {}", args.output.display());

    if let Some(ref path) = args.report {
        let json = serde_json::to_string_pretty(report)
            .map_err(|e| TabAnonError::serialization("serializing anonymization report", e))?;
        write_text(path, &json).await?;
        info!("✓ Report saved to {}", path.display());
    }

    println!("Anonymization completed successfully");
    println!("Output: {}", args.output.display());
    println!("Records: {}", report.record_count);
    println!("Partitions: {}", report.partition_count);
    println!(
        "Partition sizes: min {}, max {}, mean {:.1}",
        report.min_partition_size, report.max_partition_size, report.mean_partition_size
    );

    Ok(())
}

/// Prints privacy metrics of the input file as JSON
async fn measure(args: &MetricsArgs) -> anyhow::Result<()> {
    let dataset = load_dataset(&args.input).await?;
    let quasi_identifiers: Vec<&str> = args.quasi_identifiers.iter().map(String::as_str).collect();

    let metrics = metrics::measure(&dataset, &quasi_identifiers, args.sensitive.as_deref())
        .with_context(|| format!("Failed to measure {}", args.input.display()))?;

    info!(
        "{} records in {} equivalence classes",
        metrics.record_count, metrics.equivalence_class_count
    );
    println!("{}", serde_json::to_string_pretty(&metrics)?);

    Ok(())
}

/// Pseudonymizes one column of the input file
async fn pseudonymize(args: &PseudonymizeArgs) -> anyhow::Result<()> {
    let dataset = load_dataset(&args.input).await?;

    let (output, mapping) = pseudonymize_column(&dataset, &args.column)
        .with_context(|| format!("Failed to pseudonymize column '{}'", args.column))?;

    write_text(&args.output, &output.to_json_string_pretty()?).await?;
    info!("✓ Pseudonymized rows saved to {}", args.output.display());

    if let Some(ref path) = args.mapping {
        write_text(path, &mapping.to_json_string_pretty()?).await?;
        info!("✓ Mapping saved to {}", path.display());
    } else {
        warn!("No --mapping file given; pseudonyms cannot be reversed");
    }

    println!("Pseudonymization completed successfully");
    println!("Output: {}", args.output.display());
    println!("Distinct values: {}", mapping.len());

    Ok(())
}

/// Builds the run configuration from the optional file and CLI overrides
async fn build_config(args: &AnonymizeArgs) -> anyhow::Result<AnonymizationConfig> {
    let mut config = match args.config {
        Some(ref path) => {
            let json = read_text(path).await?;
            AnonymizationConfig::from_json_str(&json)
                .with_context(|| format!("Invalid configuration file {}", path.display()))?
        }
        None => AnonymizationConfig::default(),
    };

    apply_overrides(&mut config, args);

    if config.quasi_identifiers.is_empty() {
        bail!("No quasi-identifiers given; use --qi NAME[:KIND] or a --config file");
    }

    Ok(config)
}

/// Applies command-line overrides on top of a loaded configuration
fn apply_overrides(config: &mut AnonymizationConfig, args: &AnonymizeArgs) {
    if !args.quasi_identifiers.is_empty() {
        config.quasi_identifiers = args.quasi_identifiers.clone();
    }
    if let Some(ref sensitive) = args.sensitive {
        config.sensitive_column = Some(sensitive.clone());
    }

    let thresholds: &mut PrivacyThresholds = &mut config.thresholds;
    if let Some(k) = args.k {
        thresholds.k = k;
    }
    if let Some(l) = args.l {
        thresholds.l = l;
    }
    if let Some(t) = args.t {
        thresholds.t = t;
    }

    if let Some(policy) = args.categorical {
        config.categorical_aggregation = policy;
    }
    if let Some(workers) = args.workers {
        if workers == 0 {
            warn!("--workers 0 is not valid, using 1");
        }
        config.workers = workers.max(1);
    }
}

/// Reads and parses a dataset file
async fn load_dataset(path: &Path) -> anyhow::Result<Dataset> {
    let json = read_text(path).await?;
    let dataset = Dataset::from_json_str(&json)
        .with_context(|| format!("Invalid dataset file {}", path.display()))?;
    info!(
        "Loaded {} records with {} columns",
        dataset.len(),
        dataset.columns().len()
    );
    Ok(dataset)
}

/// Reads a UTF-8 file
async fn read_text(path: &Path) -> tabanon_core::Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| TabAnonError::Io {
            context: format!("Failed to read {}", path.display()),
            source: e,
        })
}

/// Writes a UTF-8 file
async fn write_text(path: &Path, contents: &str) -> tabanon_core::Result<()> {
    tokio::fs::write(path, contents)
        .await
        .map_err(|e| TabAnonError::Io {
            context: format!("Failed to write to {}", path.display()),
            source: e,
        })
}
