//! Provcert CLI - provider certification result review
//!
//! Consolidates an extracted provider run with an optional baseline run,
//! narrows the provider failures through the suite, baseline and flake
//! filters, and evaluates the acceptance checks.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use provcert_checks::{CheckCatalog, CheckEngine};
use provcert_flake::{FlakeConfig, FlakeCorpus, FlakeQueryPool, SippyClient, StaticCorpus};
use provcert_summary::{
    ArchiveReader, ArtifactWriter, ConsolidatedSummary, DirectoryArchiveReader, FilterPipeline,
    ProcessInputs, SuiteSource,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod error;
mod output;

use config::ProvcertConfig;
use error::CliResult;
use output::OutputFormat;

/// Provcert CLI application
#[derive(Parser)]
#[command(name = "provcert")]
#[command(about = "Provider certification result review", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "PROVCERT_CONFIG")]
    config: Option<String>,

    /// Log level, overrides the configuration
    #[arg(long, env = "PROVCERT_LOG_LEVEL")]
    log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand)]
enum Commands {
    /// Consolidate results, apply filters and evaluate the checks
    Report(ReportArgs),

    /// Show the effective configuration
    Config,
}

#[derive(Args)]
struct ReportArgs {
    /// Extracted provider results directory
    archive: PathBuf,

    /// Extracted baseline results directory
    #[arg(short, long)]
    baseline: Option<PathBuf>,

    /// Kubernetes conformance suite list
    #[arg(long, env = "PROVCERT_KUBE_SUITE")]
    kube_suite: PathBuf,

    /// OpenShift conformance suite list
    #[arg(long, env = "PROVCERT_OPENSHIFT_SUITE")]
    openshift_suite: PathBuf,

    /// Write filter lists and failure output to this new directory
    #[arg(long)]
    save_to: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    output: OutputFormat,

    /// Skip flake corpus queries
    #[arg(long)]
    offline: bool,

    /// Flake corpus release, e.g. 4.14
    #[arg(long)]
    release: Option<String>,

    /// Query a frozen flake snapshot (JSON list of records) instead of the API
    #[arg(long, conflicts_with = "offline")]
    flake_snapshot: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> CliResult<()> {
    let cli = Cli::parse();

    // Load config
    let config = ProvcertConfig::load(cli.config.as_deref())?;

    // Initialize tracing
    let level = cli.log_level.clone().unwrap_or_else(|| config.logging.level.clone());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| level.into());

    if cli.log_json || config.logging.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    match cli.command {
        Commands::Report(args) => report(args, &config).await,
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

async fn report(args: ReportArgs, config: &ProvcertConfig) -> CliResult<()> {
    let provider = DirectoryArchiveReader::open(&args.archive)?;
    let baseline = args
        .baseline
        .as_ref()
        .map(DirectoryArchiveReader::open)
        .transpose()?;
    if baseline.is_none() {
        warn!("No baseline given, baseline filter passes through");
    }

    let pipeline = build_pipeline(&args, &config.flake)?;

    let mut summary = ConsolidatedSummary::new();
    summary
        .process(
            ProcessInputs {
                provider: &provider,
                baseline: baseline.as_ref().map(|b| b as &dyn ArchiveReader),
                suites: vec![
                    SuiteSource::kubernetes_conformance(&args.kube_suite),
                    SuiteSource::openshift_conformance(&args.openshift_suite),
                ],
            },
            &pipeline,
        )
        .await?;

    let engine = CheckEngine::new(CheckCatalog::default_catalog(&config.checks.docs_base_url));
    let checks = engine.run(&summary);

    if let Some(dir) = &args.save_to {
        let manifest = ArtifactWriter::new().save(&summary, dir)?;
        info!(dir = %manifest.root.display(), files = manifest.files.len(), "Artifacts written");
    }

    println!("{}", output::render_report(&summary, &checks, args.output)?);
    Ok(())
}

fn build_pipeline(args: &ReportArgs, flake: &FlakeConfig) -> CliResult<FilterPipeline> {
    if args.offline || !flake.enabled {
        info!("Flake corpus disabled");
        return Ok(FilterPipeline::offline());
    }

    let corpus: Arc<dyn FlakeCorpus> = match &args.flake_snapshot {
        Some(path) => {
            let content = std::fs::read_to_string(path)?;
            let snapshot = StaticCorpus::from_json(&content)?;
            info!(path = %path.display(), tests = snapshot.len(), "Using frozen flake snapshot");
            Arc::new(snapshot)
        }
        None => Arc::new(SippyClient::from_config(flake)?),
    };

    let release = args.release.clone().or_else(|| flake.release.clone());
    Ok(FilterPipeline::with_pool(FlakeQueryPool::from_config(corpus, flake)).with_release(release))
}
