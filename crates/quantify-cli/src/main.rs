mod display;
mod pipeline;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use chrono::Datelike;
use clap::{Args, Parser, Subcommand};
use quantify_core::RunPeriod;
use quantify_fetch::{FetchConfig, FetchError, FetchLimits, HttpTransport, Transport};
use quantify_process::{AggregateOptions, Aggregator, DEFAULT_TOP_N, ReportAssembler};
use quantify_store::{ArtifactStore, DryRunStore, FsStore};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::pipeline::StageReport;

#[derive(Parser)]
#[command(name = "quantify")]
#[command(about = "Quantify the size of the commons: fetch, process and report")]
#[command(version)]
struct Cli {
    /// Root of the per-period data tree
    #[arg(long, env = "QUANTIFY_DATA_DIR", default_value = "data", global = true)]
    data_dir: PathBuf,

    /// Run period, e.g. 2025Q4 (default: current quarter)
    #[arg(long, global = true)]
    period: Option<RunPeriod>,

    /// GitHub token for higher search rate limits
    #[arg(long, env = "GH_TOKEN", hide_env_values = true, global = true)]
    github_token: Option<String>,

    /// Google Custom Search developer key
    #[arg(long, env = "GCS_DEVELOPER_KEY", hide_env_values = true, global = true)]
    gcs_developer_key: Option<String>,

    /// Google Custom Search engine id
    #[arg(long, env = "GCS_CX", hide_env_values = true, global = true)]
    gcs_cx: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available sources
    Sources,

    /// Fetch raw tables from sources
    Fetch {
        #[command(flatten)]
        target: Target,
        #[command(flatten)]
        fetch: FetchOpts,
    },

    /// Aggregate fetched tables into summaries
    Process {
        #[command(flatten)]
        target: Target,
        #[command(flatten)]
        process: ProcessOpts,
    },

    /// Assemble figures, report manifests and README narrative
    Report {
        #[command(flatten)]
        target: Target,
        #[command(flatten)]
        report: ReportOpts,
    },

    /// Fetch, process and report in one go
    Run {
        #[command(flatten)]
        target: Target,
        #[command(flatten)]
        fetch: FetchOpts,
        #[command(flatten)]
        process: ProcessOpts,
        #[command(flatten)]
        report: ReportOpts,
    },
}

#[derive(Args)]
struct Target {
    /// Sources to run (default: all)
    sources: Vec<String>,

    /// Write results under the data directory (otherwise nothing is written)
    #[arg(long)]
    enable_save: bool,
}

#[derive(Args)]
struct FetchOpts {
    /// Stop after this many rows per source; the run is marked sampled
    #[arg(long)]
    limit: Option<u64>,

    /// Stop after this many pages per source; the run is marked sampled
    #[arg(long)]
    max_pages: Option<u64>,

    /// Only count works from the last N years where the source supports it
    #[arg(long, value_name = "YEARS")]
    date_back: Option<u32>,

    /// Wikipedia language editions to query (comma separated)
    #[arg(long, value_delimiter = ',')]
    wikipedia_languages: Vec<String>,
}

#[derive(Args)]
struct ProcessOpts {
    /// Do not flag summaries of sampled fetches
    #[arg(long)]
    no_sampling_caveat: bool,
}

#[derive(Args)]
struct ReportOpts {
    /// Rows shown in rankings and non-chronological figures
    #[arg(long, default_value_t = DEFAULT_TOP_N)]
    top_n: usize,
}

impl Cli {
    fn fetch_config(&self, opts: Option<&FetchOpts>) -> FetchConfig {
        let mut config = FetchConfig {
            github_token: self.github_token.clone(),
            gcs_developer_key: self.gcs_developer_key.clone(),
            gcs_cx: self.gcs_cx.clone(),
            ..FetchConfig::default()
        };
        if let Some(opts) = opts {
            config.limits = FetchLimits {
                max_pages: opts.max_pages,
                max_rows: opts.limit,
            };
            config.min_year = opts
                .date_back
                .and_then(|years| cutoff_year(chrono::Utc::now().year(), years));
            if !opts.wikipedia_languages.is_empty() {
                config.wikipedia_languages = Some(opts.wikipedia_languages.clone());
            }
        }
        config
    }
}

/// First year inside a `--date-back` window; `None` when the window reaches
/// past the representable years and so filters nothing.
fn cutoff_year(current: i32, years_back: u32) -> Option<i32> {
    i32::try_from(years_back)
        .ok()
        .and_then(|years| current.checked_sub(years))
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
}

fn open_store(data_dir: &Path, enable_save: bool) -> Box<dyn ArtifactStore> {
    let base = FsStore::new(data_dir);
    if enable_save {
        Box::new(base)
    } else {
        warn!("dry run: nothing is written without --enable-save");
        Box::new(DryRunStore::new(base))
    }
}

fn transport(config: &FetchConfig) -> anyhow::Result<Arc<dyn Transport>> {
    let transport = HttpTransport::new(&config.user_agent, config.timeout)
        .context("building HTTP client")?;
    Ok(Arc::new(transport))
}

/// Run the chosen command; `Ok(false)` means at least one source failed.
async fn run(cli: Cli) -> anyhow::Result<bool> {
    let period = cli.period.unwrap_or_else(RunPeriod::current);
    info!(version = env!("CARGO_PKG_VERSION"), period = %period, "quantify");

    let mut stages: Vec<StageReport> = Vec::new();
    match &cli.command {
        Commands::Sources => {
            display::print_sources(&cli.fetch_config(None));
            return Ok(true);
        }
        Commands::Fetch { target, fetch } => {
            let config = cli.fetch_config(Some(fetch));
            let (adapters, skipped) = pipeline::select_adapters(&target.sources, &config)?;
            let store = open_store(&cli.data_dir, target.enable_save);
            let mut stage =
                pipeline::fetch_stage(store.as_ref(), period, transport(&config)?, &config, &adapters).await;
            stage.skipped = skipped;
            stages.push(stage);
        }
        Commands::Process { target, process } => {
            let store = open_store(&cli.data_dir, target.enable_save);
            let sources = pipeline::stage_sources(&target.sources, store.raw_sources(period)?)?;
            let aggregator = Aggregator::new(AggregateOptions {
                flag_sampled: !process.no_sampling_caveat,
            });
            stages.push(pipeline::process_stage(store.as_ref(), period, &sources, &aggregator));
        }
        Commands::Report { target, report } => {
            let store = open_store(&cli.data_dir, target.enable_save);
            let sources = pipeline::stage_sources(&target.sources, store.summary_sources(period)?)?;
            let assembler = ReportAssembler::new(report.top_n);
            let (stage, reports) = pipeline::report_stage(store.as_ref(), period, &sources, &assembler);
            for report in &reports {
                display::print_report(report)?;
            }
            stages.push(stage);
        }
        Commands::Run {
            target,
            fetch,
            process,
            report,
        } => {
            let config = cli.fetch_config(Some(fetch));
            let (adapters, skipped) = pipeline::select_adapters(&target.sources, &config)?;
            let store = open_store(&cli.data_dir, target.enable_save);

            let mut fetched =
                pipeline::fetch_stage(store.as_ref(), period, transport(&config)?, &config, &adapters).await;
            fetched.skipped = skipped;

            let aggregator = Aggregator::new(AggregateOptions {
                flag_sampled: !process.no_sampling_caveat,
            });
            let processed =
                pipeline::process_stage(store.as_ref(), period, &fetched.succeeded, &aggregator);

            let assembler = ReportAssembler::new(report.top_n);
            let (reported, reports) =
                pipeline::report_stage(store.as_ref(), period, &processed.succeeded, &assembler);
            for report in &reports {
                display::print_report(report)?;
            }
            stages.extend([fetched, processed, reported]);
        }
    }

    for stage in &stages {
        display::print_stage(stage);
    }
    Ok(stages.iter().all(StageReport::is_success))
}

/// Configuration mistakes exit with 2, everything else with 1.
fn exit_code(err: &anyhow::Error) -> ExitCode {
    match err.downcast_ref::<FetchError>() {
        Some(FetchError::MissingCredential { .. } | FetchError::UnknownSource(_)) => ExitCode::from(2),
        _ => ExitCode::FAILURE,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{e:#}");
            exit_code(&e)
        }
    }
}
