//! Stage orchestration: fetch → process → report, one source at a time.
//!
//! A failing source is recorded and the stage moves on to the next one; the
//! caller turns any recorded failure into a non-zero exit code.

use std::sync::Arc;
use std::time::Instant;

use quantify_core::{Report, RunPeriod};
use quantify_fetch::{
    FetchConfig, FetchError, SOURCES, SourceAdapter, Transport, build_adapter, fetch_source,
};
use quantify_process::{Aggregator, ReportAssembler, process_source, report_source};
use quantify_store::ArtifactStore;
use tracing::{error, info, warn};

/// What happened to each source in one stage.
#[derive(Debug, Default)]
pub struct StageReport {
    pub stage: &'static str,
    pub succeeded: Vec<String>,
    pub failed: Vec<(String, String)>,
    pub skipped: Vec<(String, String)>,
    pub elapsed_secs: f64,
}

impl StageReport {
    fn new(stage: &'static str) -> Self {
        Self {
            stage,
            ..Self::default()
        }
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    fn record<T, E: std::fmt::Display>(&mut self, source: &str, result: Result<T, E>) -> Option<T> {
        match result {
            Ok(value) => {
                self.succeeded.push(source.to_string());
                Some(value)
            }
            Err(e) => {
                error!(stage = self.stage, source, error = %e, "source failed");
                self.failed.push((source.to_string(), e.to_string()));
                None
            }
        }
    }
}

/// Adapters for the requested sources, or every source when none is named.
///
/// A named source that cannot run is a configuration error. When running
/// every source, those missing credentials are skipped with a warning.
pub fn select_adapters(
    requested: &[String],
    config: &FetchConfig,
) -> Result<(Vec<Box<dyn SourceAdapter>>, Vec<(String, String)>), FetchError> {
    let mut adapters = Vec::new();
    let mut skipped = Vec::new();
    if requested.is_empty() {
        for name in SOURCES {
            match build_adapter(name, config) {
                Ok(adapter) => adapters.push(adapter),
                Err(e @ FetchError::MissingCredential { .. }) => {
                    warn!(source = name, reason = %e, "skipping source");
                    skipped.push((name.to_string(), e.to_string()));
                }
                Err(e) => return Err(e),
            }
        }
    } else {
        for name in requested {
            adapters.push(build_adapter(name, config)?);
        }
    }
    Ok((adapters, skipped))
}

/// Source names for the process and report stages: the requested ones
/// (which must be known), or whatever the previous stage left in the store.
pub fn stage_sources(requested: &[String], available: Vec<String>) -> Result<Vec<String>, FetchError> {
    if requested.is_empty() {
        return Ok(available);
    }
    for name in requested {
        if !SOURCES.contains(&name.as_str()) {
            return Err(FetchError::UnknownSource(name.clone()));
        }
    }
    Ok(requested.to_vec())
}

pub async fn fetch_stage(
    store: &dyn ArtifactStore,
    period: RunPeriod,
    transport: Arc<dyn Transport>,
    config: &FetchConfig,
    adapters: &[Box<dyn SourceAdapter>],
) -> StageReport {
    let start = Instant::now();
    let mut report = StageReport::new("fetch");
    for adapter in adapters {
        let name = adapter.name();
        info!(source = name, period = %period, "fetching");
        let result = match fetch_source(
            adapter.as_ref(),
            transport.clone(),
            config.retry,
            config.limits,
            period,
        )
        .await
        {
            Ok(outcome) => outcome.commit(store).map(|()| outcome),
            Err(e) => Err(e),
        };
        if let Some(outcome) = report.record(name, result) {
            eprintln!(
                "  {name}: {} rows in {} tables, {} pages, {} retries{}",
                outcome.provenance.rows,
                outcome.tables.len(),
                outcome.provenance.pages_fetched,
                outcome.provenance.retries,
                if outcome.provenance.is_sampled() { " (sampled)" } else { "" },
            );
        }
    }
    report.elapsed_secs = start.elapsed().as_secs_f64();
    report
}

pub fn process_stage(
    store: &dyn ArtifactStore,
    period: RunPeriod,
    sources: &[String],
    aggregator: &Aggregator,
) -> StageReport {
    let start = Instant::now();
    let mut report = StageReport::new("process");
    for source in sources {
        if let Some(summaries) = report.record(source, process_source(store, source, period, aggregator)) {
            eprintln!("  {source}: {} summary tables", summaries.len());
        }
    }
    report.elapsed_secs = start.elapsed().as_secs_f64();
    report
}

pub fn report_stage(
    store: &dyn ArtifactStore,
    period: RunPeriod,
    sources: &[String],
    assembler: &ReportAssembler,
) -> (StageReport, Vec<Report>) {
    let start = Instant::now();
    let mut stage = StageReport::new("report");
    let mut reports = Vec::new();
    for source in sources {
        if let Some(report) = stage.record(source, report_source(store, source, period, assembler)) {
            reports.push(report);
        }
    }
    stage.elapsed_secs = start.elapsed().as_secs_f64();
    (stage, reports)
}
