//! The hand-off contract between pipeline stages.

use quantify_core::{Dimension, Provenance, RawTable, Report, RunPeriod, SummaryTable};
use serde::{Deserialize, Serialize};

use crate::StoreError;

/// Everything one fetch run of one source produced.
#[derive(Debug, Clone, PartialEq)]
pub struct RawArtifact {
    pub provenance: Provenance,
    pub tables: Vec<RawTable>,
}

/// Persistence for every stage's output.
///
/// Commits replace whatever the store held for the same `(source, period)`;
/// a failed commit leaves the previous artifacts readable.
pub trait ArtifactStore: Send + Sync {
    fn commit_raw(&self, tables: &[RawTable], provenance: &Provenance) -> Result<(), StoreError>;

    fn load_raw(&self, source: &str, period: RunPeriod) -> Result<RawArtifact, StoreError>;

    /// Sources with a complete raw artifact set for `period`.
    fn raw_sources(&self, period: RunPeriod) -> Result<Vec<String>, StoreError>;

    fn commit_summaries(
        &self,
        source: &str,
        period: RunPeriod,
        summaries: &[SummaryTable],
    ) -> Result<(), StoreError>;

    fn load_summaries(&self, source: &str, period: RunPeriod)
    -> Result<Vec<SummaryTable>, StoreError>;

    fn summary_sources(&self, period: RunPeriod) -> Result<Vec<String>, StoreError>;

    fn commit_report(&self, report: &Report) -> Result<(), StoreError>;

    fn load_report(&self, source: &str, period: RunPeriod) -> Result<Report, StoreError>;

    fn load_readme(&self, period: RunPeriod) -> Result<Option<String>, StoreError>;

    fn save_readme(&self, period: RunPeriod, text: &str) -> Result<(), StoreError>;
}

/// Index of the summaries written for one source, stored beside the CSVs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryManifest {
    pub source: String,
    pub period: RunPeriod,
    pub summaries: Vec<SummaryEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryEntry {
    pub name: String,
    pub table: String,
    pub dimension: Dimension,
    pub rows: u64,
    pub total: u64,
    pub sampled: bool,
}

impl SummaryManifest {
    pub fn from_summaries(source: &str, period: RunPeriod, summaries: &[SummaryTable]) -> Self {
        Self {
            source: source.to_string(),
            period,
            summaries: summaries
                .iter()
                .map(|s| SummaryEntry {
                    name: s.name(),
                    table: s.table.clone(),
                    dimension: s.dimension,
                    rows: s.rows.len() as u64,
                    total: s.total(),
                    sampled: s.sampled,
                })
                .collect(),
        }
    }
}

/// Check that every table belongs to the provenance's source and period.
pub(crate) fn check_raw_ownership(
    tables: &[RawTable],
    provenance: &Provenance,
) -> Result<(), StoreError> {
    for table in tables {
        if table.id.source != provenance.source || table.id.period != provenance.period {
            return Err(StoreError::Mismatch {
                table: table.id.table.clone(),
                found: format!("{}/{}", table.id.source, table.id.period),
                expected: format!("{}/{}", provenance.source, provenance.period),
            });
        }
    }
    Ok(())
}

pub(crate) fn check_summary_ownership(
    source: &str,
    period: RunPeriod,
    summaries: &[SummaryTable],
) -> Result<(), StoreError> {
    for summary in summaries {
        if summary.source != source || summary.period != period {
            return Err(StoreError::Mismatch {
                table: summary.name(),
                found: format!("{}/{}", summary.source, summary.period),
                expected: format!("{source}/{period}"),
            });
        }
    }
    Ok(())
}
