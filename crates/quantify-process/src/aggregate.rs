//! Aggregator: raw tables → per-dimension summary tables.
//!
//! Each raw table yields one summary per declared dimension (license first)
//! plus the four license-derived groupings. Counts are grouped on exact
//! normalized values; blank or missing values fall into the `Unknown` bucket.

use std::collections::HashMap;

use quantify_core::summary::fraction;
use quantify_core::tools::{free_culture_label, lifecycle_of, product_of, restriction_of};
use quantify_core::{
    Dimension, RawTable, RunPeriod, SourceRecord, SummaryRow, SummaryTable, UNKNOWN,
    canonical_label,
};
use quantify_store::{ArtifactStore, RawArtifact};
use tracing::info;

use crate::ProcessError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregateOptions {
    /// Carry the fetch's sampling caveat onto every summary.
    pub flag_sampled: bool,
}

impl Default for AggregateOptions {
    fn default() -> Self {
        Self { flag_sampled: true }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Aggregator {
    options: AggregateOptions,
}

impl Aggregator {
    pub fn new(options: AggregateOptions) -> Self {
        Self { options }
    }

    /// Dimensions summarised for a table: license, the other declared
    /// dimensions in declaration order, then the derived groupings.
    pub fn dimensions(table: &RawTable) -> Vec<Dimension> {
        let mut dims = vec![Dimension::License];
        dims.extend(
            table
                .dimensions
                .iter()
                .copied()
                .filter(|d| *d != Dimension::License && !d.is_derived()),
        );
        dims.extend(Dimension::DERIVED);
        dims
    }

    pub fn summarize_table(&self, table: &RawTable, sampled: bool) -> Vec<SummaryTable> {
        let sampled = sampled && self.options.flag_sampled;
        Self::dimensions(table)
            .into_iter()
            .map(|dimension| SummaryTable {
                source: table.id.source.clone(),
                table: table.id.table.clone(),
                period: table.id.period,
                dimension,
                sampled,
                rows: group(&table.records, dimension),
            })
            .collect()
    }

    /// Summaries for every table of a fetch run, in table order.
    pub fn summarize(&self, artifact: &RawArtifact) -> Vec<SummaryTable> {
        let sampled = artifact.provenance.is_sampled();
        artifact
            .tables
            .iter()
            .flat_map(|table| self.summarize_table(table, sampled))
            .collect()
    }
}

/// Group key of `record` under `dimension`.
fn key(record: &SourceRecord, dimension: Dimension) -> String {
    let label = || canonical_label(&record.legal_tool);
    match dimension {
        Dimension::License => label(),
        Dimension::Product => product_of(&label()).label().to_string(),
        Dimension::Restriction => restriction_of(&label()).label().to_string(),
        Dimension::Status => lifecycle_of(&label()).label().to_string(),
        Dimension::FreeCulture => free_culture_label(&label()).to_string(),
        _ => match record.value(dimension) {
            Some(value) if !value.trim().is_empty() => value.trim().to_string(),
            _ => UNKNOWN.to_string(),
        },
    }
}

/// Counts per key with percentages of the table total, ordered by count
/// descending then key ascending.
fn group(records: &[SourceRecord], dimension: Dimension) -> Vec<SummaryRow> {
    let mut counts: HashMap<String, u64> = HashMap::new();
    for record in records {
        *counts.entry(key(record, dimension)).or_default() += record.count;
    }
    let total: u64 = counts.values().sum();

    let mut rows: Vec<SummaryRow> = counts
        .into_iter()
        .map(|(key, count)| SummaryRow {
            percentage: fraction(count, total),
            key,
            count,
        })
        .collect();
    rows.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.key.cmp(&b.key)));
    rows
}

/// Aggregate the committed raw tables of `source` and commit the summaries.
pub fn process_source(
    store: &dyn ArtifactStore,
    source: &str,
    period: RunPeriod,
    aggregator: &Aggregator,
) -> Result<Vec<SummaryTable>, ProcessError> {
    let artifact = store.load_raw(source, period)?;
    let summaries = aggregator.summarize(&artifact);
    store.commit_summaries(source, period, &summaries)?;
    info!(
        source,
        period = %period,
        tables = artifact.tables.len(),
        summaries = summaries.len(),
        sampled = summaries.iter().any(|s| s.sampled),
        "summaries committed"
    );
    Ok(summaries)
}
