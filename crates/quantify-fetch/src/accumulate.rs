//! Raw Accumulator: collects a source's pages into deduplicated raw tables
//! and their provenance.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use quantify_core::{
    Provenance, RawTable, RawTableId, RecordKey, RunPeriod, Sampling, TableProvenance, TableSpec,
};
use quantify_store::ArtifactStore;
use tracing::{info, warn};

use crate::FetchError;
use crate::adapter::{FetchLimits, Page, Pager, SourceAdapter};
use crate::client::{ApiClient, RetryPolicy};
use crate::http::Transport;

struct TableBuffer {
    table: RawTable,
    index: HashMap<RecordKey, usize>,
}

impl TableBuffer {
    fn push(&mut self, record: quantify_core::SourceRecord) {
        match self.index.get(&record.key()) {
            Some(&i) => self.table.records[i].count += record.count,
            None => {
                self.index.insert(record.key(), self.table.records.len());
                self.table.records.push(record);
            }
        }
    }
}

/// Per-run state while pages stream in.
pub struct RawAccumulator {
    source: String,
    period: RunPeriod,
    tables: Vec<TableBuffer>,
    pages: u64,
    skipped: Vec<String>,
    unmapped: BTreeMap<String, u64>,
    reference_totals: BTreeMap<String, u64>,
    caveats: Vec<String>,
}

/// Everything needed to describe the run besides the pages themselves.
#[derive(Debug, Clone)]
pub struct RunMeta {
    pub fetched_at: DateTime<Utc>,
    pub api_version: String,
    pub parameters: BTreeMap<String, String>,
    pub retries: u64,
    pub truncation: Option<String>,
    pub row_cap: Option<u64>,
}

/// Raw tables plus provenance, ready to commit.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchOutcome {
    pub tables: Vec<RawTable>,
    pub provenance: Provenance,
}

impl FetchOutcome {
    pub fn commit(&self, store: &dyn ArtifactStore) -> Result<(), FetchError> {
        store.commit_raw(&self.tables, &self.provenance)?;
        Ok(())
    }
}

impl RawAccumulator {
    pub fn new(source: &str, period: RunPeriod, specs: Vec<TableSpec>) -> Self {
        let tables = specs
            .into_iter()
            .map(|spec| TableBuffer {
                table: RawTable::new(
                    RawTableId {
                        source: source.to_string(),
                        table: spec.name,
                        period,
                    },
                    spec.dimensions,
                ),
                index: HashMap::new(),
            })
            .collect();
        Self {
            source: source.to_string(),
            period,
            tables,
            pages: 0,
            skipped: Vec::new(),
            unmapped: BTreeMap::new(),
            reference_totals: BTreeMap::new(),
            caveats: Vec::new(),
        }
    }

    pub fn push(&mut self, page: Page) -> Result<(), FetchError> {
        let buffer = self
            .tables
            .iter_mut()
            .find(|b| b.table.id.table == page.table)
            .ok_or_else(|| FetchError::UnknownTable(page.table.to_string()))?;
        self.pages += 1;

        let result = page.result;
        for record in result.records {
            buffer.push(record);
        }
        if let Some(reason) = result.skipped {
            info!(source = %self.source, query = %page.query, reason = %reason, "page skipped");
            self.skipped.push(format!("{} page {}: {reason}", page.query, page.number));
        }
        for label in result.unmapped {
            *self.unmapped.entry(label).or_default() += 1;
        }
        for (label, total) in result.reference_totals {
            self.reference_totals.insert(label, total);
        }
        if let Some(caveat) = result.caveat
            && !self.caveats.contains(&caveat)
        {
            self.caveats.push(caveat);
        }
        Ok(())
    }

    pub fn finish(self, meta: RunMeta) -> FetchOutcome {
        let tables: Vec<RawTable> = self.tables.into_iter().map(|b| b.table).collect();
        let table_provenance = tables
            .iter()
            .map(|t| TableProvenance {
                name: t.id.table.clone(),
                dimensions: t.dimensions.clone(),
                rows: t.len() as u64,
                total: t.total(),
            })
            .collect();

        let mut reasons = Vec::new();
        if let Some(truncation) = &meta.truncation {
            reasons.push(truncation.clone());
        }
        reasons.extend(self.caveats);
        let sampling = (!reasons.is_empty()).then(|| Sampling {
            reasons,
            row_cap: meta.truncation.as_ref().and(meta.row_cap),
        });

        if !self.unmapped.is_empty() {
            let total: u64 = self.unmapped.values().sum();
            warn!(source = %self.source, labels = self.unmapped.len(), occurrences = total, "unmapped legal tool labels");
        }

        let provenance = Provenance {
            source: self.source,
            period: self.period,
            fetched_at: meta.fetched_at,
            api_version: meta.api_version,
            parameters: meta.parameters,
            pages_fetched: self.pages,
            retries: meta.retries,
            rows: tables.iter().map(|t| t.len() as u64).sum(),
            tables: table_provenance,
            skipped: self.skipped,
            unmapped_labels: self.unmapped,
            reference_totals: self.reference_totals,
            sampling,
        };
        FetchOutcome { tables, provenance }
    }
}

/// Run one adapter to completion and accumulate its pages.
///
/// Any unrecovered error aborts the run; nothing is returned to commit.
pub async fn fetch_source(
    adapter: &dyn SourceAdapter,
    transport: Arc<dyn Transport>,
    retry: RetryPolicy,
    limits: FetchLimits,
    period: RunPeriod,
) -> Result<FetchOutcome, FetchError> {
    let fetched_at = Utc::now();
    let client = ApiClient::new(transport, adapter.min_delay(), retry);
    let mut pager = Pager::new(adapter, &client, limits);
    let mut acc = RawAccumulator::new(adapter.name(), period, adapter.tables());

    while let Some(page) = pager.next_page().await? {
        acc.push(page)?;
    }

    let truncation = pager.truncation().map(str::to_string);
    if let Some(reason) = &truncation {
        warn!(source = adapter.name(), reason = %reason, "fetch truncated, counts are sampled");
    }
    let outcome = acc.finish(RunMeta {
        fetched_at,
        api_version: adapter.api_version().to_string(),
        parameters: adapter.parameters(),
        retries: client.stats().retries,
        truncation,
        row_cap: limits.max_rows,
    });
    info!(
        source = adapter.name(),
        pages = outcome.provenance.pages_fetched,
        rows = outcome.provenance.rows,
        retries = outcome.provenance.retries,
        "fetch complete"
    );
    Ok(outcome)
}
