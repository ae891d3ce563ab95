use quantify_core::{Provenance, RawTable, Report, RunPeriod, SummaryTable};
use tracing::debug;

use crate::artifact::{ArtifactStore, RawArtifact};
use crate::memory::MemoryStore;
use crate::StoreError;

/// Read-through store that never writes to its base.
///
/// Commits land in an in-memory overlay; loads consult the overlay first and
/// fall back to the base store. This lets a dry run hand off between stages
/// without touching the data directory.
pub struct DryRunStore<S> {
    base: S,
    overlay: MemoryStore,
}

impl<S: ArtifactStore> DryRunStore<S> {
    pub fn new(base: S) -> Self {
        Self {
            base,
            overlay: MemoryStore::new(),
        }
    }

    pub fn overlay(&self) -> &MemoryStore {
        &self.overlay
    }
}

fn or_base<T>(
    overlay: Result<T, StoreError>,
    base: impl FnOnce() -> Result<T, StoreError>,
) -> Result<T, StoreError> {
    match overlay {
        Err(e) if e.is_not_found() => base(),
        other => other,
    }
}

fn union(mut a: Vec<String>, b: Vec<String>) -> Vec<String> {
    a.extend(b);
    a.sort();
    a.dedup();
    a
}

impl<S: ArtifactStore> ArtifactStore for DryRunStore<S> {
    fn commit_raw(&self, tables: &[RawTable], provenance: &Provenance) -> Result<(), StoreError> {
        debug!(source = %provenance.source, "dry run: raw tables kept in memory");
        self.overlay.commit_raw(tables, provenance)
    }

    fn load_raw(&self, source: &str, period: RunPeriod) -> Result<RawArtifact, StoreError> {
        or_base(self.overlay.load_raw(source, period), || {
            self.base.load_raw(source, period)
        })
    }

    fn raw_sources(&self, period: RunPeriod) -> Result<Vec<String>, StoreError> {
        Ok(union(
            self.overlay.raw_sources(period)?,
            self.base.raw_sources(period)?,
        ))
    }

    fn commit_summaries(
        &self,
        source: &str,
        period: RunPeriod,
        summaries: &[SummaryTable],
    ) -> Result<(), StoreError> {
        debug!(source, "dry run: summaries kept in memory");
        self.overlay.commit_summaries(source, period, summaries)
    }

    fn load_summaries(
        &self,
        source: &str,
        period: RunPeriod,
    ) -> Result<Vec<SummaryTable>, StoreError> {
        or_base(self.overlay.load_summaries(source, period), || {
            self.base.load_summaries(source, period)
        })
    }

    fn summary_sources(&self, period: RunPeriod) -> Result<Vec<String>, StoreError> {
        Ok(union(
            self.overlay.summary_sources(period)?,
            self.base.summary_sources(period)?,
        ))
    }

    fn commit_report(&self, report: &Report) -> Result<(), StoreError> {
        debug!(source = %report.source, "dry run: report kept in memory");
        self.overlay.commit_report(report)
    }

    fn load_report(&self, source: &str, period: RunPeriod) -> Result<Report, StoreError> {
        or_base(self.overlay.load_report(source, period), || {
            self.base.load_report(source, period)
        })
    }

    fn load_readme(&self, period: RunPeriod) -> Result<Option<String>, StoreError> {
        match self.overlay.load_readme(period)? {
            Some(text) => Ok(Some(text)),
            None => self.base.load_readme(period),
        }
    }

    fn save_readme(&self, period: RunPeriod, text: &str) -> Result<(), StoreError> {
        self.overlay.save_readme(period, text)
    }
}
