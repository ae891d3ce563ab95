use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use quantify_core::{Provenance, RawTable, Report, RunPeriod, SummaryTable};

use crate::artifact::{ArtifactStore, RawArtifact, check_raw_ownership, check_summary_ownership};
use crate::StoreError;

type Key = (String, RunPeriod);

#[derive(Default)]
struct Inner {
    raw: BTreeMap<Key, RawArtifact>,
    summaries: BTreeMap<Key, Vec<SummaryTable>>,
    reports: BTreeMap<Key, Report>,
    readmes: BTreeMap<RunPeriod, String>,
}

/// Artifact store that keeps everything in process memory.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, StoreError> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Other("memory store lock poisoned".into()))
    }
}

fn key(source: &str, period: RunPeriod) -> Key {
    (source.to_string(), period)
}

fn sources<V>(map: &BTreeMap<Key, V>, period: RunPeriod) -> Vec<String> {
    map.keys()
        .filter(|(_, p)| *p == period)
        .map(|(s, _)| s.clone())
        .collect()
}

impl ArtifactStore for MemoryStore {
    fn commit_raw(&self, tables: &[RawTable], provenance: &Provenance) -> Result<(), StoreError> {
        check_raw_ownership(tables, provenance)?;
        let artifact = RawArtifact {
            provenance: provenance.clone(),
            tables: tables.to_vec(),
        };
        self.lock()?
            .raw
            .insert(key(&provenance.source, provenance.period), artifact);
        Ok(())
    }

    fn load_raw(&self, source: &str, period: RunPeriod) -> Result<RawArtifact, StoreError> {
        self.lock()?
            .raw
            .get(&key(source, period))
            .cloned()
            .ok_or_else(|| StoreError::not_found(format!("raw tables for {source} ({period})")))
    }

    fn raw_sources(&self, period: RunPeriod) -> Result<Vec<String>, StoreError> {
        Ok(sources(&self.lock()?.raw, period))
    }

    fn commit_summaries(
        &self,
        source: &str,
        period: RunPeriod,
        summaries: &[SummaryTable],
    ) -> Result<(), StoreError> {
        check_summary_ownership(source, period, summaries)?;
        self.lock()?
            .summaries
            .insert(key(source, period), summaries.to_vec());
        Ok(())
    }

    fn load_summaries(
        &self,
        source: &str,
        period: RunPeriod,
    ) -> Result<Vec<SummaryTable>, StoreError> {
        self.lock()?
            .summaries
            .get(&key(source, period))
            .cloned()
            .ok_or_else(|| StoreError::not_found(format!("summaries for {source} ({period})")))
    }

    fn summary_sources(&self, period: RunPeriod) -> Result<Vec<String>, StoreError> {
        Ok(sources(&self.lock()?.summaries, period))
    }

    fn commit_report(&self, report: &Report) -> Result<(), StoreError> {
        self.lock()?
            .reports
            .insert(key(&report.source, report.period), report.clone());
        Ok(())
    }

    fn load_report(&self, source: &str, period: RunPeriod) -> Result<Report, StoreError> {
        self.lock()?
            .reports
            .get(&key(source, period))
            .cloned()
            .ok_or_else(|| StoreError::not_found(format!("report for {source} ({period})")))
    }

    fn load_readme(&self, period: RunPeriod) -> Result<Option<String>, StoreError> {
        Ok(self.lock()?.readmes.get(&period).cloned())
    }

    fn save_readme(&self, period: RunPeriod, text: &str) -> Result<(), StoreError> {
        self.lock()?.readmes.insert(period, text.to_string());
        Ok(())
    }
}
