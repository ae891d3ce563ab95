//! Filesystem artifact store: CSV tables plus YAML manifests under a
//! [`DataLayout`].

use std::fs;
use std::path::PathBuf;

use quantify_core::schema::tables;
use quantify_core::{
    Provenance, RawTable, RawTableId, Report, ReportFigure, RunPeriod, SummaryTable,
};
use tracing::{info, warn};

use crate::artifact::{
    ArtifactStore, RawArtifact, SummaryManifest, check_raw_ownership, check_summary_ownership,
};
use crate::io::{StagedWrites, read_csv, read_text, read_yaml, sources_with_suffix};
use crate::layout::{DataLayout, PROVENANCE_SUFFIX, Phase, SUMMARIES_SUFFIX};
use crate::StoreError;

/// Artifact store rooted at a data directory.
///
/// Every commit stages its files as temporaries in the target directory and
/// renames them into place; the manifest (provenance, summary index, report)
/// is renamed last, so readers never see a manifest that points at files from
/// a different commit.
pub struct FsStore {
    layout: DataLayout,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            layout: DataLayout::new(root),
        }
    }

    pub fn layout(&self) -> &DataLayout {
        &self.layout
    }

    fn has_raw_tables(&self, source: &str, period: RunPeriod) -> bool {
        let prefix = format!("{source}_");
        fs::read_dir(self.layout.phase_dir(period, Phase::Fetch))
            .map(|entries| {
                entries.filter_map(Result::ok).any(|entry| {
                    entry
                        .file_name()
                        .to_str()
                        .is_some_and(|name| name.starts_with(&prefix) && name.ends_with(".csv"))
                })
            })
            .unwrap_or(false)
    }
}

/// Delete files an earlier commit wrote that the new commit no longer lists.
fn remove_stale(previous: Vec<PathBuf>, current: &[PathBuf]) {
    for path in previous {
        if current.contains(&path) {
            continue;
        }
        if let Err(e) = fs::remove_file(&path)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            warn!(path = %path.display(), error = %e, "failed to remove stale table");
        }
    }
}

impl ArtifactStore for FsStore {
    fn commit_raw(&self, tables: &[RawTable], provenance: &Provenance) -> Result<(), StoreError> {
        check_raw_ownership(tables, provenance)?;
        let (source, period) = (provenance.source.as_str(), provenance.period);
        let provenance_path = self.layout.provenance(period, source);
        let previous: Vec<PathBuf> = read_yaml::<Provenance>(&provenance_path)
            .map(|p| {
                p.tables
                    .iter()
                    .map(|t| self.layout.raw_table(period, source, &t.name))
                    .collect()
            })
            .unwrap_or_default();

        let mut staged = StagedWrites::new();
        let mut written = Vec::with_capacity(tables.len());
        for table in tables {
            let path = self.layout.raw_table(period, source, &table.id.table);
            staged.csv(path.clone(), &table.to_batch()?)?;
            written.push(path);
        }
        staged.yaml(provenance_path, provenance)?;
        let files = staged.commit()?;

        remove_stale(previous, &written);
        info!(source, %period, files, rows = provenance.rows, "committed raw tables");
        Ok(())
    }

    fn load_raw(&self, source: &str, period: RunPeriod) -> Result<RawArtifact, StoreError> {
        let what = format!("raw tables for {source} ({period})");
        let provenance_path = self.layout.provenance(period, source);
        if !provenance_path.exists() {
            if self.has_raw_tables(source, period) {
                return Err(StoreError::Incomplete {
                    what,
                    detail: "provenance missing".into(),
                });
            }
            return Err(StoreError::NotFound { what });
        }

        let provenance: Provenance = read_yaml(&provenance_path)?;
        let mut raw_tables = Vec::with_capacity(provenance.tables.len());
        for entry in &provenance.tables {
            let path = self.layout.raw_table(period, source, &entry.name);
            if !path.exists() {
                return Err(StoreError::Incomplete {
                    what,
                    detail: format!("{} missing", path.display()),
                });
            }
            let batches = read_csv(&path, tables::raw_schema())?;
            let id = RawTableId {
                source: source.to_string(),
                table: entry.name.clone(),
                period,
            };
            raw_tables.push(RawTable::from_batches(id, entry.dimensions.clone(), &batches)?);
        }
        Ok(RawArtifact {
            provenance,
            tables: raw_tables,
        })
    }

    fn raw_sources(&self, period: RunPeriod) -> Result<Vec<String>, StoreError> {
        sources_with_suffix(&self.layout.phase_dir(period, Phase::Fetch), PROVENANCE_SUFFIX)
    }

    fn commit_summaries(
        &self,
        source: &str,
        period: RunPeriod,
        summaries: &[SummaryTable],
    ) -> Result<(), StoreError> {
        check_summary_ownership(source, period, summaries)?;
        let manifest_path = self.layout.summary_manifest(period, source);
        let previous: Vec<PathBuf> = read_yaml::<SummaryManifest>(&manifest_path)
            .map(|m| {
                m.summaries
                    .iter()
                    .map(|e| self.layout.summary(period, source, &e.name))
                    .collect()
            })
            .unwrap_or_default();

        let mut staged = StagedWrites::new();
        let mut written = Vec::with_capacity(summaries.len());
        for summary in summaries {
            let path = self.layout.summary(period, source, &summary.name());
            staged.csv(path.clone(), &summary.to_batch()?)?;
            written.push(path);
        }
        let manifest = SummaryManifest::from_summaries(source, period, summaries);
        staged.yaml(manifest_path, &manifest)?;
        let files = staged.commit()?;

        remove_stale(previous, &written);
        info!(source, %period, files, "committed summaries");
        Ok(())
    }

    fn load_summaries(
        &self,
        source: &str,
        period: RunPeriod,
    ) -> Result<Vec<SummaryTable>, StoreError> {
        let manifest_path = self.layout.summary_manifest(period, source);
        if !manifest_path.exists() {
            return Err(StoreError::not_found(format!("summaries for {source} ({period})")));
        }
        let manifest: SummaryManifest = read_yaml(&manifest_path)?;
        let mut summaries = Vec::with_capacity(manifest.summaries.len());
        for entry in manifest.summaries {
            let path = self.layout.summary(period, source, &entry.name);
            let batches = read_csv(&path, tables::summary_schema(entry.dimension))?;
            summaries.push(SummaryTable {
                source: source.to_string(),
                table: entry.table,
                period,
                dimension: entry.dimension,
                sampled: entry.sampled,
                rows: SummaryTable::rows_from_batches(entry.dimension, &batches)?,
            });
        }
        Ok(summaries)
    }

    fn summary_sources(&self, period: RunPeriod) -> Result<Vec<String>, StoreError> {
        sources_with_suffix(&self.layout.phase_dir(period, Phase::Process), SUMMARIES_SUFFIX)
    }

    fn commit_report(&self, report: &Report) -> Result<(), StoreError> {
        let (source, period) = (report.source.as_str(), report.period);
        let manifest_path = self.layout.report_manifest(period, source);
        let previous: Vec<PathBuf> = read_yaml::<Report>(&manifest_path)
            .map(|r| {
                r.figures
                    .iter()
                    .map(|f| self.layout.figure(period, source, &f.name))
                    .collect()
            })
            .unwrap_or_default();

        let mut staged = StagedWrites::new();
        let mut written = Vec::with_capacity(report.figures.len());
        for figure in &report.figures {
            let path = self.layout.figure(period, source, &figure.name);
            staged.csv(path.clone(), &figure.to_batch()?)?;
            written.push(path);
        }
        staged.yaml(manifest_path, report)?;
        let files = staged.commit()?;

        remove_stale(previous, &written);
        info!(source, %period, files, "committed report");
        Ok(())
    }

    fn load_report(&self, source: &str, period: RunPeriod) -> Result<Report, StoreError> {
        let manifest_path = self.layout.report_manifest(period, source);
        if !manifest_path.exists() {
            return Err(StoreError::not_found(format!("report for {source} ({period})")));
        }
        let mut report: Report = read_yaml(&manifest_path)?;
        for figure in &mut report.figures {
            let path = self.layout.figure(period, source, &figure.name);
            let batches = read_csv(&path, tables::figure_schema())?;
            figure.points = ReportFigure::points_from_batches(&batches)?;
        }
        Ok(report)
    }

    fn load_readme(&self, period: RunPeriod) -> Result<Option<String>, StoreError> {
        read_text(&self.layout.readme(period))
    }

    fn save_readme(&self, period: RunPeriod, text: &str) -> Result<(), StoreError> {
        let mut staged = StagedWrites::new();
        staged.text(self.layout.readme(period), text)?;
        staged.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use quantify_core::{
        Dimension, FigurePoint, SourceRecord, SummaryRow, TableProvenance,
    };
    use tempfile::TempDir;

    use super::*;

    fn period() -> RunPeriod {
        "2025Q4".parse().unwrap()
    }

    fn raw(source: &str, table: &str, records: Vec<SourceRecord>) -> RawTable {
        let mut t = RawTable::new(
            RawTableId {
                source: source.into(),
                table: table.into(),
                period: period(),
            },
            vec![Dimension::License, Dimension::Country],
        );
        t.records = records;
        t
    }

    fn provenance(source: &str, tables: &[&RawTable]) -> Provenance {
        Provenance {
            source: source.into(),
            period: period(),
            fetched_at: chrono::Utc::now(),
            api_version: "v1".into(),
            parameters: BTreeMap::new(),
            pages_fetched: 1,
            retries: 0,
            rows: tables.iter().map(|t| t.len() as u64).sum(),
            tables: tables
                .iter()
                .map(|t| TableProvenance {
                    name: t.id.table.clone(),
                    dimensions: t.dimensions.clone(),
                    rows: t.len() as u64,
                    total: t.total(),
                })
                .collect(),
            skipped: vec![],
            unmapped_labels: BTreeMap::new(),
            reference_totals: BTreeMap::new(),
            sampling: None,
        }
    }

    #[test]
    fn raw_commit_and_load() {
        let tmp = TempDir::new().unwrap();
        let store = FsStore::new(tmp.path());
        let table = raw(
            "gcs",
            "count_by_country",
            vec![
                SourceRecord::new("gcs", "CC BY 4.0", 120).with_country("US"),
                SourceRecord::new("gcs", "CC0 1.0", 7),
            ],
        );
        let prov = provenance("gcs", &[&table]);
        store.commit_raw(std::slice::from_ref(&table), &prov).unwrap();

        assert!(tmp.path().join("2025Q4/1-fetch/gcs_count_by_country.csv").exists());
        assert!(tmp.path().join("2025Q4/1-fetch/gcs_provenance.yaml").exists());

        let artifact = store.load_raw("gcs", period()).unwrap();
        assert_eq!(artifact.tables, vec![table]);
        assert_eq!(artifact.provenance.rows, 2);
        assert_eq!(store.raw_sources(period()).unwrap(), vec!["gcs"]);
    }

    #[test]
    fn missing_raw_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let store = FsStore::new(tmp.path());
        let err = store.load_raw("doaj", period()).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn tables_without_provenance_are_incomplete() {
        let tmp = TempDir::new().unwrap();
        let store = FsStore::new(tmp.path());
        let dir = tmp.path().join("2025Q4/1-fetch");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("doaj_journals.csv"), "source,legal_tool\n").unwrap();

        let err = store.load_raw("doaj", period()).unwrap_err();
        assert!(matches!(err, StoreError::Incomplete { .. }), "got {err}");
        assert!(store.raw_sources(period()).unwrap().is_empty());
    }

    #[test]
    fn recommit_supersedes_and_drops_stale_tables() {
        let tmp = TempDir::new().unwrap();
        let store = FsStore::new(tmp.path());

        let a = raw("gcs", "count", vec![SourceRecord::new("gcs", "CC BY 4.0", 1)]);
        let b = raw("gcs", "count_by_language", vec![SourceRecord::new("gcs", "CC BY 4.0", 1)]);
        store.commit_raw(&[a.clone(), b.clone()], &provenance("gcs", &[&a, &b])).unwrap();

        let a2 = raw("gcs", "count", vec![SourceRecord::new("gcs", "CC0 1.0", 9)]);
        store.commit_raw(std::slice::from_ref(&a2), &provenance("gcs", &[&a2])).unwrap();

        let artifact = store.load_raw("gcs", period()).unwrap();
        assert_eq!(artifact.tables, vec![a2]);
        assert!(!tmp.path().join("2025Q4/1-fetch/gcs_count_by_language.csv").exists());
    }

    #[test]
    fn foreign_table_rejected() {
        let tmp = TempDir::new().unwrap();
        let store = FsStore::new(tmp.path());
        let table = raw("doaj", "journals", vec![]);
        let err = store
            .commit_raw(std::slice::from_ref(&table), &provenance("gcs", &[&table]))
            .unwrap_err();
        assert!(matches!(err, StoreError::Mismatch { .. }));
        assert!(!tmp.path().join("2025Q4").exists());
    }

    #[test]
    fn summaries_round_trip_with_manifest() {
        let tmp = TempDir::new().unwrap();
        let store = FsStore::new(tmp.path());
        let summary = SummaryTable {
            source: "doaj".into(),
            table: "journals".into(),
            period: period(),
            dimension: Dimension::Language,
            sampled: true,
            rows: vec![
                SummaryRow { key: "EN".into(), count: 3, percentage: 0.75 },
                SummaryRow { key: "Unknown".into(), count: 1, percentage: 0.25 },
            ],
        };
        store
            .commit_summaries("doaj", period(), std::slice::from_ref(&summary))
            .unwrap();

        let csv = fs::read_to_string(tmp.path().join("2025Q4/2-process/doaj_journals_by_language.csv"))
            .unwrap();
        assert!(csv.starts_with("language,count,percentage\n"));

        let loaded = store.load_summaries("doaj", period()).unwrap();
        assert_eq!(loaded, vec![summary]);
        assert_eq!(store.summary_sources(period()).unwrap(), vec!["doaj"]);
    }

    #[test]
    fn report_round_trip_with_figures() {
        let tmp = TempDir::new().unwrap();
        let store = FsStore::new(tmp.path());
        let report = Report {
            source: "github".into(),
            period: period(),
            sampled: false,
            headlines: vec![],
            figures: vec![ReportFigure {
                name: "count_by_license".into(),
                title: "GitHub count by legal tool".into(),
                x_label: "Legal tool".into(),
                y_label: "Count".into(),
                caption: "caption".into(),
                points: vec![FigurePoint {
                    label: "MIT".into(),
                    value: 10,
                    percentage: 1.0,
                }],
            }],
            narrative: vec![],
        };
        store.commit_report(&report).unwrap();
        assert!(tmp.path().join("2025Q4/3-report/github_count_by_license.csv").exists());
        assert_eq!(store.load_report("github", period()).unwrap(), report);
    }

    #[test]
    fn resummarising_drops_summaries_no_longer_produced() {
        let tmp = TempDir::new().unwrap();
        let store = FsStore::new(tmp.path());
        let summary = |dimension| SummaryTable {
            source: "doaj".into(),
            table: "journals".into(),
            period: period(),
            dimension,
            sampled: false,
            rows: vec![SummaryRow { key: "Unknown".into(), count: 1, percentage: 1.0 }],
        };
        let dir = tmp.path().join("2025Q4/2-process");

        store
            .commit_summaries("doaj", period(), &[summary(Dimension::License), summary(Dimension::Subject)])
            .unwrap();
        assert!(dir.join("doaj_journals_by_subject.csv").exists());

        store
            .commit_summaries("doaj", period(), &[summary(Dimension::License)])
            .unwrap();
        assert!(dir.join("doaj_journals_by_license.csv").exists());
        assert!(!dir.join("doaj_journals_by_subject.csv").exists());
        assert_eq!(store.load_summaries("doaj", period()).unwrap().len(), 1);
    }

    #[test]
    fn rereporting_drops_figures_no_longer_produced() {
        let tmp = TempDir::new().unwrap();
        let store = FsStore::new(tmp.path());
        let figure = |name: &str| ReportFigure {
            name: name.into(),
            title: name.into(),
            x_label: "Legal tool".into(),
            y_label: "Count".into(),
            caption: String::new(),
            points: vec![],
        };
        let mut report = Report {
            source: "github".into(),
            period: period(),
            sampled: false,
            headlines: vec![],
            figures: vec![figure("count_by_license"), figure("count_by_status")],
            narrative: vec![],
        };
        store.commit_report(&report).unwrap();

        report.figures.pop();
        store.commit_report(&report).unwrap();

        let dir = tmp.path().join("2025Q4/3-report");
        assert!(dir.join("github_count_by_license.csv").exists());
        assert!(!dir.join("github_count_by_status.csv").exists());
    }

    #[test]
    fn readme_save_and_load() {
        let tmp = TempDir::new().unwrap();
        let store = FsStore::new(tmp.path());
        assert_eq!(store.load_readme(period()).unwrap(), None);
        store.save_readme(period(), "# Report\n").unwrap();
        assert_eq!(store.load_readme(period()).unwrap().as_deref(), Some("# Report\n"));
    }
}
