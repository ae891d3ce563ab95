//! On-disk layout of a data directory.
//!
//! ```text
//! <root>/<period>/1-fetch/<source>_<table>.csv
//! <root>/<period>/1-fetch/<source>_provenance.yaml
//! <root>/<period>/2-process/<source>_<table>_by_<dimension>.csv
//! <root>/<period>/2-process/<source>_summaries.yaml
//! <root>/<period>/3-report/<source>_<figure>.csv
//! <root>/<period>/3-report/<source>_report.yaml
//! <root>/<period>/README.md
//! ```

use std::path::{Path, PathBuf};

use quantify_core::RunPeriod;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Fetch,
    Process,
    Report,
}

impl Phase {
    pub fn dir_name(&self) -> &'static str {
        match self {
            Phase::Fetch => "1-fetch",
            Phase::Process => "2-process",
            Phase::Report => "3-report",
        }
    }
}

pub const PROVENANCE_SUFFIX: &str = "_provenance.yaml";
pub const SUMMARIES_SUFFIX: &str = "_summaries.yaml";
pub const REPORT_SUFFIX: &str = "_report.yaml";

#[derive(Debug, Clone)]
pub struct DataLayout {
    root: PathBuf,
}

impl DataLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn period_dir(&self, period: RunPeriod) -> PathBuf {
        self.root.join(period.to_string())
    }

    pub fn phase_dir(&self, period: RunPeriod, phase: Phase) -> PathBuf {
        self.period_dir(period).join(phase.dir_name())
    }

    pub fn raw_table(&self, period: RunPeriod, source: &str, table: &str) -> PathBuf {
        self.phase_dir(period, Phase::Fetch)
            .join(format!("{source}_{table}.csv"))
    }

    pub fn provenance(&self, period: RunPeriod, source: &str) -> PathBuf {
        self.phase_dir(period, Phase::Fetch)
            .join(format!("{source}{PROVENANCE_SUFFIX}"))
    }

    /// `summary` is the summary name, `<table>_by_<dimension>`.
    pub fn summary(&self, period: RunPeriod, source: &str, summary: &str) -> PathBuf {
        self.phase_dir(period, Phase::Process)
            .join(format!("{source}_{summary}.csv"))
    }

    pub fn summary_manifest(&self, period: RunPeriod, source: &str) -> PathBuf {
        self.phase_dir(period, Phase::Process)
            .join(format!("{source}{SUMMARIES_SUFFIX}"))
    }

    pub fn figure(&self, period: RunPeriod, source: &str, figure: &str) -> PathBuf {
        self.phase_dir(period, Phase::Report)
            .join(format!("{source}_{figure}.csv"))
    }

    pub fn report_manifest(&self, period: RunPeriod, source: &str) -> PathBuf {
        self.phase_dir(period, Phase::Report)
            .join(format!("{source}{REPORT_SUFFIX}"))
    }

    pub fn readme(&self, period: RunPeriod) -> PathBuf {
        self.period_dir(period).join("README.md")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_follow_phase_directories() {
        let layout = DataLayout::new("data");
        let period: RunPeriod = "2025Q4".parse().unwrap();
        assert_eq!(
            layout.raw_table(period, "gcs", "count_by_country"),
            PathBuf::from("data/2025Q4/1-fetch/gcs_count_by_country.csv")
        );
        assert_eq!(
            layout.provenance(period, "gcs"),
            PathBuf::from("data/2025Q4/1-fetch/gcs_provenance.yaml")
        );
        assert_eq!(
            layout.summary(period, "doaj", "journals_by_language"),
            PathBuf::from("data/2025Q4/2-process/doaj_journals_by_language.csv")
        );
        assert_eq!(
            layout.report_manifest(period, "doaj"),
            PathBuf::from("data/2025Q4/3-report/doaj_report.yaml")
        );
        assert_eq!(layout.readme(period), PathBuf::from("data/2025Q4/README.md"));
    }
}
