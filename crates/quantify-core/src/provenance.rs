use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::period::RunPeriod;
use crate::record::Dimension;

/// Metadata describing one fetch run of one source, covering all its tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    pub source: String,
    pub period: RunPeriod,
    pub fetched_at: DateTime<Utc>,
    pub api_version: String,
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
    pub pages_fetched: u64,
    pub retries: u64,
    pub rows: u64,
    pub tables: Vec<TableProvenance>,
    #[serde(default)]
    pub skipped: Vec<String>,
    /// Raw labels that fell into the `Unknown` bucket, with occurrence counts.
    #[serde(default)]
    pub unmapped_labels: BTreeMap<String, u64>,
    /// Totals the source reports alongside the per-tool counts.
    #[serde(default)]
    pub reference_totals: BTreeMap<String, u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sampling: Option<Sampling>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableProvenance {
    pub name: String,
    pub dimensions: Vec<Dimension>,
    pub rows: u64,
    pub total: u64,
}

/// Why a run's counts are not exhaustive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sampling {
    pub reasons: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_cap: Option<u64>,
}

impl Provenance {
    pub fn is_sampled(&self) -> bool {
        self.sampling.is_some()
    }

    pub fn unmapped_total(&self) -> u64 {
        self.unmapped_labels.values().sum()
    }

    pub fn table(&self, name: &str) -> Option<&TableProvenance> {
        self.tables.iter().find(|t| t.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Provenance {
        Provenance {
            source: "doaj".into(),
            period: "2025Q4".parse().unwrap(),
            fetched_at: "2025-10-02T08:00:00Z".parse().unwrap(),
            api_version: "v4".into(),
            parameters: BTreeMap::from([("page_size".to_string(), "100".to_string())]),
            pages_fetched: 3,
            retries: 1,
            rows: 250,
            tables: vec![TableProvenance {
                name: "journals".into(),
                dimensions: vec![Dimension::License, Dimension::Language],
                rows: 250,
                total: 250,
            }],
            skipped: vec![],
            unmapped_labels: BTreeMap::from([("Publisher's own license".to_string(), 4)]),
            reference_totals: BTreeMap::new(),
            sampling: None,
        }
    }

    #[test]
    fn yaml_round_trip_preserves_everything() {
        let prov = sample();
        let yaml = serde_yaml::to_string(&prov).unwrap();
        assert!(yaml.contains("period: 2025Q4"));
        assert!(!yaml.contains("sampling"));
        let back: Provenance = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back, prov);
    }

    #[test]
    fn sampling_and_lookups() {
        let mut prov = sample();
        assert!(!prov.is_sampled());
        assert_eq!(prov.unmapped_total(), 4);
        assert_eq!(prov.table("journals").map(|t| t.total), Some(250));
        assert!(prov.table("missing").is_none());

        prov.sampling = Some(Sampling {
            reasons: vec!["row limit 250 reached".into()],
            row_cap: Some(250),
        });
        assert!(prov.is_sampled());
    }
}
