use serde::{Deserialize, Serialize};

use crate::period::RunPeriod;
use crate::record::Dimension;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow {
    pub key: String,
    pub count: u64,
    /// Fraction of the raw table total, in `[0, 1]`.
    pub percentage: f64,
}

/// Counts of one raw table grouped by one dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryTable {
    pub source: String,
    pub table: String,
    pub period: RunPeriod,
    pub dimension: Dimension,
    /// Set when the underlying fetch was sampled rather than exhaustive.
    pub sampled: bool,
    pub rows: Vec<SummaryRow>,
}

impl SummaryTable {
    /// `<table>_by_<dimension>`, the file stem this summary is stored under.
    pub fn name(&self) -> String {
        summary_name(&self.table, self.dimension)
    }

    pub fn total(&self) -> u64 {
        self.rows.iter().map(|r| r.count).sum()
    }

    pub fn row(&self, key: &str) -> Option<&SummaryRow> {
        self.rows.iter().find(|r| r.key == key)
    }
}

pub fn summary_name(table: &str, dimension: Dimension) -> String {
    format!("{table}_by_{}", dimension.slug())
}

/// `count / total`, zero when the total is zero.
pub fn fraction(count: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_and_lookup() {
        let table = SummaryTable {
            source: "gcs".into(),
            table: "count".into(),
            period: "2025Q4".parse().unwrap(),
            dimension: Dimension::Country,
            sampled: true,
            rows: vec![
                SummaryRow { key: "US".into(), count: 3, percentage: 0.75 },
                SummaryRow { key: "DE".into(), count: 1, percentage: 0.25 },
            ],
        };
        assert_eq!(table.name(), "count_by_country");
        assert_eq!(table.total(), 4);
        assert_eq!(table.row("DE").map(|r| r.count), Some(1));
    }

    #[test]
    fn fraction_handles_zero_total() {
        assert_eq!(fraction(0, 0), 0.0);
        assert_eq!(fraction(1, 4), 0.25);
    }
}
