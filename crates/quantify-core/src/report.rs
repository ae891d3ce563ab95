use serde::{Deserialize, Serialize};

use crate::period::RunPeriod;

/// A labelled value in a chart-ready table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FigurePoint {
    pub label: String,
    pub value: u64,
    pub percentage: f64,
}

/// Named chart-ready table with its presentation metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportFigure {
    pub name: String,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub caption: String,
    #[serde(skip)]
    pub points: Vec<FigurePoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedEntry {
    pub key: String,
    pub count: u64,
}

/// Headline statistics for one raw table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Headline {
    pub table: String,
    pub grand_total: u64,
    pub free_culture_total: u64,
    /// Restriction category label and its subtotal, in fixed category order.
    pub restriction_totals: Vec<(String, u64)>,
    pub top: Vec<RankedEntry>,
    pub bottom: Vec<RankedEntry>,
}

/// Narrative fragment destined for the period README.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrativeEntry {
    pub title: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub figure: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub source: String,
    pub period: RunPeriod,
    pub sampled: bool,
    pub headlines: Vec<Headline>,
    pub figures: Vec<ReportFigure>,
    pub narrative: Vec<NarrativeEntry>,
}

impl Report {
    pub fn figure(&self, name: &str) -> Option<&ReportFigure> {
        self.figures.iter().find(|f| f.name == name)
    }

    pub fn headline(&self, table: &str) -> Option<&Headline> {
        self.headlines.iter().find(|h| h.table == table)
    }
}
