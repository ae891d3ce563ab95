//! Report Assembler: summary tables → headlines, figures and narrative.

use quantify_core::summary::fraction;
use quantify_core::tools::{is_free_culture, restriction_of};
use quantify_core::{
    Dimension, FigurePoint, Headline, NarrativeEntry, RankedEntry, Report, ReportFigure,
    Restriction, RunPeriod, SummaryRow, SummaryTable, UNKNOWN,
};
use quantify_store::ArtifactStore;
use tracing::{debug, info};

use crate::ProcessError;
use crate::readme::upsert_entry;

pub const DEFAULT_TOP_N: usize = 10;

/// Human title of a source, used for README sections and figure titles.
pub fn source_title(source: &str) -> String {
    match source {
        "doaj" => "DOAJ".to_string(),
        "gcs" => "Google Custom Search".to_string(),
        "github" => "GitHub".to_string(),
        "wikipedia" => "Wikipedia".to_string(),
        other => other.to_string(),
    }
}

/// `1234567` → `1,234,567`.
pub fn thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

fn percent(value: f64) -> String {
    format!("{:.2}%", value * 100.0)
}

fn ranked<'a>(rows: impl Iterator<Item = &'a SummaryRow>, n: usize) -> Vec<RankedEntry> {
    rows.take(n)
        .map(|r| RankedEntry {
            key: r.key.clone(),
            count: r.count,
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct ReportAssembler {
    top_n: usize,
}

impl Default for ReportAssembler {
    fn default() -> Self {
        Self { top_n: DEFAULT_TOP_N }
    }
}

impl ReportAssembler {
    pub fn new(top_n: usize) -> Self {
        Self { top_n: top_n.max(1) }
    }

    pub fn top_n(&self) -> usize {
        self.top_n
    }

    /// Headline statistics for one raw table from its license summary.
    pub fn headline(&self, by_license: &SummaryTable) -> Headline {
        let grand_total = by_license.total();
        let free_culture_total = by_license
            .rows
            .iter()
            .filter(|r| is_free_culture(&r.key))
            .map(|r| r.count)
            .sum();
        let restriction_totals = Restriction::ALL
            .iter()
            .map(|restriction| {
                let total = by_license
                    .rows
                    .iter()
                    .filter(|r| restriction_of(&r.key) == *restriction)
                    .map(|r| r.count)
                    .sum();
                (restriction.label().to_string(), total)
            })
            .collect();

        let top = ranked(by_license.rows.iter(), self.top_n);
        let mut ascending: Vec<&SummaryRow> = by_license.rows.iter().collect();
        ascending.sort_by(|a, b| a.count.cmp(&b.count).then_with(|| a.key.cmp(&b.key)));
        let bottom = ranked(ascending.into_iter(), self.top_n);

        Headline {
            table: by_license.table.clone(),
            grand_total,
            free_culture_total,
            restriction_totals,
            top,
            bottom,
        }
    }

    /// Chart-ready figure for one summary. Year figures are chronological
    /// and complete, derived groupings complete, everything else top-N.
    pub fn figure(&self, summary: &SummaryTable) -> ReportFigure {
        let dimension = summary.dimension;
        let mut rows: Vec<_> = summary.rows.iter().collect();
        let shown = match dimension {
            Dimension::Year => {
                rows.sort_by_key(|r| (r.key.parse::<i32>().unwrap_or(i32::MAX), r.key.clone()));
                rows.len()
            }
            d if d.is_derived() => rows.len(),
            _ => rows.len().min(self.top_n),
        };
        let points: Vec<FigurePoint> = rows
            .into_iter()
            .take(shown)
            .map(|r| FigurePoint {
                label: r.key.clone(),
                value: r.count,
                percentage: r.percentage,
            })
            .collect();

        let source = source_title(&summary.source);
        let mut caption = format!(
            "{source} {} by {} for {}: {} works in total",
            summary.table,
            dimension.title().to_lowercase(),
            summary.period,
            thousands(summary.total()),
        );
        if shown < summary.rows.len() {
            caption.push_str(&format!(
                "; top {shown} of {} values shown",
                summary.rows.len()
            ));
        }
        if summary.sampled {
            caption.push_str("; counts are sampled, not exhaustive");
        }
        caption.push('.');

        ReportFigure {
            name: summary.name(),
            title: format!("{source} {} by {}", summary.table, dimension.title().to_lowercase()),
            x_label: dimension.title().to_string(),
            y_label: "Count".to_string(),
            caption,
            points,
        }
    }

    fn headline_entry(&self, source: &str, headline: &Headline, sampled: bool) -> NarrativeEntry {
        let title = source_title(source);
        let free_share = fraction(headline.free_culture_total, headline.grand_total);
        let mut text = format!(
            "{} works under legal tools in {title} `{}`; {} ({}) of the total are approved for \
             Free Cultural Works.",
            thousands(headline.grand_total),
            headline.table,
            thousands(headline.free_culture_total),
            percent(free_share),
        );
        let breakdown: Vec<String> = headline
            .restriction_totals
            .iter()
            .filter(|(_, total)| *total > 0)
            .map(|(label, total)| {
                format!(
                    "{label}: {} ({})",
                    thousands(*total),
                    percent(fraction(*total, headline.grand_total))
                )
            })
            .collect();
        if !breakdown.is_empty() {
            text.push_str(&format!(" By restriction: {}.", breakdown.join(", ")));
        }
        if let Some(leader) = headline.top.first()
            && leader.key != UNKNOWN
        {
            text.push_str(&format!(
                " The most common legal tool is {} with {} works.",
                leader.key,
                thousands(leader.count)
            ));
        }
        if sampled {
            text.push_str(" These counts come from a sampled fetch and are not exhaustive.");
        }
        NarrativeEntry {
            title: format!("{title} {} totals", headline.table),
            text,
            figure: None,
        }
    }

    /// Assemble the report for one source from its summaries.
    pub fn assemble(
        &self,
        source: &str,
        period: RunPeriod,
        summaries: &[SummaryTable],
    ) -> Result<Report, ProcessError> {
        let mut tables: Vec<&str> = Vec::new();
        for summary in summaries {
            if !tables.contains(&summary.table.as_str()) {
                tables.push(&summary.table);
            }
        }
        let sampled = summaries.iter().any(|s| s.sampled);

        let mut headlines = Vec::with_capacity(tables.len());
        for table in &tables {
            let by_license = summaries
                .iter()
                .find(|s| s.table == *table && s.dimension == Dimension::License)
                .ok_or_else(|| ProcessError::MissingLicenseSummary {
                    source_name: source.to_string(),
                    table: table.to_string(),
                })?;
            let headline = self.headline(by_license);
            debug_assert!(headline.free_culture_total <= headline.grand_total);
            headlines.push(headline);
        }

        let figures: Vec<ReportFigure> = summaries.iter().map(|s| self.figure(s)).collect();

        let mut narrative: Vec<NarrativeEntry> = headlines
            .iter()
            .map(|h| self.headline_entry(source, h, sampled))
            .collect();
        narrative.extend(figures.iter().map(|figure| NarrativeEntry {
            title: figure.title.clone(),
            text: figure.caption.clone(),
            figure: Some(format!("3-report/{source}_{}.csv", figure.name)),
        }));

        debug!(source, figures = figures.len(), "report assembled");
        Ok(Report {
            source: source.to_string(),
            period,
            sampled,
            headlines,
            figures,
            narrative,
        })
    }
}

/// Assemble the report for `source`, commit it, and upsert its narrative
/// into the period README.
pub fn report_source(
    store: &dyn ArtifactStore,
    source: &str,
    period: RunPeriod,
    assembler: &ReportAssembler,
) -> Result<Report, ProcessError> {
    let summaries = store.load_summaries(source, period)?;
    let report = assembler.assemble(source, period, &summaries)?;
    store.commit_report(&report)?;

    let section = source_title(source);
    let mut readme = store.load_readme(period)?.unwrap_or_default();
    for entry in &report.narrative {
        readme = upsert_entry(&readme, period, &section, entry)?;
    }
    store.save_readme(period, &readme)?;

    info!(
        source,
        period = %period,
        figures = report.figures.len(),
        entries = report.narrative.len(),
        "report committed"
    );
    Ok(report)
}
