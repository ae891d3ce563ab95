//! Terminal output: source listing, stage summaries and report previews.

use arrow::util::pretty::pretty_format_batches;
use quantify_core::{Dimension, Report};
use quantify_fetch::{FetchConfig, SOURCES, build_adapter};
use quantify_process::thousands;

use crate::pipeline::StageReport;

// ── Sources ──

/// List every source with its tables, request spacing and credentials.
pub fn print_sources(config: &FetchConfig) {
    for name in SOURCES {
        match build_adapter(name, config) {
            Ok(adapter) => {
                println!("{name} (API {})", adapter.api_version());
                for table in adapter.tables() {
                    let dims: Vec<&str> = table.dimensions.iter().map(Dimension::slug).collect();
                    println!("  {:<20} {}", table.name, dims.join(", "));
                }
                println!("  {:<20} {} ms", "min delay", adapter.min_delay().as_millis());
                println!("  {:<20} {}", "queries", adapter.queries().len());
                let creds = adapter.required_credentials();
                if !creds.is_empty() {
                    println!("  {:<20} {}", "credentials", creds.join(", "));
                }
            }
            Err(e) => println!("{name} (unavailable: {e})"),
        }
        println!();
    }
}

// ── Stages ──

pub fn print_stage(report: &StageReport) {
    println!(
        "{}: {} ok, {} failed, {} skipped ({:.1}s)",
        report.stage,
        report.succeeded.len(),
        report.failed.len(),
        report.skipped.len(),
        report.elapsed_secs
    );
    for (source, reason) in &report.skipped {
        println!("  skipped {source}: {reason}");
    }
    for (source, reason) in &report.failed {
        println!("  FAILED  {source}: {reason}");
    }
}

// ── Reports ──

/// Headlines plus the license figure of each table, as text tables.
pub fn print_report(report: &Report) -> anyhow::Result<()> {
    println!("=== {} {} ===", report.source, report.period);
    if report.sampled {
        println!("(sampled: counts are not exhaustive)");
    }
    for headline in &report.headlines {
        println!();
        println!("{}", headline.table);
        println!("  {:<26} {}", "grand total", thousands(headline.grand_total));
        println!("  {:<26} {}", "free culture", thousands(headline.free_culture_total));
        for (label, total) in headline.restriction_totals.iter().filter(|(_, t)| *t > 0) {
            println!("  {:<26} {}", label, thousands(*total));
        }

        let name = quantify_core::summary::summary_name(&headline.table, Dimension::License);
        if let Some(figure) = report.figure(&name)
            && !figure.points.is_empty()
        {
            let batch = figure.to_batch()?;
            println!("{}", pretty_format_batches(&[batch])?);
        }
    }
    println!();
    Ok(())
}
