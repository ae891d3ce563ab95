//! Process and report stages: aggregate raw tables into summaries, then
//! assemble headline statistics, chart-ready figures and README narrative.

pub mod aggregate;
pub mod error;
pub mod readme;
pub mod report;

pub use aggregate::{AggregateOptions, Aggregator, process_source};
pub use error::ProcessError;
pub use readme::upsert_entry;
pub use report::{DEFAULT_TOP_N, ReportAssembler, report_source, source_title, thousands};
