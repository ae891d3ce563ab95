pub mod label;
pub mod period;
pub mod provenance;
pub mod record;
pub mod report;
pub mod schema;
pub mod summary;
pub mod table;
pub mod tools;

pub use label::{canonical_label, normalize_label};
pub use period::{PeriodError, RunPeriod};
pub use provenance::{Provenance, Sampling, TableProvenance};
pub use record::{Dimension, RawTable, RawTableId, RecordKey, SourceRecord, TableSpec};
pub use report::{FigurePoint, Headline, NarrativeEntry, RankedEntry, Report, ReportFigure};
pub use summary::{SummaryRow, SummaryTable};
pub use table::TableError;
pub use tools::{LegalTool, Lifecycle, Product, Restriction, UNKNOWN};
