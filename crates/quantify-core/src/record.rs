//! Normalized records and the raw tables that hold them.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::period::RunPeriod;

/// A categorical axis a table can be grouped by.
///
/// The first seven are populated by sources; `Product`, `Restriction`,
/// `Status` and `FreeCulture` are derived from the legal tool during
/// aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    License,
    Country,
    Language,
    Subject,
    Publisher,
    PublisherCountry,
    Year,
    Product,
    Restriction,
    Status,
    FreeCulture,
}

impl Dimension {
    pub const DERIVED: [Dimension; 4] = [
        Dimension::Product,
        Dimension::Restriction,
        Dimension::Status,
        Dimension::FreeCulture,
    ];

    /// Lower-case name used in file names and column headers.
    pub fn slug(&self) -> &'static str {
        match self {
            Dimension::License => "license",
            Dimension::Country => "country",
            Dimension::Language => "language",
            Dimension::Subject => "subject",
            Dimension::Publisher => "publisher",
            Dimension::PublisherCountry => "publisher_country",
            Dimension::Year => "year",
            Dimension::Product => "product",
            Dimension::Restriction => "restriction",
            Dimension::Status => "status",
            Dimension::FreeCulture => "free_culture",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Dimension::License => "Legal tool",
            Dimension::Country => "Country",
            Dimension::Language => "Language",
            Dimension::Subject => "Subject",
            Dimension::Publisher => "Publisher",
            Dimension::PublisherCountry => "Publisher country",
            Dimension::Year => "Year",
            Dimension::Product => "Product",
            Dimension::Restriction => "Restriction",
            Dimension::Status => "Status",
            Dimension::FreeCulture => "Free Culture",
        }
    }

    pub fn is_derived(&self) -> bool {
        Self::DERIVED.contains(self)
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

/// One normalized observation from a source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRecord {
    pub source: String,
    pub legal_tool: String,
    pub country: Option<String>,
    pub language: Option<String>,
    pub subject: Option<String>,
    pub publisher: Option<String>,
    pub publisher_country: Option<String>,
    pub year: Option<i32>,
    pub count: u64,
}

impl SourceRecord {
    pub fn new(source: impl Into<String>, legal_tool: impl Into<String>, count: u64) -> Self {
        Self {
            source: source.into(),
            legal_tool: legal_tool.into(),
            country: None,
            language: None,
            subject: None,
            publisher: None,
            publisher_country: None,
            year: None,
            count,
        }
    }

    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn with_publisher(mut self, publisher: impl Into<String>) -> Self {
        self.publisher = Some(publisher.into());
        self
    }

    pub fn with_publisher_country(mut self, country: impl Into<String>) -> Self {
        self.publisher_country = Some(country.into());
        self
    }

    pub fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    /// Value of a source-populated dimension. Derived dimensions return `None`.
    pub fn value(&self, dimension: Dimension) -> Option<String> {
        match dimension {
            Dimension::License => Some(self.legal_tool.clone()),
            Dimension::Country => self.country.clone(),
            Dimension::Language => self.language.clone(),
            Dimension::Subject => self.subject.clone(),
            Dimension::Publisher => self.publisher.clone(),
            Dimension::PublisherCountry => self.publisher_country.clone(),
            Dimension::Year => self.year.map(|y| y.to_string()),
            Dimension::Product
            | Dimension::Restriction
            | Dimension::Status
            | Dimension::FreeCulture => None,
        }
    }

    /// Everything except `count`; records with equal keys are duplicates.
    pub fn key(&self) -> RecordKey {
        RecordKey {
            source: self.source.clone(),
            legal_tool: self.legal_tool.clone(),
            country: self.country.clone(),
            language: self.language.clone(),
            subject: self.subject.clone(),
            publisher: self.publisher.clone(),
            publisher_country: self.publisher_country.clone(),
            year: self.year,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordKey {
    source: String,
    legal_tool: String,
    country: Option<String>,
    language: Option<String>,
    subject: Option<String>,
    publisher: Option<String>,
    publisher_country: Option<String>,
    year: Option<i32>,
}

/// Declared shape of one raw table a source produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSpec {
    pub name: String,
    pub dimensions: Vec<Dimension>,
}

impl TableSpec {
    pub fn new(name: impl Into<String>, dimensions: &[Dimension]) -> Self {
        Self {
            name: name.into(),
            dimensions: dimensions.to_vec(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RawTableId {
    pub source: String,
    pub table: String,
    pub period: RunPeriod,
}

impl fmt::Display for RawTableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} ({})", self.source, self.table, self.period)
    }
}

/// Ordered records from one source, one table and one run.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    pub id: RawTableId,
    pub dimensions: Vec<Dimension>,
    pub records: Vec<SourceRecord>,
}

impl RawTable {
    pub fn new(id: RawTableId, dimensions: Vec<Dimension>) -> Self {
        Self {
            id,
            dimensions,
            records: Vec::new(),
        }
    }

    pub fn total(&self) -> u64 {
        self.records.iter().map(|r| r.count).sum()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_fields() {
        let r = SourceRecord::new("doaj", "CC BY 4.0", 1)
            .with_language("EN")
            .with_subject("Medicine")
            .with_year(2012);
        assert_eq!(r.value(Dimension::License).as_deref(), Some("CC BY 4.0"));
        assert_eq!(r.value(Dimension::Language).as_deref(), Some("EN"));
        assert_eq!(r.value(Dimension::Year).as_deref(), Some("2012"));
        assert_eq!(r.value(Dimension::Country), None);
        assert_eq!(r.value(Dimension::Restriction), None);
    }

    #[test]
    fn key_ignores_count() {
        let a = SourceRecord::new("gcs", "CC BY 4.0", 10).with_country("US");
        let b = SourceRecord::new("gcs", "CC BY 4.0", 99).with_country("US");
        let c = SourceRecord::new("gcs", "CC BY 4.0", 10).with_country("DE");
        assert_eq!(a.key(), b.key());
        assert_ne!(a.key(), c.key());
    }

    #[test]
    fn raw_table_total() {
        let period = "2025Q4".parse().unwrap();
        let mut table = RawTable::new(
            RawTableId {
                source: "github".into(),
                table: "count".into(),
                period,
            },
            vec![Dimension::License],
        );
        assert!(table.is_empty());
        table.records.push(SourceRecord::new("github", "MIT", 7));
        table.records.push(SourceRecord::new("github", "CC0 1.0", 3));
        assert_eq!(table.total(), 10);
        assert_eq!(table.id.to_string(), "github/count (2025Q4)");
    }

    #[test]
    fn derived_dimensions() {
        assert!(Dimension::Status.is_derived());
        assert!(!Dimension::Language.is_derived());
        assert_eq!(Dimension::PublisherCountry.slug(), "publisher_country");
    }
}
