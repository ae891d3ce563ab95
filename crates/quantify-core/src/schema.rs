/// Arrow schema definitions for pipeline tables.
///
/// Raw and summary tables are persisted as CSV; these schemas are used both to
/// build the record batches and to read the files back with typed columns.
pub mod tables {
    use arrow::datatypes::{DataType, Field, Schema};

    use crate::record::Dimension;

    pub const SOURCE: &str = "source";
    pub const LEGAL_TOOL: &str = "legal_tool";
    pub const COUNTRY: &str = "country";
    pub const LANGUAGE: &str = "language";
    pub const SUBJECT: &str = "subject";
    pub const PUBLISHER: &str = "publisher";
    pub const PUBLISHER_COUNTRY: &str = "publisher_country";
    pub const YEAR: &str = "year";
    pub const COUNT: &str = "count";
    pub const PERCENTAGE: &str = "percentage";
    pub const LABEL: &str = "label";
    pub const VALUE: &str = "value";

    /// Schema for normalized source records.
    pub fn raw_schema() -> Schema {
        Schema::new(vec![
            Field::new(SOURCE, DataType::Utf8, false),
            Field::new(LEGAL_TOOL, DataType::Utf8, false),
            Field::new(COUNTRY, DataType::Utf8, true),
            Field::new(LANGUAGE, DataType::Utf8, true),
            Field::new(SUBJECT, DataType::Utf8, true),
            Field::new(PUBLISHER, DataType::Utf8, true),
            Field::new(PUBLISHER_COUNTRY, DataType::Utf8, true),
            Field::new(YEAR, DataType::Int32, true),
            Field::new(COUNT, DataType::UInt64, false),
        ])
    }

    /// Schema for a summary grouped by `dimension`; the key column is named
    /// after the dimension.
    pub fn summary_schema(dimension: Dimension) -> Schema {
        Schema::new(vec![
            Field::new(dimension.slug(), DataType::Utf8, false),
            Field::new(COUNT, DataType::UInt64, false),
            Field::new(PERCENTAGE, DataType::Float64, false),
        ])
    }

    /// Schema for chart-ready report figures.
    pub fn figure_schema() -> Schema {
        Schema::new(vec![
            Field::new(LABEL, DataType::Utf8, false),
            Field::new(VALUE, DataType::UInt64, false),
            Field::new(PERCENTAGE, DataType::Float64, false),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::tables;
    use crate::record::Dimension;

    #[test]
    fn raw_schema_has_expected_fields() {
        let schema = tables::raw_schema();
        assert_eq!(schema.fields().len(), 9);
        assert!(schema.field_with_name("legal_tool").is_ok());
        assert!(!schema.field_with_name("count").unwrap().is_nullable());
        assert!(schema.field_with_name("year").unwrap().is_nullable());
    }

    #[test]
    fn summary_key_column_named_after_dimension() {
        let schema = tables::summary_schema(Dimension::PublisherCountry);
        assert_eq!(schema.field(0).name(), "publisher_country");
        assert!(schema.field_with_name("percentage").is_ok());
    }

    #[test]
    fn figure_schema_has_expected_fields() {
        let schema = tables::figure_schema();
        assert_eq!(schema.fields().len(), 3);
        assert!(schema.field_with_name("label").is_ok());
    }
}
