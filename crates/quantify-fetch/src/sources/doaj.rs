//! Directory of Open Access Journals, API v4 journal search.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use quantify_core::{Dimension, SourceRecord, TableSpec, UNKNOWN};
use serde::Deserialize;
use tracing::info;

use crate::FetchError;
use crate::adapter::{PageResult, QueryInfo, SourceAdapter};
use crate::client::ApiClient;
use crate::config::FetchConfig;
use crate::http::ApiRequest;

const NAME: &str = "doaj";
const SEARCH_URL: &str = "https://doaj.org/api/v4/search/journals/*";
const TABLE: &str = "journals";
const PAGE_SIZE: u32 = 100;

#[derive(Debug, Deserialize)]
struct JournalSearch {
    total: u64,
    #[serde(default)]
    results: Vec<Journal>,
}

#[derive(Debug, Deserialize)]
struct Journal {
    #[serde(default)]
    bibjson: Bibjson,
}

#[derive(Debug, Default, Deserialize)]
struct Bibjson {
    #[serde(default)]
    license: Vec<License>,
    #[serde(default)]
    subject: Vec<Subject>,
    #[serde(default)]
    language: Vec<String>,
    oa_start: Option<i32>,
    publisher: Option<Publisher>,
}

#[derive(Debug, Deserialize)]
struct License {
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct Subject {
    code: Option<String>,
    term: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Publisher {
    name: Option<String>,
    country: Option<String>,
}

pub struct DoajAdapter {
    min_year: Option<i32>,
}

impl DoajAdapter {
    pub fn new(config: &FetchConfig) -> Self {
        Self {
            min_year: config.min_year,
        }
    }

    /// One record per journal: first mappable license (or the first listed),
    /// first language, first subject.
    fn record(&self, bibjson: Bibjson, result: &mut PageResult) -> Option<SourceRecord> {
        if let (Some(min), Some(start)) = (self.min_year, bibjson.oa_start)
            && start < min
        {
            return None;
        }

        let tool = match bibjson
            .license
            .iter()
            .find(|l| quantify_core::normalize_label(&l.kind).is_some())
            .or(bibjson.license.first())
        {
            Some(license) => result.map_label(&license.kind),
            None => {
                result.unmapped.push("(no license listed)".to_string());
                UNKNOWN.to_string()
            }
        };

        let mut record = SourceRecord::new(NAME, tool, 1);
        if let Some(language) = bibjson.language.into_iter().next() {
            record = record.with_language(language);
        }
        if let Some(subject) = bibjson.subject.into_iter().next()
            && let Some(name) = subject.term.or(subject.code)
        {
            record = record.with_subject(name);
        }
        if let Some(publisher) = bibjson.publisher {
            if let Some(name) = publisher.name {
                record = record.with_publisher(name);
            }
            if let Some(country) = publisher.country {
                record = record.with_publisher_country(country);
            }
        }
        if let Some(year) = bibjson.oa_start {
            record = record.with_year(year);
        }
        Some(record)
    }
}

#[async_trait]
impl SourceAdapter for DoajAdapter {
    fn name(&self) -> &'static str {
        NAME
    }

    fn api_version(&self) -> &'static str {
        "v4"
    }

    fn tables(&self) -> Vec<TableSpec> {
        vec![TableSpec::new(
            TABLE,
            &[
                Dimension::License,
                Dimension::Language,
                Dimension::Subject,
                Dimension::Publisher,
                Dimension::PublisherCountry,
                Dimension::Year,
            ],
        )]
    }

    fn parameters(&self) -> BTreeMap<String, String> {
        let mut params = BTreeMap::from([
            ("endpoint".to_string(), SEARCH_URL.to_string()),
            ("page_size".to_string(), PAGE_SIZE.to_string()),
        ]);
        if let Some(year) = self.min_year {
            params.insert("min_oa_start_year".to_string(), year.to_string());
        }
        params
    }

    fn min_delay(&self) -> Duration {
        Duration::from_millis(500)
    }

    fn queries(&self) -> Vec<QueryInfo> {
        vec![QueryInfo {
            table: TABLE,
            label: "journals".to_string(),
        }]
    }

    async fn fetch_page(
        &self,
        client: &ApiClient,
        _query: usize,
        page: u32,
    ) -> Result<PageResult, FetchError> {
        let request = ApiRequest::get(SEARCH_URL)
            .query("page", page)
            .query("pageSize", PAGE_SIZE);
        let search: JournalSearch = match client.get_json(&request).await {
            Ok(search) => search,
            // DOAJ rejects pages past its deep-paging window with a 400.
            Err(FetchError::Status { status: 400, .. }) if page > 1 => {
                info!(page, "DOAJ paging window exhausted");
                return Ok(PageResult::last()
                    .with_caveat("DOAJ deep-paging window ended before the last result"));
            }
            Err(e) => return Err(e),
        };

        let fetched = search.results.len() as u64;
        let has_more = fetched > 0 && u64::from(page) * u64::from(PAGE_SIZE) < search.total;
        let mut result = if has_more {
            PageResult::more()
        } else {
            PageResult::last()
        };
        if page == 1 {
            result = result.with_reference_total("Total journals", search.total);
        }
        for journal in search.results {
            if let Some(record) = self.record(journal.bibjson, &mut result) {
                result.records.push(record);
            }
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use quantify_core::RunPeriod;

    use super::*;
    use crate::accumulate::fetch_source;
    use crate::adapter::FetchLimits;
    use crate::client::RetryPolicy;
    use crate::mock::ScriptedTransport;

    fn journal(license: &str, language: &str, year: i32) -> String {
        format!(
            r#"{{"id": "x", "bibjson": {{
                "license": [{{"type": "{license}"}}],
                "language": ["{language}", "FR"],
                "subject": [{{"code": "R", "term": "Medicine", "scheme": "LCC"}}],
                "publisher": {{"name": "Example Press", "country": "BR"}},
                "oa_start": {year}
            }}}}"#
        )
    }

    fn page(total: u64, journals: &[String]) -> String {
        format!(r#"{{"total": {total}, "page": 1, "pageSize": 100, "results": [{}]}}"#, journals.join(","))
    }

    fn period() -> RunPeriod {
        "2025Q4".parse().unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn journals_become_one_record_each() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond(
            "page=1&",
            200,
            page(
                3,
                &[
                    journal("CC BY", "EN", 2010),
                    journal("CC BY", "EN", 2010),
                    journal("Publisher's own license", "ES", 2018),
                ],
            ),
        );

        let adapter = DoajAdapter::new(&FetchConfig::default());
        let outcome = fetch_source(&adapter, transport, RetryPolicy::immediate(0), FetchLimits::default(), period())
            .await
            .unwrap();

        let records = &outcome.tables[0].records;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].legal_tool, "CC BY 4.0");
        assert_eq!(records[0].count, 2);
        assert_eq!(records[0].language.as_deref(), Some("EN"));
        assert_eq!(records[0].subject.as_deref(), Some("Medicine"));
        assert_eq!(records[0].publisher_country.as_deref(), Some("BR"));
        assert_eq!(records[0].year, Some(2010));
        assert_eq!(records[1].legal_tool, UNKNOWN);
        assert_eq!(
            outcome.provenance.unmapped_labels.get("Publisher's own license"),
            Some(&1)
        );
        assert_eq!(outcome.provenance.reference_totals.get("Total journals"), Some(&3));
    }

    #[tokio::test(start_paused = true)]
    async fn paginates_until_total_reached() {
        let transport = Arc::new(ScriptedTransport::new());
        let full: Vec<String> = (0..100).map(|_| journal("CC BY-SA", "EN", 2015)).collect();
        transport.respond("page=1&", 200, page(150, &full));
        transport.respond("page=2&", 200, page(150, &full[..50]));

        let adapter = DoajAdapter::new(&FetchConfig::default());
        let outcome = fetch_source(&adapter, transport.clone(), RetryPolicy::immediate(0), FetchLimits::default(), period())
            .await
            .unwrap();
        assert_eq!(outcome.provenance.pages_fetched, 2);
        assert_eq!(outcome.tables[0].total(), 150);
        assert_eq!(transport.requests().len(), 2);
        assert!(outcome.provenance.sampling.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn date_back_filter_drops_older_journals() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond(
            "page=1&",
            200,
            page(2, &[journal("CC BY", "EN", 1999), journal("CC BY", "EN", 2021)]),
        );
        let config = FetchConfig {
            min_year: Some(2005),
            ..FetchConfig::default()
        };
        let adapter = DoajAdapter::new(&config);
        let outcome = fetch_source(&adapter, transport, RetryPolicy::immediate(0), FetchLimits::default(), period())
            .await
            .unwrap();
        assert_eq!(outcome.tables[0].total(), 1);
        assert_eq!(outcome.tables[0].records[0].year, Some(2021));
        assert_eq!(
            outcome.provenance.parameters.get("min_oa_start_year").map(String::as_str),
            Some("2005")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn paging_window_end_is_a_caveat() {
        let transport = Arc::new(ScriptedTransport::new());
        let full: Vec<String> = (0..100).map(|_| journal("CC BY", "EN", 2015)).collect();
        transport.respond("page=1&", 200, page(5000, &full));
        transport.respond("page=2&", 400, r#"{"error": "page out of range"}"#);

        let adapter = DoajAdapter::new(&FetchConfig::default());
        let outcome = fetch_source(&adapter, transport, RetryPolicy::immediate(0), FetchLimits::default(), period())
            .await
            .unwrap();
        assert_eq!(outcome.tables[0].total(), 100);
        assert!(outcome.provenance.is_sampled());
    }
}
