//! Wikipedia article counts per language edition (MediaWiki `siteinfo`).

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use quantify_core::{Dimension, SourceRecord, TableSpec};
use serde::Deserialize;
use tracing::{info, warn};

use crate::FetchError;
use crate::adapter::{PageResult, QueryInfo, SourceAdapter};
use crate::client::ApiClient;
use crate::config::FetchConfig;
use crate::http::ApiRequest;

const NAME: &str = "wikipedia";
const TABLE: &str = "articles";
/// Text of every edition is published under this license.
const CONTENT_LICENSE: &str = "CC BY-SA 4.0";

/// Editions queried unless overridden.
pub const DEFAULT_LANGUAGES: &[&str] = &[
    "ar", "de", "en", "es", "fa", "fr", "he", "id", "it", "ja", "ko", "nl", "pl", "pt", "ru",
    "sv", "tr", "uk", "vi", "zh",
];

#[derive(Debug, Deserialize)]
struct SiteInfo {
    query: SiteQuery,
}

#[derive(Debug, Deserialize)]
struct SiteQuery {
    statistics: Statistics,
}

#[derive(Debug, Deserialize)]
struct Statistics {
    articles: u64,
}

pub struct WikipediaAdapter {
    languages: Vec<String>,
}

impl WikipediaAdapter {
    pub fn new(config: &FetchConfig) -> Self {
        let requested: Vec<String> = config
            .wikipedia_languages
            .iter()
            .flatten()
            .map(|l| l.trim().to_lowercase())
            .filter(|l| !l.is_empty())
            .collect();
        let languages = if requested.is_empty() {
            DEFAULT_LANGUAGES.iter().map(|l| l.to_string()).collect()
        } else {
            requested
        };
        Self { languages }
    }

    fn request(language: &str) -> ApiRequest {
        ApiRequest::get(format!("https://{language}.wikipedia.org/w/api.php"))
            .query("action", "query")
            .query("meta", "siteinfo")
            .query("siprop", "statistics")
            .query("format", "json")
            .query("formatversion", 2)
    }
}

#[async_trait]
impl SourceAdapter for WikipediaAdapter {
    fn name(&self) -> &'static str {
        NAME
    }

    fn api_version(&self) -> &'static str {
        "MediaWiki Action API"
    }

    fn tables(&self) -> Vec<TableSpec> {
        vec![TableSpec::new(TABLE, &[Dimension::License, Dimension::Language])]
    }

    fn parameters(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("languages".to_string(), self.languages.join(",")),
            ("siprop".to_string(), "statistics".to_string()),
        ])
    }

    fn min_delay(&self) -> Duration {
        Duration::from_millis(100)
    }

    fn queries(&self) -> Vec<QueryInfo> {
        self.languages
            .iter()
            .map(|code| QueryInfo {
                table: TABLE,
                label: code.clone(),
            })
            .collect()
    }

    async fn fetch_page(
        &self,
        client: &ApiClient,
        query: usize,
        _page: u32,
    ) -> Result<PageResult, FetchError> {
        let Some(language) = self.languages.get(query) else {
            return Ok(PageResult::skipped(format!("no language edition at query {query}")));
        };
        let info: SiteInfo = client.get_json(&Self::request(language)).await?;
        let articles = info.query.statistics.articles;
        if articles == 0 {
            warn!(language = %language, "edition reports zero articles, skipping");
            return Ok(PageResult::skipped(format!("{language}: zero articles")));
        }
        info!(language = %language, articles, "edition counted");

        let mut result = PageResult::last();
        let tool = result.map_label(CONTENT_LICENSE);
        result
            .records
            .push(SourceRecord::new(NAME, tool, articles).with_language(language.clone()));
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

    fn stats(articles: u64) -> String {
        format!(
            r#"{{"batchcomplete": true, "query": {{"statistics": {{"pages": 99, "articles": {articles}, "edits": 5}}}}}}"#
        )
    }

    fn adapter(languages: &[&str]) -> WikipediaAdapter {
        WikipediaAdapter::new(&FetchConfig {
            wikipedia_languages: Some(languages.iter().map(|l| l.to_string()).collect()),
            ..FetchConfig::default()
        })
    }

    #[test]
    fn defaults_when_no_override() {
        let adapter = WikipediaAdapter::new(&FetchConfig::default());
        assert_eq!(adapter.queries().len(), DEFAULT_LANGUAGES.len());
        assert_eq!(
            WikipediaAdapter::request("de").url,
            "https://de.wikipedia.org/w/api.php"
        );
    }

    #[test]
    fn blank_language_codes_are_dropped() {
        let trimmed = adapter(&["en", "", " DE ", "  "]);
        assert_eq!(trimmed.languages, vec!["en", "de"]);

        let blank = adapter(&["", " "]);
        assert_eq!(blank.languages.len(), DEFAULT_LANGUAGES.len());
    }

    #[tokio::test(start_paused = true)]
    async fn one_row_per_edition_and_zero_editions_skipped() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond("https://en.", 200, stats(6_900_000));
        transport.respond("https://fr.", 200, stats(2_600_000));
        transport.respond("https://xx.", 200, stats(0));

        let period: RunPeriod = "2025Q4".parse().unwrap();
        let outcome = fetch_source(
            &adapter(&["en", "FR", "xx"]),
            transport,
            RetryPolicy::immediate(0),
            FetchLimits::default(),
            period,
        )
        .await
        .unwrap();

        let table = &outcome.tables[0];
        assert_eq!(table.len(), 2);
        assert_eq!(table.total(), 9_500_000);
        assert!(table.records.iter().all(|r| r.legal_tool == "CC BY-SA 4.0"));
        assert_eq!(table.records[1].language.as_deref(), Some("fr"));
        assert_eq!(outcome.provenance.skipped.len(), 1);
        assert!(outcome.provenance.skipped[0].contains("xx"));
    }

    #[tokio::test(start_paused = true)]
    async fn missing_statistics_is_malformed() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond_always("https://en.", 200, r#"{"error": {"code": "badvalue"}}"#);

        let period: RunPeriod = "2025Q4".parse().unwrap();
        let err = fetch_source(
            &adapter(&["en"]),
            transport,
            RetryPolicy::immediate(1),
            FetchLimits::default(),
            period,
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("page 1"), "{err}");
    }
}
