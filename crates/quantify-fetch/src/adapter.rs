//! The uniform source adapter interface and the pager that drives it.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use quantify_core::{SourceRecord, TableSpec, normalize_label, UNKNOWN};
use tracing::debug;

use crate::FetchError;
use crate::client::ApiClient;

/// One logical query an adapter issues, possibly over several pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryInfo {
    /// Raw table the query's records belong to.
    pub table: &'static str,
    pub label: String,
}

/// What one fetched page contributed.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PageResult {
    pub records: Vec<SourceRecord>,
    pub has_more: bool,
    /// Why the page contributed nothing, when the source legitimately skips it.
    pub skipped: Option<String>,
    pub reference_totals: Vec<(String, u64)>,
    pub caveat: Option<String>,
    /// Raw labels that mapped to `Unknown`.
    pub unmapped: Vec<String>,
}

impl PageResult {
    pub fn last() -> Self {
        Self::default()
    }

    pub fn more() -> Self {
        Self {
            has_more: true,
            ..Self::default()
        }
    }

    pub fn skipped(reason: impl Into<String>) -> Self {
        Self {
            skipped: Some(reason.into()),
            ..Self::default()
        }
    }

    pub fn with_caveat(mut self, caveat: impl Into<String>) -> Self {
        self.caveat = Some(caveat.into());
        self
    }

    pub fn with_reference_total(mut self, label: impl Into<String>, total: u64) -> Self {
        self.reference_totals.push((label.into(), total));
        self
    }

    /// Canonical legal tool for `raw`, recording it as unmapped when it does
    /// not normalize.
    pub fn map_label(&mut self, raw: &str) -> String {
        match normalize_label(raw) {
            Some(tool) => tool.identifier.clone(),
            None => {
                self.unmapped.push(raw.trim().to_string());
                UNKNOWN.to_string()
            }
        }
    }
}

/// A third-party data source.
///
/// Adapters describe their queries up front and fetch one page at a time;
/// they never touch the filesystem. The [`Pager`] owns iteration, limits and
/// error context.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn name(&self) -> &'static str;

    fn api_version(&self) -> &'static str;

    fn tables(&self) -> Vec<TableSpec>;

    /// Query scope recorded in provenance.
    fn parameters(&self) -> BTreeMap<String, String>;

    fn min_delay(&self) -> Duration;

    fn queries(&self) -> Vec<QueryInfo>;

    /// Environment variables the adapter cannot run without.
    fn required_credentials(&self) -> &'static [&'static str] {
        &[]
    }

    /// Fetch page `page` (1-based) of query `query`.
    async fn fetch_page(
        &self,
        client: &ApiClient,
        query: usize,
        page: u32,
    ) -> Result<PageResult, FetchError>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchLimits {
    pub max_pages: Option<u64>,
    pub max_rows: Option<u64>,
}

/// A fetched page tagged with where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub table: &'static str,
    pub query: String,
    pub number: u32,
    pub result: PageResult,
}

/// Lazy, finite page sequence over all of an adapter's queries.
///
/// Stops at end-of-results or when a limit is reached; hitting a limit with
/// work remaining records a truncation reason.
pub struct Pager<'a> {
    adapter: &'a dyn SourceAdapter,
    client: &'a ApiClient,
    queries: Vec<QueryInfo>,
    limits: FetchLimits,
    query: usize,
    page: u32,
    pages_fetched: u64,
    rows: u64,
    truncated: Option<String>,
}

impl<'a> Pager<'a> {
    pub fn new(adapter: &'a dyn SourceAdapter, client: &'a ApiClient, limits: FetchLimits) -> Self {
        Self {
            adapter,
            client,
            queries: adapter.queries(),
            limits,
            query: 0,
            page: 1,
            pages_fetched: 0,
            rows: 0,
            truncated: None,
        }
    }

    pub async fn next_page(&mut self) -> Result<Option<Page>, FetchError> {
        if self.query >= self.queries.len() || self.truncated.is_some() {
            return Ok(None);
        }
        if let Some(max) = self.limits.max_pages
            && self.pages_fetched >= max
        {
            self.truncated = Some(format!("page limit of {max} reached"));
            return Ok(None);
        }
        if let Some(max) = self.limits.max_rows
            && self.rows >= max
        {
            self.truncated = Some(format!("row limit of {max} reached"));
            return Ok(None);
        }

        let info = &self.queries[self.query];
        debug!(source = self.adapter.name(), query = %info.label, page = self.page, "fetching page");
        let mut result = self
            .adapter
            .fetch_page(self.client, self.query, self.page)
            .await
            .map_err(|e| FetchError::Page {
                query: info.label.clone(),
                page: self.page,
                source: Box::new(e),
            })?;
        self.pages_fetched += 1;

        if let Some(max) = self.limits.max_rows {
            let remaining = max.saturating_sub(self.rows);
            if result.records.len() as u64 > remaining {
                result.records.truncate(remaining as usize);
                result.has_more = true;
            }
        }
        self.rows += result.records.len() as u64;

        let page = Page {
            table: info.table,
            query: info.label.clone(),
            number: self.page,
            result,
        };
        if page.result.has_more {
            self.page += 1;
        } else {
            self.query += 1;
            self.page = 1;
        }
        Ok(Some(page))
    }

    pub fn pages_fetched(&self) -> u64 {
        self.pages_fetched
    }

    /// Set once a limit cut the sequence short.
    pub fn truncation(&self) -> Option<&str> {
        self.truncated.as_deref()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Arc;

    use quantify_core::Dimension;

    use super::*;
    use crate::client::RetryPolicy;
    use crate::mock::ScriptedTransport;

    /// Two queries: "alpha" with three pages of two records, "beta" with one.
    pub(crate) struct FakeAdapter;

    #[async_trait]
    impl SourceAdapter for FakeAdapter {
        fn name(&self) -> &'static str {
            "fake"
        }

        fn api_version(&self) -> &'static str {
            "v0"
        }

        fn tables(&self) -> Vec<TableSpec> {
            vec![TableSpec::new("count", &[Dimension::License])]
        }

        fn parameters(&self) -> BTreeMap<String, String> {
            BTreeMap::from([("scope".to_string(), "test".to_string())])
        }

        fn min_delay(&self) -> Duration {
            Duration::ZERO
        }

        fn queries(&self) -> Vec<QueryInfo> {
            ["alpha", "beta"]
                .into_iter()
                .map(|label| QueryInfo { table: "count", label: label.into() })
                .collect()
        }

        async fn fetch_page(
            &self,
            client: &ApiClient,
            query: usize,
            page: u32,
        ) -> Result<PageResult, FetchError> {
            let label = if query == 0 { "alpha" } else { "beta" };
            let url = format!("https://fake/{label}/{page}");
            let body: serde_json::Value = client.get_json(&crate::http::ApiRequest::get(url)).await?;
            let last_page = if query == 0 { 3 } else { 1 };
            let mut result = if page < last_page { PageResult::more() } else { PageResult::last() };
            let n = body["n"].as_u64().unwrap_or(0);
            for _ in 0..2 {
                let tool = result.map_label(if query == 0 { "CC-BY-4.0" } else { "mystery" });
                result.records.push(SourceRecord::new("fake", tool, n));
            }
            Ok(result)
        }
    }

    pub(crate) fn scripted() -> Arc<ScriptedTransport> {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond_always("fake/", 200, r#"{"n": 1}"#);
        transport
    }

    fn client(transport: Arc<ScriptedTransport>) -> ApiClient {
        ApiClient::new(transport, Duration::ZERO, RetryPolicy::immediate(0))
    }

    async fn drain(pager: &mut Pager<'_>) -> Vec<Page> {
        let mut pages = Vec::new();
        while let Some(page) = pager.next_page().await.unwrap() {
            pages.push(page);
        }
        pages
    }

    #[tokio::test]
    async fn walks_every_page_of_every_query() {
        let client = client(scripted());
        let mut pager = Pager::new(&FakeAdapter, &client, FetchLimits::default());
        let pages = drain(&mut pager).await;

        let seen: Vec<(String, u32)> = pages.iter().map(|p| (p.query.clone(), p.number)).collect();
        assert_eq!(
            seen,
            vec![
                ("alpha".into(), 1),
                ("alpha".into(), 2),
                ("alpha".into(), 3),
                ("beta".into(), 1)
            ]
        );
        assert_eq!(pager.pages_fetched(), 4);
        assert_eq!(pager.truncation(), None);
        assert_eq!(pages[3].result.unmapped, vec!["mystery", "mystery"]);
        assert_eq!(pages[0].result.records[0].legal_tool, "CC BY 4.0");
    }

    #[tokio::test]
    async fn page_limit_truncates() {
        let client = client(scripted());
        let limits = FetchLimits { max_pages: Some(2), max_rows: None };
        let mut pager = Pager::new(&FakeAdapter, &client, limits);
        assert_eq!(drain(&mut pager).await.len(), 2);
        assert_eq!(pager.truncation(), Some("page limit of 2 reached"));
    }

    #[tokio::test]
    async fn row_limit_cuts_mid_page() {
        let client = client(scripted());
        let limits = FetchLimits { max_pages: None, max_rows: Some(3) };
        let mut pager = Pager::new(&FakeAdapter, &client, limits);
        let pages = drain(&mut pager).await;
        let rows: usize = pages.iter().map(|p| p.result.records.len()).sum();
        assert_eq!(rows, 3);
        assert_eq!(pager.truncation(), Some("row limit of 3 reached"));
    }

    #[tokio::test]
    async fn limit_equal_to_total_is_not_truncation() {
        let client = client(scripted());
        let limits = FetchLimits { max_pages: Some(4), max_rows: Some(8) };
        let mut pager = Pager::new(&FakeAdapter, &client, limits);
        assert_eq!(drain(&mut pager).await.len(), 4);
        assert_eq!(pager.truncation(), None);
    }

    #[tokio::test]
    async fn errors_carry_query_and_page() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond("fake/alpha/1", 200, r#"{"n": 1}"#);
        transport.respond("fake/alpha/2", 500, "boom");
        let client = client(transport);
        let mut pager = Pager::new(&FakeAdapter, &client, FetchLimits::default());

        assert!(pager.next_page().await.unwrap().is_some());
        let err = pager.next_page().await.unwrap_err();
        assert!(err.to_string().starts_with("query 'alpha' page 2:"), "{err}");
    }
}
