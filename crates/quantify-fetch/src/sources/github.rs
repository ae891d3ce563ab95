//! GitHub repository search: one `total_count` per SPDX license.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use quantify_core::{Dimension, SourceRecord, TableSpec};
use serde::Deserialize;

use crate::FetchError;
use crate::adapter::{PageResult, QueryInfo, SourceAdapter};
use crate::client::ApiClient;
use crate::config::FetchConfig;
use crate::http::ApiRequest;

const NAME: &str = "github";
const SEARCH_URL: &str = "https://api.github.com/search/repositories";
const TABLE: &str = "count";
pub const TOTAL_LABEL: &str = "Total public repositories";

/// SPDX identifiers counted; each normalizes to a registered legal tool.
const SPDX_LICENSES: &[&str] = &[
    "0BSD",
    "CC0-1.0",
    "CC-BY-4.0",
    "CC-BY-SA-4.0",
    "MIT-0",
    "Unlicense",
];

#[derive(Debug, Deserialize)]
struct SearchResponse {
    total_count: u64,
    #[serde(default)]
    incomplete_results: bool,
}

pub struct GithubAdapter {
    token: Option<String>,
}

impl GithubAdapter {
    pub fn new(config: &FetchConfig) -> Self {
        Self {
            token: FetchConfig::credential(&config.github_token).map(str::to_string),
        }
    }

    fn request(&self, query: usize) -> ApiRequest {
        let q = match SPDX_LICENSES.get(query) {
            Some(spdx) => format!("is:public license:{}", spdx.to_lowercase()),
            None => "is:public".to_string(),
        };
        let mut request = ApiRequest::get(SEARCH_URL)
            .query("per_page", 1)
            .query("q", q)
            .header("accept", "application/vnd.github+json")
            .header("x-github-api-version", "2022-11-28");
        if let Some(token) = &self.token {
            request = request.header("authorization", format!("Bearer {token}"));
        }
        request
    }
}

#[async_trait]
impl SourceAdapter for GithubAdapter {
    fn name(&self) -> &'static str {
        NAME
    }

    fn api_version(&self) -> &'static str {
        "2022-11-28"
    }

    fn tables(&self) -> Vec<TableSpec> {
        vec![TableSpec::new(TABLE, &[Dimension::License])]
    }

    fn parameters(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("licenses".to_string(), SPDX_LICENSES.join(",")),
            ("visibility".to_string(), "public".to_string()),
            ("authenticated".to_string(), self.token.is_some().to_string()),
        ])
    }

    /// Search allows 30 requests/minute with a token, 10 without.
    fn min_delay(&self) -> Duration {
        if self.token.is_some() {
            Duration::from_secs(2)
        } else {
            Duration::from_secs(6)
        }
    }

    fn queries(&self) -> Vec<QueryInfo> {
        SPDX_LICENSES
            .iter()
            .map(|spdx| spdx.to_string())
            .chain(std::iter::once(TOTAL_LABEL.to_string()))
            .map(|label| QueryInfo { table: TABLE, label })
            .collect()
    }

    async fn fetch_page(
        &self,
        client: &ApiClient,
        query: usize,
        _page: u32,
    ) -> Result<PageResult, FetchError> {
        let response: SearchResponse = client.get_json(&self.request(query)).await?;
        let mut result = PageResult::last();
        if response.incomplete_results {
            result = result.with_caveat("GitHub search reported incomplete results");
        }
        match SPDX_LICENSES.get(query) {
            Some(spdx) => {
                let tool = result.map_label(spdx);
                result
                    .records
                    .push(SourceRecord::new(NAME, tool, response.total_count));
            }
            None => result = result.with_reference_total(TOTAL_LABEL, response.total_count),
        }
        Ok(result)
    }
}
