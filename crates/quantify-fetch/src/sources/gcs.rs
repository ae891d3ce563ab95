//! Google Custom Search: estimated result counts for pages linking to each
//! legal tool's deed, overall and scoped by country and by language.
//!
//! Every Creative Commons tool (current, prior and retired) is counted
//! overall. Country and language scopes are limited to the latest tools:
//! the 4.0 licenses, CC0 and the Public Domain Mark.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use quantify_core::tools::{LegalTool, creative_commons_tools};
use quantify_core::{Dimension, Lifecycle, SourceRecord, TableSpec};
use serde::{Deserialize, Deserializer};

use crate::FetchError;
use crate::adapter::{PageResult, QueryInfo, SourceAdapter};
use crate::client::ApiClient;
use crate::config::FetchConfig;
use crate::http::ApiRequest;

const NAME: &str = "gcs";
const SEARCH_URL: &str = "https://www.googleapis.com/customsearch/v1";
const DEVELOPER_KEY: &str = "GCS_DEVELOPER_KEY";
const CX: &str = "GCS_CX";
const ESTIMATE_CAVEAT: &str = "Custom Search totalResults are engine estimates, not exhaustive counts";

/// ISO country code and its `cr` restrict value.
const COUNTRIES: &[(&str, &str)] = &[
    ("AU", "countryAU"),
    ("BR", "countryBR"),
    ("CA", "countryCA"),
    ("DE", "countryDE"),
    ("FR", "countryFR"),
    ("GB", "countryUK"),
    ("IN", "countryIN"),
    ("JP", "countryJP"),
    ("MX", "countryMX"),
    ("US", "countryUS"),
];

/// ISO language code and its `lr` restrict value.
const LANGUAGES: &[(&str, &str)] = &[
    ("ar", "lang_ar"),
    ("de", "lang_de"),
    ("en", "lang_en"),
    ("es", "lang_es"),
    ("fr", "lang_fr"),
    ("ja", "lang_ja"),
    ("pt", "lang_pt"),
    ("zh", "lang_zh-CN"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    Overall,
    Country(usize),
    Language(usize),
}

impl Scope {
    fn table(self) -> &'static str {
        match self {
            Scope::Overall => "count",
            Scope::Country(_) => "count_by_country",
            Scope::Language(_) => "count_by_language",
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(rename = "searchInformation")]
    search_information: Option<SearchInformation>,
}

#[derive(Debug, Deserialize)]
struct SearchInformation {
    #[serde(rename = "totalResults", deserialize_with = "total_results")]
    total_results: u64,
}

/// The API reports the total as a decimal string.
fn total_results<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Total {
        Text(String),
        Number(u64),
    }
    match Total::deserialize(deserializer)? {
        Total::Number(n) => Ok(n),
        Total::Text(s) => s
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("totalResults '{s}' is not a count"))),
    }
}

pub struct GcsAdapter {
    developer_key: String,
    cx: String,
    /// (deed url, scope) in query order: every tool overall, then each
    /// latest tool by country and by language.
    plan: Vec<(String, Scope)>,
}

fn tool_urls(latest_only: bool) -> Vec<String> {
    creative_commons_tools()
        .into_iter()
        .filter(|t| !latest_only || t.lifecycle == Lifecycle::Latest)
        .filter_map(LegalTool::deed_url)
        .collect()
}

fn query_plan() -> Vec<(String, Scope)> {
    let mut plan: Vec<(String, Scope)> = tool_urls(false)
        .into_iter()
        .map(|url| (url, Scope::Overall))
        .collect();
    for url in tool_urls(true) {
        let scopes = (0..COUNTRIES.len())
            .map(Scope::Country)
            .chain((0..LANGUAGES.len()).map(Scope::Language));
        plan.extend(scopes.map(|scope| (url.clone(), scope)));
    }
    plan
}

impl GcsAdapter {
    pub fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        let developer_key = FetchConfig::credential(&config.gcs_developer_key).ok_or(
            FetchError::MissingCredential {
                source_name: NAME,
                credential: DEVELOPER_KEY,
            },
        )?;
        let cx = FetchConfig::credential(&config.gcs_cx).ok_or(FetchError::MissingCredential {
            source_name: NAME,
            credential: CX,
        })?;

        Ok(Self {
            developer_key: developer_key.to_string(),
            cx: cx.to_string(),
            plan: query_plan(),
        })
    }

    fn request(&self, url: &str, scope: Scope) -> ApiRequest {
        let request = ApiRequest::get(SEARCH_URL)
            .query("key", &self.developer_key)
            .query("cx", &self.cx)
            .query("q", format!("\"{url}\""))
            .query("linkSite", url);
        match scope {
            Scope::Overall => request,
            Scope::Country(i) => request.query("cr", COUNTRIES[i].1),
            Scope::Language(i) => request.query("lr", LANGUAGES[i].1),
        }
    }
}

#[async_trait]
impl SourceAdapter for GcsAdapter {
    fn name(&self) -> &'static str {
        NAME
    }

    fn api_version(&self) -> &'static str {
        "v1"
    }

    fn tables(&self) -> Vec<TableSpec> {
        vec![
            TableSpec::new("count", &[Dimension::License]),
            TableSpec::new("count_by_country", &[Dimension::License, Dimension::Country]),
            TableSpec::new("count_by_language", &[Dimension::License, Dimension::Language]),
        ]
    }

    fn parameters(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("tools".to_string(), tool_urls(false).len().to_string()),
            ("scoped_tools".to_string(), tool_urls(true).join(",")),
            (
                "countries".to_string(),
                COUNTRIES.iter().map(|(c, _)| *c).collect::<Vec<_>>().join(","),
            ),
            (
                "languages".to_string(),
                LANGUAGES.iter().map(|(l, _)| *l).collect::<Vec<_>>().join(","),
            ),
        ])
    }

    fn min_delay(&self) -> Duration {
        Duration::from_secs(1)
    }

    fn queries(&self) -> Vec<QueryInfo> {
        self.plan
            .iter()
            .map(|(url, scope)| {
                let label = match scope {
                    Scope::Overall => url.to_string(),
                    Scope::Country(i) => format!("{url} country:{}", COUNTRIES[*i].0),
                    Scope::Language(i) => format!("{url} language:{}", LANGUAGES[*i].0),
                };
                QueryInfo {
                    table: scope.table(),
                    label,
                }
            })
            .collect()
    }

    fn required_credentials(&self) -> &'static [&'static str] {
        &[DEVELOPER_KEY, CX]
    }

    async fn fetch_page(
        &self,
        client: &ApiClient,
        query: usize,
        _page: u32,
    ) -> Result<PageResult, FetchError> {
        let Some((url, scope)) = self.plan.get(query) else {
            return Ok(PageResult::skipped(format!("no planned query at {query}")));
        };
        let scope = *scope;
        let response: SearchResponse = client.get_json(&self.request(url, scope)).await?;
        let total = response
            .search_information
            .map(|info| info.total_results)
            .unwrap_or(0);

        let mut result = PageResult::last().with_caveat(ESTIMATE_CAVEAT);
        let tool = result.map_label(url);
        let record = SourceRecord::new(NAME, tool, total);
        let record = match scope {
            Scope::Overall => record,
            Scope::Country(i) => record.with_country(COUNTRIES[i].0),
            Scope::Language(i) => record.with_language(LANGUAGES[i].0),
        };
        result.records.push(record);
        Ok(result)
    }
}
