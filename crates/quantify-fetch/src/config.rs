use std::time::Duration;

use crate::adapter::FetchLimits;
use crate::client::RetryPolicy;
use crate::http::USER_AGENT;

/// Everything adapters need from the outside world, built once at startup.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout: Duration,
    pub retry: RetryPolicy,
    pub limits: FetchLimits,
    pub github_token: Option<String>,
    pub gcs_developer_key: Option<String>,
    pub gcs_cx: Option<String>,
    /// Earliest year in scope for sources that support a date-back filter.
    pub min_year: Option<i32>,
    /// Override the Wikipedia language editions queried.
    pub wikipedia_languages: Option<Vec<String>>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: USER_AGENT.to_string(),
            timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
            limits: FetchLimits::default(),
            github_token: None,
            gcs_developer_key: None,
            gcs_cx: None,
            min_year: None,
            wikipedia_languages: None,
        }
    }
}

impl FetchConfig {
    /// `Some(value)` only for non-blank values.
    pub fn credential(value: &Option<String>) -> Option<&str> {
        value.as_deref().map(str::trim).filter(|v| !v.is_empty())
    }
}
