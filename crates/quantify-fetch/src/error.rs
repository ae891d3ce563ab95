use quantify_store::StoreError;
use thiserror::Error;

use crate::client::RETRY_STATUSES;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {message}")]
    Network { url: String, message: String },

    #[error("{url} returned HTTP {status}: {excerpt}")]
    Status {
        url: String,
        status: u16,
        excerpt: String,
    },

    #[error("malformed response from {url}: {detail} (body: {excerpt})")]
    Malformed {
        url: String,
        detail: String,
        excerpt: String,
    },

    #[error("gave up after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: Box<FetchError>,
    },

    #[error("query '{query}' page {page}: {source}")]
    Page {
        query: String,
        page: u32,
        source: Box<FetchError>,
    },

    #[error("source '{source_name}' needs {credential}")]
    MissingCredential {
        source_name: &'static str,
        credential: &'static str,
    },

    #[error("unknown source '{0}'")]
    UnknownSource(String),

    #[error("page delivered for undeclared table '{0}'")]
    UnknownTable(String),

    #[error("HTTP client setup failed: {0}")]
    Client(#[from] reqwest::Error),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl FetchError {
    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Network { .. } | FetchError::Malformed { .. } => true,
            FetchError::Status { status, .. } => RETRY_STATUSES.contains(status),
            _ => false,
        }
    }
}

/// First 200 characters of a response body, for logs and errors.
pub(crate) fn excerpt(body: &str) -> String {
    let trimmed = body.trim();
    let mut out: String = trimmed.chars().take(200).collect();
    if out.len() < trimmed.len() {
        out.push('…');
    }
    out
}
