//! Fetch stage: HTTP transport, rate-limited retrying client, the
//! `SourceAdapter` seam with its pager, the raw accumulator, and the
//! concrete source adapters.

pub mod accumulate;
pub mod adapter;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod sources;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

pub use accumulate::{FetchOutcome, RawAccumulator, RunMeta, fetch_source};
pub use adapter::{FetchLimits, Page, PageResult, Pager, QueryInfo, SourceAdapter};
pub use client::{ApiClient, ClientStats, RetryPolicy};
pub use config::FetchConfig;
pub use error::FetchError;
pub use http::{ApiRequest, ApiResponse, HttpTransport, Transport, USER_AGENT};
pub use sources::{SOURCES, build_adapter};
