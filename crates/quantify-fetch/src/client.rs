//! Rate-limited, retrying JSON client shared by all adapters.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, error, warn};

use crate::FetchError;
use crate::error::excerpt;
use crate::http::{ApiRequest, Transport};

/// HTTP statuses worth retrying.
pub const RETRY_STATUSES: &[u16] = &[408, 422, 429, 500, 502, 503, 504];

/// Bounded exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Retries without sleeping between attempts.
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }

    /// Delay before retry number `retry` (1-based): initial × 2^(retry-1), capped.
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

/// Minimum spacing between consecutive requests.
struct RateLimiter {
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    fn new(min_interval: Duration) -> Self {
        Self {
            last_request: Mutex::new(None),
            min_interval,
        }
    }

    async fn wait(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(last_time) = *last {
            let elapsed = last_time.elapsed();
            if elapsed < self.min_interval {
                let wait_time = self.min_interval - elapsed;
                debug!(wait_ms = wait_time.as_millis() as u64, "rate limiting");
                tokio::time::sleep(wait_time).await;
            }
        }
        *last = Some(Instant::now());
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClientStats {
    pub requests: u64,
    pub retries: u64,
}

/// JSON GET client for one source run: one rate limiter, one retry budget
/// per request, and counters for provenance.
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    limiter: RateLimiter,
    retry: RetryPolicy,
    requests: AtomicU64,
    retries: AtomicU64,
}

impl ApiClient {
    pub fn new(transport: Arc<dyn Transport>, min_delay: Duration, retry: RetryPolicy) -> Self {
        Self {
            transport,
            limiter: RateLimiter::new(min_delay),
            retry,
            requests: AtomicU64::new(0),
            retries: AtomicU64::new(0),
        }
    }

    pub fn stats(&self) -> ClientStats {
        ClientStats {
            requests: self.requests.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
        }
    }

    /// GET `request` and decode the body as `T`.
    ///
    /// Retryable statuses, network errors and bodies that do not decode are
    /// retried up to the policy's bound; any other status fails at once.
    pub async fn get_json<T: DeserializeOwned>(&self, request: &ApiRequest) -> Result<T, FetchError> {
        let url = request.display_url();
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            self.limiter.wait().await;
            self.requests.fetch_add(1, Ordering::Relaxed);

            let err = match self.transport.send(request).await {
                Ok(resp) if resp.is_success() => match serde_json::from_str::<T>(&resp.body) {
                    Ok(value) => {
                        if attempt > 1 {
                            debug!(url = %url, attempt, "succeeded after retry");
                        }
                        return Ok(value);
                    }
                    Err(e) => FetchError::Malformed {
                        url: url.clone(),
                        detail: e.to_string(),
                        excerpt: excerpt(&resp.body),
                    },
                },
                Ok(resp) => FetchError::Status {
                    url: url.clone(),
                    status: resp.status,
                    excerpt: excerpt(&resp.body),
                },
                Err(e) => e,
            };

            if !err.is_transient() {
                return Err(err);
            }
            if attempt > self.retry.max_retries {
                error!(url = %url, attempts = attempt, error = %err, "retries exhausted");
                return Err(FetchError::RetriesExhausted {
                    attempts: attempt,
                    last: Box::new(err),
                });
            }

            let delay = self.retry.backoff(attempt);
            self.retries.fetch_add(1, Ordering::Relaxed);
            warn!(
                url = %url,
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "transient failure, retrying"
            );
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;
    use crate::mock::ScriptedTransport;

    #[derive(Debug, Deserialize)]
    struct Count {
        total_count: u64,
    }

    fn client(transport: &Arc<ScriptedTransport>, retries: u32) -> ApiClient {
        ApiClient::new(transport.clone(), Duration::ZERO, RetryPolicy::immediate(retries))
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            max_retries: 5,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(10),
        };
        assert_eq!(policy.backoff(1), Duration::from_secs(1));
        assert_eq!(policy.backoff(2), Duration::from_secs(2));
        assert_eq!(policy.backoff(4), Duration::from_secs(8));
        assert_eq!(policy.backoff(5), Duration::from_secs(10));
        assert_eq!(policy.backoff(40), Duration::from_secs(10));
    }

    #[tokio::test]
    async fn retries_transient_statuses_then_succeeds() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond("search", 503, "unavailable");
        transport.respond("search", 429, "slow down");
        transport.respond("search", 200, r#"{"total_count": 42}"#);

        let client = client(&transport, 5);
        let count: Count = client.get_json(&ApiRequest::get("https://x/search")).await.unwrap();
        assert_eq!(count.total_count, 42);
        assert_eq!(client.stats(), ClientStats { requests: 3, retries: 2 });
    }

    #[tokio::test]
    async fn malformed_body_is_retried() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond("search", 200, "<html>maintenance</html>");
        transport.respond("search", 200, r#"{"total_count": 1}"#);

        let client = client(&transport, 5);
        let count: Count = client.get_json(&ApiRequest::get("https://x/search")).await.unwrap();
        assert_eq!(count.total_count, 1);
        assert_eq!(client.stats().retries, 1);
    }

    #[tokio::test]
    async fn exhaustion_reports_last_error() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond_always("search", 502, "bad gateway");

        let client = client(&transport, 2);
        let err = client
            .get_json::<Count>(&ApiRequest::get("https://x/search"))
            .await
            .unwrap_err();
        match err {
            FetchError::RetriesExhausted { attempts, last } => {
                assert_eq!(attempts, 3);
                assert!(matches!(*last, FetchError::Status { status: 502, .. }));
            }
            other => panic!("expected RetriesExhausted, got {other}"),
        }
        assert_eq!(transport.requests().len(), 3);
    }

    #[tokio::test]
    async fn non_retryable_status_fails_immediately() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond_always("search", 401, "bad credentials");

        let client = client(&transport, 5);
        let err = client
            .get_json::<Count>(&ApiRequest::get("https://x/search"))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 401, .. }));
        assert_eq!(client.stats(), ClientStats { requests: 1, retries: 0 });
    }

    #[tokio::test]
    async fn network_errors_are_retried() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.fail("search", "connection reset");
        transport.respond("search", 200, r#"{"total_count": 5}"#);

        let client = client(&transport, 1);
        let count: Count = client.get_json(&ApiRequest::get("https://x/search")).await.unwrap();
        assert_eq!(count.total_count, 5);
    }

    #[tokio::test]
    async fn rate_limiter_spaces_requests() {
        let limiter = RateLimiter::new(Duration::from_millis(30));
        let start = Instant::now();
        limiter.wait().await;
        limiter.wait().await;
        assert!(start.elapsed() >= Duration::from_millis(30));
    }
}
