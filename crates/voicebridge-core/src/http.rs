//! Shared HTTP client helper, used by the upstream bootstrap call and by the
//! HTTP tool dispatcher. Both need the same retry-with-backoff policy over
//! transient transport errors and 5xx responses.

use crate::{Error, Result};
use reqwest::{Client, ClientBuilder};
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            connect_timeout_secs: 10,
            user_agent: format!("voicebridge/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

pub fn create_client(config: &HttpClientConfig) -> Result<Client> {
    ClientBuilder::new()
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .user_agent(&config.user_agent)
        .use_rustls_tls()
        .build()
        .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))
}

/// Exponential backoff in milliseconds for retry attempt `n` (0-indexed),
/// capped per spec §4.5: `100ms * 2^n`, capped at 2s.
pub fn backoff_ms(attempt: u32) -> u64 {
    (100u64.saturating_mul(1u64 << attempt.min(10))).min(2_000)
}

/// Retry `operation` up to `max_retries` additional times, classifying a
/// retryable outcome via `is_retryable`. Used both for the bootstrap POST
/// (which never retries, `max_retries = 0`) and for HTTP tool dispatch.
pub async fn with_retry<F, Fut, T>(
    max_retries: u32,
    is_retryable: impl Fn(&Result<T>) -> bool,
    operation: F,
) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        let outcome = operation().await;
        if attempt >= max_retries || !is_retryable(&outcome) {
            return outcome;
        }
        let wait = backoff_ms(attempt);
        warn!(attempt, wait_ms = wait, "retrying after transient failure");
        tokio::time::sleep(Duration::from_millis(wait)).await;
        attempt += 1;
        debug!(attempt, "retry attempt starting");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn backoff_doubles_and_caps() {
        assert_eq!(backoff_ms(0), 100);
        assert_eq!(backoff_ms(1), 200);
        assert_eq!(backoff_ms(2), 400);
        assert_eq!(backoff_ms(10), 2_000);
        assert_eq!(backoff_ms(30), 2_000);
    }

    #[tokio::test]
    async fn retries_until_success() {
        let calls = AtomicU32::new(0);
        let result = with_retry(
            3,
            |r: &Result<i32>| r.is_err(),
            || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(Error::Transport("boom".into()))
                    } else {
                        Ok(42)
                    }
                }
            },
        )
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let calls = AtomicU32::new(0);
        let result: Result<i32> = with_retry(
            2,
            |r: &Result<i32>| r.is_err(),
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(Error::Transport("still broken".into())) }
            },
        )
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3); // initial + 2 retries
    }

    #[test]
    fn create_client_succeeds_with_defaults() {
        let client = create_client(&HttpClientConfig::default());
        assert!(client.is_ok());
    }
}
