//! Concurrent, polite, circuit-broken HTTP fetcher for feed entry source
//! pages.
//!
//! Concurrency is gated by a global semaphore and a per-domain semaphore,
//! acquired in that order (global first) so that a burst of entries from one
//! domain can't starve fetches to other domains. Each domain additionally
//! carries a [`CircuitBreakerState`] that opens after repeated failures.

use std::net::ToSocketAddrs;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use newsgrid_core::ssrf::guard_address;
use newsgrid_core::CircuitBreakerState;

use crate::error::FetchError;

const USER_AGENT: &str = "newsgrid-fetcher/1.0 (+https://newsgrid.example/bot)";
const MAX_ATTEMPTS: u32 = 3;
const BACKOFF_SCHEDULE_SECS: [u64; 3] = [1, 2, 30];

/// Result of a successful fetch.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub url: String,
    pub html: String,
    pub status: u16,
}

#[derive(Debug, Clone, Copy)]
pub struct FetcherConfig {
    pub global_concurrency: usize,
    pub per_domain_concurrency: usize,
    pub polite_delay: Duration,
    pub max_retry_after: Duration,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            global_concurrency: 50,
            per_domain_concurrency: 4,
            polite_delay: Duration::from_millis(250),
            max_retry_after: Duration::from_secs(60),
        }
    }
}

/// Concurrent fetcher shared across an ingest run.
pub struct AsyncFetcher {
    client: reqwest::Client,
    config: FetcherConfig,
    global_semaphore: Arc<Semaphore>,
    per_domain_semaphores: DashMap<String, Arc<Semaphore>>,
    circuit_breakers: DashMap<String, Arc<Mutex<CircuitBreakerState>>>,
    breaker_threshold: u32,
    breaker_cooldown: Duration,
}

impl AsyncFetcher {
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client fails to build.
    pub fn new(
        config: FetcherConfig,
        breaker_threshold: u32,
        breaker_cooldown: Duration,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            config,
            global_semaphore: Arc::new(Semaphore::new(config.global_concurrency)),
            per_domain_semaphores: DashMap::new(),
            circuit_breakers: DashMap::new(),
            breaker_threshold,
            breaker_cooldown,
        })
    }

    fn domain_semaphore(&self, domain: &str) -> Arc<Semaphore> {
        self.per_domain_semaphores
            .entry(domain.to_string())
            .or_insert_with(|| Arc::new(Semaphore::new(self.config.per_domain_concurrency)))
            .clone()
    }

    fn breaker(&self, domain: &str) -> Arc<Mutex<CircuitBreakerState>> {
        self.circuit_breakers
            .entry(domain.to_string())
            .or_insert_with(|| {
                Arc::new(Mutex::new(CircuitBreakerState::new(
                    self.breaker_threshold,
                    self.breaker_cooldown,
                )))
            })
            .clone()
    }

    /// Fetches `url`, honoring global/per-domain concurrency limits, the
    /// domain's circuit breaker, and retry-with-backoff on 429/503.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] if the domain's circuit breaker is open, the
    /// URL resolves to a blocked address, or every retry attempt fails.
    pub async fn fetch(&self, url: &str) -> Result<FetchResult, FetchError> {
        let domain = extract_domain(url);
        let breaker = self.breaker(&domain);

        if breaker.lock().is_open() {
            return Err(FetchError::CircuitOpen { domain });
        }

        guard_url_address(url)?;

        // Acquire global permit first, then the per-domain permit, so one
        // domain's queue never starves fetches to other domains.
        let _global_permit = self.global_semaphore.acquire().await;
        let domain_semaphore = self.domain_semaphore(&domain);
        let _domain_permit = domain_semaphore.acquire().await;

        let result = self.fetch_with_retry(url).await;

        match &result {
            Ok(_) => breaker.lock().record_success(),
            Err(_) => breaker.lock().record_failure(),
        }

        if result.is_ok() {
            tokio::time::sleep(self.config.polite_delay).await;
        }

        result
    }

    async fn fetch_with_retry(&self, url: &str) -> Result<FetchResult, FetchError> {
        let mut last_err = None;

        for attempt in 0..MAX_ATTEMPTS {
            let resp = self.client.get(url).send().await.map_err(|source| {
                if source.is_timeout() {
                    FetchError::Timeout { url: url.to_string() }
                } else {
                    FetchError::Transport { url: url.to_string(), source }
                }
            });

            match resp {
                Ok(response) => {
                    let status = response.status();
                    if status.as_u16() == 429 || status.as_u16() == 503 {
                        let wait = retry_after(&response, self.config.max_retry_after)
                            .unwrap_or_else(|| Duration::from_secs(BACKOFF_SCHEDULE_SECS[attempt as usize % 3]));
                        warn!(%url, status = status.as_u16(), wait_secs = wait.as_secs(), "retrying after rate limit");
                        last_err = Some(FetchError::HttpStatus { url: url.to_string(), status: status.as_u16() });
                        tokio::time::sleep(wait).await;
                        continue;
                    }
                    if !status.is_success() {
                        return Err(FetchError::HttpStatus { url: url.to_string(), status: status.as_u16() });
                    }
                    let html = response
                        .text()
                        .await
                        .map_err(|source| FetchError::Transport { url: url.to_string(), source })?;
                    return Ok(FetchResult { url: url.to_string(), html, status: status.as_u16() });
                }
                Err(err) => {
                    debug!(%url, attempt, "fetch attempt failed");
                    let wait = Duration::from_secs(BACKOFF_SCHEDULE_SECS[attempt as usize % 3]);
                    last_err = Some(err);
                    tokio::time::sleep(wait).await;
                }
            }
        }

        Err(last_err.unwrap_or(FetchError::HttpStatus { url: url.to_string(), status: 0 }))
    }
}

/// Reads and clamps the `Retry-After` header, if present, to
/// `max_retry_after`.
fn retry_after(response: &reqwest::Response, max_retry_after: Duration) -> Option<Duration> {
    let header = response.headers().get("retry-after")?;
    let secs: u64 = header.to_str().ok()?.parse().ok()?;
    Some(Duration::from_secs(secs).min(max_retry_after))
}

fn extract_domain(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| url.to_string())
}

fn guard_url_address(url: &str) -> Result<(), FetchError> {
    let parsed = url::Url::parse(url).map_err(|_| FetchError::Ssrf(url.to_string()))?;
    let host = parsed.host_str().ok_or_else(|| FetchError::Ssrf(url.to_string()))?;
    let port = parsed.port_or_known_default().unwrap_or(80);

    let addrs = (host, port)
        .to_socket_addrs()
        .map_err(|e| FetchError::Ssrf(format!("{url}: {e}")))?;

    for addr in addrs {
        guard_address(addr.ip()).map_err(FetchError::Ssrf)?;
    }
    Ok(())
}
