//! HTTP extraction of the raw rates payload.
//!
//! One GET per run against the configured endpoint. Server-side hiccups
//! (5xx from the forcelist), refused connections and timeouts are retried with
//! exponential backoff; anything else surfaces immediately.

use std::time::Duration;

use log::{debug, info, warn};
use reqwest::header::RETRY_AFTER;
use reqwest::{Client, StatusCode};

use crate::config::Config;
use crate::error::EtlError;
use crate::model::RawResponse;

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt; total attempts are `max_retries + 1`.
    pub max_retries: u32,
    pub backoff_factor: f64,
    pub status_forcelist: Vec<u16>,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_factor: 0.3,
            status_forcelist: vec![500, 502, 503, 504],
            max_backoff: Duration::from_secs(120),
        }
    }
}

impl RetryPolicy {
    pub fn should_retry_status(&self, status: StatusCode) -> bool {
        self.status_forcelist.contains(&status.as_u16())
    }

    /// Honors a server's `Retry-After`, but never beyond `max_backoff`.
    pub fn retry_after(&self, secs: u64) -> Duration {
        Duration::from_secs(secs).min(self.max_backoff)
    }

    /// Delay before retry number `retry` (1-based). The first retry is immediate,
    /// then `backoff_factor * 2^(retry - 1)` seconds up to `max_backoff`.
    pub fn backoff(&self, retry: u32) -> Duration {
        if retry <= 1 {
            return Duration::ZERO;
        }
        let secs = self.backoff_factor * 2f64.powi(retry as i32 - 1);
        Duration::from_secs_f64(secs.min(self.max_backoff.as_secs_f64()))
    }
}

/// Owns the HTTP client for the lifetime of one run.
pub struct RateFetcher {
    client: Client,
    url: String,
    retry: RetryPolicy,
}

enum Attempt {
    Done(String),
    Retry { error: EtlError, wait: Option<Duration> },
}

impl RateFetcher {
    pub fn new(config: &Config) -> Result<Self, EtlError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|source| EtlError::Transport {
                url: config.api_url.clone(),
                source,
            })?;

        Ok(Self {
            client,
            url: config.api_url.clone(),
            retry: config.retry.clone(),
        })
    }

    pub async fn fetch(&self) -> Result<RawResponse, EtlError> {
        info!("Starting data extraction from {}", self.url);
        let body = self.fetch_with_retry().await?;
        let raw: RawResponse = serde_json::from_str(&body)?;
        info!("Data extraction completed.");
        Ok(raw)
    }

    async fn fetch_with_retry(&self) -> Result<String, EtlError> {
        let mut retry = 0;
        loop {
            let (error, wait) = match self.attempt().await? {
                Attempt::Done(body) => return Ok(body),
                Attempt::Retry { error, wait } => (error, wait),
            };

            if retry >= self.retry.max_retries {
                return Err(error);
            }
            retry += 1;

            let delay = wait.unwrap_or_else(|| self.retry.backoff(retry));
            warn!(
                "{error}; retry {retry}/{} in {:.1}s",
                self.retry.max_retries,
                delay.as_secs_f64()
            );
            tokio::time::sleep(delay).await;
        }
    }

    /// One GET. `Err` is final; `Ok(Attempt::Retry)` is eligible for another try.
    async fn attempt(&self) -> Result<Attempt, EtlError> {
        let response = match self.client.get(&self.url).send().await {
            Ok(response) => response,
            Err(source) => {
                let error = EtlError::Transport {
                    url: self.url.clone(),
                    source,
                };
                if error.is_transient_transport() {
                    return Ok(Attempt::Retry { error, wait: None });
                }
                return Err(error);
            }
        };

        let status = response.status();
        debug!("GET {} -> {status}", self.url);

        if status.is_success() {
            let body = response.text().await.map_err(|source| EtlError::Transport {
                url: self.url.clone(),
                source,
            })?;
            return Ok(Attempt::Done(body));
        }

        let error = EtlError::Http {
            url: self.url.clone(),
            status,
        };
        if !self.retry.should_retry_status(status) {
            return Err(error);
        }

        let wait = if status == StatusCode::SERVICE_UNAVAILABLE {
            response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(|secs| self.retry.retry_after(secs))
        } else {
            None
        };
        Ok(Attempt::Retry { error, wait })
    }
}
