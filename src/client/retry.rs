//! Response-driven retry layered on the hook set.
//!
//! The pipeline itself never retries. [`RetryingHooks`] is a derived client
//! that does: it counts attempts in the `attempt` custom option, and when a
//! response carries a retryable status it sends the processed request back
//! through the pipeline after an exponential backoff, until `max_tries`
//! attempts have been made. Past that bound it fails with
//! [`Error::RetryExhausted`].
//!
//! # Examples
//!
//! ```
//! use hookwire::client::{RetryingHooks, DefaultHooks, MAX_TRIES};
//! use hookwire::RequestOptions;
//! use std::time::Duration;
//!
//! let hooks = RetryingHooks::new(DefaultHooks).with_base_delay(Duration::from_millis(50));
//! let options = RequestOptions::new().with_custom(MAX_TRIES, 5);
//! # let _ = (hooks, options);
//! ```

use super::config::ClientConfig;
use super::hooks::{Hooks, Resend};
use crate::error::{Error, Result};
use crate::types::{Body, HeaderList, Outcome, Params, Request, RequestOptions, Response};
use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;
use tokio::time::sleep;

/// Custom option holding the attempt bound.
pub const MAX_TRIES: &str = "max_tries";
/// Custom option holding the number of the current attempt (1 based).
pub const ATTEMPT: &str = "attempt";
pub const DEFAULT_MAX_TRIES: u32 = 3;

/// Check if status code indicates a retryable response
pub fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 425 | 429 | 502 | 503 | 504)
}

/// Exponential backoff delay: `base_ms * 2^attempt`, exponent capped at 10.
pub fn exponential_backoff(attempt: u32, base_ms: u64) -> Duration {
    let delay_ms = base_ms.saturating_mul(2_u64.pow(attempt.min(10)));
    Duration::from_millis(delay_ms)
}

/// Wraps another hook set and retries retryable responses.
#[derive(Debug, Clone)]
pub struct RetryingHooks<H> {
    inner: H,
    base_delay_ms: u64,
    retry_on: fn(u16) -> bool,
    enable_logging: bool,
}

impl<H: Hooks> RetryingHooks<H> {
    pub fn new(inner: H) -> Self {
        Self::from_config(inner, &ClientConfig::default())
    }

    /// Take the backoff base and logging switch from `config`.
    pub fn from_config(inner: H, config: &ClientConfig) -> Self {
        RetryingHooks {
            inner,
            base_delay_ms: config.retry_delay_ms,
            retry_on: is_retryable_status,
            enable_logging: config.enable_logging,
        }
    }

    pub fn with_base_delay(mut self, base: Duration) -> Self {
        self.base_delay_ms = base.as_millis() as u64;
        self
    }

    /// Replace the retryable-status predicate.
    pub fn with_retry_on(mut self, retry_on: fn(u16) -> bool) -> Self {
        self.retry_on = retry_on;
        self
    }

    pub fn inner(&self) -> &H {
        &self.inner
    }
}

fn attempt_of(options: &RequestOptions) -> u32 {
    options.custom_u64(ATTEMPT).unwrap_or(1) as u32
}

fn max_tries_of(options: &RequestOptions) -> u32 {
    options
        .custom_u64(MAX_TRIES)
        .map(|n| n as u32)
        .unwrap_or(DEFAULT_MAX_TRIES)
}

#[async_trait]
impl<H: Hooks> Hooks for RetryingHooks<H> {
    fn process_request_params(&self, request: &Request) -> Params {
        self.inner.process_request_params(request)
    }

    fn process_request_url(&self, request: &Request) -> String {
        self.inner.process_request_url(request)
    }

    fn process_request_headers(&self, request: &Request) -> HeaderList {
        self.inner.process_request_headers(request)
    }

    fn process_request_body(&self, request: &Request) -> Body {
        self.inner.process_request_body(request)
    }

    /// Bumps the attempt counter.
    fn process_request_options(&self, request: &Request) -> RequestOptions {
        let mut options = self.inner.process_request_options(request);
        let attempt = options.custom_u64(ATTEMPT).unwrap_or(0) + 1;
        options.custom.insert(ATTEMPT.to_string(), attempt.into());
        options
    }

    fn process_response_status_code(&self, status_code: u16) -> u16 {
        self.inner.process_response_status_code(status_code)
    }

    fn process_response_headers(&self, headers: HeaderList) -> HeaderList {
        self.inner.process_response_headers(headers)
    }

    fn process_response_body(&self, body: Bytes) -> Bytes {
        self.inner.process_response_body(body)
    }

    fn process_response_chunk(&self, chunk: Bytes) -> Bytes {
        self.inner.process_response_chunk(chunk)
    }

    async fn process_response(&self, response: Response, resend: &dyn Resend) -> Result<Outcome> {
        if !(self.retry_on)(response.status_code) {
            return self.inner.process_response(response, resend).await;
        }

        let attempt = attempt_of(response.request.options());
        let max_tries = max_tries_of(response.request.options());
        if attempt >= max_tries {
            if self.enable_logging {
                tracing::warn!(
                    status = response.status_code,
                    attempt,
                    max_tries,
                    "Giving up after retryable response"
                );
            }
            return Err(Error::RetryExhausted {
                attempts: attempt,
                max_tries,
            });
        }

        let delay = exponential_backoff(attempt.saturating_sub(1), self.base_delay_ms);
        if self.enable_logging {
            tracing::warn!(
                "Retryable status {} (attempt {} of {}), retrying after {:?}",
                response.status_code,
                attempt,
                max_tries,
                delay
            );
        }
        sleep(delay).await;
        resend.resend(response.request).await
    }
}
