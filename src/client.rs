//! Bitbucket REST client with bounded retries on transient statuses.

use std::time::Duration;

use actix_web::{http::header, web::Bytes};
use color_eyre::eyre::WrapErr as _;
use futures::future::{FutureExt as _, LocalBoxFuture};
use secstr::SecUtf8;
use serde::de::DeserializeOwned;

use crate::{
    config::Config,
    error::{Error, Result},
};

/// Statuses worth another attempt: rate limiting and gateway/server hiccups.
pub const RETRY_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub reason: String,
    pub body: Bytes,
}

pub trait Transport {
    fn get<'a>(&'a self, url: &'a str) -> LocalBoxFuture<'a, Result<RawResponse>>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn get<'a>(&'a self, url: &'a str) -> LocalBoxFuture<'a, Result<RawResponse>> {
        (**self).get(url)
    }
}

/// `awc`-backed transport. Credentials are fixed for the lifetime of the value
/// and attached to every request.
pub struct AwcTransport {
    http: awc::Client,
    username: String,
    password: SecUtf8,
    body_limit: usize,
}

impl AwcTransport {
    pub fn new(username: String, password: SecUtf8, body_limit: usize) -> Self {
        Self {
            http: awc::Client::new(),
            username,
            password,
            body_limit,
        }
    }
}

impl Transport for AwcTransport {
    fn get<'a>(&'a self, url: &'a str) -> LocalBoxFuture<'a, Result<RawResponse>> {
        async move {
            let mut resp = self
                .http
                .get(url)
                .basic_auth(&self.username, self.password.unsecure())
                .insert_header((header::ACCEPT, "application/json"))
                .send()
                .await
                .map_err(|err| Error::Http {
                    url: url.to_string(),
                    status: None,
                    reason: err.to_string(),
                })?;

            let status = resp.status();
            let body = resp
                .body()
                .limit(self.body_limit)
                .await
                .map_err(|err| Error::Http {
                    url: url.to_string(),
                    status: Some(status.as_u16()),
                    reason: format!("failed reading response body: {}", err),
                })?;

            Ok(RawResponse {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or_default().to_string(),
                body,
            })
        }
        .boxed_local()
    }
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Attempts per logical request, the first one included.
    pub total: u32,
    pub backoff_factor: Duration,
    pub retry_on: Vec<u16>,
}

impl RetryPolicy {
    pub fn new(total: u32, backoff_factor: Duration) -> Self {
        Self {
            total,
            backoff_factor,
            retry_on: RETRY_STATUSES.to_vec(),
        }
    }

    pub fn is_retryable(&self, status: u16) -> bool {
        self.retry_on.contains(&status)
    }

    /// Delay before the attempt following `failed_attempts` failures.
    /// Saturates at `Duration::MAX`.
    pub fn backoff(&self, failed_attempts: u32) -> Duration {
        let exp = failed_attempts.saturating_sub(1).min(16);
        self.backoff_factor
            .checked_mul(2u32.pow(exp))
            .unwrap_or(Duration::MAX)
    }
}

pub struct Client<T> {
    transport: T,
    api_url: String,
    retry: RetryPolicy,
}

impl Client<AwcTransport> {
    pub fn from_config(config: &Config) -> Self {
        let transport = AwcTransport::new(
            config.username.clone(),
            config.password.clone(),
            config.body_limit,
        );
        let retry = RetryPolicy::new(
            config.retry_total,
            Duration::from_millis(config.backoff_factor_ms),
        );
        Self::new(transport, &config.api_url, retry)
    }
}

impl<T: Transport> Client<T> {
    pub fn new(transport: T, api_url: &str, retry: RetryPolicy) -> Self {
        Self {
            transport,
            api_url: api_url.trim_end_matches('/').to_string(),
            retry,
        }
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_url, path.trim_start_matches('/'))
    }

    /// GETs `url` and decodes its JSON body.
    ///
    /// Statuses in `retry.retry_on` are retried until `retry.total` attempts
    /// were made, then reported as [`Error::MaxRetry`]. Any other non-2xx
    /// status and any transport failure is reported as [`Error::Http`].
    pub async fn get<R: DeserializeOwned>(&self, url: &str) -> Result<R> {
        let total = self.retry.total.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            let resp = self.transport.get(url).await?;

            if (200..300).contains(&resp.status) {
                let body: R = serde_json::from_slice(&resp.body)
                    .wrap_err_with(|| format!("Failed to decode response of GET {}", url))?;
                return Ok(body);
            }

            if !self.retry.is_retryable(resp.status) {
                return Err(Error::Http {
                    url: url.to_string(),
                    status: Some(resp.status),
                    reason: format!(
                        "unexpected response HTTP status {} with reason \"{}\"",
                        resp.status, resp.reason
                    ),
                });
            }

            if attempt >= total {
                return Err(Error::MaxRetry {
                    url: url.to_string(),
                    attempts: attempt,
                    status: resp.status,
                });
            }

            let delay = self.retry.backoff(attempt);
            tracing::warn!(
                url,
                status = resp.status,
                attempt,
                "GET returned {}, retrying in {:?}",
                resp.status,
                delay,
            );
            if !delay.is_zero() {
                actix_web::rt::time::sleep(delay).await;
            }
        }
    }
}
