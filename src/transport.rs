//! The HTTP exchange itself.
//!
//! The client never talks to the network directly: it hands each
//! [`SignedRequest`] to a [`Transport`]. [`ReqwestTransport`] is the default;
//! anything that can perform GET/POST/PUT/DELETE with custom headers and hand
//! back the status and body can stand in for it.

use crate::{request::SignedRequest, response::RawResponse, Result};
use std::future::Future;
use std::time::{Duration, Instant};

/// Executes signed requests.
///
/// Implementations are shared by every concurrent call of a client, so they
/// must be `Send + Sync`. Timeouts, pooling and TLS are the transport's
/// business; the client adds nothing on top.
///
/// # Examples
///
/// ```
/// use billmyservices::{request::SignedRequest, response::RawResponse, Transport};
/// use http::StatusCode;
///
/// /// Answers every request with an empty JSON array.
/// struct Canned;
///
/// impl Transport for Canned {
///     async fn execute(&self, _request: SignedRequest) -> billmyservices::Result<RawResponse> {
///         Ok(RawResponse::new(StatusCode::OK, "[]"))
///     }
/// }
/// ```
pub trait Transport: Send + Sync + 'static {
    /// Sends the request and reads the whole response body.
    ///
    /// Errors are reported as [`Error::Network`](crate::Error::Network) or
    /// similar; the client turns them into failed outcomes.
    fn execute(&self, request: SignedRequest) -> impl Future<Output = Result<RawResponse>> + Send;
}

/// A [`Transport`] backed by a pooled `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http_client: reqwest::Client,
    timeout: Option<Duration>,
}

impl ReqwestTransport {
    /// Wraps an existing `reqwest::Client`.
    pub fn new(http_client: reqwest::Client) -> Self {
        Self {
            http_client,
            timeout: None,
        }
    }

    /// Sets a per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Returns the underlying `reqwest::Client`.
    pub fn http_client(&self) -> &reqwest::Client {
        &self.http_client
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new(reqwest::Client::new())
    }
}

impl Transport for ReqwestTransport {
    async fn execute(&self, request: SignedRequest) -> Result<RawResponse> {
        let start_time = Instant::now();

        tracing::debug!(
            method = %request.method,
            url = %request.url,
            "Executing HTTP request"
        );

        let mut builder = self
            .http_client
            .request(request.method, request.url)
            .headers(request.headers);

        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text().await?;
        let latency = start_time.elapsed();

        tracing::info!(
            status = status.as_u16(),
            latency_ms = latency.as_millis(),
            "Received HTTP response"
        );

        Ok(RawResponse {
            status,
            headers,
            body,
            latency,
        })
    }
}
