//! Raw responses and how they become [`Outcome`]s.
//!
//! Every client operation funnels its response through [`with_status`]: the
//! status is checked against the one the operation expects, and only then is
//! the body looked at. A mismatch keeps the expected status, the observed
//! status and the raw body in the failure message, for debugging.

use crate::Outcome;
use http::{HeaderMap, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// A response as returned by a [`Transport`](crate::Transport), body read.
#[derive(Debug, Clone)]
pub struct RawResponse {
    /// The HTTP status code of the response.
    pub status: StatusCode,

    /// The response headers.
    pub headers: HeaderMap,

    /// The raw response body.
    pub body: String,

    /// Time from sending the request until the body was read.
    pub latency: Duration,
}

impl RawResponse {
    /// Creates a response with no headers and zero latency.
    ///
    /// Handy for transports that do not track either, and for tests.
    ///
    /// # Examples
    ///
    /// ```
    /// use billmyservices::response::RawResponse;
    /// use http::StatusCode;
    ///
    /// let response = RawResponse::new(StatusCode::OK, "[]");
    /// assert_eq!(response.body, "[]");
    /// ```
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
            latency: Duration::ZERO,
        }
    }

    /// Returns a header value by name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)?.to_str().ok()
    }
}

/// Applies `mapper` if the response has the `expected` status, otherwise
/// fails with a message naming both statuses and the raw body.
///
/// # Examples
///
/// ```
/// use billmyservices::response::{with_status, RawResponse};
/// use billmyservices::Outcome;
/// use http::StatusCode;
///
/// let response = RawResponse::new(StatusCode::NOT_FOUND, "no such counter type");
/// let outcome = with_status(StatusCode::OK, &response, |r| Outcome::Success(r.body.len()));
///
/// assert_eq!(
///     outcome.message(),
///     "expected HTTP 200 but 404, response was `no such counter type`"
/// );
/// ```
pub fn with_status<T, F>(expected: StatusCode, response: &RawResponse, mapper: F) -> Outcome<T>
where
    F: FnOnce(&RawResponse) -> Outcome<T>,
{
    if response.status == expected {
        return mapper(response);
    }

    tracing::warn!(
        expected = expected.as_u16(),
        status = response.status.as_u16(),
        response = %response.body,
        "Unexpected HTTP status"
    );

    Outcome::Failure(format!(
        "expected HTTP {} but {}, response was `{}`",
        expected.as_u16(),
        response.status.as_u16(),
        response.body
    ))
}

/// Like [`with_status`], for operations whose only answer is the status:
/// succeeds with `true` when it matches.
pub fn confirm_status(expected: StatusCode, response: &RawResponse) -> Outcome<bool> {
    with_status(expected, response, |_| Outcome::Success(true))
}

/// Deserializes the JSON body, failing with the decoder's message.
pub fn decode<T>(response: &RawResponse) -> Outcome<T>
where
    T: DeserializeOwned,
{
    match serde_json::from_str::<T>(&response.body) {
        Ok(data) => Outcome::Success(data),
        Err(e) => {
            tracing::error!(
                error = %e,
                raw_response = %response.body,
                "Failed to deserialize response"
            );
            Outcome::Failure(e.to_string())
        }
    }
}
