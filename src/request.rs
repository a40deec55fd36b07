//! Request assembly: URL, `wsb-*` headers and signature.
//!
//! Everything here runs synchronously, before any network activity, so a call
//! that breaks the API contract is rejected with an [`Error`] rather than sent.

use crate::{
    model::CounterVersion,
    signer::{CanonicalFields, Signer},
    Error, Result,
};
use http::{HeaderMap, HeaderValue, Method};
use std::time::{SystemTime, UNIX_EPOCH};
use url::Url;

/// Names of the headers the service reads.
pub mod headers {
    /// Request time, seconds since the UNIX epoch. Always sent.
    pub const WSB_TIME: &str = "wsb-time";
    pub const WSB_VALUE: &str = "wsb-value";
    pub const WSB_K1: &str = "wsb-k1";
    pub const WSB_K2: &str = "wsb-k2";
    pub const WSB_MODE: &str = "wsb-mode";
    pub const WSB_NAME: &str = "wsb-name";
    /// Base64 HMAC-SHA256 over the canonical string. Always sent.
    pub const WSB_HMAC: &str = "wsb-hmac";
}

/// Everything needed to address and sign requests for one account.
///
/// Immutable once built; cloning is cheap enough to do per client.
#[derive(Debug, Clone)]
pub struct Credentials {
    service_url: Url,
    account_id: String,
    signer: Signer,
}

impl Credentials {
    /// Creates credentials from a service URL, an account id and a base64
    /// encoded secret key.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be parsed or used as a base, if the
    /// account id is empty or not printable US-ASCII, or if the secret key is
    /// invalid.
    pub fn new(service_url: &str, account_id: impl Into<String>, secret_key: &str) -> Result<Self> {
        let signer = Signer::from_base64(secret_key)?;
        Self::with_signer(Url::parse(service_url)?, account_id, signer)
    }

    /// Creates credentials around an existing [`Signer`].
    pub fn with_signer(service_url: Url, account_id: impl Into<String>, signer: Signer) -> Result<Self> {
        if service_url.cannot_be_a_base() {
            return Err(Error::ConfigurationError(format!(
                "`{service_url}` cannot be used as a service URL"
            )));
        }

        let account_id = account_id.into();
        if account_id.is_empty() {
            return Err(Error::ConfigurationError("the account id is empty".to_string()));
        }
        check_text("account id", &account_id)
            .map_err(|e| Error::ConfigurationError(e.to_string()))?;

        Ok(Self {
            service_url,
            account_id,
            signer,
        })
    }

    pub fn service_url(&self) -> &Url {
        &self.service_url
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    pub fn signer(&self) -> &Signer {
        &self.signer
    }
}

/// The resource a request is about.
///
/// A counter can only be addressed through its counter type, so the illegal
/// "counter without counter type" combination cannot be expressed here; use
/// [`Endpoint::from_parts`] when starting from optional codes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// `{service}/{account}`
    Account,
    /// `{service}/{account}/{counter_type}`
    CounterType(String),
    /// `{service}/{account}/{counter_type}/{counter}`
    Counter(String, String),
}

impl Endpoint {
    pub fn counter_type(code: impl Into<String>) -> Self {
        Endpoint::CounterType(code.into())
    }

    pub fn counter(counter_type_code: impl Into<String>, counter_code: impl Into<String>) -> Self {
        Endpoint::Counter(counter_type_code.into(), counter_code.into())
    }

    /// Builds an endpoint from optional codes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IllegalArguments`] if `counter_code` is given without
    /// `counter_type_code`.
    ///
    /// # Examples
    ///
    /// ```
    /// use billmyservices::request::Endpoint;
    ///
    /// assert_eq!(
    ///     Endpoint::from_parts(Some("T1"), None).unwrap(),
    ///     Endpoint::counter_type("T1")
    /// );
    /// assert!(Endpoint::from_parts(None, Some("C1")).is_err());
    /// ```
    pub fn from_parts(counter_type_code: Option<&str>, counter_code: Option<&str>) -> Result<Self> {
        match (counter_type_code, counter_code) {
            (None, None) => Ok(Endpoint::Account),
            (Some(counter_type), None) => Ok(Endpoint::counter_type(counter_type)),
            (Some(counter_type), Some(counter)) => Ok(Endpoint::counter(counter_type, counter)),
            (None, Some(_)) => Err(Error::IllegalArguments(
                "if `counter_type_code` is absent then `counter_code` must be absent".to_string(),
            )),
        }
    }

    pub fn counter_type_code(&self) -> Option<&str> {
        match self {
            Endpoint::Account => None,
            Endpoint::CounterType(counter_type) | Endpoint::Counter(counter_type, _) => {
                Some(counter_type)
            }
        }
    }

    pub fn counter_code(&self) -> Option<&str> {
        match self {
            Endpoint::Counter(_, counter) => Some(counter),
            _ => None,
        }
    }

    /// Resolves the endpoint against the account's service URL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IllegalArguments`] for codes that would not survive as
    /// their own path segment: empty, `.`, `..` or not printable US-ASCII.
    pub fn url(&self, credentials: &Credentials) -> Result<Url> {
        for code in [self.counter_type_code(), self.counter_code()].into_iter().flatten() {
            check_code(code)?;
        }

        let mut url = credentials.service_url.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                Error::ConfigurationError("the service URL cannot be used as a base".to_string())
            })?;
            segments.pop_if_empty().push(&credentials.account_id);
            segments.extend(self.counter_type_code());
            segments.extend(self.counter_code());
        }
        Ok(url)
    }
}

/// A signed request, ready for a [`Transport`](crate::Transport).
#[derive(Debug, Clone)]
pub struct SignedRequest {
    /// One of GET, POST, PUT or DELETE.
    pub method: Method,

    /// The absolute request URL.
    pub url: Url,

    /// The `wsb-*` headers, signature included.
    pub headers: HeaderMap,
}

impl SignedRequest {
    /// Returns a header value by name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)?.to_str().ok()
    }
}

/// Collects the parameters of one call and turns them into a [`SignedRequest`].
///
/// # Examples
///
/// ```
/// use billmyservices::request::{Credentials, Endpoint, RequestBuilder};
/// use http::Method;
///
/// # fn example() -> Result<(), billmyservices::Error> {
/// let credentials = Credentials::new("http://services.billmyservices.com", "acme", "SmVmZQ==")?;
///
/// let request = RequestBuilder::new(Method::POST, Endpoint::counter("api-calls", "customer-42"))
///     .value(1)
///     .build(&credentials)?;
///
/// assert_eq!(request.url.as_str(), "http://services.billmyservices.com/acme/api-calls/customer-42");
/// assert_eq!(request.header("wsb-value"), Some("1"));
/// assert!(request.header("wsb-hmac").is_some());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    method: Method,
    endpoint: Endpoint,
    name: Option<String>,
    value: Option<i64>,
    k1: Option<i64>,
    k2: Option<i64>,
    mode: Option<CounterVersion>,
    timestamp: Option<i64>,
}

impl RequestBuilder {
    pub fn new(method: Method, endpoint: Endpoint) -> Self {
        Self {
            method,
            endpoint,
            name: None,
            value: None,
            k1: None,
            k2: None,
            mode: None,
            timestamp: None,
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn value(mut self, value: i64) -> Self {
        self.value = Some(value);
        self
    }

    pub fn k1(mut self, k1: i64) -> Self {
        self.k1 = Some(k1);
        self
    }

    pub fn k2(mut self, k2: i64) -> Self {
        self.k2 = Some(k2);
        self
    }

    pub fn mode(mut self, mode: CounterVersion) -> Self {
        self.mode = Some(mode);
        self
    }

    /// Pins the request time. Defaults to the current time when building.
    pub fn timestamp(mut self, seconds_since_epoch: i64) -> Self {
        self.timestamp = Some(seconds_since_epoch);
        self
    }

    /// Validates, addresses and signs the request.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedMethod`] for methods other than GET, POST,
    /// PUT and DELETE, and [`Error::IllegalArguments`] if a code or the name
    /// cannot be signed as printable US-ASCII, or if a code is empty, `.` or
    /// `..`.
    pub fn build(&self, credentials: &Credentials) -> Result<SignedRequest> {
        if ![Method::GET, Method::POST, Method::PUT, Method::DELETE].contains(&self.method) {
            return Err(Error::UnsupportedMethod(self.method.clone()));
        }

        if let Some(name) = &self.name {
            check_text("name", name)?;
        }

        let url = self.endpoint.url(credentials)?;
        let timestamp = self.timestamp.unwrap_or_else(now);

        let mut headers = HeaderMap::new();
        if let Some(value) = self.value {
            headers.insert(headers::WSB_VALUE, HeaderValue::from(value));
        }
        if let Some(k1) = self.k1 {
            headers.insert(headers::WSB_K1, HeaderValue::from(k1));
        }
        if let Some(k2) = self.k2 {
            headers.insert(headers::WSB_K2, HeaderValue::from(k2));
        }
        if let Some(mode) = self.mode {
            headers.insert(headers::WSB_MODE, HeaderValue::from_static(mode.as_str()));
        }
        headers.insert(headers::WSB_TIME, HeaderValue::from(timestamp));

        let signature = credentials.signer.sign_fields(&CanonicalFields {
            account_id: &credentials.account_id,
            counter_type_code: self.endpoint.counter_type_code(),
            counter_code: self.endpoint.counter_code(),
            name: self.name.as_deref(),
            value: self.value,
            k1: self.k1,
            k2: self.k2,
            mode: self.mode,
            timestamp,
        });
        headers.insert(headers::WSB_HMAC, header_value("signature", &signature)?);

        if let Some(name) = &self.name {
            headers.insert(headers::WSB_NAME, header_value("name", name)?);
        }

        tracing::debug!(
            method = %self.method,
            url = %url,
            timestamp = timestamp,
            "Signed request"
        );

        Ok(SignedRequest {
            method: self.method.clone(),
            url,
            headers,
        })
    }
}

fn now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs() as i64)
        .unwrap_or_default()
}

/// Signed text must be printable US-ASCII: the signature is computed over
/// ASCII bytes and the text travels in headers or the path.
fn check_text(field: &str, text: &str) -> Result<()> {
    match text.chars().find(|c| !c.is_ascii() || c.is_ascii_control()) {
        Some(c) => Err(Error::IllegalArguments(format!(
            "the {field} `{}` contains {c:?}, only printable US-ASCII can be signed",
            text.escape_debug()
        ))),
        None => Ok(()),
    }
}

/// `.` and `..` are dropped or resolved by URL path handling, which would
/// address a different resource than the one signed.
fn check_code(code: &str) -> Result<()> {
    if code.is_empty() || code == "." || code == ".." {
        return Err(Error::IllegalArguments(format!(
            "`{code}` cannot be used as a code"
        )));
    }
    check_text("code", code)
}

fn header_value(field: &str, text: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(text)
        .map_err(|e| Error::IllegalArguments(format!("Invalid header value for {field}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "http://services.billmyservices.com";
    const SECRET: &str = "c2VjcmV0LWtleS0xMjM0NTY3ODkw";

    fn credentials() -> Credentials {
        Credentials::new(BASE, "acme-1", SECRET).unwrap()
    }

    #[test]
    fn test_endpoint_urls() {
        let credentials = credentials();

        assert_eq!(
            Endpoint::Account.url(&credentials).unwrap().as_str(),
            format!("{BASE}/acme-1")
        );
        assert_eq!(
            Endpoint::from_parts(Some("T1"), None)
                .unwrap()
                .url(&credentials)
                .unwrap()
                .as_str(),
            format!("{BASE}/acme-1/T1")
        );
        assert_eq!(
            Endpoint::counter("T1", "C1").url(&credentials).unwrap().as_str(),
            format!("{BASE}/acme-1/T1/C1")
        );
    }

    #[test]
    fn test_counter_without_counter_type_is_illegal() {
        let result = Endpoint::from_parts(None, Some("C1"));
        assert!(matches!(result, Err(Error::IllegalArguments(_))));
    }

    #[test]
    fn test_service_url_with_path_prefix() {
        let credentials = Credentials::new("https://example.com/bms/", "acme", SECRET).unwrap();
        let url = Endpoint::counter_type("T1").url(&credentials).unwrap();
        assert_eq!(url.as_str(), "https://example.com/bms/acme/T1");
    }

    #[test]
    fn test_codes_are_path_encoded() {
        let url = Endpoint::counter_type("a b/c").url(&credentials()).unwrap();
        assert_eq!(url.as_str(), format!("{BASE}/acme-1/a%20b%2Fc"));
    }

    #[test]
    fn test_post_counter_headers_and_signature() {
        let request = RequestBuilder::new(Method::POST, Endpoint::counter("T1", "C1"))
            .value(42)
            .timestamp(1_700_000_000)
            .build(&credentials())
            .unwrap();

        assert_eq!(request.method, Method::POST);
        assert_eq!(request.header(headers::WSB_VALUE), Some("42"));
        assert_eq!(request.header(headers::WSB_TIME), Some("1700000000"));
        assert_eq!(request.header(headers::WSB_K1), None);
        assert_eq!(request.header(headers::WSB_K2), None);
        assert_eq!(request.header(headers::WSB_MODE), None);
        assert_eq!(request.header(headers::WSB_NAME), None);
        // HMAC-SHA256 of "acme-1T1C1421700000000"
        assert_eq!(
            request.header(headers::WSB_HMAC),
            Some("TOX+35uHlGoCU+eXnupPxp49FeHUrs7azdefsoY++4E=")
        );
    }

    #[test]
    fn test_every_signed_field_is_sent() {
        let credentials = credentials();
        let request = RequestBuilder::new(Method::PUT, Endpoint::counter_type("T1"))
            .name("Calls")
            .value(0)
            .k1(-5)
            .k2(5)
            .mode(CounterVersion::AbsoluteCounter)
            .timestamp(1_700_000_000)
            .build(&credentials)
            .unwrap();

        assert_eq!(request.header(headers::WSB_NAME), Some("Calls"));
        assert_eq!(request.header(headers::WSB_VALUE), Some("0"));
        assert_eq!(request.header(headers::WSB_K1), Some("-5"));
        assert_eq!(request.header(headers::WSB_K2), Some("5"));
        assert_eq!(request.header(headers::WSB_MODE), Some("AbsoluteCounter"));

        let expected = credentials
            .signer()
            .sign("acme-1T1Calls0-55AbsoluteCounter1700000000");
        assert_eq!(request.header(headers::WSB_HMAC), Some(expected.as_str()));
    }

    #[test]
    fn test_timestamp_defaults_to_now() {
        let before = now();
        let request = RequestBuilder::new(Method::GET, Endpoint::Account)
            .build(&credentials())
            .unwrap();
        let sent: i64 = request.header(headers::WSB_TIME).unwrap().parse().unwrap();
        assert!(sent >= before && sent <= now());
    }

    #[test]
    fn test_unsupported_method_is_rejected() {
        let result = RequestBuilder::new(Method::PATCH, Endpoint::Account).build(&credentials());
        assert!(matches!(result, Err(Error::UnsupportedMethod(m)) if m == Method::PATCH));
    }

    #[test]
    fn test_non_ascii_or_empty_text_is_rejected() {
        let credentials = credentials();

        let result = RequestBuilder::new(Method::GET, Endpoint::counter_type("tipo-ñ")).build(&credentials);
        assert!(matches!(result, Err(Error::IllegalArguments(_))));

        let result = RequestBuilder::new(Method::PUT, Endpoint::counter_type("T1"))
            .name("line\nbreak")
            .build(&credentials);
        assert!(matches!(result, Err(Error::IllegalArguments(_))));

        let result = RequestBuilder::new(Method::GET, Endpoint::counter("T1", "")).build(&credentials);
        assert!(matches!(result, Err(Error::IllegalArguments(_))));
    }

    #[test]
    fn test_dot_segments_are_not_codes() {
        let credentials = credentials();

        for code in [".", ".."] {
            let result = RequestBuilder::new(Method::DELETE, Endpoint::counter_type(code)).build(&credentials);
            assert!(matches!(result, Err(Error::IllegalArguments(_))), "counter type `{code}`");

            let result = RequestBuilder::new(Method::DELETE, Endpoint::counter("T1", code)).build(&credentials);
            assert!(matches!(result, Err(Error::IllegalArguments(_))), "counter `{code}`");

            let endpoint = Endpoint::from_parts(Some(code), None).unwrap();
            assert!(matches!(endpoint.url(&credentials), Err(Error::IllegalArguments(_))));
        }

        // dots inside a code are fine
        let url = Endpoint::counter("T1", "v1..2").url(&credentials).unwrap();
        assert_eq!(url.as_str(), format!("{BASE}/acme-1/T1/v1..2"));
    }

    #[test]
    fn test_invalid_credentials() {
        assert!(matches!(
            Credentials::new("not a url", "acme", SECRET),
            Err(Error::InvalidUrl(_))
        ));
        assert!(matches!(
            Credentials::new("mailto:bms@example.com", "acme", SECRET),
            Err(Error::ConfigurationError(_))
        ));
        assert!(matches!(
            Credentials::new(BASE, "", SECRET),
            Err(Error::ConfigurationError(_))
        ));
        assert!(matches!(
            Credentials::new(BASE, "acme", "%%%"),
            Err(Error::InvalidSecretKey(_))
        ));
    }
}
