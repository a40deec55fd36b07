//! The Bill My Services client.
//!
//! The [`Client`] type is the main entry point. Use [`ClientBuilder`] to
//! configure and create clients, or [`Client::from_env`] to read the standard
//! settings.

use crate::{
    config::{Config, DEFAULT_SERVICE_URL, SETTING_ACCOUNT_ID, SETTING_SECRET_KEY},
    model::{Counter, CounterType, CounterTypeAndCounters},
    request::{Credentials, Endpoint, RequestBuilder, SignedRequest},
    response::{confirm_status, decode, with_status, RawResponse},
    signer::Signer,
    transport::{ReqwestTransport, Transport},
    Error, Outcome, Result,
};
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use std::future::Future;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use url::Url;

/// A non-blocking, thread safe Bill My Services client.
///
/// Every operation signs its request right away and returns a future that
/// performs the HTTP exchange. Problems with the call itself (an illegal code,
/// for instance) are returned as an [`Error`] before anything is sent; anything
/// that happens once the request is out, including network errors and
/// rejections by the service, resolves to an [`Outcome::Failure`].
///
/// The client is cheap to clone and can be shared between tasks and threads.
///
/// # Examples
///
/// ```no_run
/// use billmyservices::{Client, CounterType, CounterVersion};
///
/// # async fn example() -> Result<(), billmyservices::Error> {
/// let client = Client::builder()
///     .account_id("acme")
///     .secret_key("c2VjcmV0LWtleS0xMjM0NTY3ODkw")
///     .build()?;
///
/// let calls = CounterType::new("api-calls", "API calls", 0, 0, 1000, CounterVersion::AbsoluteCounter);
/// assert!(client.add_counter_type(&calls)?.await.is_success());
///
/// let accepted = client.post_counter("api-calls", "customer-42", 1)?.await;
/// if let Some(reason) = accepted.failure_message() {
///     eprintln!("rejected: {reason}");
/// }
/// # Ok(())
/// # }
/// ```
pub struct Client<T: Transport = ReqwestTransport> {
    inner: Arc<ClientInner<T>>,
}

struct ClientInner<T> {
    transport: T,
    credentials: Credentials,
}

impl<T: Transport> Clone for Client<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Client {
    /// Creates a new `ClientBuilder` for configuring a client.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Creates a client from an explicit [`Config`].
    ///
    /// # Errors
    ///
    /// Returns an error if the URL or the secret key is invalid.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::builder().config(config)?.build()
    }

    /// Creates a client from the `BILLMYSERVICES_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or invalid.
    pub fn from_env() -> Result<Self> {
        Self::from_config(&Config::from_env()?)
    }
}

impl<T: Transport> Client<T> {
    /// Creates a client that sends its requests through `transport`.
    pub fn with_transport(credentials: Credentials, transport: T) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                transport,
                credentials,
            }),
        }
    }

    /// Returns the transport requests are sent through.
    pub fn transport(&self) -> &T {
        &self.inner.transport
    }

    pub fn account_id(&self) -> &str {
        self.inner.credentials.account_id()
    }

    pub fn service_url(&self) -> &Url {
        self.inner.credentials.service_url()
    }

    /// Lists all of the account's counter types.
    ///
    /// # Errors
    ///
    /// This call has no parameters to reject; the `Result` keeps the shape of
    /// every operation the same.
    pub fn list_counter_types(
        &self,
    ) -> Result<impl Future<Output = Outcome<Vec<CounterType>>> + Send + 'static> {
        let request = RequestBuilder::new(Method::GET, Endpoint::Account).build(&self.inner.credentials)?;
        Ok(self.dispatch(request, |response| {
            with_status(StatusCode::OK, response, decode::<Vec<CounterType>>)
        }))
    }

    /// Adds a counter type, or replaces the one with the same code.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IllegalArguments`] if the code or name cannot be
    /// signed.
    pub fn add_counter_type(
        &self,
        counter_type: &CounterType,
    ) -> Result<impl Future<Output = Outcome<bool>> + Send + 'static> {
        let request = RequestBuilder::new(Method::PUT, Endpoint::counter_type(counter_type.code()))
            .name(counter_type.name())
            .value(counter_type.default_value())
            .k1(counter_type.k1())
            .k2(counter_type.k2())
            .mode(counter_type.version())
            .build(&self.inner.credentials)?;
        Ok(self.dispatch(request, |response| confirm_status(StatusCode::OK, response)))
    }

    /// Reads one counter type together with all of its counters.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IllegalArguments`] if the code is empty or cannot be
    /// signed.
    pub fn read_counter_type(
        &self,
        counter_type_code: &str,
    ) -> Result<impl Future<Output = Outcome<CounterTypeAndCounters>> + Send + 'static> {
        let request = RequestBuilder::new(Method::GET, Endpoint::counter_type(counter_type_code))
            .build(&self.inner.credentials)?;
        Ok(self.dispatch(request, |response| {
            with_status(StatusCode::OK, response, decode::<CounterTypeAndCounters>)
        }))
    }

    /// Deletes a counter type.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IllegalArguments`] if the code is empty or cannot be
    /// signed.
    pub fn delete_counter_type(
        &self,
        counter_type_code: &str,
    ) -> Result<impl Future<Output = Outcome<bool>> + Send + 'static> {
        let request = RequestBuilder::new(Method::DELETE, Endpoint::counter_type(counter_type_code))
            .build(&self.inner.credentials)?;
        Ok(self.dispatch(request, |response| confirm_status(StatusCode::OK, response)))
    }

    /// Reads one counter. A counter that was never posted to comes back with
    /// its counter type's default value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IllegalArguments`] if a code is empty or cannot be
    /// signed.
    pub fn read_counter(
        &self,
        counter_type_code: &str,
        counter_code: &str,
    ) -> Result<impl Future<Output = Outcome<Counter>> + Send + 'static> {
        let request = RequestBuilder::new(Method::GET, Endpoint::counter(counter_type_code, counter_code))
            .build(&self.inner.credentials)?;
        Ok(self.dispatch(request, |response| {
            with_status(StatusCode::OK, response, decode::<Counter>)
        }))
    }

    /// Adds `value_delta` to a counter.
    ///
    /// A delta the service refuses (for instance one that would take an
    /// absolute counter out of `[k1, k2]`) resolves to a failure whose message
    /// carries the status and body the service answered with.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IllegalArguments`] if a code is empty or cannot be
    /// signed.
    pub fn post_counter(
        &self,
        counter_type_code: &str,
        counter_code: &str,
        value_delta: i64,
    ) -> Result<impl Future<Output = Outcome<bool>> + Send + 'static> {
        let request = RequestBuilder::new(Method::POST, Endpoint::counter(counter_type_code, counter_code))
            .value(value_delta)
            .build(&self.inner.credentials)?;
        Ok(self.dispatch(request, |response| confirm_status(StatusCode::OK, response)))
    }

    /// Resets a counter to its counter type's default value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IllegalArguments`] if a code is empty or cannot be
    /// signed.
    pub fn reset_counter(
        &self,
        counter_type_code: &str,
        counter_code: &str,
    ) -> Result<impl Future<Output = Outcome<bool>> + Send + 'static> {
        let request = RequestBuilder::new(Method::DELETE, Endpoint::counter(counter_type_code, counter_code))
            .build(&self.inner.credentials)?;
        Ok(self.dispatch(request, |response| confirm_status(StatusCode::OK, response)))
    }

    /// Sends a signed request and maps whatever comes back into an outcome.
    fn dispatch<R, F>(
        &self,
        request: SignedRequest,
        map_response: F,
    ) -> impl Future<Output = Outcome<R>> + Send + 'static
    where
        R: Send + 'static,
        F: FnOnce(&RawResponse) -> Outcome<R> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);

        async move {
            let method = request.method.clone();
            let url = request.url.clone();

            match inner.transport.execute(request).await {
                Ok(response) => map_response(&response),
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        method = %method,
                        url = %url,
                        "Request failed"
                    );
                    Outcome::failure(e)
                }
            }
        }
    }
}

/// Builder for configuring and creating a [`Client`].
///
/// # Examples
///
/// ```no_run
/// use billmyservices::ClientBuilder;
/// use std::time::Duration;
///
/// # fn example() -> Result<(), billmyservices::Error> {
/// let client = ClientBuilder::new()
///     .service_url("https://bms.internal.example.com")?
///     .account_id("acme")
///     .secret_key("c2VjcmV0LWtleS0xMjM0NTY3ODkw")
///     .timeout(Duration::from_secs(5))
///     .default_header("User-Agent", "billing-worker/1.0")?
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct ClientBuilder {
    service_url: Option<Url>,
    account_id: Option<String>,
    secret_key: Option<String>,
    default_headers: HeaderMap,
    timeout: Option<Duration>,
    http_client: Option<reqwest::Client>,
}

impl ClientBuilder {
    /// Creates a new `ClientBuilder` pointing at the public service.
    pub fn new() -> Self {
        Self {
            service_url: None,
            account_id: None,
            secret_key: None,
            default_headers: HeaderMap::new(),
            timeout: None,
            http_client: None,
        }
    }

    /// Takes the URL, account id and secret key from `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn config(self, config: &Config) -> Result<Self> {
        Ok(self
            .service_url(&config.service_url)?
            .account_id(&config.account_id)
            .secret_key(&config.secret_key))
    }

    /// Sets the service URL. Defaults to `http://services.billmyservices.com`.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn service_url(mut self, url: impl AsRef<str>) -> Result<Self> {
        self.service_url = Some(Url::parse(url.as_ref())?);
        Ok(self)
    }

    /// Sets the account (user profile) id.
    pub fn account_id(mut self, account_id: impl Into<String>) -> Self {
        self.account_id = Some(account_id.into());
        self
    }

    /// Sets the base64 encoded secret key.
    pub fn secret_key(mut self, secret_key: impl Into<String>) -> Self {
        self.secret_key = Some(secret_key.into());
        self
    }

    /// Adds a default header sent with every request.
    ///
    /// Ignored when a custom `reqwest::Client` is supplied.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn default_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<Self> {
        let name = HeaderName::try_from(name.as_ref())
            .map_err(|e| Error::ConfigurationError(format!("Invalid header name: {}", e)))?;
        let value = HeaderValue::try_from(value.as_ref())
            .map_err(|e| Error::ConfigurationError(format!("Invalid header value: {}", e)))?;
        self.default_headers.insert(name, value);
        Ok(self)
    }

    /// Sets the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Uses an existing `reqwest::Client`, for instance to share its
    /// connection pool.
    pub fn http_client(mut self, http_client: reqwest::Client) -> Self {
        self.http_client = Some(http_client);
        self
    }

    /// Builds a client backed by `reqwest`.
    ///
    /// # Errors
    ///
    /// Returns an error if the account id or secret key is missing or invalid,
    /// or if the HTTP client cannot be built.
    pub fn build(mut self) -> Result<Client> {
        let credentials = self.credentials()?;

        let http_client = match self.http_client.take() {
            Some(http_client) => http_client,
            None => reqwest::Client::builder()
                .default_headers(std::mem::take(&mut self.default_headers))
                .build()
                .map_err(|e| {
                    Error::ConfigurationError(format!("Failed to build HTTP client: {}", e))
                })?,
        };

        let mut transport = ReqwestTransport::new(http_client);
        if let Some(timeout) = self.timeout {
            transport = transport.with_timeout(timeout);
        }

        Ok(Client::with_transport(credentials, transport))
    }

    /// Builds a client that sends its requests through `transport`.
    ///
    /// Timeout, default headers and `reqwest` client settings do not apply.
    ///
    /// # Errors
    ///
    /// Returns an error if the account id or secret key is missing or invalid.
    pub fn build_with_transport<T: Transport>(self, transport: T) -> Result<Client<T>> {
        Ok(Client::with_transport(self.credentials()?, transport))
    }

    fn credentials(&self) -> Result<Credentials> {
        let account_id = self
            .account_id
            .clone()
            .ok_or(Error::MissingSetting(SETTING_ACCOUNT_ID))?;
        let secret_key = self
            .secret_key
            .as_deref()
            .ok_or(Error::MissingSetting(SETTING_SECRET_KEY))?;
        let service_url = match &self.service_url {
            Some(url) => url.clone(),
            None => Url::parse(DEFAULT_SERVICE_URL)?,
        };

        Credentials::with_signer(service_url, account_id, Signer::from_base64(secret_key)?)
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

static DEFAULT_CLIENT: OnceLock<Client> = OnceLock::new();

/// Returns the process-wide client, building it from the environment on first
/// use (see [`Client::from_env`]).
///
/// Nothing in this crate depends on it; explicitly constructed clients are
/// preferred wherever they can be passed around.
///
/// # Errors
///
/// Returns the configuration error if the client has not been installed and
/// cannot be built from the environment.
pub fn default_client() -> Result<&'static Client> {
    if let Some(client) = DEFAULT_CLIENT.get() {
        return Ok(client);
    }
    let client = Client::from_env()?;
    Ok(DEFAULT_CLIENT.get_or_init(|| client))
}

/// Installs `client` as the process-wide client.
///
/// # Errors
///
/// Gives the client back if one was already installed or built.
pub fn install_default(client: Client) -> std::result::Result<(), Client> {
    DEFAULT_CLIENT.set(client)
}
