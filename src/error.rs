//! Error types for client construction and request preparation.
//!
//! Only problems a caller cannot recover from at runtime are reported as an
//! [`Error`]: bad configuration, illegal parameter combinations and transport
//! faults surfaced by a [`Transport`](crate::Transport). Anything the service
//! answers (an unexpected status, a body that does not decode) is reported as
//! an [`Outcome::Failure`](crate::Outcome::Failure) instead.

use http::Method;

/// The error type for configuration, contract and transport failures.
///
/// # Examples
///
/// ```
/// use billmyservices::{Client, Error};
///
/// let result = Client::builder()
///     .account_id("acme")
///     .secret_key("not base64!")
///     .build();
///
/// assert!(matches!(result, Err(Error::InvalidSecretKey(_))));
/// ```
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A network-level error occurred (connection refused, DNS, timeout, ...).
    ///
    /// Only transports produce this variant. The client turns it into a
    /// failed [`Outcome`](crate::Outcome) so it never escapes an operation.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// A required setting was not provided.
    #[error("Bill My Services configuration error, no settings found for the `{0}` value")]
    MissingSetting(&'static str),

    /// The secret key is not valid base64 or is empty.
    #[error("Invalid secret key: {0}")]
    InvalidSecretKey(String),

    /// Invalid configuration was provided.
    ///
    /// Covers things like an unusable account id or invalid default headers.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// The service URL could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The request parameters break the API contract.
    ///
    /// For instance a counter code without a counter type code, or a code
    /// that cannot be signed as US-ASCII.
    #[error("Illegal arguments: {0}")]
    IllegalArguments(String),

    /// The service only understands GET, POST, PUT and DELETE.
    #[error("The http method `{0}` is not supported")]
    UnsupportedMethod(Method),
}

impl Error {
    /// Returns `true` for errors raised while building a client.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::MissingSetting(_)
                | Error::InvalidSecretKey(_)
                | Error::ConfigurationError(_)
                | Error::InvalidUrl(_)
        )
    }

    /// Returns `true` for errors caused by an illegal call, raised before any
    /// network activity.
    pub fn is_contract(&self) -> bool {
        matches!(
            self,
            Error::IllegalArguments(_) | Error::UnsupportedMethod(_)
        )
    }
}

/// A specialized `Result` type for fallible client setup.
///
/// This is a convenience alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
