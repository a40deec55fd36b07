//! Request authentication.
//!
//! The service authenticates a request by rebuilding a canonical string from
//! the request it received and comparing its HMAC-SHA256 with the `wsb-hmac`
//! header. The canonical string is the plain concatenation of the fields that
//! are present, in a fixed order, with no separators. Field order, the absence
//! of delimiters and decimal number formatting must all match the service
//! exactly.

use crate::{model::CounterVersion, Error, Result};
use base64::{
    alphabet,
    engine::{general_purpose::STANDARD, DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
    Engine as _,
};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::fmt;

type HmacSha256 = Hmac<Sha256>;

/// Standard alphabet, padding optional. Keys are often handed around with the
/// trailing `=` stripped.
const KEY_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// The fields of a request that take part in its signature.
///
/// Absent fields contribute nothing to the canonical string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CanonicalFields<'a> {
    pub account_id: &'a str,
    pub counter_type_code: Option<&'a str>,
    pub counter_code: Option<&'a str>,
    pub name: Option<&'a str>,
    pub value: Option<i64>,
    pub k1: Option<i64>,
    pub k2: Option<i64>,
    pub mode: Option<CounterVersion>,
    /// Seconds since the UNIX epoch.
    pub timestamp: i64,
}

/// Builds the canonical string for `fields`.
///
/// # Examples
///
/// ```
/// use billmyservices::signer::{canonicalize, CanonicalFields};
///
/// let fields = CanonicalFields {
///     account_id: "acme",
///     counter_type_code: Some("T1"),
///     value: Some(-3),
///     timestamp: 1_700_000_000,
///     ..Default::default()
/// };
///
/// assert_eq!(canonicalize(&fields), "acmeT1-31700000000");
/// ```
pub fn canonicalize(fields: &CanonicalFields<'_>) -> String {
    let value = fields.value.map(|v| v.to_string());
    let k1 = fields.k1.map(|v| v.to_string());
    let k2 = fields.k2.map(|v| v.to_string());
    let timestamp = fields.timestamp.to_string();

    let parts = [
        Some(fields.account_id),
        fields.counter_type_code,
        fields.counter_code,
        fields.name,
        value.as_deref(),
        k1.as_deref(),
        k2.as_deref(),
        fields.mode.map(|m| m.as_str()),
        Some(timestamp.as_str()),
    ];

    parts.into_iter().flatten().collect()
}

/// Produces `wsb-hmac` signatures with the account secret key.
///
/// The keyed MAC is prepared once; every call to [`sign`](Signer::sign) works
/// on its own copy, so a `Signer` can be shared between threads.
#[derive(Clone)]
pub struct Signer {
    mac: HmacSha256,
}

impl Signer {
    /// Creates a signer from the raw secret key bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSecretKey`] if the key is empty.
    pub fn new(key: &[u8]) -> Result<Self> {
        if key.is_empty() {
            return Err(Error::InvalidSecretKey("the secret key is empty".to_string()));
        }
        let mac = HmacSha256::new_from_slice(key)
            .map_err(|e| Error::InvalidSecretKey(e.to_string()))?;
        Ok(Self { mac })
    }

    /// Creates a signer from a base64 encoded secret key, the form in which
    /// the service hands keys out.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSecretKey`] if `secret_key` is not valid base64
    /// or decodes to nothing.
    pub fn from_base64(secret_key: &str) -> Result<Self> {
        let key = KEY_ENGINE
            .decode(secret_key.trim())
            .map_err(|e| Error::InvalidSecretKey(e.to_string()))?;
        Self::new(&key)
    }

    /// Signs a canonical string, returning the base64 encoded HMAC-SHA256.
    ///
    /// The canonical string is expected to be US-ASCII.
    pub fn sign(&self, canonical: &str) -> String {
        let mut mac = self.mac.clone();
        mac.update(canonical.as_bytes());
        STANDARD.encode(mac.finalize().into_bytes())
    }

    /// Canonicalizes and signs `fields` in one go.
    pub fn sign_fields(&self, fields: &CanonicalFields<'_>) -> String {
        self.sign(&canonicalize(fields))
    }
}

impl fmt::Debug for Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signer").finish_non_exhaustive()
    }
}
