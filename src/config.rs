//! Where the service URL, account id and secret key come from.

use crate::{Error, Result};
use std::fmt;

/// The public Bill My Services endpoint.
pub const DEFAULT_SERVICE_URL: &str = "http://services.billmyservices.com";

/// Setting holding the service URL.
pub const SETTING_URL: &str = "billmyservices_url";
/// Setting holding the account (user profile) id.
pub const SETTING_ACCOUNT_ID: &str = "billmyservices_userid";
/// Setting holding the base64 encoded secret key.
pub const SETTING_SECRET_KEY: &str = "billmyservices_secretkey";

/// Connection settings for one account.
///
/// # Examples
///
/// ```
/// use billmyservices::Config;
///
/// let config = Config::from_lookup(|key| match key {
///     "BILLMYSERVICES_USERID" => Some("acme".to_string()),
///     "BILLMYSERVICES_SECRETKEY" => Some("SmVmZQ==".to_string()),
///     _ => None,
/// })?;
///
/// assert_eq!(config.service_url, "http://services.billmyservices.com");
/// assert_eq!(config.account_id, "acme");
/// # Ok::<(), billmyservices::Error>(())
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Config {
    pub service_url: String,
    pub account_id: String,
    /// Base64 encoded, as handed out by the service.
    pub secret_key: String,
}

impl Config {
    /// Creates a config for the public service endpoint.
    pub fn new(account_id: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            service_url: DEFAULT_SERVICE_URL.to_string(),
            account_id: account_id.into(),
            secret_key: secret_key.into(),
        }
    }

    /// Reads the config from the environment: `BILLMYSERVICES_URL` (optional),
    /// `BILLMYSERVICES_USERID` and `BILLMYSERVICES_SECRETKEY`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingSetting`] if the account id or the secret key is
    /// not set.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the config through `lookup`.
    ///
    /// Each setting is looked up first by its lowercase name (e.g.
    /// `billmyservices_userid`), then by its uppercase environment name. The
    /// URL falls back to [`DEFAULT_SERVICE_URL`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingSetting`] if the account id or the secret key
    /// cannot be found.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let setting = |key: &str| {
            lookup(key.to_lowercase().as_str()).or_else(|| lookup(key.to_uppercase().as_str()))
        };
        let required = |key: &'static str| setting(key).ok_or(Error::MissingSetting(key));

        Ok(Self {
            service_url: setting(SETTING_URL).unwrap_or_else(|| DEFAULT_SERVICE_URL.to_string()),
            account_id: required(SETTING_ACCOUNT_ID)?,
            secret_key: required(SETTING_SECRET_KEY)?,
        })
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("service_url", &self.service_url)
            .field("account_id", &self.account_id)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_in(settings: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let settings: HashMap<String, String> = settings
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| settings.get(key).cloned()
    }

    #[test]
    fn test_defaults_url_when_absent() {
        let config = Config::from_lookup(lookup_in(&[
            ("BILLMYSERVICES_USERID", "acme"),
            ("BILLMYSERVICES_SECRETKEY", "SmVmZQ=="),
        ]))
        .unwrap();

        assert_eq!(config, Config::new("acme", "SmVmZQ=="));
    }

    #[test]
    fn test_lowercase_setting_wins_over_environment_name() {
        let config = Config::from_lookup(lookup_in(&[
            ("billmyservices_url", "http://localhost:8080"),
            ("BILLMYSERVICES_URL", "http://ignored"),
            ("billmyservices_userid", "from-setting"),
            ("BILLMYSERVICES_USERID", "from-env"),
            ("BILLMYSERVICES_SECRETKEY", "SmVmZQ=="),
        ]))
        .unwrap();

        assert_eq!(config.service_url, "http://localhost:8080");
        assert_eq!(config.account_id, "from-setting");
    }

    #[test]
    fn test_missing_required_settings() {
        let result = Config::from_lookup(lookup_in(&[("BILLMYSERVICES_SECRETKEY", "SmVmZQ==")]));
        assert!(matches!(result, Err(Error::MissingSetting(SETTING_ACCOUNT_ID))));

        let result = Config::from_lookup(lookup_in(&[("BILLMYSERVICES_USERID", "acme")]));
        assert!(matches!(result, Err(Error::MissingSetting(SETTING_SECRET_KEY))));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let debug = format!("{:?}", Config::new("acme", "SmVmZQ=="));
        assert!(debug.contains("acme"));
        assert!(!debug.contains("SmVmZQ=="));
    }
}
