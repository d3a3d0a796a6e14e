//! Settings and tenant credentials.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::TokenError;

/// Environment variable overriding [`TokenSettings::base_url`].
pub const ENV_BASE_URL: &str = "TENANTKIT_BASE_URL";
/// Environment variable overriding [`TokenSettings::key_prefix`].
pub const ENV_KEY_PREFIX: &str = "TENANTKIT_KEY_PREFIX";
/// Environment variable overriding [`TokenSettings::safety_margin_secs`].
pub const ENV_SAFETY_MARGIN_SECS: &str = "TENANTKIT_SAFETY_MARGIN_SECS";
/// Environment variable overriding [`TokenSettings::request_timeout_secs`].
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "TENANTKIT_REQUEST_TIMEOUT_SECS";

/// Shared settings for every token provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenSettings {
    /// Base URL of the issuing platform (e.g. `https://qyapi.weixin.qq.com`).
    pub base_url: String,
    /// Namespace prepended to every credential store key.
    pub key_prefix: String,
    /// Seconds subtracted from `expires_in` before caching a token.
    pub safety_margin_secs: u64,
    /// HTTP request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for TokenSettings {
    fn default() -> Self {
        Self {
            base_url: "https://qyapi.weixin.qq.com".to_string(),
            key_prefix: "tenantkit".to_string(),
            safety_margin_secs: 100,
            request_timeout_secs: 10,
        }
    }
}

impl TokenSettings {
    /// Defaults overridden by `TENANTKIT_*` environment variables.
    pub fn from_env() -> Result<Self, TokenError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, TokenError> {
        let mut settings = Self::default();
        if let Some(url) = lookup(ENV_BASE_URL) {
            settings.base_url = url;
        }
        if let Some(prefix) = lookup(ENV_KEY_PREFIX) {
            settings.key_prefix = prefix;
        }
        if let Some(margin) = lookup(ENV_SAFETY_MARGIN_SECS) {
            settings.safety_margin_secs = parse_secs(ENV_SAFETY_MARGIN_SECS, &margin)?;
        }
        if let Some(timeout) = lookup(ENV_REQUEST_TIMEOUT_SECS) {
            settings.request_timeout_secs = parse_secs(ENV_REQUEST_TIMEOUT_SECS, &timeout)?;
        }
        Ok(settings)
    }

    /// Namespaced credential store key.
    pub fn store_key(&self, key: &str) -> String {
        if self.key_prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}:{key}", self.key_prefix)
        }
    }
}

fn parse_secs(name: &str, value: &str) -> Result<u64, TokenError> {
    value
        .trim()
        .parse()
        .map_err(|_| TokenError::Config(format!("{name} must be a number of seconds, got {value:?}")))
}

/// A corp's own application secret (flat token).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpCredentials {
    /// Corp id.
    pub corp_id: String,
    /// Application secret.
    pub corp_secret: String,
    /// Application id, when one corp runs several applications.
    #[serde(default)]
    pub agent_id: Option<String>,
}

/// Service-provider credentials (provider tier).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderCredentials {
    /// Provider corp id.
    pub corp_id: String,
    /// Provider secret.
    pub provider_secret: String,
}

/// Third-party suite credentials (suite tier).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteCredentials {
    /// Suite id.
    pub suite_id: String,
    /// Suite secret.
    pub suite_secret: String,
}

/// A corp's authorization of a suite (corp tier).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpAuthorization {
    /// Suite the corp authorized.
    pub suite_id: String,
    /// Authorizing corp id.
    pub auth_corp_id: String,
    /// Permanent code issued at authorization time.
    pub permanent_code: String,
}

/// A complete configuration document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TenantkitConfig {
    /// Shared settings.
    pub settings: TokenSettings,
    /// Corps using their own application secret.
    pub corps: Vec<CorpCredentials>,
    /// Service providers.
    pub providers: Vec<ProviderCredentials>,
    /// Third-party suites.
    pub suites: Vec<SuiteCredentials>,
    /// Corp authorizations of suites.
    pub authorizations: Vec<CorpAuthorization>,
}

impl TenantkitConfig {
    /// Load a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, TokenError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }

    /// Parse and validate a JSON configuration document.
    pub fn from_json_str(text: &str) -> Result<Self, TokenError> {
        let config: Self = serde_json::from_str(text)
            .map_err(|e| TokenError::Config(format!("invalid configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject empty identifiers and authorizations for unknown suites.
    pub fn validate(&self) -> Result<(), TokenError> {
        let empty = |what: &str| TokenError::Config(format!("{what} must not be empty"));
        for corp in &self.corps {
            if corp.corp_id.is_empty() || corp.corp_secret.is_empty() {
                return Err(empty("corp_id and corp_secret"));
            }
        }
        for provider in &self.providers {
            if provider.corp_id.is_empty() || provider.provider_secret.is_empty() {
                return Err(empty("provider corp_id and provider_secret"));
            }
        }
        for suite in &self.suites {
            if suite.suite_id.is_empty() || suite.suite_secret.is_empty() {
                return Err(empty("suite_id and suite_secret"));
            }
        }
        for auth in &self.authorizations {
            if auth.auth_corp_id.is_empty() || auth.permanent_code.is_empty() {
                return Err(empty("auth_corp_id and permanent_code"));
            }
            if !self.suites.iter().any(|s| s.suite_id == auth.suite_id) {
                return Err(TokenError::Config(format!(
                    "authorization for {} references unknown suite {}",
                    auth.auth_corp_id, auth.suite_id
                )));
            }
        }
        Ok(())
    }

    /// Look up a suite by id.
    pub fn suite(&self, suite_id: &str) -> Option<&SuiteCredentials> {
        self.suites.iter().find(|s| s.suite_id == suite_id)
    }
}
