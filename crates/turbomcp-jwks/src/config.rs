//! Resolver configuration types

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{JwksError, JwksResult};

/// Static association between an issuer and where its keys live
///
/// At most one of `discovery_url` / `jwks_url` is normally set. When both are
/// absent the issuer is only pre-declared and resolves through live discovery.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderEntry {
    /// Issuer (`iss` claim value) this entry applies to
    #[serde(default)]
    pub issuer: String,
    /// OpenID discovery document URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discovery_url: Option<String>,
    /// JWKS endpoint URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jwks_url: Option<String>,
}

impl ProviderEntry {
    /// Entry resolving `issuer` straight from a JWKS endpoint
    pub fn with_jwks_url(issuer: impl Into<String>, jwks_url: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            discovery_url: None,
            jwks_url: Some(jwks_url.into()),
        }
    }

    /// Entry resolving `issuer` through a fixed discovery document
    pub fn with_discovery_url(issuer: impl Into<String>, discovery_url: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            discovery_url: Some(discovery_url.into()),
            jwks_url: None,
        }
    }

    /// Entry that only pre-declares `issuer`
    pub fn issuer_only(issuer: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            discovery_url: None,
            jwks_url: None,
        }
    }
}

/// Longest accepted refresh period: one year
pub const MAX_REFRESH_INTERVAL_SECS: u64 = 365 * 24 * 60 * 60;

/// JWKS cache configuration
///
/// All fields have defaults, so an empty TOML/JSON document is a valid config.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JwksConfig {
    /// Timeout for a whole HTTP request in seconds (default: 10)
    pub request_timeout_secs: u64,
    /// Connect timeout in seconds (default: 5)
    pub connect_timeout_secs: u64,
    /// Maximum discovery/JWKS body size in bytes (default: 256 KiB)
    pub max_response_size: usize,
    /// Full refresh period in seconds (default: 24 hours)
    pub refresh_interval_secs: u64,
    /// User agent sent with every request
    pub user_agent: String,
    /// Statically configured providers
    pub providers: Vec<ProviderEntry>,
}

impl Default for JwksConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 10,
            connect_timeout_secs: 5,
            max_response_size: 256 * 1024,
            refresh_interval_secs: 24 * 60 * 60,
            user_agent: format!("turbomcp-jwks/{}", env!("CARGO_PKG_VERSION")),
            providers: Vec::new(),
        }
    }
}

impl JwksConfig {
    /// Request timeout as a [`Duration`]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Connect timeout as a [`Duration`]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Refresh period as a [`Duration`]
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    /// Reject settings that would disable timeouts or spin the refresh loop
    ///
    /// # Errors
    ///
    /// Returns [`JwksError::Scheduling`] for a zero refresh interval or one
    /// above [`MAX_REFRESH_INTERVAL_SECS`], and [`JwksError::HttpClient`] for
    /// zero timeouts or body limit.
    pub fn validate(&self) -> JwksResult<()> {
        if self.refresh_interval_secs == 0 {
            return Err(JwksError::Scheduling(
                "refresh interval must be greater than zero".to_string(),
            ));
        }
        if self.refresh_interval_secs > MAX_REFRESH_INTERVAL_SECS {
            return Err(JwksError::Scheduling(format!(
                "refresh interval of {}s exceeds the maximum of {MAX_REFRESH_INTERVAL_SECS}s",
                self.refresh_interval_secs
            )));
        }
        if self.request_timeout_secs == 0 || self.connect_timeout_secs == 0 {
            return Err(JwksError::HttpClient(
                "timeouts must be greater than zero".to_string(),
            ));
        }
        if self.max_response_size == 0 {
            return Err(JwksError::HttpClient(
                "max_response_size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Build the shared HTTP client for discovery and JWKS requests
    ///
    /// Redirects are not followed; a 3xx response fails the request.
    ///
    /// # Errors
    ///
    /// Returns [`JwksError::HttpClient`] if reqwest cannot build the client.
    pub fn http_client(&self) -> JwksResult<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(self.request_timeout())
            .connect_timeout(self.connect_timeout())
            .user_agent(&self.user_agent)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| JwksError::HttpClient(e.to_string()))
    }
}
