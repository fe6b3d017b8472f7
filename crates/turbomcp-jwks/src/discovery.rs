//! # OpenID Connect Discovery
//!
//! Maps an issuer to its discovery document URL and reads the `jwks_uri`
//! the document advertises.
//!
//! The discovery URL is the issuer with `.well-known/openid-configuration`
//! appended, keeping any issuer path (OpenID Connect Discovery 1.0 §4):
//!
//! ```rust
//! use turbomcp_jwks::discovery::discovery_url;
//!
//! let url = discovery_url("accounts.google.com/").unwrap();
//! assert_eq!(url.as_str(), "https://accounts.google.com/.well-known/openid-configuration");
//! ```

use serde::Deserialize;
use tracing::{debug, error, info};
use url::Url;

use crate::config::JwksConfig;
use crate::error::{JwksError, JwksResult};
use crate::fetch::get_json;

/// Path appended to an issuer to locate its discovery document
pub const WELL_KNOWN_PATH: &str = ".well-known/openid-configuration";

/// Derive the discovery document URL for `issuer`
///
/// A `/` separator is inserted unless the issuer already ends with one, and
/// an issuer without a scheme defaults to `https`.
///
/// # Errors
///
/// Returns [`JwksError::InvalidUrl`] if the result is not an http(s) URL.
pub fn discovery_url(issuer: &str) -> JwksResult<Url> {
    let issuer = issuer.trim();
    if issuer.is_empty() {
        return Err(JwksError::InvalidUrl {
            url: issuer.to_string(),
            reason: "issuer is empty".to_string(),
        });
    }

    let joined = if issuer.ends_with('/') {
        format!("{issuer}{WELL_KNOWN_PATH}")
    } else {
        format!("{issuer}/{WELL_KNOWN_PATH}")
    };

    let candidate = if joined.contains("://") {
        joined
    } else {
        format!("https://{joined}")
    };

    let url = Url::parse(&candidate).map_err(|e| JwksError::InvalidUrl {
        url: issuer.to_string(),
        reason: e.to_string(),
    })?;

    match url.scheme() {
        "https" | "http" => Ok(url),
        other => Err(JwksError::InvalidUrl {
            url: issuer.to_string(),
            reason: format!("unsupported scheme '{other}'"),
        }),
    }
}

/// The one discovery field this crate needs
///
/// Everything else in the document is ignored. `jwks_uri` is kept as a raw
/// value so a non-string entry is reported as malformed rather than as a
/// decode failure.
#[derive(Debug, Deserialize)]
struct OidcDiscoveryDocument {
    #[serde(default)]
    jwks_uri: Option<serde_json::Value>,
}

/// Resolves discovery documents to JWKS URLs
#[derive(Debug, Clone)]
pub struct DiscoveryResolver {
    client: reqwest::Client,
    max_response_size: usize,
}

impl DiscoveryResolver {
    /// Create a resolver with its own HTTP client
    ///
    /// # Errors
    ///
    /// Returns [`JwksError::HttpClient`] if the client cannot be built.
    pub fn new(config: &JwksConfig) -> JwksResult<Self> {
        Ok(Self::with_client(config.http_client()?, config))
    }

    /// Create a resolver around an existing HTTP client
    pub fn with_client(client: reqwest::Client, config: &JwksConfig) -> Self {
        Self {
            client,
            max_response_size: config.max_response_size,
        }
    }

    /// Fetch the discovery document at `discovery_url` and return its `jwks_uri`
    ///
    /// # Errors
    ///
    /// - [`JwksError::DiscoveryFetch`] on transport, status or JSON failure
    /// - [`JwksError::MalformedDiscoveryDocument`] if `jwks_uri` is absent or not a string
    pub async fn jwks_url(&self, discovery_url: &str) -> JwksResult<String> {
        debug!(discovery_url = %discovery_url, "Fetching OpenID discovery document");

        let document: OidcDiscoveryDocument =
            get_json(&self.client, discovery_url, self.max_response_size)
                .await
                .map_err(|reason| {
                    error!(
                        discovery_url = %discovery_url,
                        error = %reason,
                        "Failed to fetch discovery document"
                    );
                    JwksError::DiscoveryFetch {
                        url: discovery_url.to_string(),
                        reason,
                    }
                })?;

        match document.jwks_uri {
            Some(serde_json::Value::String(jwks_uri)) if !jwks_uri.is_empty() => {
                info!(
                    discovery_url = %discovery_url,
                    jwks_uri = %jwks_uri,
                    "Discovered JWKS URI"
                );
                Ok(jwks_uri)
            }
            _ => Err(JwksError::MalformedDiscoveryDocument {
                url: discovery_url.to_string(),
            }),
        }
    }

    /// Derive the discovery URL for `issuer` and return the `jwks_uri` it advertises
    ///
    /// # Errors
    ///
    /// Same as [`discovery_url`] and [`DiscoveryResolver::jwks_url`].
    pub async fn jwks_url_for_issuer(&self, issuer: &str) -> JwksResult<String> {
        let url = discovery_url(issuer)?;
        self.jwks_url(url.as_str()).await
    }
}
