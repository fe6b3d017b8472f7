//! JWKS endpoint fetching
//!
//! One plain GET per call, no caching here. Caching lives in
//! [`crate::cache::CacheLayer`]; this is the leaf the cascade bottoms out in.

use jsonwebtoken::jwk::JwkSet;
use serde::de::DeserializeOwned;
use tracing::{debug, error, info};

use crate::config::JwksConfig;
use crate::error::{JwksError, JwksResult};
use crate::keys::KeySet;

/// GET `url` and decode a JSON body no larger than `max_size` bytes
///
/// Failures are returned as plain strings; callers attach the endpoint kind.
pub(crate) async fn get_json<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
    max_size: usize,
) -> Result<T, String> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| format!("Request failed: {e}"))?;

    if !response.status().is_success() {
        return Err(format!(
            "HTTP {} {}",
            response.status().as_u16(),
            response.status().canonical_reason().unwrap_or("Unknown")
        ));
    }

    if let Some(content_length) = response.content_length()
        && content_length > max_size as u64
    {
        return Err(format!("Response size {content_length} exceeds {max_size} bytes"));
    }

    let body = response
        .bytes()
        .await
        .map_err(|e| format!("Failed to read response: {e}"))?;

    if body.len() > max_size {
        return Err(format!("Response size {} exceeds {max_size} bytes", body.len()));
    }

    serde_json::from_slice(&body).map_err(|e| format!("Invalid JSON: {e}"))
}

/// Fetches JWKS documents
#[derive(Debug, Clone)]
pub struct KeySetFetcher {
    client: reqwest::Client,
    max_response_size: usize,
}

impl KeySetFetcher {
    /// Create a fetcher with its own HTTP client
    ///
    /// # Errors
    ///
    /// Returns [`JwksError::HttpClient`] if the client cannot be built.
    pub fn new(config: &JwksConfig) -> JwksResult<Self> {
        Ok(Self::with_client(config.http_client()?, config))
    }

    /// Create a fetcher around an existing HTTP client
    pub fn with_client(client: reqwest::Client, config: &JwksConfig) -> Self {
        Self {
            client,
            max_response_size: config.max_response_size,
        }
    }

    /// Fetch and parse the JWKS published at `jwks_url`
    ///
    /// # Errors
    ///
    /// Returns [`JwksError::Fetch`] if the endpoint is unreachable, answers
    /// with a non-success status, or the body is not a JWK set.
    pub async fn fetch(&self, jwks_url: &str) -> JwksResult<KeySet> {
        info!(jwks_url = %jwks_url, "Fetching JWKS from endpoint");

        let jwks: JwkSet = get_json(&self.client, jwks_url, self.max_response_size)
            .await
            .map_err(|reason| {
                error!(jwks_url = %jwks_url, error = %reason, "Failed to fetch JWKS");
                JwksError::Fetch {
                    url: jwks_url.to_string(),
                    reason,
                }
            })?;

        debug!(
            jwks_url = %jwks_url,
            key_count = jwks.keys.len(),
            "Successfully fetched JWKS"
        );

        Ok(KeySet::new(jwks_url, jwks))
    }
}
