//! Error types for key resolution
//!
//! Every failure on the resolution path surfaces as a [`JwksError`]. The
//! variants are grouped by [`ErrorCategory`] so callers can tell a discovery
//! failure from a JWKS fetch failure from a key lookup failure without
//! matching on every variant.

use std::fmt;
use thiserror::Error;

/// Key resolution errors
#[derive(Debug, Error)]
pub enum JwksError {
    /// Token header carries no string `kid`
    #[error("Token header has no kid (key ID)")]
    MissingKeyId,

    /// Token payload carries no string `iss` claim
    #[error("Token has no iss (issuer) claim")]
    MissingIssuerClaim,

    /// Token is not a decodable compact JWT
    #[error("Malformed token: {0}")]
    MalformedToken(String),

    /// Issuer or endpoint could not be turned into a URL
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl {
        /// The offending input
        url: String,
        /// Why it was rejected
        reason: String,
    },

    /// Discovery document could not be fetched or decoded
    #[error("Failed to fetch discovery document from {url}: {reason}")]
    DiscoveryFetch {
        /// Discovery document URL
        url: String,
        /// Transport or decode failure
        reason: String,
    },

    /// Discovery document has no string `jwks_uri`
    #[error("Discovery document at {url} has no string jwks_uri")]
    MalformedDiscoveryDocument {
        /// Discovery document URL
        url: String,
    },

    /// JWKS endpoint unreachable or returned an unparsable body
    #[error("Failed to fetch JWKS from {url}: {reason}")]
    Fetch {
        /// JWKS endpoint URL
        url: String,
        /// Transport or decode failure
        reason: String,
    },

    /// Key ID still absent after the cached set was invalidated and refetched
    #[error("Key '{kid}' not found in JWKS from {jwks_url}")]
    KeyNotFound {
        /// Requested key ID
        kid: String,
        /// Endpoint the final key set came from
        jwks_url: String,
    },

    /// More than one key in the set carries the requested key ID
    #[error("Key '{kid}' matches {count} keys in JWKS from {jwks_url}")]
    AmbiguousKey {
        /// Requested key ID
        kid: String,
        /// Number of matching keys
        count: usize,
        /// Endpoint the key set came from
        jwks_url: String,
    },

    /// JWK fields could not be materialized into a public key
    #[error("Key '{kid}' could not be materialized: {reason}")]
    InvalidKey {
        /// Key ID of the broken JWK
        kid: String,
        /// Materialization failure
        reason: String,
    },

    /// Periodic refresh could not be armed
    #[error("Failed to schedule JWKS refresh: {0}")]
    Scheduling(String),

    /// `init` was called more than once on the same cache
    #[error("JWKS cache is already initialized")]
    AlreadyInitialized,

    /// HTTP client could not be constructed
    #[error("Failed to create HTTP client: {0}")]
    HttpClient(String),
}

impl JwksError {
    /// Coarse grouping of this error
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::MissingKeyId | Self::MissingIssuerClaim | Self::MalformedToken(_) => {
                ErrorCategory::Request
            }
            Self::InvalidUrl { .. }
            | Self::DiscoveryFetch { .. }
            | Self::MalformedDiscoveryDocument { .. } => ErrorCategory::Discovery,
            Self::Fetch { .. } => ErrorCategory::Fetch,
            Self::KeyNotFound { .. } | Self::AmbiguousKey { .. } | Self::InvalidKey { .. } => {
                ErrorCategory::Lookup
            }
            Self::Scheduling(_) => ErrorCategory::Scheduling,
            Self::AlreadyInitialized | Self::HttpClient(_) => ErrorCategory::Configuration,
        }
    }

    /// Whether this is the key-not-found case that warrants one invalidate-and-retry
    ///
    /// Ambiguous keys and request-layer errors are structural and never retried.
    pub fn is_stale_cache_miss(&self) -> bool {
        matches!(self, Self::KeyNotFound { .. })
    }
}

/// Error categories
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The token itself is unusable
    Request,
    /// Issuer discovery failed
    Discovery,
    /// JWKS endpoint failed
    Fetch,
    /// Key set was fetched but the key could not be selected
    Lookup,
    /// Refresh timer failure
    Scheduling,
    /// Misuse or setup failure
    Configuration,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Request => write!(f, "Request"),
            Self::Discovery => write!(f, "Discovery"),
            Self::Fetch => write!(f, "Fetch"),
            Self::Lookup => write!(f, "Key Lookup"),
            Self::Scheduling => write!(f, "Scheduling"),
            Self::Configuration => write!(f, "Configuration"),
        }
    }
}

/// Result type for key resolution
pub type JwksResult<T> = Result<T, JwksError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories_separate_discovery_from_fetch() {
        let discovery = JwksError::DiscoveryFetch {
            url: "https://issuer/.well-known/openid-configuration".to_string(),
            reason: "HTTP 500".to_string(),
        };
        let fetch = JwksError::Fetch {
            url: "https://issuer/jwks".to_string(),
            reason: "HTTP 500".to_string(),
        };
        let lookup = JwksError::KeyNotFound {
            kid: "k1".to_string(),
            jwks_url: "https://issuer/jwks".to_string(),
        };

        assert_eq!(discovery.category(), ErrorCategory::Discovery);
        assert_eq!(fetch.category(), ErrorCategory::Fetch);
        assert_eq!(lookup.category(), ErrorCategory::Lookup);
        assert_eq!(JwksError::MissingKeyId.category(), ErrorCategory::Request);
    }

    #[test]
    fn test_only_key_not_found_is_retryable() {
        let missing = JwksError::KeyNotFound {
            kid: "k1".to_string(),
            jwks_url: "https://issuer/jwks".to_string(),
        };
        let ambiguous = JwksError::AmbiguousKey {
            kid: "k1".to_string(),
            count: 2,
            jwks_url: "https://issuer/jwks".to_string(),
        };

        assert!(missing.is_stale_cache_miss());
        assert!(!ambiguous.is_stale_cache_miss());
        assert!(!JwksError::MissingKeyId.is_stale_cache_miss());
        assert!(!JwksError::MissingIssuerClaim.is_stale_cache_miss());
    }

    #[test]
    fn test_error_messages_carry_context() {
        let err = JwksError::AmbiguousKey {
            kid: "dup".to_string(),
            count: 2,
            jwks_url: "https://issuer/jwks".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Key 'dup' matches 2 keys in JWKS from https://issuer/jwks"
        );
    }
}
