//! # TurboMCP JWKS - Verification Key Resolution
//!
//! Finds the public key that verifies a signed token by discovering,
//! fetching and caching the JSON Web Key Sets an identity provider
//! publishes. Signature verification itself stays with `jsonwebtoken`; this
//! crate hands it the right [`jsonwebtoken::DecodingKey`].
//!
//! ## Resolution
//!
//! A token is resolved through one of three entry points:
//!
//! - by its `iss` claim: issuer → discovery document → JWKS
//! - by a fixed discovery document URL
//! - by a fixed JWKS URL
//!
//! Every step is cached in its own tier ([`cache::CacheLayer`]), so once an
//! issuer has been seen, later tokens from it resolve without network I/O.
//! A `kid` missing from a cached set triggers one invalidate-and-refetch,
//! which picks up keys rotated in since the set was cached.
//!
//! ## Architecture
//!
//! - [`resolver`] - [`JwksCache`] (the tiers and cascade) and [`KeyResolver`]
//! - [`cache`] - Generic get-or-populate tier with single-flight population
//! - [`discovery`] - Discovery URL derivation and `jwks_uri` lookup
//! - [`fetch`] - JWKS endpoint fetching
//! - [`registry`] - Statically configured providers
//! - [`scheduler`] - Periodic full refresh
//! - [`keys`] - [`KeySet`] and materialized [`Key`]
//! - [`token`] - `kid` / `iss` extraction
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use turbomcp_jwks::{JwksCache, JwksConfig, KeyResolver};
//!
//! # async fn example(token: &str) -> Result<(), Box<dyn std::error::Error>> {
//! let cache = JwksCache::new(JwksConfig::default())?;
//! cache.init_from_config().await?;
//!
//! let key = cache.issuer_claim_resolver().resolve(token).await?;
//! let validation = jsonwebtoken::Validation::new(jsonwebtoken::Algorithm::RS256);
//! let claims = jsonwebtoken::decode::<serde_json::Value>(token, key.decoding_key(), &validation)?;
//! # let _ = claims;
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod discovery;
pub mod error;
pub mod fetch;
pub mod keys;
pub mod registry;
pub mod resolver;
pub mod scheduler;
pub mod token;

// Keys hand out `jsonwebtoken` types
pub use jsonwebtoken;

#[doc(inline)]
pub use config::{JwksConfig, MAX_REFRESH_INTERVAL_SECS, ProviderEntry};

#[doc(inline)]
pub use error::{ErrorCategory, JwksError, JwksResult};

#[doc(inline)]
pub use keys::{Key, KeySet};

#[doc(inline)]
pub use resolver::{
    CacheStats, JwksCache, JwksCacheBuilder, JwksKeyResolver, KeyResolver, KeySource,
    RefreshReport,
};

#[doc(inline)]
pub use scheduler::{Scheduler, TokioScheduler};
