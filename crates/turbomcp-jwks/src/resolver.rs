//! Token → key resolution through the three cache tiers
//!
//! ```text
//!   issuer ──► discovery URL ──► JWKS URL ──► KeySet ──► Key
//!     │             │                │
//!  by_issuer   by_discovery_url  by_jwks_url      (CacheLayer each)
//! ```
//!
//! Each tier is get-or-populate. A miss at one tier resolves through the
//! tier below it and stores the result, so the issuer tier ends up holding
//! the same `Arc<KeySet>` as the JWKS tier it was resolved through.
//!
//! When a cached set does not contain the requested `kid`, the set is treated
//! as predating a key rotation: it is evicted from every tier that holds it
//! and resolved again, once.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::cache::{CacheLayer, Tier, TierStats};
use crate::config::{JwksConfig, ProviderEntry};
use crate::discovery::{DiscoveryResolver, discovery_url};
use crate::error::{JwksError, JwksResult};
use crate::fetch::KeySetFetcher;
use crate::keys::{Key, KeySet};
use crate::registry::{ProviderRegistry, ProviderRoute};
use crate::scheduler::{RefreshTask, ScheduledRefresh, Scheduler, TokioScheduler};
use crate::token;

/// Where the key set for a token comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySource {
    /// The token's own `iss` claim
    IssuerClaim,
    /// A fixed discovery document URL
    DiscoveryUrl(String),
    /// A fixed JWKS URL
    JwksUrl(String),
}

/// Resolves the verification key for a token
#[async_trait]
pub trait KeyResolver: Send + Sync {
    /// Return the single key matching the token's `kid`
    ///
    /// # Errors
    ///
    /// Returns a [`JwksError`] describing which step of resolution failed.
    async fn resolve(&self, token: &str) -> JwksResult<Key>;
}

/// Outcome of one full refresh pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshReport {
    /// Entries recomputed successfully
    pub refreshed: usize,
    /// Entries left pending after a failure
    pub failed: usize,
}

/// Entry counts for all three tiers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// JWKS-URL tier
    pub jwks_url: TierStats,
    /// Discovery-URL tier
    pub discovery_url: TierStats,
    /// Issuer tier
    pub issuer: TierStats,
}

struct Inner {
    config: JwksConfig,
    fetcher: KeySetFetcher,
    discovery: DiscoveryResolver,
    by_jwks_url: CacheLayer,
    by_discovery_url: CacheLayer,
    by_issuer: CacheLayer,
    registry: RwLock<ProviderRegistry>,
    scheduler: Arc<dyn Scheduler>,
    scheduled: Mutex<Option<ScheduledRefresh>>,
    initialized: AtomicBool,
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(scheduled) = self.scheduled.get_mut().take() {
            scheduled.cancel();
        }
    }
}

/// Layered JWKS cache
///
/// Cheap to clone; clones share the same tiers.
///
/// # Example
///
/// ```rust,no_run
/// # use turbomcp_jwks::{JwksCache, JwksConfig, KeyResolver, ProviderEntry};
/// # tokio_test::block_on(async {
/// let cache = JwksCache::new(JwksConfig::default())?;
/// cache
///     .init(vec![ProviderEntry::with_jwks_url(
///         "https://auth.example.com",
///         "https://auth.example.com/jwks",
///     )])
///     .await?;
///
/// let resolver = cache.issuer_claim_resolver();
/// let key = resolver.resolve("eyJhbGciOiJSUzI1NiIsImtpZCI6...").await?;
/// println!("verifying with {}", key.key_id());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// # });
/// ```
#[derive(Clone)]
pub struct JwksCache {
    inner: Arc<Inner>,
}

impl fmt::Debug for JwksCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwksCache")
            .field("config", &self.inner.config)
            .field("stats", &self.stats())
            .field("initialized", &self.inner.initialized.load(Ordering::Relaxed))
            .finish()
    }
}

/// Builder for [`JwksCache`]
#[derive(Default)]
pub struct JwksCacheBuilder {
    config: JwksConfig,
    scheduler: Option<Arc<dyn Scheduler>>,
    http_client: Option<reqwest::Client>,
}

impl JwksCacheBuilder {
    /// Use `config` instead of the defaults
    pub fn config(mut self, config: JwksConfig) -> Self {
        self.config = config;
        self
    }

    /// Use `scheduler` for periodic refresh instead of [`TokioScheduler`]
    pub fn scheduler(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    /// Share an existing HTTP client instead of building one from the config
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Build the cache
    ///
    /// # Errors
    ///
    /// Returns an error if the config is invalid or the HTTP client cannot be built.
    pub fn build(self) -> JwksResult<JwksCache> {
        self.config.validate()?;

        let client = match self.http_client {
            Some(client) => client,
            None => self.config.http_client()?,
        };

        Ok(JwksCache {
            inner: Arc::new(Inner {
                fetcher: KeySetFetcher::with_client(client.clone(), &self.config),
                discovery: DiscoveryResolver::with_client(client, &self.config),
                by_jwks_url: CacheLayer::new(Tier::JwksUrl),
                by_discovery_url: CacheLayer::new(Tier::DiscoveryUrl),
                by_issuer: CacheLayer::new(Tier::Issuer),
                registry: RwLock::new(ProviderRegistry::default()),
                scheduler: self.scheduler.unwrap_or_else(|| Arc::new(TokioScheduler)),
                scheduled: Mutex::new(None),
                initialized: AtomicBool::new(false),
                config: self.config,
            }),
        })
    }
}

impl JwksCache {
    /// Create a cache with `config` and the tokio refresh scheduler
    ///
    /// # Errors
    ///
    /// Returns an error if the config is invalid or the HTTP client cannot be built.
    pub fn new(config: JwksConfig) -> JwksResult<Self> {
        Self::builder().config(config).build()
    }

    /// Start building a cache
    pub fn builder() -> JwksCacheBuilder {
        JwksCacheBuilder::default()
    }

    /// Configuration this cache was built with
    pub fn config(&self) -> &JwksConfig {
        &self.inner.config
    }

    /// The tier indexed by `tier`
    pub fn layer(&self, tier: Tier) -> &CacheLayer {
        match tier {
            Tier::JwksUrl => &self.inner.by_jwks_url,
            Tier::DiscoveryUrl => &self.inner.by_discovery_url,
            Tier::Issuer => &self.inner.by_issuer,
        }
    }

    /// Entry counts for every tier
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            jwks_url: self.inner.by_jwks_url.stats(),
            discovery_url: self.inner.by_discovery_url.stats(),
            issuer: self.inner.by_issuer.stats(),
        }
    }

    /// Register static providers, eagerly populate them, and arm periodic refresh
    ///
    /// May be called once per cache. Fetch failures during the eager pass
    /// are logged and skipped.
    ///
    /// # Errors
    ///
    /// - [`JwksError::AlreadyInitialized`] on a second call
    /// - [`JwksError::Scheduling`] if the refresh timer cannot be armed
    pub async fn init(&self, providers: Vec<ProviderEntry>) -> JwksResult<()> {
        if self.inner.initialized.swap(true, Ordering::SeqCst) {
            return Err(JwksError::AlreadyInitialized);
        }

        for entry in &providers {
            if !entry.issuer.is_empty() {
                self.inner.by_issuer.declare(&entry.issuer);
            }
            if let Some(url) = entry.discovery_url.as_deref().filter(|u| !u.is_empty()) {
                self.inner.by_discovery_url.declare(url);
            }
            if let Some(url) = entry.jwks_url.as_deref().filter(|u| !u.is_empty()) {
                self.inner.by_jwks_url.declare(url);
            }
        }

        info!(providers = providers.len(), "Initializing JWKS cache");
        *self.inner.registry.write() = ProviderRegistry::new(providers);

        self.refresh_caches().await;

        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let task: RefreshTask = Arc::new(move || {
            let weak = weak.clone();
            Box::pin(async move {
                if let Some(inner) = weak.upgrade() {
                    JwksCache { inner }.refresh_caches().await;
                }
            })
        });

        let scheduled = self
            .inner
            .scheduler
            .every(self.inner.config.refresh_interval(), task)?;
        *self.inner.scheduled.lock() = Some(scheduled);

        Ok(())
    }

    /// Like [`JwksCache::init`], using the providers from the config
    ///
    /// # Errors
    ///
    /// Same as [`JwksCache::init`].
    pub async fn init_from_config(&self) -> JwksResult<()> {
        self.init(self.inner.config.providers.clone()).await
    }

    /// Stop periodic refresh, if armed
    pub fn stop_refresh(&self) {
        if let Some(scheduled) = self.inner.scheduled.lock().take() {
            scheduled.cancel();
            debug!("Periodic JWKS refresh stopped");
        }
    }

    /// Recompute every cached entry in every tier
    ///
    /// Tiers are walked innermost first so issuer and discovery entries
    /// re-link to freshly fetched sets. A failed entry is left pending
    /// until the next pass or the next on-demand resolution; failures never
    /// abort the pass.
    pub async fn refresh_caches(&self) -> RefreshReport {
        let mut report = RefreshReport::default();

        for tier in Tier::ALL {
            let layer = self.layer(tier);
            for key in layer.keys() {
                match layer.repopulate(&key, || self.populate(tier, &key)).await {
                    Ok(set) => {
                        debug!(
                            tier = tier.as_str(),
                            key = %key,
                            key_count = set.len(),
                            "Refreshed JWKS cache entry"
                        );
                        report.refreshed += 1;
                    }
                    Err(e) => {
                        warn!(
                            tier = tier.as_str(),
                            key = %key,
                            error = %e,
                            "JWKS refresh failed, entry left pending"
                        );
                        report.failed += 1;
                    }
                }
            }
        }

        info!(
            refreshed = report.refreshed,
            failed = report.failed,
            "JWKS cache refresh pass complete"
        );
        report
    }

    /// Key set published at `jwks_url`
    ///
    /// # Errors
    ///
    /// Returns [`JwksError::Fetch`] on a cold miss that cannot be fetched.
    pub async fn key_set_for_jwks_url(&self, jwks_url: &str) -> JwksResult<Arc<KeySet>> {
        self.inner
            .by_jwks_url
            .get_or_populate(jwks_url, || self.fetch_jwks(jwks_url))
            .await
    }

    /// Key set behind the discovery document at `discovery_url`
    ///
    /// # Errors
    ///
    /// Returns a discovery error or [`JwksError::Fetch`] on a cold miss.
    pub async fn key_set_for_discovery_url(&self, discovery_url: &str) -> JwksResult<Arc<KeySet>> {
        self.inner
            .by_discovery_url
            .get_or_populate(discovery_url, || self.populate_discovery(discovery_url))
            .await
    }

    /// Key set for `issuer`, via static configuration or live discovery
    ///
    /// # Errors
    ///
    /// Returns a discovery error or [`JwksError::Fetch`] on a cold miss.
    pub async fn key_set_for_issuer(&self, issuer: &str) -> JwksResult<Arc<KeySet>> {
        self.inner
            .by_issuer
            .get_or_populate(issuer, || self.populate_issuer(issuer))
            .await
    }

    /// Key set cached under `key` in `tier`
    ///
    /// # Errors
    ///
    /// Same as the tier-specific accessors.
    pub async fn key_set(&self, tier: Tier, key: &str) -> JwksResult<Arc<KeySet>> {
        match tier {
            Tier::JwksUrl => self.key_set_for_jwks_url(key).await,
            Tier::DiscoveryUrl => self.key_set_for_discovery_url(key).await,
            Tier::Issuer => self.key_set_for_issuer(key).await,
        }
    }

    async fn populate(&self, tier: Tier, key: &str) -> JwksResult<Arc<KeySet>> {
        match tier {
            Tier::JwksUrl => self.fetch_jwks(key).await,
            Tier::DiscoveryUrl => self.populate_discovery(key).await,
            Tier::Issuer => self.populate_issuer(key).await,
        }
    }

    async fn fetch_jwks(&self, jwks_url: &str) -> JwksResult<Arc<KeySet>> {
        self.inner.fetcher.fetch(jwks_url).await.map(Arc::new)
    }

    async fn populate_discovery(&self, discovery_url: &str) -> JwksResult<Arc<KeySet>> {
        let jwks_url = self.inner.discovery.jwks_url(discovery_url).await?;
        self.key_set_for_jwks_url(&jwks_url).await
    }

    async fn populate_issuer(&self, issuer: &str) -> JwksResult<Arc<KeySet>> {
        let route = self.inner.registry.read().route(issuer);
        match route {
            ProviderRoute::JwksUrl(jwks_url) => {
                debug!(issuer = %issuer, jwks_url = %jwks_url, "Issuer resolved from static JWKS URL");
                self.key_set_for_jwks_url(&jwks_url).await
            }
            ProviderRoute::DiscoveryUrl(url) => {
                debug!(issuer = %issuer, discovery_url = %url, "Issuer resolved from static discovery URL");
                self.key_set_for_discovery_url(&url).await
            }
            ProviderRoute::Discover => {
                let url = discovery_url(issuer)?;
                debug!(issuer = %issuer, discovery_url = %url, "Issuer resolved through live discovery");
                self.key_set_for_discovery_url(url.as_str()).await
            }
        }
    }

    /// Evict `stale` from `key` in `tier` and from every other slot holding it
    fn invalidate(&self, tier: Tier, key: &str, stale: &Arc<KeySet>) {
        let removed = self.layer(tier).invalidate_if_current(key, stale);
        let reset: usize = Tier::ALL
            .iter()
            .map(|t| self.layer(*t).reset_matching(stale))
            .sum();

        debug!(
            tier = tier.as_str(),
            key = %key,
            removed,
            reset,
            jwks_url = %stale.jwks_url(),
            "Invalidated stale JWKS"
        );
    }

    /// Resolve the key `kid` through the set cached under `key` in `tier`
    ///
    /// A missing `kid` invalidates the cached set and retries exactly once.
    ///
    /// # Errors
    ///
    /// - [`JwksError::KeyNotFound`] if `kid` is still missing after the retry
    /// - [`JwksError::AmbiguousKey`] if several keys carry `kid` (not retried)
    /// - any discovery or fetch error from populating the set
    pub async fn retrieve_key(&self, kid: &str, tier: Tier, key: &str) -> JwksResult<Key> {
        let set = self.key_set(tier, key).await?;

        match set.key(kid) {
            Err(e) if e.is_stale_cache_miss() => {
                warn!(
                    kid = %kid,
                    tier = tier.as_str(),
                    key = %key,
                    jwks_url = %set.jwks_url(),
                    "Key ID not in cached JWKS, refetching"
                );
                self.invalidate(tier, key, &set);

                let fresh = self.key_set(tier, key).await?;
                fresh.key(kid)
            }
            other => other,
        }
    }

    /// Resolve the key for `token` from `source`
    ///
    /// The `kid` header is checked before anything touches the network.
    ///
    /// # Errors
    ///
    /// - [`JwksError::MissingKeyId`] / [`JwksError::MalformedToken`] for unusable tokens
    /// - [`JwksError::MissingIssuerClaim`] for [`KeySource::IssuerClaim`] without `iss`
    /// - otherwise as [`JwksCache::retrieve_key`]
    pub async fn resolve_with(&self, token: &str, source: &KeySource) -> JwksResult<Key> {
        let kid = token::key_id(token)?;

        match source {
            KeySource::IssuerClaim => {
                let issuer = token::issuer(token)?;
                self.retrieve_key(&kid, Tier::Issuer, &issuer).await
            }
            KeySource::DiscoveryUrl(url) => self.retrieve_key(&kid, Tier::DiscoveryUrl, url).await,
            KeySource::JwksUrl(url) => self.retrieve_key(&kid, Tier::JwksUrl, url).await,
        }
    }

    /// Resolver reading the issuer from each token's `iss` claim
    pub fn issuer_claim_resolver(&self) -> JwksKeyResolver {
        JwksKeyResolver::new(self.clone(), KeySource::IssuerClaim)
    }

    /// Resolver bound to one discovery document
    pub fn discovery_url_resolver(&self, discovery_url: impl Into<String>) -> JwksKeyResolver {
        JwksKeyResolver::new(self.clone(), KeySource::DiscoveryUrl(discovery_url.into()))
    }

    /// Resolver bound to one JWKS endpoint
    pub fn jwks_url_resolver(&self, jwks_url: impl Into<String>) -> JwksKeyResolver {
        JwksKeyResolver::new(self.clone(), KeySource::JwksUrl(jwks_url.into()))
    }
}

/// [`KeyResolver`] over a [`JwksCache`] and a fixed [`KeySource`]
#[derive(Debug, Clone)]
pub struct JwksKeyResolver {
    cache: JwksCache,
    source: KeySource,
}

impl JwksKeyResolver {
    /// Bind `cache` to `source`
    pub fn new(cache: JwksCache, source: KeySource) -> Self {
        Self { cache, source }
    }

    /// Where keys are resolved from
    pub fn source(&self) -> &KeySource {
        &self.source
    }
}

#[async_trait]
impl KeyResolver for JwksKeyResolver {
    async fn resolve(&self, token: &str) -> JwksResult<Key> {
        self.cache.resolve_with(token, &self.source).await
    }
}
