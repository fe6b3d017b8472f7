//! Statically configured providers
//!
//! Lets an issuer skip live discovery when its JWKS or discovery URL is
//! already known.

use std::collections::HashMap;

use crate::config::ProviderEntry;

/// How an issuer should be resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderRoute {
    /// Fetch this JWKS URL directly
    JwksUrl(String),
    /// Read the JWKS URL from this discovery document
    DiscoveryUrl(String),
    /// Derive the discovery URL from the issuer
    Discover,
}

/// Issuer → provider entry lookup
#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
    entries: HashMap<String, ProviderEntry>,
}

impl ProviderRegistry {
    /// Build a registry; later entries for the same issuer win
    ///
    /// Entries without an issuer cannot be looked up and are not indexed.
    pub fn new(entries: impl IntoIterator<Item = ProviderEntry>) -> Self {
        let entries = entries
            .into_iter()
            .filter(|entry| !entry.issuer.is_empty())
            .map(|entry| (entry.issuer.clone(), entry))
            .collect();
        Self { entries }
    }

    /// Entry configured for `issuer`
    pub fn get(&self, issuer: &str) -> Option<&ProviderEntry> {
        self.entries.get(issuer)
    }

    /// Route for `issuer`; a JWKS URL takes precedence over a discovery URL
    pub fn route(&self, issuer: &str) -> ProviderRoute {
        match self.entries.get(issuer) {
            Some(ProviderEntry {
                jwks_url: Some(url),
                ..
            }) if !url.is_empty() => ProviderRoute::JwksUrl(url.clone()),
            Some(ProviderEntry {
                discovery_url: Some(url),
                ..
            }) if !url.is_empty() => ProviderRoute::DiscoveryUrl(url.clone()),
            _ => ProviderRoute::Discover,
        }
    }

    /// Number of configured issuers
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no issuers are configured
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
