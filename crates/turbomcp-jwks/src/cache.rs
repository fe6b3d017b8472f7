//! Get-or-populate cache tier
//!
//! A [`CacheLayer`] maps a string key (a JWKS URL, a discovery URL or an
//! issuer) to the [`KeySet`] it last resolved to. The three tiers of
//! [`crate::JwksCache`] are all instances of this one type; only the populate
//! function passed in differs.
//!
//! A slot can exist without a value. Such pending slots are keys declared up
//! front (by `init`) or keys whose last refresh failed; they count as a miss
//! on lookup but are still visited by refresh.
//!
//! Population is single-flight per key: concurrent misses on one key wait
//! for the first caller's fetch instead of issuing their own. A key's lock
//! only lives while someone holds or waits on it, so keys that never
//! populate (an unverified token's bogus `iss`, say) leave nothing behind.

use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use crate::error::JwksResult;
use crate::keys::KeySet;

/// Which key a tier is indexed by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    /// Keyed by JWKS endpoint URL
    JwksUrl,
    /// Keyed by discovery document URL
    DiscoveryUrl,
    /// Keyed by issuer
    Issuer,
}

impl Tier {
    /// All tiers, innermost first (the order refresh walks them in)
    pub const ALL: [Tier; 3] = [Tier::JwksUrl, Tier::DiscoveryUrl, Tier::Issuer];

    /// Short name for logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::JwksUrl => "jwks_url",
            Self::DiscoveryUrl => "discovery_url",
            Self::Issuer => "issuer",
        }
    }
}

/// One cache tier
#[derive(Debug)]
pub struct CacheLayer {
    tier: Tier,
    entries: DashMap<String, Option<Arc<KeySet>>>,
    gates: DashMap<String, Arc<Mutex<()>>>,
}

impl CacheLayer {
    /// Create an empty tier
    pub fn new(tier: Tier) -> Self {
        Self {
            tier,
            entries: DashMap::new(),
            gates: DashMap::new(),
        }
    }

    /// Which tier this is
    pub fn tier(&self) -> Tier {
        self.tier
    }

    /// Populated value for `key`, if any
    pub fn get(&self, key: &str) -> Option<Arc<KeySet>> {
        self.entries.get(key).and_then(|entry| entry.value().clone())
    }

    /// Whether `key` has a slot, populated or not
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Declare `key` without populating it
    ///
    /// An existing value is left untouched.
    pub fn declare(&self, key: &str) {
        self.entries.entry(key.to_string()).or_insert(None);
    }

    /// Store `set` under `key`
    pub fn insert(&self, key: &str, set: Arc<KeySet>) {
        self.entries.insert(key.to_string(), Some(set));
    }

    /// Snapshot of every key with a slot
    pub fn keys(&self) -> Vec<String> {
        self.entries.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Remove `key` if it still holds `stale`
    ///
    /// Returns `false` when another caller already replaced the entry, in
    /// which case the caller should just re-read it.
    pub fn invalidate_if_current(&self, key: &str, stale: &Arc<KeySet>) -> bool {
        self.entries
            .remove_if(key, |_, current| {
                current.as_ref().is_some_and(|set| Arc::ptr_eq(set, stale))
            })
            .is_some()
    }

    /// Reset every slot holding `stale` back to pending
    ///
    /// Returns the number of slots reset.
    pub fn reset_matching(&self, stale: &Arc<KeySet>) -> usize {
        let mut reset = 0;
        for mut entry in self.entries.iter_mut() {
            if entry.value().as_ref().is_some_and(|set| Arc::ptr_eq(set, stale)) {
                *entry.value_mut() = None;
                reset += 1;
            }
        }
        reset
    }

    async fn lock_gate(&self, key: &str) -> GateGuard<'_> {
        let gate = Arc::clone(
            self.gates
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .value(),
        );

        // Built before waiting so a caller cancelled in the queue cleans up too
        let mut guard = GateGuard {
            layer: self,
            key: key.to_string(),
            gate,
            lock: None,
        };
        guard.lock = Some(Arc::clone(&guard.gate).lock_owned().await);
        guard
    }

    /// Keys with a population lock currently allocated
    pub fn active_gates(&self) -> usize {
        self.gates.len()
    }

    /// Return the cached set for `key`, or populate it
    ///
    /// The populated set is stored as returned, so a tier populated from a
    /// lower tier shares that tier's `Arc`. Only one `populate` runs per key
    /// at a time; callers that arrive while it runs get its result from the
    /// cache once it finishes. A failed populate stores nothing.
    ///
    /// # Errors
    ///
    /// Propagates the error returned by `populate`.
    pub async fn get_or_populate<F, Fut>(&self, key: &str, populate: F) -> JwksResult<Arc<KeySet>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = JwksResult<Arc<KeySet>>>,
    {
        if let Some(set) = self.get(key) {
            debug!(tier = self.tier.as_str(), key = %key, "JWKS cache hit");
            return Ok(set);
        }

        let _gate = self.lock_gate(key).await;

        // Filled while we waited on the gate
        if let Some(set) = self.get(key) {
            debug!(tier = self.tier.as_str(), key = %key, "JWKS populated by concurrent caller");
            return Ok(set);
        }

        let set = populate().await?;
        self.insert(key, Arc::clone(&set));
        Ok(set)
    }

    /// Delete `key` and recompute it, same as a cold miss
    ///
    /// On failure the slot is left pending (not restored to the old value).
    ///
    /// # Errors
    ///
    /// Propagates the error returned by `populate`.
    pub async fn repopulate<F, Fut>(&self, key: &str, populate: F) -> JwksResult<Arc<KeySet>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = JwksResult<Arc<KeySet>>>,
    {
        let _gate = self.lock_gate(key).await;

        self.entries.insert(key.to_string(), None);
        let set = populate().await?;
        self.insert(key, Arc::clone(&set));
        Ok(set)
    }

    /// Entry counts for this tier
    pub fn stats(&self) -> TierStats {
        let total_entries = self.entries.len();
        let populated_entries = self
            .entries
            .iter()
            .filter(|entry| entry.value().is_some())
            .count();

        TierStats {
            total_entries,
            populated_entries,
            pending_entries: total_entries - populated_entries,
        }
    }
}

/// Population lock for one key, held or being waited on
///
/// Dropping it (normally, on error, or by cancellation) frees the key's
/// lock from the map unless another caller still holds or awaits it.
struct GateGuard<'a> {
    layer: &'a CacheLayer,
    key: String,
    gate: Arc<Mutex<()>>,
    lock: Option<OwnedMutexGuard<()>>,
}

impl Drop for GateGuard<'_> {
    fn drop(&mut self) {
        self.lock.take();
        // One reference in the map, one here; more means other callers
        self.layer
            .gates
            .remove_if(&self.key, |_, gate| Arc::strong_count(gate) <= 2);
    }
}

/// Entry counts for one tier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TierStats {
    /// Slots, populated or not
    pub total_entries: usize,
    /// Slots holding a key set
    pub populated_entries: usize,
    /// Declared slots without a key set
    pub pending_entries: usize,
}
