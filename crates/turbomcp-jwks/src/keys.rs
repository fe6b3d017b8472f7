//! Key sets and materialized keys
//!
//! A [`KeySet`] is one fetched JWKS document, remembered together with the
//! endpoint it came from. A [`Key`] is a single JWK from such a set that has
//! been materialized into a [`DecodingKey`] ready for signature verification.

use std::fmt;
use std::time::SystemTime;

use jsonwebtoken::DecodingKey;
use jsonwebtoken::jwk::{AlgorithmParameters, Jwk, JwkSet, KeyAlgorithm, PublicKeyUse};

use crate::error::{JwksError, JwksResult};

/// Materialized public key
///
/// Immutable once constructed.
#[derive(Clone)]
pub struct Key {
    key_id: String,
    jwk: Jwk,
    decoding_key: DecodingKey,
}

impl Key {
    /// Materialize a JWK into a verification key
    ///
    /// # Errors
    ///
    /// Returns [`JwksError::InvalidKey`] if the JWK has no `kid` or its key
    /// parameters cannot be decoded.
    pub fn from_jwk(jwk: &Jwk) -> JwksResult<Self> {
        let key_id = jwk
            .common
            .key_id
            .clone()
            .ok_or_else(|| JwksError::InvalidKey {
                kid: String::new(),
                reason: "JWK has no kid".to_string(),
            })?;

        let decoding_key = DecodingKey::from_jwk(jwk).map_err(|e| JwksError::InvalidKey {
            kid: key_id.clone(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            key_id,
            jwk: jwk.clone(),
            decoding_key,
        })
    }

    /// Key ID (`kid`)
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// Intended use (`use`), if published
    pub fn key_use(&self) -> Option<&PublicKeyUse> {
        self.jwk.common.public_key_use.as_ref()
    }

    /// Algorithm (`alg`), if published
    pub fn algorithm(&self) -> Option<KeyAlgorithm> {
        self.jwk.common.key_algorithm
    }

    /// Key type (`kty`) as published
    pub fn key_type(&self) -> &'static str {
        match self.jwk.algorithm {
            AlgorithmParameters::RSA(_) => "RSA",
            AlgorithmParameters::EllipticCurve(_) => "EC",
            AlgorithmParameters::OctetKey(_) => "oct",
            AlgorithmParameters::OctetKeyPair(_) => "OKP",
        }
    }

    /// The raw JWK this key was materialized from
    pub fn jwk(&self) -> &Jwk {
        &self.jwk
    }

    /// Key usable with `jsonwebtoken::decode`
    pub fn decoding_key(&self) -> &DecodingKey {
        &self.decoding_key
    }
}

// DecodingKey holds raw key bytes; print identifying fields only
impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Key")
            .field("key_id", &self.key_id)
            .field("key_type", &self.key_type())
            .field("key_use", &self.key_use())
            .field("algorithm", &self.algorithm())
            .finish()
    }
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        self.jwk == other.jwk
    }
}

/// Result of looking a key ID up in a [`KeySet`]
#[derive(Debug)]
pub enum KeyLookup<'a> {
    /// No key carries the ID
    Missing,
    /// Exactly one key carries the ID
    Unique(&'a Jwk),
    /// Several keys carry the ID
    Ambiguous(usize),
}

/// One fetched JWKS document
#[derive(Debug, Clone)]
pub struct KeySet {
    jwks_url: String,
    jwks: JwkSet,
    fetched_at: SystemTime,
}

impl KeySet {
    /// Wrap a JWKS fetched from `jwks_url`
    pub fn new(jwks_url: impl Into<String>, jwks: JwkSet) -> Self {
        Self {
            jwks_url: jwks_url.into(),
            jwks,
            fetched_at: SystemTime::now(),
        }
    }

    /// Endpoint this set was fetched from
    pub fn jwks_url(&self) -> &str {
        &self.jwks_url
    }

    /// When this set was fetched
    pub fn fetched_at(&self) -> SystemTime {
        self.fetched_at
    }

    /// Number of keys in the set
    pub fn len(&self) -> usize {
        self.jwks.keys.len()
    }

    /// Whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.jwks.keys.is_empty()
    }

    /// Key IDs in document order (keys without `kid` are skipped)
    pub fn key_ids(&self) -> impl Iterator<Item = &str> {
        self.jwks
            .keys
            .iter()
            .filter_map(|jwk| jwk.common.key_id.as_deref())
    }

    /// Look up every key carrying `kid`
    pub fn lookup(&self, kid: &str) -> KeyLookup<'_> {
        let mut matches = self
            .jwks
            .keys
            .iter()
            .filter(|jwk| jwk.common.key_id.as_deref() == Some(kid));

        match (matches.next(), matches.next()) {
            (None, _) => KeyLookup::Missing,
            (Some(jwk), None) => KeyLookup::Unique(jwk),
            (Some(_), Some(_)) => KeyLookup::Ambiguous(2 + matches.count()),
        }
    }

    /// Materialize the single key carrying `kid`
    ///
    /// # Errors
    ///
    /// - [`JwksError::KeyNotFound`] if no key carries `kid`
    /// - [`JwksError::AmbiguousKey`] if more than one does
    /// - [`JwksError::InvalidKey`] if the JWK cannot be materialized
    pub fn key(&self, kid: &str) -> JwksResult<Key> {
        match self.lookup(kid) {
            KeyLookup::Unique(jwk) => Key::from_jwk(jwk),
            KeyLookup::Missing => Err(JwksError::KeyNotFound {
                kid: kid.to_string(),
                jwks_url: self.jwks_url.clone(),
            }),
            KeyLookup::Ambiguous(count) => Err(JwksError::AmbiguousKey {
                kid: kid.to_string(),
                count,
                jwks_url: self.jwks_url.clone(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODULUS: &str = "xL3TevYy9F9myjfAJw1dLV3LouuP8m24VlgWTehPypAce34YAprAHNWJhflKFCNQqqXRJEJYfyGn10K0OywIXrmpkq8-Sxmy3WmMT-DprKisP3YIbrW2gEm8BL8mQYyHosGQAFxM1ErhPtItiI56Avs7hj1bQ7SXJGElwqi19NqlN7sfoOUpTCuOp5E2wKRjMHKryi1pvPAXqxS58vDQ2no72d3Uoy1flQfK6pyCBqCMQkiP8ganuZV4oLaXEeS8e71w7HuoJ87o30r4J_WKAVwENwJJWhai1c_TvyWCCBFjEjdIDiQJaG4lGaaPV60mSHTGk2Sr_cf3aIKCbLGk0Q";

    fn key_set(kids: &[&str]) -> KeySet {
        let keys: Vec<serde_json::Value> = kids
            .iter()
            .map(|kid| {
                serde_json::json!({
                    "kty": "RSA",
                    "kid": kid,
                    "use": "sig",
                    "alg": "RS256",
                    "n": MODULUS,
                    "e": "AQAB"
                })
            })
            .collect();
        let jwks: JwkSet = serde_json::from_value(serde_json::json!({ "keys": keys })).unwrap();
        KeySet::new("https://issuer.example.com/jwks", jwks)
    }

    #[test]
    fn test_unique_key_materializes() {
        let set = key_set(&["512fe2ae0e60bd03084b12885b41423f"]);
        let key = set.key("512fe2ae0e60bd03084b12885b41423f").unwrap();

        assert_eq!(key.key_id(), "512fe2ae0e60bd03084b12885b41423f");
        assert_eq!(key.key_type(), "RSA");
        assert_eq!(key.key_use(), Some(&PublicKeyUse::Signature));
        assert_eq!(key.algorithm(), Some(KeyAlgorithm::RS256));
        match &key.jwk().algorithm {
            AlgorithmParameters::RSA(rsa) => {
                assert_eq!(rsa.n, MODULUS);
                assert_eq!(rsa.e, "AQAB");
            }
            other => panic!("expected RSA parameters, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_key() {
        let set = key_set(&["a", "b"]);
        assert!(matches!(set.lookup("c"), KeyLookup::Missing));
        assert!(matches!(
            set.key("c"),
            Err(JwksError::KeyNotFound { ref kid, .. }) if kid == "c"
        ));
    }

    #[test]
    fn test_duplicate_key_id_is_ambiguous() {
        let set = key_set(&["dup", "other", "dup", "dup"]);
        assert!(matches!(set.lookup("dup"), KeyLookup::Ambiguous(3)));
        assert!(matches!(
            set.key("dup"),
            Err(JwksError::AmbiguousKey { count: 3, .. })
        ));
        assert!(set.key("other").is_ok());
    }

    #[test]
    fn test_key_ids_in_order() {
        let set = key_set(&["one", "two"]);
        assert_eq!(set.key_ids().collect::<Vec<_>>(), vec!["one", "two"]);
        assert_eq!(set.len(), 2);
        assert!(!set.is_empty());
        assert_eq!(set.jwks_url(), "https://issuer.example.com/jwks");
    }
}
