//! Key-id and issuer extraction from compact JWTs
//!
//! Nothing here verifies a signature. The header is decoded to learn which
//! key the token claims to be signed with, and the payload is peeked at for
//! the issuer so the right key set can be located before verification.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::{JwksError, JwksResult};

/// Only the header field needed to pick a key
#[derive(Debug, Deserialize)]
struct KeyIdHeader {
    #[serde(default)]
    kid: Option<serde_json::Value>,
}

/// Only the claim needed to locate the key set
#[derive(Debug, Deserialize)]
struct IssuerClaim {
    #[serde(default)]
    iss: Option<serde_json::Value>,
}

/// Decode one base64url JSON segment of a compact JWT
fn decode_segment<T: DeserializeOwned>(token: &str, index: usize, name: &str) -> JwksResult<T> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err(JwksError::MalformedToken("Invalid JWT format".to_string()));
    }

    let bytes = URL_SAFE_NO_PAD
        .decode(parts[index])
        .map_err(|e| JwksError::MalformedToken(format!("Invalid JWT {name} encoding: {e}")))?;

    serde_json::from_slice(&bytes)
        .map_err(|e| JwksError::MalformedToken(format!("Invalid JWT {name}: {e}")))
}

/// Read the `kid` header of a compact JWT
///
/// # Errors
///
/// Returns [`JwksError::MalformedToken`] if the header cannot be decoded and
/// [`JwksError::MissingKeyId`] if `kid` is absent, empty or not a string.
pub fn key_id(token: &str) -> JwksResult<String> {
    let header: KeyIdHeader = decode_segment(token, 0, "header")?;

    match header.kid {
        Some(serde_json::Value::String(kid)) if !kid.is_empty() => Ok(kid),
        _ => Err(JwksError::MissingKeyId),
    }
}

/// Read the `iss` claim of a compact JWT without verifying it
///
/// # Errors
///
/// Returns [`JwksError::MalformedToken`] if the payload cannot be decoded and
/// [`JwksError::MissingIssuerClaim`] if `iss` is absent or not a string.
pub fn issuer(token: &str) -> JwksResult<String> {
    let claims: IssuerClaim = decode_segment(token, 1, "payload")?;

    match claims.iss {
        Some(serde_json::Value::String(iss)) if !iss.is_empty() => Ok(iss),
        _ => Err(JwksError::MissingIssuerClaim),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn token(header: serde_json::Value, claims: serde_json::Value) -> String {
        format!(
            "{}.{}.c2ln",
            URL_SAFE_NO_PAD.encode(header.to_string()),
            URL_SAFE_NO_PAD.encode(claims.to_string())
        )
    }

    #[test]
    fn test_key_id_present() {
        let t = token(
            json!({"alg": "RS256", "kid": "verySecretKey"}),
            json!({"iss": "https://issuer.example.com"}),
        );
        assert_eq!(key_id(&t).unwrap(), "verySecretKey");
    }

    #[test]
    fn test_key_id_missing() {
        let t = token(json!({"alg": "RS256"}), json!({}));
        assert!(matches!(key_id(&t), Err(JwksError::MissingKeyId)));
    }

    #[test]
    fn test_key_id_not_a_string() {
        for kid in [json!(42), json!(null), json!(""), json!({"id": "k1"})] {
            let t = token(json!({"alg": "RS256", "kid": kid}), json!({}));
            assert!(
                matches!(key_id(&t), Err(JwksError::MissingKeyId)),
                "kid {kid} should count as missing"
            );
        }
    }

    #[test]
    fn test_key_id_bad_header() {
        assert!(matches!(
            key_id("%%%.e30.c2ln"),
            Err(JwksError::MalformedToken(_))
        ));
        let not_json = format!("{}.e30.c2ln", URL_SAFE_NO_PAD.encode("nope"));
        assert!(matches!(
            key_id(&not_json),
            Err(JwksError::MalformedToken(_))
        ));
    }

    #[test]
    fn test_key_id_garbage_token() {
        assert!(matches!(
            key_id("not-a-token"),
            Err(JwksError::MalformedToken(_))
        ));
    }

    #[test]
    fn test_issuer_present() {
        let t = token(
            json!({"alg": "RS256", "kid": "k1"}),
            json!({"iss": "https://issuer.example.com", "sub": "alice"}),
        );
        assert_eq!(issuer(&t).unwrap(), "https://issuer.example.com");
    }

    #[test]
    fn test_issuer_missing_or_not_string() {
        let absent = token(json!({"alg": "RS256", "kid": "k1"}), json!({"sub": "alice"}));
        let numeric = token(json!({"alg": "RS256", "kid": "k1"}), json!({"iss": 42}));

        assert!(matches!(issuer(&absent), Err(JwksError::MissingIssuerClaim)));
        assert!(matches!(issuer(&numeric), Err(JwksError::MissingIssuerClaim)));
    }

    #[test]
    fn test_issuer_bad_payload() {
        assert!(matches!(
            issuer("a.%%%.c"),
            Err(JwksError::MalformedToken(_))
        ));
        assert!(matches!(
            issuer("only.two"),
            Err(JwksError::MalformedToken(_))
        ));
    }
}
