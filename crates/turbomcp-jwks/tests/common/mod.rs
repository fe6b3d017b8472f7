//! Common test utilities for integration tests
//!
//! A mock identity provider serving a discovery document and a JWKS, plus
//! helpers for building unsigned compact tokens.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use serde_json::{Value, json};
use turbomcp_jwks::scheduler::{RefreshTask, ScheduledRefresh, Scheduler};
use turbomcp_jwks::{JwksCache, JwksConfig, JwksResult};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

/// Key ID used by the fixture key
pub const KID: &str = "512fe2ae0e60bd03084b12885b41423f";

/// RSA modulus of the fixture key
pub const MODULUS: &str = "xL3TevYy9F9myjfAJw1dLV3LouuP8m24VlgWTehPypAce34YAprAHNWJhflKFCNQqqXRJEJYfyGn10K0OywIXrmpkq8-Sxmy3WmMT-DprKisP3YIbrW2gEm8BL8mQYyHosGQAFxM1ErhPtItiI56Avs7hj1bQ7SXJGElwqi19NqlN7sfoOUpTCuOp5E2wKRjMHKryi1pvPAXqxS58vDQ2no72d3Uoy1flQfK6pyCBqCMQkiP8ganuZV4oLaXEeS8e71w7HuoJ87o30r4J_WKAVwENwJJWhai1c_TvyWCCBFjEjdIDiQJaG4lGaaPV60mSHTGk2Sr_cf3aIKCbLGk0Q";

/// RSA public exponent of the fixture key
pub const EXPONENT: &str = "AQAB";

/// RSA signing JWK with the fixture modulus
pub fn rsa_jwk(kid: &str) -> Value {
    json!({
        "kid": kid,
        "e": EXPONENT,
        "kty": "RSA",
        "alg": "RS256",
        "n": MODULUS,
        "use": "sig"
    })
}

/// JWKS document holding `keys`
pub fn jwks(keys: Vec<Value>) -> Value {
    json!({ "keys": keys })
}

/// Compact token with the given header and claims and a dummy signature
pub fn token(header: Value, claims: Value) -> String {
    format!(
        "{}.{}.{}",
        URL_SAFE_NO_PAD.encode(header.to_string()),
        URL_SAFE_NO_PAD.encode(claims.to_string()),
        URL_SAFE_NO_PAD.encode("not-a-real-signature")
    )
}

/// RS256 token with `kid` issued by `issuer`
pub fn token_for(issuer: &str, kid: &str) -> String {
    token(
        json!({"typ": "JWT", "alg": "RS256", "kid": kid}),
        json!({"iss": issuer, "sub": "alice"}),
    )
}

/// Mock identity provider
pub struct MockIdentityProvider {
    pub server: MockServer,
    pub issuer: String,
    pub discovery_url: String,
    pub jwks_url: String,
}

impl MockIdentityProvider {
    /// Start a provider whose issuer is the server's base URL
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        let issuer = server.uri();

        Self {
            discovery_url: format!("{issuer}/.well-known/openid-configuration"),
            jwks_url: format!("{issuer}/jwks"),
            issuer,
            server,
        }
    }

    /// Serve a discovery document pointing at `/jwks`, expecting `calls` requests
    pub async fn mock_discovery(&self, calls: u64) {
        Mock::given(method("GET"))
            .and(path("/.well-known/openid-configuration"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "issuer": self.issuer,
                "jwks_uri": self.jwks_url,
                "id_token_signing_alg_values_supported": ["RS256"]
            })))
            .expect(calls)
            .named("discovery")
            .mount(&self.server)
            .await;
    }

    /// Serve `body` at `/jwks`, expecting `calls` requests
    pub async fn mock_jwks(&self, body: Value, calls: u64) {
        Mock::given(method("GET"))
            .and(path("/jwks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .expect(calls)
            .named("jwks")
            .mount(&self.server)
            .await;
    }

    /// Serve `body` at `/jwks` for the first request only, ahead of other mocks
    pub async fn mock_jwks_once(&self, body: Value) {
        Mock::given(method("GET"))
            .and(path("/jwks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .up_to_n_times(1)
            .with_priority(1)
            .expect(1)
            .named("jwks (first response)")
            .mount(&self.server)
            .await;
    }

    /// Serve `body` at `/jwks` after `delay`, expecting `calls` requests
    pub async fn mock_slow_jwks(&self, body: Value, delay: Duration, calls: u64) {
        Mock::given(method("GET"))
            .and(path("/jwks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body).set_delay(delay))
            .expect(calls)
            .named("slow jwks")
            .mount(&self.server)
            .await;
    }

    /// Answer every `/jwks` request with `status`, expecting `calls` requests
    pub async fn mock_jwks_status(&self, status: u16, calls: u64) {
        Mock::given(method("GET"))
            .and(path("/jwks"))
            .respond_with(ResponseTemplate::new(status))
            .expect(calls)
            .named("jwks error")
            .mount(&self.server)
            .await;
    }

    /// Number of requests received for `request_path` so far
    pub async fn hits(&self, request_path: &str) -> usize {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|request| request.url.path() == request_path)
            .count()
    }
}

/// Scheduler that hands the refresh task to the test instead of a timer
#[derive(Default)]
pub struct ManualScheduler {
    task: Mutex<Option<RefreshTask>>,
    period: Mutex<Option<Duration>>,
}

impl ManualScheduler {
    /// Run the captured task once, as a timer tick would
    pub async fn tick(&self) {
        let task = self
            .task
            .lock()
            .unwrap()
            .clone()
            .expect("refresh task was never armed");
        task().await;
    }

    /// Period the task was armed with
    pub fn period(&self) -> Option<Duration> {
        *self.period.lock().unwrap()
    }
}

impl Scheduler for ManualScheduler {
    fn every(&self, period: Duration, task: RefreshTask) -> JwksResult<ScheduledRefresh> {
        *self.task.lock().unwrap() = Some(task);
        *self.period.lock().unwrap() = Some(period);
        Ok(ScheduledRefresh::detached())
    }
}

/// Cache driven by `scheduler`
pub fn cache_with(scheduler: Arc<ManualScheduler>) -> JwksCache {
    JwksCache::builder()
        .config(JwksConfig::default())
        .scheduler(scheduler)
        .build()
        .expect("cache should build")
}

/// Cache with a scheduler that never fires
pub fn cache() -> JwksCache {
    cache_with(Arc::new(ManualScheduler::default()))
}
