//! JWKS cache with single-flight refresh
//!
//! Fetches the provider's published signing keys and caches them by key id.
//! The cached set is replaced atomically as a whole; readers see either the
//! old complete set or the new one, never a partial state. Refresh is lazy:
//! a lookup miss (or a set older than the TTL) triggers one fetch, and
//! concurrent misses collapse into a single outbound request.

use crate::config::Config;
use crate::error::GateError;
use arc_swap::ArcSwapOption;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use jsonwebtoken::{Algorithm, DecodingKey};
use parking_lot::Mutex as SyncMutex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// JSON Web Key structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Jwk {
    /// Key type (RSA, EC)
    pub kty: String,
    /// Key ID
    pub kid: String,
    /// Key use (sig, enc)
    #[serde(rename = "use")]
    pub key_use: Option<String>,
    /// Algorithm
    pub alg: Option<String>,
    /// RSA modulus
    pub n: Option<String>,
    /// RSA exponent
    pub e: Option<String>,
    /// EC x coordinate
    pub x: Option<String>,
    /// EC y coordinate
    pub y: Option<String>,
    /// EC curve
    pub crv: Option<String>,
}

/// JSON Web Key Set structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Jwks {
    /// List of keys
    pub keys: Vec<Jwk>,
}

/// One published verification key.
#[derive(Clone)]
pub struct SigningKey {
    /// Key id, unique within a key set
    pub kid: String,
    /// Algorithm the provider declared for this key
    pub algorithm: Algorithm,
    /// Public key material
    pub key: Arc<DecodingKey>,
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("kid", &self.kid)
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

/// A complete fetched key set with its fetch timestamp.
struct KeySet {
    keys: HashMap<String, SigningKey>,
    fetched_at: Instant,
}

/// A key-set fetch failure: network error, non-2xx response, or malformed
/// JSON. Cloneable so the shared in-flight future can hand it to every
/// waiter; never conflated with "key not found".
#[derive(Debug, Clone, Error)]
#[error("{reason}")]
pub struct KeyFetchFailure {
    /// Description of the failure
    pub reason: String,
}

impl From<KeyFetchFailure> for GateError {
    fn from(failure: KeyFetchFailure) -> Self {
        GateError::KeySourceUnavailable {
            reason: failure.reason,
        }
    }
}

/// Shared state the in-flight fetch future writes into.
struct CacheState {
    current: ArcSwapOption<KeySet>,
    /// Key ids that stayed absent after the last successful fetch. Bounds
    /// outbound calls to one per distinct unknown kid per TTL window.
    missing: SyncMutex<HashSet<String>>,
}

/// Type alias for the in-flight fetch future.
type InflightFetch = Shared<BoxFuture<'static, Result<Arc<KeySet>, KeyFetchFailure>>>;

/// JWKS cache with single-flight refresh.
pub struct JwkCache {
    state: Arc<CacheState>,
    inflight: Mutex<Option<InflightFetch>>,
    http_client: reqwest::Client,
    jwks_url: String,
    ttl: Duration,
}

impl JwkCache {
    /// Creates a cache for the given JWKS endpoint.
    pub fn new(
        jwks_url: String,
        ttl: Duration,
        fetch_timeout: Duration,
    ) -> Result<Self, GateError> {
        let http_client = reqwest::Client::builder()
            .timeout(fetch_timeout)
            .build()
            .map_err(|e| GateError::Internal(anyhow::anyhow!("HTTP client: {e}")))?;

        Ok(Self {
            state: Arc::new(CacheState {
                current: ArcSwapOption::from(None),
                missing: SyncMutex::new(HashSet::new()),
            }),
            inflight: Mutex::new(None),
            http_client,
            jwks_url,
            ttl,
        })
    }

    /// Creates a cache from the service configuration.
    pub fn from_config(config: &Config) -> Result<Self, GateError> {
        Self::new(
            config.jwks_url(),
            Duration::from_secs(config.jwks_cache_ttl_seconds),
            Duration::from_secs(config.jwks_fetch_timeout_seconds),
        )
    }

    /// Gets a signing key by key id.
    ///
    /// A miss (kid absent, cache empty, or set older than the TTL) triggers
    /// a synchronous single-flight fetch. A fetch failure surfaces as
    /// [`GateError::KeySourceUnavailable`]; a kid the provider does not
    /// publish even after a refresh surfaces as
    /// [`GateError::UnknownSigningKey`].
    pub async fn get_key(&self, kid: &str) -> Result<SigningKey, GateError> {
        if let Some(key) = self.lookup(kid, true) {
            return Ok(key);
        }

        // A fresh set is authoritative for kids it already failed to serve.
        if self.is_fresh() && self.state.missing.lock().contains(kid) {
            return Err(GateError::UnknownSigningKey {
                kid: kid.to_string(),
            });
        }

        self.refresh().await?;

        match self.lookup(kid, false) {
            Some(key) => Ok(key),
            None => {
                self.state.missing.lock().insert(kid.to_string());
                Err(GateError::UnknownSigningKey {
                    kid: kid.to_string(),
                })
            }
        }
    }

    /// Point-in-time lookup; `require_fresh` rejects sets older than the TTL.
    fn lookup(&self, kid: &str, require_fresh: bool) -> Option<SigningKey> {
        let set = self.state.current.load_full()?;
        if require_fresh && set.fetched_at.elapsed() >= self.ttl {
            return None;
        }
        set.keys.get(kid).cloned()
    }

    /// Whether the cached set exists and is within its TTL.
    #[must_use]
    pub fn is_fresh(&self) -> bool {
        self.state
            .current
            .load_full()
            .is_some_and(|set| set.fetched_at.elapsed() < self.ttl)
    }

    /// Number of keys in the cached set.
    #[must_use]
    pub fn cached_key_count(&self) -> usize {
        self.state
            .current
            .load_full()
            .map_or(0, |set| set.keys.len())
    }

    /// Refreshes the cached set using the single-flight pattern.
    ///
    /// Only one outbound request is made even if multiple concurrent callers
    /// miss simultaneously; all waiters observe the same outcome.
    async fn refresh(&self) -> Result<(), KeyFetchFailure> {
        let fut = {
            let mut inflight_guard = self.inflight.lock().await;
            if let Some(existing) = inflight_guard.clone() {
                existing
            } else {
                let client = self.http_client.clone();
                let url = self.jwks_url.clone();
                let state = Arc::clone(&self.state);

                let fut: BoxFuture<'static, Result<Arc<KeySet>, KeyFetchFailure>> =
                    Box::pin(async move {
                        let set = Arc::new(fetch_key_set(&client, &url).await?);
                        // All-or-nothing replacement: the negative cache
                        // resets with the set it qualified.
                        state.missing.lock().clear();
                        state.current.store(Some(Arc::clone(&set)));
                        Ok(set)
                    });

                let shared = fut.shared();
                *inflight_guard = Some(shared.clone());
                shared
            }
        };

        let result = fut.await;
        // Every waiter clears the slot; taking an already-cleared (or a
        // successor's) slot costs at most one extra fetch later.
        self.inflight.lock().await.take();
        result.map(|_| ())
    }

    /// Forces a fetch regardless of cache state (for tests).
    pub async fn force_refresh(&self) -> Result<(), GateError> {
        self.state.current.store(None);
        self.refresh().await.map_err(GateError::from)
    }
}

/// Fetches and converts the provider's JWKS document.
async fn fetch_key_set(
    client: &reqwest::Client,
    url: &str,
) -> Result<KeySet, KeyFetchFailure> {
    info!(url = %url, "fetching JWKS");

    let response = client.get(url).send().await.map_err(|e| {
        let reason = if e.is_timeout() {
            "request timed out".to_string()
        } else if e.is_connect() {
            "connection failed".to_string()
        } else {
            format!("request failed: {e}")
        };
        KeyFetchFailure { reason }
    })?;

    if !response.status().is_success() {
        return Err(KeyFetchFailure {
            reason: format!("endpoint returned {}", response.status()),
        });
    }

    let jwks: Jwks = response.json().await.map_err(|e| KeyFetchFailure {
        reason: format!("malformed JWKS document: {e}"),
    })?;

    let mut keys = HashMap::new();
    for jwk in &jwks.keys {
        match jwk_to_signing_key(jwk) {
            Some(key) => {
                keys.insert(jwk.kid.clone(), key);
            }
            None => warn!(kid = %jwk.kid, kty = %jwk.kty, "skipping unusable JWK"),
        }
    }

    info!(count = keys.len(), "JWKS cache updated");
    Ok(KeySet {
        keys,
        fetched_at: Instant::now(),
    })
}

/// Converts a JWK to a [`SigningKey`], rejecting weak or unsupported keys.
pub fn jwk_to_signing_key(jwk: &Jwk) -> Option<SigningKey> {
    let key = match jwk.kty.as_str() {
        "RSA" => {
            let n = jwk.n.as_ref()?;
            let e = jwk.e.as_ref()?;

            // Minimum key size 2048 bits (256 bytes of base64url modulus)
            if n.len() < 340 {
                warn!(kid = %jwk.kid, "RSA key too small, rejecting");
                return None;
            }

            DecodingKey::from_rsa_components(n, e).ok()?
        }
        "EC" => {
            let x = jwk.x.as_ref()?;
            let y = jwk.y.as_ref()?;
            let crv = jwk.crv.as_deref().unwrap_or("P-256");

            // Only allow P-256 or stronger curves
            if !matches!(crv, "P-256" | "P-384" | "P-521") {
                warn!(kid = %jwk.kid, crv = %crv, "weak EC curve, rejecting");
                return None;
            }

            DecodingKey::from_ec_components(x, y).ok()?
        }
        _ => {
            warn!(kty = %jwk.kty, "unsupported key type");
            return None;
        }
    };

    let algorithm = declared_algorithm(jwk)?;
    Some(SigningKey {
        kid: jwk.kid.clone(),
        algorithm,
        key: Arc::new(key),
    })
}

/// The algorithm the provider declared for a key, with a per-key-type
/// default when the JWK omits `alg`. Symmetric algorithms never apply to a
/// published key set and are rejected.
fn declared_algorithm(jwk: &Jwk) -> Option<Algorithm> {
    let algorithm = match jwk.alg.as_deref() {
        Some(alg) => Algorithm::from_str(alg).ok()?,
        None => match jwk.kty.as_str() {
            "RSA" => Algorithm::RS256,
            "EC" => match jwk.crv.as_deref() {
                Some("P-384") => Algorithm::ES384,
                _ => Algorithm::ES256,
            },
            _ => return None,
        },
    };

    if matches!(
        algorithm,
        Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512
    ) {
        warn!(kid = %jwk.kid, "symmetric algorithm in JWKS, rejecting");
        return None;
    }

    Some(algorithm)
}
