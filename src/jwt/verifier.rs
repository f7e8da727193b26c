//! Bearer-token verification engine
//!
//! Parses a presented token, matches its key id against the JWKS cache,
//! verifies the signature, and validates expiry and audience before
//! producing a [`ClaimSet`]. Every failure mode is a distinct
//! [`GateError`](crate::error::GateError) variant.

use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::error::GateError;
use crate::jwt::claims::{ClaimSet, RawClaims};
use crate::jwt::jwk_cache::JwkCache;
use chrono::DateTime;
use jsonwebtoken::{Validation, decode, decode_header};
use std::sync::Arc;
use tracing::warn;

/// Token verifier backed by the JWKS cache.
pub struct TokenVerifier {
    keys: Arc<JwkCache>,
    expected_audience: String,
    enforce_audience: bool,
    clock: Arc<dyn Clock>,
}

impl TokenVerifier {
    /// Creates a verifier using the wall clock.
    ///
    /// Disabling audience enforcement is a compatibility override and is
    /// logged loudly here, once, rather than per request.
    pub fn new(keys: Arc<JwkCache>, config: &Config) -> Self {
        if !config.enforce_audience {
            warn!(
                client_id = %config.client_id,
                "audience validation is DISABLED by configuration override; \
                 tokens issued for other clients will be accepted"
            );
        }
        Self {
            keys,
            expected_audience: config.client_id.clone(),
            enforce_audience: config.enforce_audience,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replaces the clock, for deterministic expiry testing.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Verifies a presented bearer token.
    ///
    /// The token is an opaque string; no assumption is made about where the
    /// caller extracted it from. On success the returned [`ClaimSet`] is the
    /// only way claim data leaves this function — nothing is surfaced from a
    /// token that failed verification.
    pub async fn verify(&self, token: &str) -> Result<ClaimSet, GateError> {
        // 1. Structural header parse; nothing in it is trusted yet.
        let header = decode_header(token).map_err(|e| GateError::TokenMalformed {
            reason: format!("invalid header: {e}"),
        })?;
        let kid = header.kid.as_deref().ok_or_else(|| GateError::TokenMalformed {
            reason: "missing kid in header".to_string(),
        })?;

        // 2. Key lookup; may trigger a JWKS fetch on first use of this kid.
        let key = self.keys.get_key(kid).await?;

        // 3. The token's self-declared algorithm must match the key's
        //    published one; a mismatch cannot carry a valid signature.
        if header.alg != key.algorithm {
            warn!(
                kid = %kid,
                token_alg = ?header.alg,
                key_alg = ?key.algorithm,
                "token algorithm does not match published key algorithm"
            );
            return Err(GateError::SignatureInvalid);
        }

        // Signature check only; expiry and audience are validated explicitly
        // below against the injected clock and configured audience.
        let mut validation = Validation::new(key.algorithm);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let token_data = decode::<RawClaims>(token, &key.key, &validation)?;
        let claims = token_data.claims;

        // 4. Expiry must be strictly in the future.
        let expires_at = DateTime::from_timestamp(claims.exp, 0).ok_or_else(|| {
            GateError::TokenMalformed {
                reason: "exp out of range".to_string(),
            }
        })?;
        if expires_at <= self.clock.now() {
            return Err(GateError::TokenExpired {
                expired_at: expires_at,
            });
        }

        // 5. Audience must include the expected client id.
        let audience = if self.enforce_audience {
            match claims.aud.as_ref() {
                Some(aud) if aud.contains(&self.expected_audience) => {
                    self.expected_audience.clone()
                }
                _ => return Err(GateError::AudienceMismatch),
            }
        } else {
            claims
                .aud
                .as_ref()
                .and_then(|a| a.first())
                .unwrap_or_default()
                .to_string()
        };

        // 6. Roles come from the realm-access claim; absence is not an error.
        let roles = claims.realm_roles();

        Ok(ClaimSet::from_verified(
            claims.sub,
            claims.preferred_username.unwrap_or_default(),
            roles,
            audience,
            expires_at,
        ))
    }
}
