//! Shared application state
//!
//! All services are explicitly constructed here and passed down; there are
//! no process-wide singletons.

use crate::config::Config;
use crate::crypto::CookieCipher;
use crate::error::GateError;
use crate::gate::AccessGate;
use crate::jwt::jwk_cache::JwkCache;
use crate::jwt::verifier::TokenVerifier;
use crate::observability::metrics::GateMetrics;
use crate::oidc::provider::ProviderClient;
use std::sync::Arc;

/// Handles shared across request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Service configuration
    pub config: Arc<Config>,
    /// Bearer-token verification engine
    pub verifier: Arc<TokenVerifier>,
    /// Role-gating policy
    pub gate: Arc<AccessGate>,
    /// Provider token-endpoint client
    pub provider: Arc<ProviderClient>,
    /// Refresh-token cookie cipher
    pub cipher: Arc<CookieCipher>,
    /// Service metrics
    pub metrics: Arc<GateMetrics>,
}

impl AppState {
    /// Builds the full service graph from configuration.
    pub fn from_config(config: Config) -> Result<Self, GateError> {
        let keys = Arc::new(JwkCache::from_config(&config)?);
        let verifier = Arc::new(TokenVerifier::new(keys, &config));
        let gate = Arc::new(AccessGate::new(config.exempt_paths.clone()));
        let provider = Arc::new(ProviderClient::from_config(&config)?);
        let cipher = Arc::new(match &config.cookie_encryption_key {
            Some(key) => CookieCipher::from_key(key),
            None => CookieCipher::generate(),
        });
        let metrics = Arc::new(
            GateMetrics::new().map_err(|e| GateError::Internal(anyhow::anyhow!("metrics: {e}")))?,
        );

        Ok(Self {
            config: Arc::new(config),
            verifier,
            gate,
            provider,
            cipher,
            metrics,
        })
    }

    /// Builds state around an externally constructed verifier (for tests
    /// that inject a manual clock or point the cache at a stub provider).
    pub fn with_verifier(config: Config, verifier: Arc<TokenVerifier>) -> Result<Self, GateError> {
        let gate = Arc::new(AccessGate::new(config.exempt_paths.clone()));
        let provider = Arc::new(ProviderClient::from_config(&config)?);
        let cipher = Arc::new(match &config.cookie_encryption_key {
            Some(key) => CookieCipher::from_key(key),
            None => CookieCipher::generate(),
        });
        let metrics = Arc::new(
            GateMetrics::new().map_err(|e| GateError::Internal(anyhow::anyhow!("metrics: {e}")))?,
        );

        Ok(Self {
            config: Arc::new(config),
            verifier,
            gate,
            provider,
            cipher,
            metrics,
        })
    }
}
