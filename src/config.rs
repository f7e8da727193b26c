//! Type-safe configuration with validation
//!
//! Provides configuration loaded from environment variables, with URL
//! validation and derived provider endpoint helpers.

use std::env;
use thiserror::Error;
use url::Url;

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Invalid URL format
    #[error("Invalid URL for {field}: {reason}")]
    InvalidUrl { field: String, reason: String },

    /// Invalid port number
    #[error("Invalid port: must be between 1 and 65535")]
    InvalidPort,

    /// Invalid TTL value
    #[error("Invalid TTL: must be greater than 0")]
    InvalidTtl,

    /// Missing required field
    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    /// Environment variable parse error
    #[error("Failed to parse environment variable {name}: {reason}")]
    ParseError { name: String, reason: String },
}

/// Service configuration with validation.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host address
    pub host: String,
    /// Server port (1-65535)
    pub port: u16,
    /// Identity provider base URL
    pub issuer_url: Url,
    /// Provider realm name
    pub realm: String,
    /// OAuth client identifier; also the expected token audience
    pub client_id: String,
    /// Redirect URI registered for the authorization-code flow
    pub redirect_uri: Url,
    /// JWKS cache TTL in seconds (must be > 0)
    pub jwks_cache_ttl_seconds: u64,
    /// JWKS fetch timeout in seconds (must be > 0)
    pub jwks_fetch_timeout_seconds: u64,
    /// Whether token audience is validated against `client_id`
    pub enforce_audience: bool,
    /// Role required by the protected route
    pub required_role: String,
    /// Paths that bypass the gate entirely
    pub exempt_paths: Vec<String>,
    /// Request timeout in seconds
    pub request_timeout_seconds: u64,
    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_seconds: u64,
    /// Cookie encryption key (32 bytes, hex); generated at startup if absent
    pub cookie_encryption_key: Option<[u8; 32]>,
}

impl Config {
    /// Loads configuration from environment variables with validation.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parse_env("PORT", 8000)?,
            issuer_url: parse_url_env("KEYCLOAK_URL", "http://localhost:8080")?,
            realm: env::var("KEYCLOAK_REALM").unwrap_or_else(|_| "master".to_string()),
            client_id: env::var("KEYCLOAK_CLIENT_ID")
                .map_err(|_| ConfigError::MissingRequired("KEYCLOAK_CLIENT_ID".to_string()))?,
            redirect_uri: parse_url_env("REDIRECT_URI", "http://localhost:8000/callback")?,
            jwks_cache_ttl_seconds: parse_env("JWKS_CACHE_TTL", 3600)?,
            jwks_fetch_timeout_seconds: parse_env("JWKS_FETCH_TIMEOUT", 10)?,
            enforce_audience: parse_env("ENFORCE_AUDIENCE", true)?,
            required_role: env::var("REQUIRED_ROLE").unwrap_or_else(|_| "admin".to_string()),
            exempt_paths: parse_list_env("EXEMPT_PATHS")
                .unwrap_or_else(default_exempt_paths),
            request_timeout_seconds: parse_env("REQUEST_TIMEOUT", 30)?,
            shutdown_timeout_seconds: parse_env("SHUTDOWN_TIMEOUT", 30)?,
            cookie_encryption_key: parse_encryption_key_env("COOKIE_ENCRYPTION_KEY"),
        };

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::InvalidPort);
        }
        if self.jwks_cache_ttl_seconds == 0 || self.jwks_fetch_timeout_seconds == 0 {
            return Err(ConfigError::InvalidTtl);
        }
        if self.realm.is_empty() {
            return Err(ConfigError::MissingRequired("realm".to_string()));
        }
        if self.client_id.is_empty() {
            return Err(ConfigError::MissingRequired("client_id".to_string()));
        }
        if self.required_role.is_empty() {
            return Err(ConfigError::MissingRequired("required_role".to_string()));
        }
        Ok(())
    }

    fn realm_endpoint(&self, suffix: &str) -> String {
        format!(
            "{}/realms/{}/protocol/openid-connect/{}",
            self.issuer_url.as_str().trim_end_matches('/'),
            self.realm,
            suffix
        )
    }

    /// Gets the provider's JWKS endpoint URL.
    #[must_use]
    pub fn jwks_url(&self) -> String {
        self.realm_endpoint("certs")
    }

    /// Gets the provider's token endpoint URL.
    #[must_use]
    pub fn token_url(&self) -> String {
        self.realm_endpoint("token")
    }

    /// Gets the provider's logout endpoint URL.
    #[must_use]
    pub fn logout_url(&self) -> String {
        self.realm_endpoint("logout")
    }
}

/// The provider callback, logout and public root bypass the gate; so does
/// the metrics endpoint.
fn default_exempt_paths() -> Vec<String> {
    ["/", "/callback", "/logout", "/metrics"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Parse an environment variable with a default value.
fn parse_env<T: std::str::FromStr>(name: &str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(val) => val.parse().map_err(|e: T::Err| ConfigError::ParseError {
            name: name.to_string(),
            reason: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}

/// Parse a URL environment variable with a default value.
fn parse_url_env(name: &str, default: &str) -> Result<Url, ConfigError> {
    let url_str = env::var(name).unwrap_or_else(|_| default.to_string());
    Url::parse(&url_str).map_err(|e| ConfigError::InvalidUrl {
        field: name.to_string(),
        reason: e.to_string(),
    })
}

/// Parse a comma-separated list environment variable.
fn parse_list_env(name: &str) -> Option<Vec<String>> {
    env::var(name)
        .ok()
        .map(|v| v.split(',').map(|s| s.trim().to_string()).collect())
}

/// Parse an encryption key from a hex-encoded environment variable.
fn parse_encryption_key_env(name: &str) -> Option<[u8; 32]> {
    env::var(name).ok().and_then(|hex| {
        if hex.len() != 64 {
            return None;
        }
        let bytes: Vec<u8> = (0..hex.len())
            .step_by(2)
            .filter_map(|i| u8::from_str_radix(&hex[i..i + 2], 16).ok())
            .collect();
        if bytes.len() == 32 {
            let mut arr = [0u8; 32];
            arr.copy_from_slice(&bytes);
            Some(arr)
        } else {
            None
        }
    })
}
