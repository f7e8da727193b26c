//! Error handling module with classified, non-exhaustive error types
//!
//! This module provides a unified error handling approach with:
//! - A classified verification-failure taxonomy checked by callers
//! - Structured error variants with contextual information
//! - Automatic conversion from external error types
//! - Sanitization of sensitive information in responses

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

/// Sensitive patterns that should be sanitized from error messages
const SENSITIVE_PATTERNS: &[&str] = &[
    "password",
    "secret",
    "token",
    "key",
    "credential",
    "bearer",
    "authorization",
    "api_key",
    "apikey",
    "private",
];

/// Non-exhaustive error enum for forward compatibility
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum GateError {
    /// Token structure could not be parsed
    #[error("Token malformed: {reason}")]
    TokenMalformed {
        /// Description of the malformation
        reason: String,
    },

    /// Token references a key id the provider does not publish
    #[error("Signing key {kid} not published by provider")]
    UnknownSigningKey {
        /// Key id from the token header
        kid: String,
    },

    /// The provider's key endpoint could not be read
    #[error("Key source unavailable: {reason}")]
    KeySourceUnavailable {
        /// Description of the fetch failure
        reason: String,
    },

    /// Token signature verification failed
    #[error("Token signature invalid")]
    SignatureInvalid,

    /// Token has expired
    #[error("Token expired at {expired_at}")]
    TokenExpired {
        /// When the token expired
        expired_at: DateTime<Utc>,
    },

    /// Token audience does not include the expected client
    #[error("Token audience does not match expected client")]
    AudienceMismatch,

    /// Request lacks the role required by the route
    #[error("Access denied: role {role} required")]
    RoleDenied {
        /// The missing role
        role: String,
    },

    /// The provider's token endpoint rejected or failed the exchange
    #[error("Provider error: {reason}")]
    ProviderUnavailable {
        /// Description of the provider failure
        reason: String,
    },

    /// Internal error (details sanitized in responses)
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Error codes for API responses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    TokenMalformed,
    UnknownSigningKey,
    KeySourceUnavailable,
    SignatureInvalid,
    TokenExpired,
    AudienceMismatch,
    RoleDenied,
    ProviderUnavailable,
    Internal,
}

impl ErrorCode {
    /// Get the string representation of the error code
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TokenMalformed => "AUTH_TOKEN_MALFORMED",
            Self::UnknownSigningKey => "AUTH_UNKNOWN_SIGNING_KEY",
            Self::KeySourceUnavailable => "AUTH_KEY_SOURCE_UNAVAILABLE",
            Self::SignatureInvalid => "AUTH_SIGNATURE_INVALID",
            Self::TokenExpired => "AUTH_TOKEN_EXPIRED",
            Self::AudienceMismatch => "AUTH_AUDIENCE_MISMATCH",
            Self::RoleDenied => "AUTH_ROLE_DENIED",
            Self::ProviderUnavailable => "PROVIDER_UNAVAILABLE",
            Self::Internal => "INTERNAL_ERROR",
        }
    }

    /// Get the HTTP status for this error
    ///
    /// Token-validity failures are client faults (401), a missing role is an
    /// authorization fault (403), and key-source or provider failures are
    /// infrastructure faults (500) that must not be downgraded to a denial.
    pub fn http_status(&self) -> StatusCode {
        match self {
            Self::TokenMalformed
            | Self::UnknownSigningKey
            | Self::SignatureInvalid
            | Self::TokenExpired
            | Self::AudienceMismatch => StatusCode::UNAUTHORIZED,
            Self::RoleDenied => StatusCode::FORBIDDEN,
            Self::KeySourceUnavailable | Self::ProviderUnavailable | Self::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Structured error response with correlation ID
#[derive(Debug, Clone)]
pub struct ErrorResponse {
    /// Error code for programmatic handling
    pub code: ErrorCode,
    /// Human-readable message (sanitized)
    pub message: String,
    /// Correlation ID for tracing
    pub correlation_id: Uuid,
}

impl ErrorResponse {
    /// Create a new error response from a GateError
    pub fn from_error(error: &GateError, correlation_id: Uuid) -> Self {
        let (code, message) = match error {
            GateError::TokenMalformed { reason } => {
                (ErrorCode::TokenMalformed, sanitize_message(reason))
            }
            GateError::UnknownSigningKey { .. } => (
                ErrorCode::UnknownSigningKey,
                "Token references an unknown signing key".to_string(),
            ),
            GateError::KeySourceUnavailable { .. } => (
                ErrorCode::KeySourceUnavailable,
                "Key verification temporarily unavailable".to_string(),
            ),
            GateError::SignatureInvalid => (
                ErrorCode::SignatureInvalid,
                "Token signature is invalid".to_string(),
            ),
            GateError::TokenExpired { .. } => {
                (ErrorCode::TokenExpired, "Token has expired".to_string())
            }
            GateError::AudienceMismatch => (
                ErrorCode::AudienceMismatch,
                "Token audience is invalid".to_string(),
            ),
            GateError::RoleDenied { role } => (
                ErrorCode::RoleDenied,
                format!("Access denied: {role} role required"),
            ),
            GateError::ProviderUnavailable { .. } => (
                ErrorCode::ProviderUnavailable,
                "Identity provider temporarily unavailable".to_string(),
            ),
            GateError::Internal(_) => {
                // Never expose internal error details
                (ErrorCode::Internal, "Internal error".to_string())
            }
        };

        ErrorResponse {
            code,
            message,
            correlation_id,
        }
    }
}

impl GateError {
    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::TokenMalformed { .. } => ErrorCode::TokenMalformed,
            Self::UnknownSigningKey { .. } => ErrorCode::UnknownSigningKey,
            Self::KeySourceUnavailable { .. } => ErrorCode::KeySourceUnavailable,
            Self::SignatureInvalid => ErrorCode::SignatureInvalid,
            Self::TokenExpired { .. } => ErrorCode::TokenExpired,
            Self::AudienceMismatch => ErrorCode::AudienceMismatch,
            Self::RoleDenied { .. } => ErrorCode::RoleDenied,
            Self::ProviderUnavailable { .. } => ErrorCode::ProviderUnavailable,
            Self::Internal(_) => ErrorCode::Internal,
        }
    }

    /// True for failures the caller may retry (infrastructure faults)
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::KeySourceUnavailable { .. } | Self::ProviderUnavailable { .. }
        )
    }
}

impl IntoResponse for GateError {
    fn into_response(self) -> Response {
        let correlation_id = Uuid::new_v4();
        let response = ErrorResponse::from_error(&self, correlation_id);
        let status = response.code.http_status();

        if status.is_server_error() {
            // Internal detail is logged, never returned to the client.
            tracing::error!(
                correlation_id = %correlation_id,
                error_code = response.code.as_str(),
                error = %self,
                "request failed"
            );
        } else {
            tracing::debug!(
                correlation_id = %correlation_id,
                error_code = response.code.as_str(),
                "request rejected"
            );
        }

        let body = Json(json!({
            "error": response.message,
            "code": response.code.as_str(),
            "correlation_id": response.correlation_id,
        }));
        (status, body).into_response()
    }
}

/// Sanitize a message by removing sensitive information
fn sanitize_message(message: &str) -> String {
    let lower = message.to_lowercase();
    for pattern in SENSITIVE_PATTERNS {
        if lower.contains(pattern) {
            return "Invalid token format".to_string();
        }
    }
    message.to_string()
}

/// Check if a string contains sensitive information
pub fn contains_sensitive_info(text: &str) -> bool {
    let lower = text.to_lowercase();
    SENSITIVE_PATTERNS.iter().any(|p| lower.contains(p))
}

// ============================================================================
// From trait implementations for automatic error conversion
// ============================================================================

impl From<jsonwebtoken::errors::Error> for GateError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::InvalidSignature => GateError::SignatureInvalid,
            ErrorKind::ExpiredSignature => GateError::TokenExpired {
                expired_at: Utc::now(),
            },
            _ => GateError::TokenMalformed {
                reason: sanitize_message(&err.to_string()),
            },
        }
    }
}

impl From<reqwest::Error> for GateError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GateError::KeySourceUnavailable {
                reason: "request timed out".to_string(),
            }
        } else if err.is_connect() {
            GateError::KeySourceUnavailable {
                reason: "connection failed".to_string(),
            }
        } else {
            GateError::KeySourceUnavailable {
                reason: sanitize_message(&err.to_string()),
            }
        }
    }
}
