//! Token claim structures
//!
//! [`RawClaims`] is the wire shape deserialized during verification;
//! [`ClaimSet`] is the verified output handed to the authorization layer.
//! A `ClaimSet` can only be constructed by the verifier after the signature
//! has been checked.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Audience claim, which providers emit as a string or an array.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    /// Single audience
    Single(String),
    /// Multiple audiences
    Multiple(Vec<String>),
}

impl Audience {
    /// Check if the audience contains a specific value
    pub fn contains(&self, aud: &str) -> bool {
        match self {
            Audience::Single(s) => s == aud,
            Audience::Multiple(v) => v.iter().any(|a| a == aud),
        }
    }

    /// First audience entry, if any.
    pub fn first(&self) -> Option<&str> {
        match self {
            Audience::Single(s) => Some(s.as_str()),
            Audience::Multiple(v) => v.first().map(String::as_str),
        }
    }
}

/// Keycloak's realm-level role container.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RealmAccess {
    /// Realm role names
    #[serde(default)]
    pub roles: Vec<String>,
}

/// Claims as they appear on the wire, deserialized during verification.
///
/// Optional fields stay optional: a token without `realm_access` carries no
/// roles, which is not an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawClaims {
    /// Subject identifier
    pub sub: String,
    /// Expiration time (seconds since epoch)
    pub exp: i64,
    /// Audience (string or array; absent on some provider tokens)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<Audience>,
    /// Display username
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_username: Option<String>,
    /// Realm role container
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub realm_access: Option<RealmAccess>,
}

impl RawClaims {
    /// Realm roles, deduplicated; empty when the claim or sub-field is absent.
    #[must_use]
    pub fn realm_roles(&self) -> HashSet<String> {
        self.realm_access
            .as_ref()
            .map(|ra| ra.roles.iter().cloned().collect())
            .unwrap_or_default()
    }
}

/// Verified claim set.
///
/// Construction is confined to the verifier, so holding a `ClaimSet` is
/// proof the token's signature and structural claims were checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimSet {
    subject: String,
    preferred_username: String,
    roles: HashSet<String>,
    audience: String,
    expires_at: DateTime<Utc>,
}

impl ClaimSet {
    pub(crate) fn from_verified(
        subject: String,
        preferred_username: String,
        roles: HashSet<String>,
        audience: String,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            subject,
            preferred_username,
            roles,
            audience,
            expires_at,
        }
    }

    /// Subject identifier.
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Display username; empty when the token carried none.
    #[must_use]
    pub fn preferred_username(&self) -> &str {
        &self.preferred_username
    }

    /// Verified realm roles.
    #[must_use]
    pub fn roles(&self) -> &HashSet<String> {
        &self.roles
    }

    /// Checks membership of a single role.
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    /// Audience the token was accepted for.
    #[must_use]
    pub fn audience(&self) -> &str {
        &self.audience
    }

    /// Token expiry.
    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }
}
