//! Role-based request gating policy
//!
//! Authorization is pure role membership over a verified [`ClaimSet`]: an
//! absent claim set means an empty role set, which is a denial, not an
//! error. A configurable list of exempt paths bypasses the gate entirely.

use crate::jwt::claims::ClaimSet;
use std::collections::HashSet;

/// Outcome of an authorization check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// The required role is present.
    Allow,
    /// The required role is absent.
    Deny(DenyReason),
}

/// Why a request was denied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenyReason {
    /// The claim set (or absence of one) lacks the required role.
    MissingRole {
        /// The role the route requires
        role: String,
    },
}

/// Terminal per-request gate states, used as a metrics label.
///
/// A request moves `Unchecked → {Exempt, Verifying} → {Allowed, Denied,
/// Error}`; only the terminal states are recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    /// Path bypassed the gate.
    Exempt,
    /// Verified and role present.
    Allowed,
    /// Denied for a missing role.
    Denied,
    /// Verification failed (client fault or infrastructure fault).
    Error,
}

impl GateOutcome {
    /// Label value for metrics.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exempt => "exempt",
            Self::Allowed => "allowed",
            Self::Denied => "denied",
            Self::Error => "error",
        }
    }
}

/// True iff `required` is a member of `roles`.
#[must_use]
pub fn role_allows(roles: &HashSet<String>, required: &str) -> bool {
    roles.contains(required)
}

/// Role-membership gate with a route exemption list.
#[derive(Debug, Clone)]
pub struct AccessGate {
    exempt_paths: HashSet<String>,
}

impl AccessGate {
    /// Creates a gate with the given exempt paths.
    pub fn new<I, S>(exempt_paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            exempt_paths: exempt_paths.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether a request path bypasses the gate entirely.
    #[must_use]
    pub fn is_exempt(&self, path: &str) -> bool {
        self.exempt_paths.contains(path)
    }

    /// Authorizes a request against a required role.
    ///
    /// `claims` is `None` for anonymous requests and for requests whose
    /// verification failed upstream; both gate as an empty role set.
    #[must_use]
    pub fn authorize(&self, claims: Option<&ClaimSet>, required_role: &str) -> Decision {
        let allowed = claims.is_some_and(|c| role_allows(c.roles(), required_role));
        if allowed {
            Decision::Allow
        } else {
            Decision::Deny(DenyReason::MissingRole {
                role: required_role.to_string(),
            })
        }
    }
}
