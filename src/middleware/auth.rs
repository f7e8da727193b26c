//! Request gating middleware
//!
//! Runs on every request: exempt paths pass straight through; everything
//! else gets its bearer token extracted and verified, and the resulting
//! claim set (or its absence) attached for handlers to authorize against.
//!
//! A request that presents no token at all is *not* an error here — it
//! reaches the gate with absent claims and is denied on role membership.
//! A request that presents a token that fails verification is answered with
//! that failure's own status (401, or 500 for infrastructure faults).

use crate::gate::GateOutcome;
use crate::jwt::claims::ClaimSet;
use crate::state::AppState;
use axum::extract::{Request, State};
use axum::http::{HeaderMap, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

/// Claims attached to a request after verification.
///
/// `None` means the request was anonymous; handlers treat that as an empty
/// role set.
#[derive(Clone)]
pub struct VerifiedClaims(pub Option<ClaimSet>);

/// The gate middleware.
pub async fn rbac_gate(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    if state.gate.is_exempt(req.uri().path()) {
        state.metrics.record_gate(GateOutcome::Exempt);
        return next.run(req).await;
    }

    let claims = match bearer_token(req.headers()) {
        None => None,
        Some(token) => match state.verifier.verify(&token).await {
            Ok(claims) => {
                state.metrics.record_verification("ok");
                Some(claims)
            }
            Err(err) => {
                state.metrics.record_verification(err.code().as_str());
                state.metrics.record_gate(GateOutcome::Error);
                return err.into_response();
            }
        },
    };

    req.extensions_mut().insert(VerifiedClaims(claims));
    next.run(req).await
}

/// Extracts the bearer token from a request.
///
/// The `Authorization` header wins; the `token` session cookie is the
/// fallback for browser flows. The returned string is opaque to the caller.
#[must_use]
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    if let Some(value) = headers.get(header::AUTHORIZATION) {
        if let Ok(value) = value.to_str() {
            if let Some(token) = value.strip_prefix("Bearer ") {
                let token = token.trim();
                if !token.is_empty() {
                    return Some(token.to_string());
                }
            }
        }
    }

    cookie_value(headers, "token").filter(|t| !t.is_empty())
}

/// Reads a single cookie value from the `Cookie` header.
#[must_use]
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    cookies.split(';').map(str::trim).find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        (key == name).then(|| value.to_string())
    })
}
