//! HTTP surface
//!
//! Routes mirror the login flow: a public root exposing the provider
//! configuration, the authorization-code callback, logout, the role-gated
//! API route, and metrics. The gate middleware wraps the whole router; its
//! exemption list decides which paths bypass verification.

use crate::error::GateError;
use crate::gate::{Decision, DenyReason, GateOutcome};
use crate::middleware::auth::{VerifiedClaims, cookie_value, rbac_gate};
use crate::state::AppState;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, HeaderValue, header};
use axum::middleware;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Extension, Json, Router};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

/// Builds the service router.
pub fn build_router(state: AppState) -> Router {
    let request_timeout = Duration::from_secs(state.config.request_timeout_seconds);

    Router::new()
        .route("/", get(root))
        .route("/callback", get(callback))
        .route("/logout", get(logout))
        .route("/api/v1/secure-endpoint", get(secure_endpoint))
        .route("/metrics", get(metrics))
        .layer(middleware::from_fn_with_state(state.clone(), rbac_gate))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(request_timeout))
        // Outermost: a panicking handler surfaces as a bare 500.
        .layer(CatchPanicLayer::new())
        .with_state(state)
}

/// Public root: the provider configuration the login SPA needs.
async fn root(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "keycloak_url": state.config.issuer_url.as_str(),
        "realm": state.config.realm,
        "client_id": state.config.client_id,
    }))
}

#[derive(Debug, Deserialize)]
struct CallbackQuery {
    code: String,
}

/// Authorization-code callback.
///
/// Exchanges the code, verifies the returned access token through the core
/// engine, sets the session cookies, and redirects home. The user-data
/// cookie carries base64url-encoded JSON so the value stays cookie-safe.
async fn callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> Result<Response, GateError> {
    let tokens = state.provider.exchange_code(&query.code).await?;
    let claims = state.verifier.verify(&tokens.access_token).await?;

    let user_data = json!({
        "roles": claims.roles(),
        "preferred_username": claims.preferred_username(),
    });
    let user_data = URL_SAFE_NO_PAD.encode(user_data.to_string());

    let refresh_cookie = match tokens.refresh_token.as_deref() {
        Some(refresh_token) => state.cipher.encrypt(refresh_token)?,
        None => String::new(),
    };

    let mut response = Redirect::to("/").into_response();
    let headers = response.headers_mut();
    headers.append(
        header::SET_COOKIE,
        session_cookie("refresh_token", &refresh_cookie, true)?,
    );
    headers.append(
        header::SET_COOKIE,
        session_cookie("token", &tokens.access_token, true)?,
    );
    headers.append(
        header::SET_COOKIE,
        session_cookie("usrData", &user_data, false)?,
    );

    Ok(response)
}

/// Logout: clears session cookies and hands back the provider logout URL
/// with the decrypted refresh token the user agent needs for the redirect.
async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, GateError> {
    let refresh_token = cookie_value(&headers, "refresh_token")
        .filter(|v| !v.is_empty())
        .and_then(|encrypted| match state.cipher.decrypt(&encrypted) {
            Ok(token) => Some(token),
            Err(e) => {
                warn!(error = %e, "could not decrypt refresh token cookie");
                None
            }
        })
        .unwrap_or_default();

    let body = Json(json!({
        "logout_url": state.provider.logout_url(),
        "client_id": state.config.client_id,
        "refresh_token": refresh_token,
    }));

    let mut response = body.into_response();
    let response_headers = response.headers_mut();
    response_headers.append(header::SET_COOKIE, expired_cookie("refresh_token", true)?);
    response_headers.append(header::SET_COOKIE, expired_cookie("token", true)?);
    response_headers.append(header::SET_COOKIE, expired_cookie("usrData", false)?);

    Ok(response)
}

/// The protected route; requires the configured role.
async fn secure_endpoint(
    State(state): State<AppState>,
    claims: Option<Extension<VerifiedClaims>>,
) -> Result<Json<serde_json::Value>, GateError> {
    let claims = claims.and_then(|Extension(VerifiedClaims(claims))| claims);
    match state
        .gate
        .authorize(claims.as_ref(), &state.config.required_role)
    {
        Decision::Allow => {
            state.metrics.record_gate(GateOutcome::Allowed);
            Ok(Json(json!({"message": "Access Granted"})))
        }
        Decision::Deny(DenyReason::MissingRole { role }) => {
            state.metrics.record_gate(GateOutcome::Denied);
            Err(GateError::RoleDenied { role })
        }
    }
}

/// Prometheus exposition endpoint.
async fn metrics(State(state): State<AppState>) -> String {
    state.metrics.render()
}

/// Builds a session cookie header value.
fn session_cookie(name: &str, value: &str, http_only: bool) -> Result<HeaderValue, GateError> {
    let mut cookie = format!("{name}={value}; Path=/; Secure; SameSite=Lax");
    if http_only {
        cookie.push_str("; HttpOnly");
    }
    HeaderValue::from_str(&cookie)
        .map_err(|_| GateError::Internal(anyhow::anyhow!("invalid cookie value")))
}

/// Builds an expired cookie header value (clears the cookie).
fn expired_cookie(name: &str, http_only: bool) -> Result<HeaderValue, GateError> {
    let mut cookie = format!("{name}=; Path=/; Secure; SameSite=Lax; Max-Age=0");
    if http_only {
        cookie.push_str("; HttpOnly");
    }
    HeaderValue::from_str(&cookie)
        .map_err(|_| GateError::Internal(anyhow::anyhow!("invalid cookie value")))
}
