//! HTTP boundary: status mapping, exemption, and the role gate end-to-end.

use super::fixtures::{
    TEST_RSA_N, TEST_RSA_PEM, admin_claims, future_exp, jwks_json, jwks_path, mount_jwks,
    sign_rs256, test_config,
};
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use oidc_gate::jwt::jwk_cache::JwkCache;
use oidc_gate::jwt::verifier::TokenVerifier;
use oidc_gate::routes::build_router;
use oidc_gate::state::AppState;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn build_app(server_uri: &str) -> Router {
    let config = test_config(server_uri);
    let cache = Arc::new(JwkCache::from_config(&config).expect("cache"));
    let verifier = Arc::new(TokenVerifier::new(cache, &config));
    let state = AppState::with_verifier(config, verifier).expect("state");
    build_router(state)
}

async fn body_json(body: Body) -> Value {
    let bytes = body.collect().await.expect("body").to_bytes();
    serde_json::from_slice(&bytes).expect("json body")
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn get_with_bearer(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn root_is_public_and_returns_provider_config() {
    let server = MockServer::start().await;
    let app = build_app(&server.uri());

    let response = app.oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response.into_body()).await;
    assert_eq!(body["realm"], "demo");
    assert_eq!(body["client_id"], "demo-client");
}

#[tokio::test]
async fn anonymous_secure_endpoint_is_forbidden() {
    let server = MockServer::start().await;
    let app = build_app(&server.uri());

    let response = app.oneshot(get("/api/v1/secure-endpoint")).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let body = body_json(response.into_body()).await;
    assert_eq!(body["code"], "AUTH_ROLE_DENIED");
}

#[tokio::test]
async fn admin_token_is_granted_access() {
    let server = MockServer::start().await;
    mount_jwks(&server, jwks_json(&[("k1", TEST_RSA_N)]), 1).await;
    let app = build_app(&server.uri());

    let token = sign_rs256(TEST_RSA_PEM, "k1", &admin_claims(future_exp()));
    let response = app
        .oneshot(get_with_bearer("/api/v1/secure-endpoint", &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response.into_body()).await;
    assert_eq!(body["message"], "Access Granted");
}

#[tokio::test]
async fn token_cookie_is_accepted_as_bearer() {
    let server = MockServer::start().await;
    mount_jwks(&server, jwks_json(&[("k1", TEST_RSA_N)]), 1).await;
    let app = build_app(&server.uri());

    let token = sign_rs256(TEST_RSA_PEM, "k1", &admin_claims(future_exp()));
    let request = Request::builder()
        .uri("/api/v1/secure-endpoint")
        .header(header::COOKIE, format!("token={token}"))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn valid_token_without_required_role_is_forbidden() {
    let server = MockServer::start().await;
    mount_jwks(&server, jwks_json(&[("k1", TEST_RSA_N)]), 1).await;
    let app = build_app(&server.uri());

    let claims = json!({
        "sub": "user-456",
        "aud": "demo-client",
        "exp": future_exp(),
        "realm_access": { "roles": ["user"] },
    });
    let token = sign_rs256(TEST_RSA_PEM, "k1", &claims);
    let response = app
        .oneshot(get_with_bearer("/api/v1/secure-endpoint", &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn garbage_token_is_unauthorized() {
    let server = MockServer::start().await;
    let app = build_app(&server.uri());

    let response = app
        .oneshot(get_with_bearer("/api/v1/secure-endpoint", "garbage"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body = body_json(response.into_body()).await;
    assert_eq!(body["code"], "AUTH_TOKEN_MALFORMED");
    assert!(body["correlation_id"].is_string());
}

#[tokio::test]
async fn expired_token_is_unauthorized() {
    let server = MockServer::start().await;
    mount_jwks(&server, jwks_json(&[("k1", TEST_RSA_N)]), 1).await;
    let app = build_app(&server.uri());

    let exp = chrono::Utc::now().timestamp() - 60;
    let token = sign_rs256(TEST_RSA_PEM, "k1", &admin_claims(exp));
    let response = app
        .oneshot(get_with_bearer("/api/v1/secure-endpoint", &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body = body_json(response.into_body()).await;
    assert_eq!(body["code"], "AUTH_TOKEN_EXPIRED");
}

#[tokio::test]
async fn key_source_outage_maps_to_500() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(jwks_path()))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    let app = build_app(&server.uri());

    let token = sign_rs256(TEST_RSA_PEM, "k1", &admin_claims(future_exp()));
    let response = app
        .oneshot(get_with_bearer("/api/v1/secure-endpoint", &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = body_json(response.into_body()).await;
    assert_eq!(body["code"], "AUTH_KEY_SOURCE_UNAVAILABLE");
}

#[tokio::test]
async fn metrics_endpoint_is_exempt() {
    let server = MockServer::start().await;
    let app = build_app(&server.uri());

    let response = app.oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn logout_clears_session_cookies() {
    let server = MockServer::start().await;
    let app = build_app(&server.uri());

    let response = app.oneshot(get("/logout")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let cleared: Vec<String> = response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect();
    assert_eq!(cleared.len(), 3);
    assert!(cleared.iter().all(|c| c.contains("Max-Age=0")));
    assert!(cleared.iter().any(|c| c.starts_with("refresh_token=")));
    assert!(cleared.iter().any(|c| c.starts_with("token=")));
    assert!(cleared.iter().any(|c| c.starts_with("usrData=")));

    let body = body_json(response.into_body()).await;
    assert!(
        body["logout_url"]
            .as_str()
            .unwrap()
            .ends_with("/protocol/openid-connect/logout")
    );
}

#[tokio::test]
async fn callback_exchanges_code_and_sets_session() {
    let server = MockServer::start().await;
    mount_jwks(&server, jwks_json(&[("k1", TEST_RSA_N)]), 1).await;

    let access_token = sign_rs256(TEST_RSA_PEM, "k1", &admin_claims(future_exp()));
    Mock::given(method("POST"))
        .and(path("/realms/demo/protocol/openid-connect/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": access_token,
            "refresh_token": "refresh-opaque",
            "expires_in": 300,
        })))
        .expect(1)
        .mount(&server)
        .await;

    let app = build_app(&server.uri());
    let response = app.oneshot(get("/callback?code=abc123")).await.unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/");

    let cookies: Vec<String> = response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect();
    assert_eq!(cookies.len(), 3);
    assert!(
        cookies
            .iter()
            .any(|c| c.starts_with("token=") && c.contains("HttpOnly"))
    );
    assert!(
        cookies
            .iter()
            .any(|c| c.starts_with("refresh_token=") && c.contains("HttpOnly"))
    );
    // The refresh token is stored encrypted, never verbatim.
    assert!(!cookies.iter().any(|c| c.contains("refresh-opaque")));
}

#[tokio::test]
async fn callback_provider_failure_maps_to_500() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/realms/demo/protocol/openid-connect/token"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let app = build_app(&server.uri());
    let response = app.oneshot(get("/callback?code=abc123")).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = body_json(response.into_body()).await;
    assert_eq!(body["code"], "PROVIDER_UNAVAILABLE");
}
