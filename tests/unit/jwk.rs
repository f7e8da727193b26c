//! JWK conversion and rejection rules.

use jsonwebtoken::Algorithm;
use oidc_gate::jwt::jwk_cache::{Jwk, jwk_to_signing_key};

// Any base64url string of modulus length works for conversion checks; the
// components need not form a usable key pair here.
const RSA_N: &str = "xKI77HlRA5LtBiOQoN6bqQ-gPfeUFzMduzjsu3-i7xL_NcaEEsBXkTx8qFEzxw4vcHSTRWcGxrhMhNk0tALEKJuK9DZTc9Qp6F9enlCSJDIqXd48qe9XiTE-GLg919LrkKuWQtFYsoupevqycTOowOoL183xeRRCmYVwICxQsFsVyK6We_YZzVP3cVkJISip9uD0Wo6LJzHXVSHkIivHepYnmAjSEBNykFJ6TYWvKpRYOVhWMSLrlW9UN5uiqkXLl3SrLpl3dbgYWL02r_CuduEkLDbihB41lMjsJsqaoRrKicGIQW92lMBbV_E0XP_XZBSpXNMhi9sS1AAyXSZRjw";

fn rsa_jwk(kid: &str) -> Jwk {
    Jwk {
        kty: "RSA".to_string(),
        kid: kid.to_string(),
        key_use: Some("sig".to_string()),
        alg: Some("RS256".to_string()),
        n: Some(RSA_N.to_string()),
        e: Some("AQAB".to_string()),
        x: None,
        y: None,
        crv: None,
    }
}

#[test]
fn test_rsa_jwk_converts() {
    let key = jwk_to_signing_key(&rsa_jwk("k1")).expect("usable key");
    assert_eq!(key.kid, "k1");
    assert_eq!(key.algorithm, Algorithm::RS256);
}

#[test]
fn test_rsa_without_alg_defaults_to_rs256() {
    let mut jwk = rsa_jwk("k1");
    jwk.alg = None;
    let key = jwk_to_signing_key(&jwk).expect("usable key");
    assert_eq!(key.algorithm, Algorithm::RS256);
}

#[test]
fn test_rsa_declared_rs512_is_kept() {
    let mut jwk = rsa_jwk("k1");
    jwk.alg = Some("RS512".to_string());
    let key = jwk_to_signing_key(&jwk).expect("usable key");
    assert_eq!(key.algorithm, Algorithm::RS512);
}

#[test]
fn test_rsa_missing_modulus_rejected() {
    let mut jwk = rsa_jwk("k1");
    jwk.n = None;
    assert!(jwk_to_signing_key(&jwk).is_none());
}

#[test]
fn test_rsa_missing_exponent_rejected() {
    let mut jwk = rsa_jwk("k1");
    jwk.e = None;
    assert!(jwk_to_signing_key(&jwk).is_none());
}

#[test]
fn test_rsa_small_modulus_rejected() {
    let mut jwk = rsa_jwk("k1");
    // Well under 2048 bits.
    jwk.n = Some("AQAB".to_string());
    assert!(jwk_to_signing_key(&jwk).is_none());
}

#[test]
fn test_symmetric_alg_rejected() {
    let mut jwk = rsa_jwk("k1");
    jwk.alg = Some("HS256".to_string());
    assert!(jwk_to_signing_key(&jwk).is_none());
}

#[test]
fn test_unknown_alg_string_rejected() {
    let mut jwk = rsa_jwk("k1");
    jwk.alg = Some("none".to_string());
    assert!(jwk_to_signing_key(&jwk).is_none());
}

#[test]
fn test_unsupported_key_type_rejected() {
    let jwk = Jwk {
        kty: "oct".to_string(),
        kid: "sym".to_string(),
        key_use: None,
        alg: Some("HS256".to_string()),
        n: None,
        e: None,
        x: None,
        y: None,
        crv: None,
    };
    assert!(jwk_to_signing_key(&jwk).is_none());
}

#[test]
fn test_weak_ec_curve_rejected() {
    let jwk = Jwk {
        kty: "EC".to_string(),
        kid: "ec1".to_string(),
        key_use: Some("sig".to_string()),
        alg: None,
        n: None,
        e: None,
        x: Some("AQAB".to_string()),
        y: Some("AQAB".to_string()),
        crv: Some("P-192".to_string()),
    };
    assert!(jwk_to_signing_key(&jwk).is_none());
}

#[test]
fn test_jwks_document_parses() {
    let doc = serde_json::json!({
        "keys": [
            { "kty": "RSA", "kid": "a", "use": "sig", "alg": "RS256", "n": RSA_N, "e": "AQAB" },
            { "kty": "EC", "kid": "b", "x": "eA", "y": "eQ", "crv": "P-256" },
        ]
    });
    let jwks: oidc_gate::jwt::jwk_cache::Jwks = serde_json::from_value(doc).expect("parses");
    assert_eq!(jwks.keys.len(), 2);
    assert_eq!(jwks.keys[0].kid, "a");
    assert_eq!(jwks.keys[1].crv.as_deref(), Some("P-256"));
}
