//! Authorization decision table.

use oidc_gate::gate::{AccessGate, Decision, DenyReason, role_allows};
use std::collections::HashSet;

fn roles(names: &[&str]) -> HashSet<String> {
    names.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_allow_iff_role_present() {
    assert!(role_allows(&roles(&["admin", "user"]), "admin"));
    assert!(!role_allows(&roles(&["user"]), "admin"));
    assert!(!role_allows(&roles(&[]), "admin"));
}

#[test]
fn test_absent_claims_deny_with_missing_role() {
    let gate = AccessGate::new(["/"]);
    match gate.authorize(None, "admin") {
        Decision::Deny(DenyReason::MissingRole { role }) => assert_eq!(role, "admin"),
        other => panic!("expected deny, got {other:?}"),
    }
}

#[test]
fn test_role_names_are_exact_matches() {
    let set = roles(&["admin"]);
    assert!(!role_allows(&set, "Admin"));
    assert!(!role_allows(&set, "admin "));
    assert!(!role_allows(&set, "adm"));
}

#[test]
fn test_exemption_is_exact_path_match() {
    let gate = AccessGate::new(["/", "/callback", "/logout", "/metrics"]);
    assert!(gate.is_exempt("/logout"));
    assert!(!gate.is_exempt("/logout/"));
    assert!(!gate.is_exempt("/api/v1/secure-endpoint"));
    assert!(!gate.is_exempt(""));
}

#[test]
fn test_empty_exemption_list_gates_everything() {
    let gate = AccessGate::new(Vec::<String>::new());
    assert!(!gate.is_exempt("/"));
    assert!(!gate.is_exempt("/callback"));
}
