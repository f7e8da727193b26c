//! Role-membership properties over arbitrary role sets.

use super::generators::{arb_role, arb_role_set};
use oidc_gate::gate::role_allows;
use proptest::prelude::*;
use std::collections::HashSet;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Allow iff the required role is a member, for role sets of size 0..N.
    #[test]
    fn prop_allow_iff_member(role_names in arb_role_set(), required in arb_role()) {
        let roles: HashSet<String> = role_names.iter().cloned().collect();
        prop_assert_eq!(role_allows(&roles, &required), roles.contains(&required));
    }

    /// Adding the required role to any set always flips the gate to allow.
    #[test]
    fn prop_adding_required_role_allows(role_names in arb_role_set(), required in arb_role()) {
        let mut roles: HashSet<String> = role_names.iter().cloned().collect();
        roles.insert(required.clone());
        prop_assert!(role_allows(&roles, &required));
    }

    /// Removing the required role from any set always flips the gate to deny.
    #[test]
    fn prop_removing_required_role_denies(role_names in arb_role_set(), required in arb_role()) {
        let mut roles: HashSet<String> = role_names.iter().cloned().collect();
        roles.remove(&required);
        prop_assert!(!role_allows(&roles, &required));
    }

    /// The empty role set never allows anything.
    #[test]
    fn prop_empty_set_denies_all(required in arb_role()) {
        prop_assert!(!role_allows(&HashSet::new(), &required));
    }

    /// Unrelated roles do not influence the decision.
    #[test]
    fn prop_irrelevant_roles_ignored(role_names in arb_role_set(), required in arb_role()) {
        let without: HashSet<String> = role_names
            .iter()
            .filter(|r| **r != required)
            .cloned()
            .collect();
        prop_assert!(!role_allows(&without, &required));
    }
}
