pub mod auth;

pub use auth::{VerifiedClaims, bearer_token, cookie_value, rbac_gate};
