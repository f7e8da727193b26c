pub mod claims;
pub mod jwk_cache;
pub mod verifier;

pub use claims::{Audience, ClaimSet, RawClaims, RealmAccess};
pub use jwk_cache::{Jwk, Jwks, JwkCache, KeyFetchFailure, SigningKey};
pub use verifier::TokenVerifier;
