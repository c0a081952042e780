//! `libristack-auth` — pure authentication/authorization boundary.
//!
//! Tokens are minted by an external auth collaborator; this crate only
//! verifies them and turns their claims into an explicit [`Principal`].
//! It is decoupled from HTTP and storage.

pub mod authorize;
pub mod claims;
pub mod jwt;
pub mod permissions;
pub mod principal;
pub mod roles;

pub use authorize::{AuthzError, CommandAuthorization, authorize};
pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use jwt::{Hs256JwtValidator, JwtError, JwtValidator};
pub use permissions::Permission;
pub use principal::Principal;
pub use roles::{Role, permissions_for_roles};
