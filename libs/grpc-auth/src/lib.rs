//! Role-based JWT authorization for gRPC services
//!
//! This library provides the shared authentication layer for the catalog
//! services: token issuance and verification, plus server-side role-based
//! interception keyed on the fully-qualified gRPC method path.
//!
//! ## Core Components
//!
//! - **TokenManager**: Issues and verifies signed, time-limited claims
//! - **UserClaims**: Structured representation of a caller's identity and role
//! - **AccessTable**: Typed mapping from gRPC method to permitted roles
//! - **AuthLayer**: Tower layer that authorizes every call before the handler runs
//!
//! ## Design Notes
//!
//! - Symmetric signing (HS256): issuer and verifier live in the same trust
//!   domain, so a shared secret is adequate. Asymmetric signing is a noted
//!   extension, not a requirement.
//! - Methods absent from the access table are admitted unconditionally.
//!   This is allow-by-absence, not deny-by-default: public methods such as
//!   login and search stay open without an explicit entry.
//! - Authorization happens once per call, before the handler, for unary and
//!   streaming methods alike. Stream messages are never re-checked.

mod access;
mod layer;
mod token;

pub use access::{AccessTable, AuthenticatedMethod, Role, UnknownRole};
pub use layer::{AuthLayer, AuthService};
pub use token::{TokenError, TokenManager, UserClaims};

/// Metadata key carrying the bearer token on every call.
pub const AUTHORIZATION_KEY: &str = "authorization";
