//! Typed role/method access table
//!
//! Both sides of the access-control map are closed enums: the method side
//! covers the catalog's authenticated RPCs, the role side the known roles, so
//! a typo cannot silently open (or close) an endpoint. The table is read-only
//! after construction.

use std::collections::HashMap;
use std::str::FromStr;

/// Roles known to the catalog services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }

    /// Compare against a role string from token claims, case-insensitively.
    pub fn matches(self, claimed: &str) -> bool {
        self.as_str().eq_ignore_ascii_case(claimed)
    }
}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("admin") {
            Ok(Role::Admin)
        } else if s.eq_ignore_ascii_case("user") {
            Ok(Role::User)
        } else {
            Err(UnknownRole(s.to_string()))
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

/// The closed set of RPCs that require authorization.
///
/// `SearchLaptop` and `Login` are deliberately absent: they are open methods
/// and the table's allow-by-absence policy admits them without a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthenticatedMethod {
    CreateLaptop,
    UploadImage,
    RateLaptop,
}

impl AuthenticatedMethod {
    /// Fully-qualified gRPC method path, as seen in the request URI.
    pub fn path(self) -> &'static str {
        match self {
            AuthenticatedMethod::CreateLaptop => "/catalog.v1.CatalogService/CreateLaptop",
            AuthenticatedMethod::UploadImage => "/catalog.v1.CatalogService/UploadImage",
            AuthenticatedMethod::RateLaptop => "/catalog.v1.CatalogService/RateLaptop",
        }
    }
}

/// Mapping from gRPC method path to the set of roles permitted to invoke it.
///
/// Absence of a method means "no authorization required".
#[derive(Debug, Clone, Default)]
pub struct AccessTable {
    roles: HashMap<&'static str, Vec<Role>>,
}

impl AccessTable {
    pub fn new(entries: impl IntoIterator<Item = (AuthenticatedMethod, Vec<Role>)>) -> Self {
        let roles = entries
            .into_iter()
            .map(|(method, roles)| (method.path(), roles))
            .collect();
        Self { roles }
    }

    /// The catalog's production policy: mutations are admin-only, rating is
    /// open to both roles.
    pub fn catalog_defaults() -> Self {
        Self::new([
            (AuthenticatedMethod::CreateLaptop, vec![Role::Admin]),
            (AuthenticatedMethod::UploadImage, vec![Role::Admin]),
            (AuthenticatedMethod::RateLaptop, vec![Role::Admin, Role::User]),
        ])
    }

    /// Roles allowed to invoke `path`, or `None` when the method is open.
    pub fn roles_for(&self, path: &str) -> Option<&[Role]> {
        self.roles.get(path).map(Vec::as_slice)
    }
}
