//! gRPC service implementations

mod auth;
mod catalog;

pub use auth::AuthServiceImpl;
pub use catalog::CatalogServiceImpl;
