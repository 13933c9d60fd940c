//! Client-side wiring: login, token refresh, and authenticated catalog calls

mod auth_client;
mod catalog_client;
mod interceptor;

pub use auth_client::AuthClient;
pub use catalog_client::{CatalogClient, LaptopRating};
pub use interceptor::ClientAuthInterceptor;
