//! Laptop catalog gRPC service
//!
//! In-memory catalog of laptops with per-method role-based access control and
//! three streaming protocols: client-streamed image upload, bidirectional
//! rating exchange, and server-streamed filtered search. Authorization is
//! enforced by [`grpc_auth::AuthLayer`] wrapping the whole router; state lives
//! in explicit store objects injected into the handlers at construction time.

pub mod client;
pub mod config;
pub mod deadline;
pub mod error;
pub mod grpc;
pub mod sample;
pub mod security;
pub mod store;
pub mod tls;

// Generated proto code from proto/catalog.proto
pub mod catalog {
    pub mod v1 {
        tonic::include_proto!("catalog.v1");
    }
}

pub use config::Config;

/// Upper bound on a single streamed upload chunk. Exceeding it is a protocol
/// violation, not a transport concern.
pub const MAX_CHUNK_SIZE: usize = 1 << 20;
