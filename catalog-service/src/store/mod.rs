//! Concurrency-safe in-memory stores
//!
//! State is memory-resident by design; durability across restarts is a
//! non-goal. Each store serializes access with its own `RwLock`: mutations
//! take the exclusive lock, lookups and scans take the shared one.

mod image;
mod laptop;
mod rating;
mod user;

pub use image::{DiskImageStore, ImageInfo, ImageStore, MemoryImageStore};
pub use laptop::LaptopStore;
pub use rating::{Rating, RatingStore};
pub use user::{User, UserStore};
