//! Access to the authoritative data source.
//!
//! `PersistentStore` is the seam the cache loads through. `ApiClient` is the
//! HTTP implementation: the aggregate document comes from one endpoint and
//! single kinds are projected from it, except the upload queue, which has its
//! own CRUD endpoint.

pub mod client;
pub mod error;
pub mod store;

pub use client::ApiClient;
pub use error::ApiError;
pub use store::PersistentStore;
