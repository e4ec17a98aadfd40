//! Data models for the lesson storefront.
//!
//! The cache treats these as opaque typed collections. Each type maps to one
//! `DataKind` partition:
//!
//! - `Module`: video/audio lessons in the catalog
//! - `User`: accounts, including parental-control flags
//! - `Purchase`: completed orders
//! - `AppSettings`: storefront-wide settings
//! - `UploadQueueItem`: media uploads awaiting processing
//! - `AppSnapshot`: the aggregate document holding all of the above

pub mod account;
pub mod catalog;
pub mod settings;
pub mod snapshot;
pub mod upload;

pub use account::{Purchase, User, UserRole};
pub use catalog::{MediaType, Module};
pub use settings::AppSettings;
pub use snapshot::AppSnapshot;
pub use upload::{UploadQueueItem, UploadStatus};
