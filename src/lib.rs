//! Direct-to-object-storage asset uploads.
//!
//! The server half (`features`, `modules`, `core`) presigns uploads, owns asset
//! metadata and reconciles it with storage. The `client` half derives keys,
//! presigns through the API and transfers bytes straight to storage.

pub mod client;
pub mod core;
pub mod features;
pub mod modules;
pub mod shared;
