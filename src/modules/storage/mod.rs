//! Storage module for asset objects
//!
//! Defines the gateway the asset feature talks to and its MinIO/S3-compatible
//! implementation, which mints presigned upload URLs and removes objects.

mod gateway;
mod minio_client;

pub use gateway::ObjectStorageGateway;
pub use minio_client::MinIOClient;
