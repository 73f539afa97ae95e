mod asset;

pub use asset::{FileMetadata, FileMetadataChanges, NewFileMetadata};
