//! Storage client module for the Bunny edge storage API
//!
//! This module provides:
//! - Region code resolution to storage endpoints
//! - Path normalization for zone-scoped wire paths
//! - Async storage operations (list, get, put, delete, exists)
//! - Typed metadata and error structures

pub mod client;
pub mod error;
pub mod metadata;
pub mod path;
pub mod region;

// Re-export main types for convenience
pub use client::{Result, StorageClient};
pub use error::StorageError;
pub use metadata::FileMetadata;
pub use path::normalize_path;
pub use region::Region;
