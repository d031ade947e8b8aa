//! bunny-storage - Async client for the Bunny edge storage HTTP API

pub mod cli;
pub mod config;
pub mod storage;

pub use config::Config;
pub use storage::{FileMetadata, Region, StorageClient, StorageError};
