//! CLI module for bunny-storage
//!
//! Command implementations for the `bunny-storage` binary: listing,
//! uploading, downloading, deleting (single and batch), existence checks,
//! and pruning of old files.

pub mod commands;
