//! Depot Core Library
//!
//! This crate provides configuration, constants, and the data models shared by
//! the storage backends: listing entries, usage snapshots, and the remote
//! backend health status.

pub mod config;
pub mod constants;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use config::{CloudinaryCredentials, Config};
pub use models::{BackendStatus, Item, StorageUsage};
pub use storage_types::ProviderKind;
