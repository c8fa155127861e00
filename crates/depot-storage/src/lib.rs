//! Depot Storage Library
//!
//! This crate provides the storage abstraction for the file manager: the
//! `StorageProvider` trait, a local filesystem backend, a Cloudinary backend
//! with a cached health check, and the factory that picks between them.
//!
//! # Paths
//!
//! Providers address content by relative paths. For local storage that is a
//! filesystem path under the configured base directory; for Cloudinary it is
//! the resource's public id (folders and files are separate concepts there).
//! User-supplied filenames are sanitized before they become part of a path;
//! see the `sanitize` module.

pub mod cloudinary;
pub mod factory;
pub mod local;
pub mod resource;
pub mod sanitize;
pub mod status;
pub mod traits;

// Re-export commonly used types
pub use cloudinary::{CloudinaryClient, CloudinaryStorage};
pub use depot_core::ProviderKind;
pub use factory::resolve_provider;
pub use local::LocalStorage;
pub use resource::ResourceKind;
pub use status::StatusCache;
pub use traits::{FileLocation, ProviderResult, StorageError, StorageProvider};
