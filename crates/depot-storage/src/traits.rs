//! Storage abstraction trait
//!
//! This module defines the StorageProvider trait that all storage backends
//! must implement, plus the shared error and result types.

use async_trait::async_trait;
use bytes::Bytes;
use depot_core::{Item, ProviderKind, StorageUsage};
use std::path::PathBuf;
use thiserror::Error;

/// Storage operation errors
///
/// Every failing operation returns exactly one of these; backend-specific
/// errors (I/O, HTTP) never escape a provider in their raw form.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Get failed: {0}")]
    GetFailed(String),

    #[error("Create folder failed: {0}")]
    CreateFolderFailed(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations
pub type ProviderResult<T> = Result<T, StorageError>;

/// Where a requested file can be fetched from.
///
/// Cloud backends hand back a redirectable URL; the local backend hands back
/// a filesystem path for the boundary layer to stream. Callers branch on the
/// variant only at the boundary, never inside the core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileLocation {
    Url(String),
    Path(PathBuf),
}

/// Storage abstraction trait
///
/// Both backends (local filesystem, Cloudinary) implement this trait so the
/// boundary layer can work against either without knowing which one the
/// factory picked.
///
/// Failure semantics: `list_items` and `storage_usage` are best-effort and
/// degrade to an empty listing or a placeholder snapshot (failures are
/// logged, the UI must always render something). The remaining operations
/// surface a single-message error the caller shows as a soft warning.
#[async_trait]
pub trait StorageProvider: Send + Sync {
    /// List the direct children of `path` (non-recursive). Empty on an empty
    /// directory and on internal failure.
    async fn list_items(&self, path: &str) -> Vec<Item>;

    /// Write `data` under `path/filename`, sanitizing `filename` first and
    /// creating intermediate directories/prefixes as needed.
    async fn upload_file(&self, data: Bytes, path: &str, filename: &str) -> ProviderResult<()>;

    /// Remove a single file or an empty folder at `path`. Deleting a
    /// non-empty directory is backend-defined.
    async fn delete_file(&self, path: &str) -> ProviderResult<()>;

    /// Resolve `path` to a fetchable location.
    async fn get_file(&self, path: &str) -> ProviderResult<FileLocation>;

    /// Idempotently ensure a folder/prefix exists at `path`.
    async fn create_folder(&self, path: &str) -> ProviderResult<()>;

    /// Best-effort quota snapshot; `total_bytes` is at least 1 even when the
    /// underlying query fails.
    async fn storage_usage(&self) -> StorageUsage;

    /// Which backend this provider is.
    fn kind(&self) -> ProviderKind;
}
