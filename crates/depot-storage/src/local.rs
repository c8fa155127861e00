use crate::sanitize::{sanitize_filename, validate_relative_path};
use crate::traits::{FileLocation, ProviderResult, StorageError, StorageProvider};
use async_trait::async_trait;
use bytes::Bytes;
use depot_core::{Item, ProviderKind, StorageUsage};
use std::path::PathBuf;
use sysinfo::Disks;
use tokio::fs;
use tokio::io::AsyncWriteExt;

const USAGE_LABEL: &str = "Local Storage";

/// Local filesystem storage provider
#[derive(Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
    strict_paths: bool,
}

impl LocalStorage {
    /// Create a new LocalStorage instance rooted at `base_path`.
    ///
    /// The base directory is created if missing. With `strict_paths` enabled,
    /// delete/get/list paths are validated against traversal in addition to
    /// the filename sanitization uploads always get.
    pub async fn new(base_path: impl Into<PathBuf>, strict_paths: bool) -> ProviderResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalStorage {
            base_path,
            strict_paths,
        })
    }

    /// Resolve a backend-relative path to a filesystem path.
    fn full_path(&self, relative: &str) -> ProviderResult<PathBuf> {
        if self.strict_paths {
            validate_relative_path(relative)?;
        }
        Ok(self.base_path.join(relative))
    }

    /// Join listing paths with `/` regardless of platform so item paths stay
    /// valid inputs for later delete/get calls on any backend.
    fn child_path(parent: &str, name: &str) -> String {
        if parent.is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", parent.trim_end_matches('/'), name)
        }
    }

    /// Sum of all file sizes under `base_path`.
    async fn walk_used_bytes(&self) -> ProviderResult<u64> {
        let mut used: u64 = 0;
        let mut pending = vec![self.base_path.clone()];

        while let Some(dir) = pending.pop() {
            let mut entries = fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let meta = entry.metadata().await?;
                if meta.is_dir() {
                    pending.push(entry.path());
                } else {
                    used += meta.len();
                }
            }
        }

        Ok(used)
    }

    /// Total capacity of the filesystem holding `base_path`.
    fn disk_total_bytes(&self) -> Option<u64> {
        let base = self
            .base_path
            .canonicalize()
            .unwrap_or_else(|_| self.base_path.clone());
        let disks = Disks::new_with_refreshed_list();

        // Pick the most specific mount point containing the base path.
        disks
            .iter()
            .filter(|disk| base.starts_with(disk.mount_point()))
            .max_by_key(|disk| disk.mount_point().as_os_str().len())
            .map(|disk| disk.total_space())
    }
}

#[async_trait]
impl StorageProvider for LocalStorage {
    async fn list_items(&self, path: &str) -> Vec<Item> {
        let full_path = match self.full_path(path) {
            Ok(p) => p,
            Err(e) => {
                tracing::error!(path = %path, error = %e, "Rejected listing path");
                return Vec::new();
            }
        };

        let mut entries = match fs::read_dir(&full_path).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::error!(
                    path = %full_path.display(),
                    error = %e,
                    "Error listing local files"
                );
                return Vec::new();
            }
        };

        let mut items = Vec::new();
        loop {
            match entries.next_entry().await {
                Ok(Some(entry)) => {
                    let name = entry.file_name().to_string_lossy().into_owned();
                    let meta = match entry.metadata().await {
                        Ok(meta) => meta,
                        Err(e) => {
                            tracing::debug!(name = %name, error = %e, "Skipping unreadable entry");
                            continue;
                        }
                    };
                    let is_dir = meta.is_dir();
                    items.push(Item {
                        path: Self::child_path(path, &name),
                        name,
                        is_dir,
                        size_bytes: if is_dir { 0 } else { meta.len() },
                    });
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::error!(
                        path = %full_path.display(),
                        error = %e,
                        "Error listing local files"
                    );
                    break;
                }
            }
        }

        items
    }

    async fn upload_file(&self, data: Bytes, path: &str, filename: &str) -> ProviderResult<()> {
        let safe_filename = sanitize_filename(filename);
        if safe_filename.is_empty() {
            return Err(StorageError::InvalidPath(format!(
                "filename reduces to nothing after sanitization: {filename}"
            )));
        }

        let target_dir = self.full_path(path)?;
        fs::create_dir_all(&target_dir).await.map_err(|e| {
            StorageError::UploadFailed(format!(
                "Failed to create directory {}: {}",
                target_dir.display(),
                e
            ))
        })?;

        let file_path = target_dir.join(&safe_filename);
        let size = data.len();
        let start = std::time::Instant::now();

        let mut file = fs::File::create(&file_path).await.map_err(|e| {
            StorageError::UploadFailed(format!(
                "Failed to create file {}: {}",
                file_path.display(),
                e
            ))
        })?;

        file.write_all(&data).await.map_err(|e| {
            StorageError::UploadFailed(format!(
                "Failed to write file {}: {}",
                file_path.display(),
                e
            ))
        })?;

        file.sync_all().await.map_err(|e| {
            StorageError::UploadFailed(format!(
                "Failed to sync file {}: {}",
                file_path.display(),
                e
            ))
        })?;

        tracing::info!(
            path = %file_path.display(),
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage upload successful"
        );

        Ok(())
    }

    async fn delete_file(&self, path: &str) -> ProviderResult<()> {
        let full_path = self.full_path(path)?;

        let meta = fs::metadata(&full_path)
            .await
            .map_err(|_| StorageError::NotFound(path.to_string()))?;

        if meta.is_dir() {
            // Empty directories only; no recursive delete.
            fs::remove_dir(&full_path).await.map_err(|e| {
                StorageError::DeleteFailed(format!(
                    "Failed to delete directory {}: {}",
                    full_path.display(),
                    e
                ))
            })?;
        } else {
            fs::remove_file(&full_path).await.map_err(|e| {
                StorageError::DeleteFailed(format!(
                    "Failed to delete file {}: {}",
                    full_path.display(),
                    e
                ))
            })?;
        }

        tracing::info!(path = %full_path.display(), "Local storage delete successful");
        Ok(())
    }

    async fn get_file(&self, path: &str) -> ProviderResult<FileLocation> {
        let full_path = self.full_path(path)?;

        let meta = fs::metadata(&full_path)
            .await
            .map_err(|_| StorageError::NotFound(path.to_string()))?;

        if meta.is_dir() {
            return Err(StorageError::GetFailed(format!(
                "{path} is a directory, not a file"
            )));
        }

        Ok(FileLocation::Path(full_path))
    }

    async fn create_folder(&self, path: &str) -> ProviderResult<()> {
        let full_path = self.full_path(path)?;

        fs::create_dir_all(&full_path).await.map_err(|e| {
            StorageError::CreateFolderFailed(format!(
                "Failed to create folder {}: {}",
                full_path.display(),
                e
            ))
        })?;

        Ok(())
    }

    async fn storage_usage(&self) -> StorageUsage {
        let used = match self.walk_used_bytes().await {
            Ok(used) => used,
            Err(e) => {
                tracing::error!(
                    base_path = %self.base_path.display(),
                    error = %e,
                    "Error computing local storage usage"
                );
                return StorageUsage::placeholder(USAGE_LABEL);
            }
        };

        match self.disk_total_bytes() {
            Some(total) => StorageUsage::new(used, total, USAGE_LABEL),
            None => {
                tracing::warn!(
                    base_path = %self.base_path.display(),
                    "Could not determine disk capacity for local storage"
                );
                StorageUsage::placeholder(USAGE_LABEL)
            }
        }
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Local
    }
}
