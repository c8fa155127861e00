//! Shared data models for the storage layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One entry in a directory listing, file or folder.
///
/// `path` is the backend-relative identifier that later delete/get calls
/// accept unchanged. Within a single listing no two items share a `path`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub name: String,
    pub is_dir: bool,
    /// Byte size of the entry; always 0 for directories.
    pub size_bytes: u64,
    pub path: String,
}

/// Quota snapshot for one backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageUsage {
    pub used_bytes: u64,
    /// Never 0 so callers can divide `used / total` for a percentage.
    pub total_bytes: u64,
    /// Human label identifying which backend produced the snapshot.
    pub name: String,
}

impl StorageUsage {
    pub fn new(used_bytes: u64, total_bytes: u64, name: impl Into<String>) -> Self {
        StorageUsage {
            used_bytes,
            total_bytes: total_bytes.max(1),
            name: name.into(),
        }
    }

    /// Degraded snapshot returned when the underlying query failed.
    pub fn placeholder(name: impl Into<String>) -> Self {
        StorageUsage {
            used_bytes: 0,
            total_bytes: 1,
            name: name.into(),
        }
    }

    pub fn percent_used(&self) -> f64 {
        (self.used_bytes as f64 / self.total_bytes as f64) * 100.0
    }
}

/// Health and configuration snapshot for the remote backend.
///
/// Mutated in place by each status check; never persisted across restarts.
/// `online` is never true while `configured` is false, and `online` and
/// `error` are never both true in a resolved status.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackendStatus {
    pub configured: bool,
    pub online: bool,
    pub error: bool,
    pub error_message: String,
    pub last_check: Option<DateTime<Utc>>,
}

impl BackendStatus {
    /// True when the backend can be handed live traffic.
    pub fn is_usable(&self) -> bool {
        self.configured && self.online && !self.error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_total_is_never_zero() {
        let usage = StorageUsage::new(10, 0, "Local Storage");
        assert_eq!(usage.total_bytes, 1);

        let placeholder = StorageUsage::placeholder("Cloudinary");
        assert_eq!(placeholder.used_bytes, 0);
        assert_eq!(placeholder.total_bytes, 1);
    }

    #[test]
    fn percent_used_is_defined_for_placeholder() {
        let usage = StorageUsage::placeholder("Cloudinary");
        assert_eq!(usage.percent_used(), 0.0);
    }

    #[test]
    fn fresh_status_is_not_usable() {
        let status = BackendStatus::default();
        assert!(!status.is_usable());
        assert!(status.last_check.is_none());
    }
}
