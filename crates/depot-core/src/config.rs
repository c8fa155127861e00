//! Configuration module
//!
//! Environment-driven configuration for the file manager core. Providers
//! receive everything they need (credentials, base path, timeouts) through
//! this struct; nothing reads ambient process state after startup.

use std::env;
use std::time::Duration;

use crate::constants::{DEFAULT_MAX_CONTENT_LENGTH_MB, STATUS_CACHE_TTL_SECS};

const DEFAULT_UPLOAD_FOLDER: &str = "uploads";
const DEFAULT_REMOTE_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CLOUDINARY_API_BASE: &str = "https://api.cloudinary.com/v1_1";

/// Credentials gating the remote backend. All three fields are required; the
/// factory only considers the remote backend when a complete set is present.
#[derive(Clone, Debug)]
pub struct CloudinaryCredentials {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
}

impl CloudinaryCredentials {
    pub fn is_complete(&self) -> bool {
        !self.cloud_name.is_empty() && !self.api_key.is_empty() && !self.api_secret.is_empty()
    }
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub cloudinary_cloud_name: Option<String>,
    pub cloudinary_api_key: Option<String>,
    pub cloudinary_api_secret: Option<String>,
    /// Endpoint override for the remote API, e.g. a self-hosted gateway or a
    /// mock server in tests.
    pub cloudinary_api_base: String,
    /// Root directory for local storage.
    pub upload_folder: String,
    pub max_content_length_bytes: u64,
    /// Disables the whole file-manager route group at the boundary.
    pub file_manager_enabled: bool,
    /// Validate delete/get/list paths against traversal, not just uploads.
    pub strict_path_checks: bool,
    pub status_cache_ttl: Duration,
    /// Bounds the health probe and every remote upload/delete/listing call.
    pub remote_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let max_content_length_mb = env::var("MAX_CONTENT_LENGTH_MB")
            .unwrap_or_else(|_| DEFAULT_MAX_CONTENT_LENGTH_MB.to_string())
            .parse::<u64>()
            .unwrap_or(DEFAULT_MAX_CONTENT_LENGTH_MB);

        let config = Config {
            cloudinary_cloud_name: env::var("CLOUDINARY_CLOUD_NAME")
                .ok()
                .filter(|s| !s.is_empty()),
            cloudinary_api_key: env::var("CLOUDINARY_API_KEY").ok().filter(|s| !s.is_empty()),
            cloudinary_api_secret: env::var("CLOUDINARY_API_SECRET")
                .ok()
                .filter(|s| !s.is_empty()),
            cloudinary_api_base: env::var("CLOUDINARY_API_BASE")
                .unwrap_or_else(|_| DEFAULT_CLOUDINARY_API_BASE.to_string()),
            upload_folder: env::var("UPLOAD_FOLDER")
                .unwrap_or_else(|_| DEFAULT_UPLOAD_FOLDER.to_string()),
            max_content_length_bytes: max_content_length_mb * 1024 * 1024,
            file_manager_enabled: env::var("FILE_MANAGER_ENABLED")
                .unwrap_or_else(|_| "true".to_string())
                .to_lowercase()
                .parse()
                .unwrap_or(true),
            strict_path_checks: env::var("STRICT_PATH_CHECKS")
                .unwrap_or_else(|_| "true".to_string())
                .to_lowercase()
                .parse()
                .unwrap_or(true),
            status_cache_ttl: Duration::from_secs(
                env::var("STATUS_CACHE_TTL_SECS")
                    .unwrap_or_else(|_| STATUS_CACHE_TTL_SECS.to_string())
                    .parse()
                    .unwrap_or(STATUS_CACHE_TTL_SECS),
            ),
            remote_timeout: Duration::from_secs(
                env::var("REMOTE_TIMEOUT_SECS")
                    .unwrap_or_else(|_| DEFAULT_REMOTE_TIMEOUT_SECS.to_string())
                    .parse()
                    .unwrap_or(DEFAULT_REMOTE_TIMEOUT_SECS),
            ),
        };

        config.validate()?;
        Ok(config)
    }

    /// A complete credential set, or `None` when any field is absent.
    ///
    /// A partial set counts as not configured; the factory then falls back to
    /// local storage without attempting any network call.
    pub fn cloudinary_credentials(&self) -> Option<CloudinaryCredentials> {
        let creds = CloudinaryCredentials {
            cloud_name: self.cloudinary_cloud_name.clone()?,
            api_key: self.cloudinary_api_key.clone()?,
            api_secret: self.cloudinary_api_secret.clone()?,
        };
        creds.is_complete().then_some(creds)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.upload_folder.trim().is_empty() {
            return Err(anyhow::anyhow!("UPLOAD_FOLDER must not be empty"));
        }

        if self.remote_timeout.is_zero() {
            return Err(anyhow::anyhow!("REMOTE_TIMEOUT_SECS must be greater than 0"));
        }

        let creds_present = [
            self.cloudinary_cloud_name.is_some(),
            self.cloudinary_api_key.is_some(),
            self.cloudinary_api_secret.is_some(),
        ];
        let set = creds_present.iter().filter(|p| **p).count();
        if set > 0 && set < creds_present.len() {
            tracing::warn!(
                fields_set = set,
                "Partial Cloudinary credentials; remote storage stays disabled"
            );
        }

        Ok(())
    }
}

impl Default for Config {
    /// Local-only configuration with the stock defaults. Mostly useful in
    /// tests and tools that never touch the remote backend.
    fn default() -> Self {
        Config {
            cloudinary_cloud_name: None,
            cloudinary_api_key: None,
            cloudinary_api_secret: None,
            cloudinary_api_base: DEFAULT_CLOUDINARY_API_BASE.to_string(),
            upload_folder: DEFAULT_UPLOAD_FOLDER.to_string(),
            max_content_length_bytes: DEFAULT_MAX_CONTENT_LENGTH_MB * 1024 * 1024,
            file_manager_enabled: true,
            strict_path_checks: true,
            status_cache_ttl: Duration::from_secs(STATUS_CACHE_TTL_SECS),
            remote_timeout: Duration::from_secs(DEFAULT_REMOTE_TIMEOUT_SECS),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_credentials_are_not_a_complete_set() {
        let config = Config {
            cloudinary_cloud_name: Some("demo".to_string()),
            cloudinary_api_key: Some("key".to_string()),
            cloudinary_api_secret: None,
            ..Config::default()
        };
        assert!(config.cloudinary_credentials().is_none());
    }

    #[test]
    fn complete_credentials_resolve() {
        let config = Config {
            cloudinary_cloud_name: Some("demo".to_string()),
            cloudinary_api_key: Some("key".to_string()),
            cloudinary_api_secret: Some("secret".to_string()),
            ..Config::default()
        };
        let creds = config.cloudinary_credentials().unwrap();
        assert_eq!(creds.cloud_name, "demo");
        assert!(creds.is_complete());
    }

    #[test]
    fn empty_upload_folder_is_rejected() {
        let config = Config {
            upload_folder: "  ".to_string(),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }
}
