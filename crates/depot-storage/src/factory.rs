//! Provider selection with health-check fallback.
//!
//! The sole failover decision point: callers get an `Arc<dyn StorageProvider>`
//! and never branch on the backend type themselves.

use crate::cloudinary::CloudinaryStorage;
use crate::local::LocalStorage;
use crate::traits::{ProviderResult, StorageProvider};
use depot_core::Config;
use std::sync::Arc;

/// Resolve the storage provider for one logical operation.
///
/// Cloudinary is used when a complete credential set is present and a forced
/// status check reports it usable; anything else falls back to local storage
/// rooted at the configured upload folder. With incomplete credentials no
/// network call is attempted at all.
pub async fn resolve_provider(config: &Config) -> ProviderResult<Arc<dyn StorageProvider>> {
    if let Some(credentials) = config.cloudinary_credentials() {
        let storage = CloudinaryStorage::new(
            credentials,
            &config.cloudinary_api_base,
            config.remote_timeout,
            config.status_cache_ttl,
        )?;

        let status = storage.check_status().await;
        if status.is_usable() {
            return Ok(Arc::new(storage));
        }

        tracing::warn!(
            configured = status.configured,
            online = status.online,
            error_message = %status.error_message,
            "Cloudinary unavailable, falling back to local storage"
        );
    }

    let storage = LocalStorage::new(&config.upload_folder, config.strict_path_checks).await?;
    Ok(Arc::new(storage))
}

#[cfg(test)]
mod tests {
    use super::*;
    use depot_core::ProviderKind;
    use tempfile::tempdir;

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    }

    fn local_config(dir: &tempfile::TempDir) -> Config {
        Config {
            upload_folder: dir.path().to_string_lossy().into_owned(),
            ..Config::default()
        }
    }

    fn cloud_config(dir: &tempfile::TempDir, api_base: &str) -> Config {
        Config {
            cloudinary_cloud_name: Some("demo".to_string()),
            cloudinary_api_key: Some("key".to_string()),
            cloudinary_api_secret: Some("secret".to_string()),
            cloudinary_api_base: api_base.to_string(),
            ..local_config(dir)
        }
    }

    #[tokio::test]
    async fn missing_credentials_resolve_to_local_without_any_probe() {
        init_tracing();
        let mut server = mockito::Server::new_async().await;
        let ping = server
            .mock("GET", "/demo/ping")
            .expect(0)
            .create_async()
            .await;

        let dir = tempdir().unwrap();
        let mut config = cloud_config(&dir, &server.url());
        config.cloudinary_api_secret = None;

        let provider = resolve_provider(&config).await.unwrap();
        assert_eq!(provider.kind(), ProviderKind::Local);
        ping.assert_async().await;
    }

    #[tokio::test]
    async fn failed_probe_falls_back_to_local() {
        init_tracing();
        let mut server = mockito::Server::new_async().await;
        let ping = server
            .mock("GET", "/demo/ping")
            .with_status(502)
            .with_body("bad gateway")
            .create_async()
            .await;

        let dir = tempdir().unwrap();
        let config = cloud_config(&dir, &server.url());

        let provider = resolve_provider(&config).await.unwrap();
        assert_eq!(provider.kind(), ProviderKind::Local);
        ping.assert_async().await;
    }

    #[tokio::test]
    async fn healthy_probe_selects_cloudinary() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/demo/ping")
            .with_status(200)
            .with_body(r#"{"status":"ok"}"#)
            .create_async()
            .await;

        let dir = tempdir().unwrap();
        let config = cloud_config(&dir, &server.url());

        let provider = resolve_provider(&config).await.unwrap();
        assert_eq!(provider.kind(), ProviderKind::Cloudinary);
    }

    #[tokio::test]
    async fn local_fallback_uses_the_configured_upload_folder() {
        let dir = tempdir().unwrap();
        let config = local_config(&dir);

        let provider = resolve_provider(&config).await.unwrap();
        provider.create_folder("inbox").await.unwrap();

        assert!(dir.path().join("inbox").is_dir());
    }
}
