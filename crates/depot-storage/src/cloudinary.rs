//! Cloudinary storage provider.
//!
//! Talks to the Cloudinary REST API: the Admin API (basic auth) for listing,
//! lookups, folders, and account usage, and the Upload API (SHA-1 signed
//! form parameters) for uploads and deletes. Cloudinary partitions content
//! by resource type, so every destructive or lookup call is scoped by the
//! `ResourceKind` derived from the file extension.

use crate::resource::ResourceKind;
use crate::sanitize::sanitize_filename;
use crate::status::StatusCache;
use crate::traits::{FileLocation, ProviderResult, StorageError, StorageProvider};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use depot_core::constants::{BYTES_PER_CREDIT, DEFAULT_CLOUD_QUOTA_BYTES, MAX_LIST_RESULTS};
use depot_core::{BackendStatus, CloudinaryCredentials, Item, ProviderKind, StorageUsage};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::Deserialize;
use sha1::{Digest, Sha1};
use std::time::Duration;

const USAGE_LABEL: &str = "Cloudinary";

/// Percent-encode folder paths and public ids for Admin API URLs, keeping
/// path separators and the characters Cloudinary allows in public ids.
const PATH_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'/')
    .remove(b'.')
    .remove(b'_')
    .remove(b'-');

fn encode_path(path: &str) -> String {
    utf8_percent_encode(path, PATH_ENCODE_SET).to_string()
}

fn leaf(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Re-tag a generic backend error with the failing operation's variant.
fn op_error(e: StorageError, wrap: fn(String) -> StorageError) -> StorageError {
    match e {
        StorageError::BackendError(message) => wrap(message),
        other => other,
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FolderEntry {
    #[serde(default)]
    pub name: String,
    pub path: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct SubfoldersResponse {
    #[serde(default)]
    folders: Vec<FolderEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResourceEntry {
    pub public_id: String,
    #[serde(default)]
    pub bytes: u64,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub secure_url: Option<String>,
}

impl ResourceEntry {
    fn location(&self) -> Option<String> {
        self.secure_url.clone().or_else(|| self.url.clone())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ResourcesResponse {
    #[serde(default)]
    resources: Vec<ResourceEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadResponse {
    pub public_id: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub secure_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct DestroyResponse {
    #[serde(default)]
    result: String,
}

/// Thin typed client over the Cloudinary REST endpoints.
#[derive(Clone)]
pub struct CloudinaryClient {
    http: reqwest::Client,
    credentials: CloudinaryCredentials,
    api_base: String,
}

impl CloudinaryClient {
    /// Create a client for one account.
    ///
    /// `api_base` is normally `https://api.cloudinary.com/v1_1`; it is
    /// overridable for self-hosted gateways and HTTP-mock tests. `timeout`
    /// bounds every call, the health probe included.
    pub fn new(
        credentials: CloudinaryCredentials,
        api_base: impl Into<String>,
        timeout: Duration,
    ) -> ProviderResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                StorageError::ConfigError(format!("Failed to create HTTP client: {e}"))
            })?;

        Ok(CloudinaryClient {
            http,
            credentials,
            api_base: api_base.into().trim_end_matches('/').to_string(),
        })
    }

    /// All three credential fields present and non-empty.
    pub fn is_configured(&self) -> bool {
        self.credentials.is_complete()
    }

    fn url(&self, suffix: &str) -> String {
        format!("{}/{}/{}", self.api_base, self.credentials.cloud_name, suffix)
    }

    /// SHA-1 request signature over the sorted parameter string plus the API
    /// secret, as the Upload API requires.
    fn signature(&self, params: &[(&str, &str)]) -> String {
        let mut sorted: Vec<_> = params.to_vec();
        sorted.sort();
        let to_sign = sorted
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");

        let mut hasher = Sha1::new();
        hasher.update(to_sign.as_bytes());
        hasher.update(self.credentials.api_secret.as_bytes());
        hex::encode(hasher.finalize())
    }

    async fn send_admin(&self, request: reqwest::RequestBuilder) -> ProviderResult<reqwest::Response> {
        let response = request
            .basic_auth(&self.credentials.api_key, Some(&self.credentials.api_secret))
            .send()
            .await
            .map_err(|e| StorageError::BackendError(e.to_string()))?;
        Self::ensure_success(response).await
    }

    async fn ensure_success(response: reqwest::Response) -> ProviderResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        Err(StorageError::BackendError(format!("{status} - {body}")))
    }

    /// Lightweight reachability/credential probe.
    pub async fn ping(&self) -> ProviderResult<()> {
        self.send_admin(self.http.get(self.url("ping"))).await?;
        Ok(())
    }

    /// Direct sub-folders of `path` (account root when empty).
    pub async fn subfolders(&self, path: &str) -> ProviderResult<Vec<FolderEntry>> {
        let suffix = if path.trim().is_empty() {
            "folders".to_string()
        } else {
            format!("folders/{}", encode_path(path))
        };

        let response = self.send_admin(self.http.get(self.url(&suffix))).await?;
        let parsed: SubfoldersResponse = response
            .json()
            .await
            .map_err(|e| StorageError::BackendError(format!("Invalid folders response: {e}")))?;
        Ok(parsed.folders)
    }

    /// Raw resources under `prefix` (all uploads when empty).
    pub async fn resources(&self, prefix: &str) -> ProviderResult<Vec<ResourceEntry>> {
        let mut request = self
            .http
            .get(self.url("resources/raw/upload"))
            .query(&[("max_results", MAX_LIST_RESULTS.to_string())]);
        if !prefix.is_empty() {
            request = request.query(&[("prefix", prefix)]);
        }

        let response = self.send_admin(request).await?;
        let parsed: ResourcesResponse = response
            .json()
            .await
            .map_err(|e| StorageError::BackendError(format!("Invalid resources response: {e}")))?;
        Ok(parsed.resources)
    }

    /// Look up a single resource inside its type partition.
    pub async fn resource(
        &self,
        public_id: &str,
        kind: ResourceKind,
    ) -> ProviderResult<ResourceEntry> {
        let suffix = format!("resources/{}/upload/{}", kind.as_str(), encode_path(public_id));
        let response = self.send_admin(self.http.get(self.url(&suffix))).await?;
        response
            .json()
            .await
            .map_err(|e| StorageError::BackendError(format!("Invalid resource response: {e}")))
    }

    /// Signed upload into the type partition for `public_id`.
    pub async fn upload(
        &self,
        data: Bytes,
        public_id: &str,
        kind: ResourceKind,
    ) -> ProviderResult<UploadResponse> {
        let timestamp = Utc::now().timestamp().to_string();
        let signature = self.signature(&[("public_id", public_id), ("timestamp", &timestamp)]);

        let form = reqwest::multipart::Form::new()
            .text("public_id", public_id.to_string())
            .text("timestamp", timestamp)
            .text("api_key", self.credentials.api_key.clone())
            .text("signature", signature)
            .part(
                "file",
                reqwest::multipart::Part::bytes(data.to_vec())
                    .file_name(leaf(public_id).to_string()),
            );

        let response = self
            .http
            .post(self.url(&format!("{}/upload", kind.as_str())))
            .multipart(form)
            .send()
            .await
            .map_err(|e| StorageError::BackendError(e.to_string()))?;
        let response = Self::ensure_success(response).await?;

        response
            .json()
            .await
            .map_err(|e| StorageError::BackendError(format!("Invalid upload response: {e}")))
    }

    /// Signed destroy scoped to the resource's type partition.
    pub async fn destroy(&self, public_id: &str, kind: ResourceKind) -> ProviderResult<()> {
        let timestamp = Utc::now().timestamp().to_string();
        let signature = self.signature(&[("public_id", public_id), ("timestamp", &timestamp)]);

        let response = self
            .http
            .post(self.url(&format!("{}/destroy", kind.as_str())))
            .form(&[
                ("public_id", public_id),
                ("timestamp", &timestamp),
                ("api_key", &self.credentials.api_key),
                ("signature", &signature),
            ])
            .send()
            .await
            .map_err(|e| StorageError::BackendError(e.to_string()))?;
        let response = Self::ensure_success(response).await?;

        let parsed: DestroyResponse = response
            .json()
            .await
            .map_err(|e| StorageError::BackendError(format!("Invalid destroy response: {e}")))?;

        match parsed.result.as_str() {
            "ok" => Ok(()),
            "not found" => Err(StorageError::NotFound(public_id.to_string())),
            other => Err(StorageError::DeleteFailed(format!(
                "destroy returned {other:?} for {public_id}"
            ))),
        }
    }

    /// Create a folder; already-existing folders are accepted by the backend.
    pub async fn create_folder(&self, path: &str) -> ProviderResult<()> {
        let suffix = format!("folders/{}", encode_path(path));
        self.send_admin(self.http.post(self.url(&suffix))).await?;
        Ok(())
    }

    /// Account-level usage payload, kept as loose JSON because its shape
    /// varies by plan.
    pub async fn usage(&self) -> ProviderResult<serde_json::Value> {
        let response = self.send_admin(self.http.get(self.url("usage"))).await?;
        response
            .json()
            .await
            .map_err(|e| StorageError::BackendError(format!("Invalid usage response: {e}")))
    }
}

/// Cloudinary storage provider
pub struct CloudinaryStorage {
    client: CloudinaryClient,
    status: StatusCache,
}

impl CloudinaryStorage {
    pub fn new(
        credentials: CloudinaryCredentials,
        api_base: impl Into<String>,
        timeout: Duration,
        status_ttl: Duration,
    ) -> ProviderResult<Self> {
        Ok(CloudinaryStorage {
            client: CloudinaryClient::new(credentials, api_base, timeout)?,
            status: StatusCache::with_ttl(status_ttl),
        })
    }

    /// Current backend health, probing at most once per TTL window.
    pub async fn check_status(&self) -> BackendStatus {
        self.status.check_status(&self.client).await
    }

    /// Cached status without a refresh, for boundary-layer indicators.
    pub async fn cached_status(&self) -> BackendStatus {
        self.status.current().await
    }

    fn compose_public_id(path: &str, filename: &str) -> String {
        let path = path.trim_matches('/');
        if path.is_empty() {
            filename.to_string()
        } else {
            format!("{path}/{filename}")
        }
    }
}

#[async_trait]
impl StorageProvider for CloudinaryStorage {
    async fn list_items(&self, path: &str) -> Vec<Item> {
        let status = self.check_status().await;
        if !status.configured || !status.online {
            // Known-down backend; skip the network entirely.
            return Vec::new();
        }

        let mut items = Vec::new();

        match self.client.subfolders(path).await {
            Ok(folders) => {
                for folder in folders {
                    items.push(Item {
                        name: leaf(&folder.path).to_string(),
                        is_dir: true,
                        size_bytes: 0,
                        path: folder.path,
                    });
                }
            }
            Err(e) => {
                tracing::error!(path = %path, error = %e, "Error listing Cloudinary folders");
                self.status.record_error(e.to_string()).await;
                return items;
            }
        }

        match self.client.resources(path).await {
            Ok(resources) => {
                for resource in resources {
                    items.push(Item {
                        name: leaf(&resource.public_id).to_string(),
                        is_dir: false,
                        size_bytes: resource.bytes,
                        path: resource.public_id,
                    });
                }
            }
            Err(e) => {
                tracing::error!(path = %path, error = %e, "Error listing Cloudinary resources");
                self.status.record_error(e.to_string()).await;
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

        let public_id = Self::compose_public_id(path, &safe_filename);
        let kind = ResourceKind::from_path(&safe_filename);
        let size = data.len();
        let start = std::time::Instant::now();

        let response = self
            .client
            .upload(data, &public_id, kind)
            .await
            .map_err(|e| op_error(e, StorageError::UploadFailed))?;

        tracing::info!(
            public_id = %response.public_id,
            url = response.secure_url.as_deref().or(response.url.as_deref()),
            resource_type = %kind,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "File uploaded to Cloudinary"
        );

        Ok(())
    }

    async fn delete_file(&self, path: &str) -> ProviderResult<()> {
        let kind = ResourceKind::from_path(path);
        self.client
            .destroy(path, kind)
            .await
            .map_err(|e| op_error(e, StorageError::DeleteFailed))?;

        tracing::info!(public_id = %path, resource_type = %kind, "Cloudinary delete successful");
        Ok(())
    }

    async fn get_file(&self, path: &str) -> ProviderResult<FileLocation> {
        let kind = ResourceKind::from_path(path);
        let resource = self
            .client
            .resource(path, kind)
            .await
            .map_err(|e| op_error(e, StorageError::GetFailed))?;

        resource
            .location()
            .map(FileLocation::Url)
            .ok_or_else(|| StorageError::GetFailed(format!("no retrievable URL for {path}")))
    }

    async fn create_folder(&self, path: &str) -> ProviderResult<()> {
        self.client
            .create_folder(path)
            .await
            .map_err(|e| op_error(e, StorageError::CreateFolderFailed))
    }

    async fn storage_usage(&self) -> StorageUsage {
        let usage = match self.client.usage().await {
            Ok(usage) => usage,
            Err(e) => {
                tracing::error!(error = %e, "Error getting Cloudinary usage");
                return StorageUsage::placeholder(USAGE_LABEL);
            }
        };
        tracing::debug!(response = %usage, "Cloudinary usage response");

        let used_bytes = match usage.pointer("/storage/usage").and_then(|v| v.as_f64()) {
            Some(used) if used >= 0.0 => used as u64,
            other => {
                tracing::warn!(value = ?other, "Cloudinary storage usage missing or not a number");
                0
            }
        };

        // Free plans report the limit in credits; 1 credit is roughly 1 GiB.
        let total_bytes = match usage.pointer("/credits/limit").and_then(|v| v.as_f64()) {
            Some(limit) if limit > 0.0 => (limit * BYTES_PER_CREDIT as f64) as u64,
            other => {
                tracing::warn!(value = ?other, "Cloudinary credit limit invalid, using default quota");
                DEFAULT_CLOUD_QUOTA_BYTES
            }
        };

        StorageUsage::new(used_bytes, total_bytes, USAGE_LABEL)
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Cloudinary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn credentials() -> CloudinaryCredentials {
        CloudinaryCredentials {
            cloud_name: "demo".to_string(),
            api_key: "key".to_string(),
            api_secret: "secret".to_string(),
        }
    }

    fn storage(api_base: &str) -> CloudinaryStorage {
        CloudinaryStorage::new(
            credentials(),
            api_base,
            Duration::from_secs(5),
            Duration::from_secs(300),
        )
        .unwrap()
    }

    async fn mock_ping(server: &mut mockito::ServerGuard) -> mockito::Mock {
        server
            .mock("GET", "/demo/ping")
            .with_status(200)
            .with_body(r#"{"status":"ok"}"#)
            .create_async()
            .await
    }

    #[tokio::test]
    async fn listing_merges_folders_and_files_with_unique_paths() {
        let mut server = mockito::Server::new_async().await;
        mock_ping(&mut server).await;
        server
            .mock("GET", "/demo/folders")
            .with_status(200)
            .with_body(r#"{"folders":[{"name":"docs","path":"docs"},{"name":"media","path":"media"}]}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/demo/resources/raw/upload")
            .match_query(Matcher::UrlEncoded("max_results".into(), "500".into()))
            .with_status(200)
            .with_body(r#"{"resources":[{"public_id":"report.pdf","bytes":2048}]}"#)
            .create_async()
            .await;

        let storage = storage(&server.url());
        let items = storage.list_items("").await;

        assert_eq!(items.len(), 3);
        let mut paths: Vec<_> = items.iter().map(|i| i.path.clone()).collect();
        paths.sort();
        paths.dedup();
        assert_eq!(paths.len(), 3);

        let report = items.iter().find(|i| i.name == "report.pdf").unwrap();
        assert!(!report.is_dir);
        assert_eq!(report.size_bytes, 2048);
        assert!(items.iter().any(|i| i.is_dir && i.path == "docs"));
    }

    #[tokio::test]
    async fn listing_failure_returns_partial_results_and_records_the_error() {
        let mut server = mockito::Server::new_async().await;
        mock_ping(&mut server).await;
        server
            .mock("GET", "/demo/folders")
            .with_status(200)
            .with_body(r#"{"folders":[{"name":"docs","path":"docs"}]}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/demo/resources/raw/upload")
            .match_query(Matcher::Any)
            .with_status(500)
            .with_body(r#"{"error":{"message":"rate limited"}}"#)
            .create_async()
            .await;

        let storage = storage(&server.url());
        let items = storage.list_items("").await;

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].path, "docs");

        let status = storage.cached_status().await;
        assert!(status.error);
        assert!(!status.online);
        assert!(!status.error_message.is_empty());
    }

    #[tokio::test]
    async fn unreachable_backend_lists_nothing() {
        // Nothing is listening on this port; the probe fails and no listing
        // call is ever attempted.
        let storage = storage("http://127.0.0.1:9");
        assert!(storage.list_items("").await.is_empty());
    }

    #[tokio::test]
    async fn upload_signs_and_addresses_the_raw_partition() {
        let mut server = mockito::Server::new_async().await;
        let upload = server
            .mock("POST", "/demo/raw/upload")
            .with_status(200)
            .with_body(
                r#"{"public_id":"docs/data.csv","secure_url":"https://res.example/docs/data.csv"}"#,
            )
            .create_async()
            .await;

        let storage = storage(&server.url());
        storage
            .upload_file(Bytes::from_static(b"a,b,c"), "docs", "data.csv")
            .await
            .unwrap();

        upload.assert_async().await;
    }

    #[tokio::test]
    async fn delete_scopes_the_destroy_call_by_resource_type() {
        let mut server = mockito::Server::new_async().await;
        let destroy = server
            .mock("POST", "/demo/video/destroy")
            .with_status(200)
            .with_body(r#"{"result":"ok"}"#)
            .create_async()
            .await;

        let storage = storage(&server.url());
        storage.delete_file("clips/take1.mov").await.unwrap();
        destroy.assert_async().await;
    }

    #[tokio::test]
    async fn delete_missing_resource_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/demo/raw/destroy")
            .with_status(200)
            .with_body(r#"{"result":"not found"}"#)
            .create_async()
            .await;

        let storage = storage(&server.url());
        let err = storage.delete_file("ghost.csv").await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[tokio::test]
    async fn get_file_returns_the_remote_url() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/demo/resources/video/upload/clips/take1.mov")
            .with_status(200)
            .with_body(
                r#"{"public_id":"clips/take1.mov","bytes":5,"secure_url":"https://res.example/clips/take1.mov"}"#,
            )
            .create_async()
            .await;

        let storage = storage(&server.url());
        let location = storage.get_file("clips/take1.mov").await.unwrap();
        assert_eq!(
            location,
            FileLocation::Url("https://res.example/clips/take1.mov".to_string())
        );
    }

    #[tokio::test]
    async fn usage_converts_credits_to_bytes() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/demo/usage")
            .with_status(200)
            .with_body(r#"{"storage":{"usage":1000},"credits":{"limit":2}}"#)
            .create_async()
            .await;

        let storage = storage(&server.url());
        let usage = storage.storage_usage().await;

        assert_eq!(usage.used_bytes, 1000);
        assert_eq!(usage.total_bytes, 2 * BYTES_PER_CREDIT);
        assert_eq!(usage.name, "Cloudinary");
    }

    #[tokio::test]
    async fn usage_falls_back_to_the_default_quota() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/demo/usage")
            .with_status(200)
            .with_body(r#"{"storage":{"usage":"lots"},"plan":"free"}"#)
            .create_async()
            .await;

        let storage = storage(&server.url());
        let usage = storage.storage_usage().await;

        assert_eq!(usage.used_bytes, 0);
        assert_eq!(usage.total_bytes, DEFAULT_CLOUD_QUOTA_BYTES);
    }

    #[tokio::test]
    async fn usage_failure_yields_a_placeholder() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/demo/usage")
            .with_status(500)
            .create_async()
            .await;

        let storage = storage(&server.url());
        let usage = storage.storage_usage().await;

        assert_eq!(usage.used_bytes, 0);
        assert_eq!(usage.total_bytes, 1);
    }

    #[test]
    fn public_ids_compose_without_leading_slashes() {
        assert_eq!(
            CloudinaryStorage::compose_public_id("", "report.pdf"),
            "report.pdf"
        );
        assert_eq!(
            CloudinaryStorage::compose_public_id("docs/2024/", "report.pdf"),
            "docs/2024/report.pdf"
        );
    }
}
