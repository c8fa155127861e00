//! Application-wide constants.

/// Extensions classified as images by the remote backend.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "webp"];

/// Extensions classified as videos by the remote backend.
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "avi", "webm"];

/// How long a cached remote health status stays valid.
pub const STATUS_CACHE_TTL_SECS: u64 = 300;

/// Maximum number of resources requested per remote listing call.
pub const MAX_LIST_RESULTS: u32 = 500;

/// Approximate conversion used by the remote usage endpoint: 1 credit ~ 1 GiB.
pub const BYTES_PER_CREDIT: u64 = 1024 * 1024 * 1024;

/// Fallback storage quota when the remote usage payload is missing or
/// non-numeric. Matches the nominal free-plan ceiling (25 GiB).
pub const DEFAULT_CLOUD_QUOTA_BYTES: u64 = 25 * 1024 * 1024 * 1024;

/// Default upload size ceiling in megabytes.
pub const DEFAULT_MAX_CONTENT_LENGTH_MB: u64 = 16;
