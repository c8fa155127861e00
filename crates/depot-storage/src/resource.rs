//! Resource type classification for the remote backend.
//!
//! Cloudinary partitions storage by resource type; upload, delete, and lookup
//! must all address the same partition or the call silently misses.

use depot_core::constants::{IMAGE_EXTENSIONS, VIDEO_EXTENSIONS};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::Path;

/// Remote partition key derived from a file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Image,
    Video,
    Raw,
}

impl ResourceKind {
    /// Classify a filename or public id by its extension. Unknown and missing
    /// extensions fall back to `Raw`.
    pub fn from_path(path: &str) -> Self {
        let ext = Path::new(path)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());

        match ext.as_deref() {
            Some(ext) if IMAGE_EXTENSIONS.contains(&ext) => ResourceKind::Image,
            Some(ext) if VIDEO_EXTENSIONS.contains(&ext) => ResourceKind::Video,
            _ => ResourceKind::Raw,
        }
    }

    /// API path segment for this partition.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Image => "image",
            ResourceKind::Video => "video",
            ResourceKind::Raw => "raw",
        }
    }
}

impl Display for ResourceKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn video_extensions_classify_as_video() {
        assert_eq!(ResourceKind::from_path("clip.mov"), ResourceKind::Video);
        assert_eq!(ResourceKind::from_path("demos/take2.MP4"), ResourceKind::Video);
    }

    #[test]
    fn image_extensions_classify_as_image() {
        assert_eq!(ResourceKind::from_path("photo.JPG"), ResourceKind::Image);
        assert_eq!(ResourceKind::from_path("a/b/c.webp"), ResourceKind::Image);
    }

    #[test]
    fn everything_else_is_raw() {
        assert_eq!(ResourceKind::from_path("data.csv"), ResourceKind::Raw);
        assert_eq!(ResourceKind::from_path("archive.tar.gz"), ResourceKind::Raw);
        assert_eq!(ResourceKind::from_path("README"), ResourceKind::Raw);
    }
}
