//! Filename and path sanitization.
//!
//! Uploads and folder creation accept user-controlled names; these helpers
//! strip anything that could escape the storage root before the name becomes
//! part of a path.

use crate::traits::{ProviderResult, StorageError};

/// Reduce a user-supplied filename to a safe leaf name.
///
/// Directory components and drive prefixes are dropped, whitespace collapses
/// to `_`, and only ASCII alphanumerics plus `.`, `_` and `-` survive.
/// Leading dots and dashes are trimmed so the result can never be a hidden
/// file or a `..` component. Returns an empty string when nothing survives;
/// callers must treat that as an invalid upload.
pub fn sanitize_filename(filename: &str) -> String {
    let leaf = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename)
        .trim();
    let leaf = leaf.rsplit(':').next().unwrap_or(leaf);

    let mut out = String::with_capacity(leaf.len());
    for ch in leaf.chars() {
        if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '_' | '-') {
            out.push(ch);
        } else if ch.is_whitespace() {
            out.push('_');
        }
    }

    out.trim_start_matches(['.', '-']).to_string()
}

/// Validate a backend-relative path against traversal.
///
/// Rejects absolute paths, drive prefixes, and any `.`/`..` component. Used
/// on delete/get/list paths when strict path checks are enabled; uploads are
/// always covered by `sanitize_filename`.
pub fn validate_relative_path(path: &str) -> ProviderResult<()> {
    if path.starts_with('/') || path.starts_with('\\') || path.contains(':') {
        return Err(StorageError::InvalidPath(format!(
            "path must be relative: {path}"
        )));
    }

    for component in path.split(['/', '\\']) {
        if component == ".." || component == "." {
            return Err(StorageError::InvalidPath(format!(
                "path contains a traversal component: {path}"
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_directory_components() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("..\\..\\boot.ini"), "boot.ini");
        assert_eq!(sanitize_filename("C:\\temp\\report.pdf"), "report.pdf");
    }

    #[test]
    fn collapses_unsafe_characters() {
        assert_eq!(sanitize_filename("my report (1).pdf"), "my_report_1.pdf");
        assert_eq!(sanitize_filename("résumé.pdf"), "rsum.pdf");
    }

    #[test]
    fn trims_leading_dots_and_dashes() {
        assert_eq!(sanitize_filename(".hidden"), "hidden");
        assert_eq!(sanitize_filename("--rm"), "rm");
        assert_eq!(sanitize_filename(".."), "");
    }

    #[test]
    fn plain_names_pass_through() {
        assert_eq!(sanitize_filename("report.pdf"), "report.pdf");
        assert_eq!(sanitize_filename("clip_01.mov"), "clip_01.mov");
    }

    #[test]
    fn relative_paths_validate() {
        assert!(validate_relative_path("").is_ok());
        assert!(validate_relative_path("docs/2024/report.pdf").is_ok());
        assert!(validate_relative_path("../escape").is_err());
        assert!(validate_relative_path("docs/../../escape").is_err());
        assert!(validate_relative_path("/etc/passwd").is_err());
        assert!(validate_relative_path("C:\\windows").is_err());
    }
}
