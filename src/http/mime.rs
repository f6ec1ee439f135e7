//! MIME type detection module
//!
//! Content-Type for the file types the proxy stores and serves.

use std::path::Path;

/// Get MIME Content-Type based on file extension (case-insensitive)
pub fn get_content_type(extension: Option<&str>) -> &'static str {
    let extension = extension.map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("html" | "htm") => "text/html; charset=utf-8",
        Some("css") => "text/css",
        Some("txt") => "text/plain; charset=utf-8",
        Some("js") => "application/javascript",
        Some("json") => "application/json",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        Some("ico") => "image/x-icon",
        _ => "application/octet-stream",
    }
}

/// Content-Type for a path on disk
pub fn content_type_for(path: &Path) -> &'static str {
    get_content_type(path.extension().and_then(|e| e.to_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_types() {
        assert_eq!(get_content_type(Some("png")), "image/png");
        assert_eq!(get_content_type(Some("HTML")), "text/html; charset=utf-8");
        assert_eq!(
            content_type_for(Path::new("static/surface_1700000000.html")),
            "text/html; charset=utf-8"
        );
    }

    #[test]
    fn test_unknown_extension() {
        assert_eq!(get_content_type(Some("exe")), "application/octet-stream");
        assert_eq!(content_type_for(Path::new("README")), "application/octet-stream");
    }
}
