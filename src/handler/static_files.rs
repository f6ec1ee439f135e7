//! Static file serving module
//!
//! Serves stored artifacts from the static directory and renders the index
//! page.

use std::path::{Component, Path, PathBuf};

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::Response;
use tokio::fs;

use crate::api::ENDPOINT_PATHS;
use crate::http::{self, cache, mime};

/// Conditional request data needed to serve a file
pub struct FileRequest<'a> {
    pub path: &'a str,
    pub is_head: bool,
    pub if_none_match: Option<&'a str>,
}

/// Serve an artifact below `route_prefix` from `static_dir`
pub async fn serve_artifact(
    req: &FileRequest<'_>,
    static_dir: &Path,
    route_prefix: &str,
) -> Response<Full<Bytes>> {
    let Some(relative) = relative_path(req.path, route_prefix) else {
        return http::build_404_response();
    };

    match load_file(static_dir, &relative).await {
        Some((content, content_type)) => {
            let etag = cache::generate_etag(&content);
            if cache::check_etag_match(req.if_none_match, &etag) {
                return http::build_304_response(&etag);
            }
            http::build_file_response(Bytes::from(content), content_type, &etag, req.is_head)
        }
        None => http::build_404_response(),
    }
}

/// Map a request path to a path relative to the static directory
///
/// Only plain file names and subdirectories survive; `..`, absolute
/// components and empty paths are refused.
pub fn relative_path(path: &str, route_prefix: &str) -> Option<PathBuf> {
    let prefix = route_prefix.trim_end_matches('/');
    let rest = path.strip_prefix(prefix)?.strip_prefix('/')?;
    if rest.is_empty() || rest.contains('\\') || rest.contains('\0') {
        return None;
    }

    let relative = Path::new(rest);
    relative
        .components()
        .all(|c| matches!(c, Component::Normal(_)))
        .then(|| relative.to_path_buf())
}

/// Read a file, making sure its canonical path stays inside `static_dir`
async fn load_file(static_dir: &Path, relative: &Path) -> Option<(Vec<u8>, &'static str)> {
    let root = match fs::canonicalize(static_dir).await {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!(dir = %static_dir.display(), error = %e, "static directory not accessible");
            return None;
        }
    };

    // Not found is the common case and not worth a log line
    let file_path = fs::canonicalize(root.join(relative)).await.ok()?;
    if !file_path.starts_with(&root) {
        tracing::warn!(
            requested = %relative.display(),
            resolved = %file_path.display(),
            "path traversal attempt blocked"
        );
        return None;
    }
    if !fs::metadata(&file_path).await.ok()?.is_file() {
        return None;
    }

    match fs::read(&file_path).await {
        Ok(content) => Some((content, mime::content_type_for(&file_path))),
        Err(e) => {
            tracing::error!(file = %file_path.display(), error = %e, "failed to read file");
            None
        }
    }
}

/// Index page listing the API endpoints
pub fn index_page(server_name: &str, route_prefix: &str) -> String {
    let endpoints: String = ENDPOINT_PATHS
        .iter()
        .map(|path| format!("        <li><code>POST {path}</code></li>\n"))
        .collect();

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>{server_name}</title>
    <style>
        body {{ font-family: -apple-system, "Segoe UI", Roboto, sans-serif; max-width: 640px; margin: 40px auto; line-height: 1.6; }}
        code {{ background: #f3f3f3; padding: 2px 4px; border-radius: 3px; }}
    </style>
</head>
<body>
    <h1>{server_name}</h1>
    <p>Every endpoint takes a JSON body and answers with <code>{{"created": ..., "data": [{{"url": ...}}]}}</code>.</p>
    <ul>
{endpoints}    </ul>
    <p>Generated artifacts are served under <code>{route_prefix}/</code>.</p>
</body>
</html>"#,
        server_name = escape_html(server_name),
        route_prefix = escape_html(route_prefix),
    )
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
