// API response utility functions module

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Response, StatusCode};
use serde::Serialize;

use super::types::ErrorBody;
use crate::error::ApiError;
use crate::http::cache::CachePolicy;

/// Build JSON response
pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    let json = match serde_json::to_vec(body) {
        Ok(j) => j,
        Err(e) => {
            tracing::error!(error = %e, "failed to serialize response");
            return raw_json(
                StatusCode::INTERNAL_SERVER_ERROR,
                Bytes::from_static(br#"{"error":"Internal server error"}"#),
            );
        }
    };

    raw_json(status, Bytes::from(json))
}

/// Convert an [`ApiError`] into `{"error": ...}` with its status
///
/// Internal failures are logged with their detail; the client only sees the
/// generic message.
pub fn error_response(path: &str, err: &ApiError) -> Response<Full<Bytes>> {
    if err.is_internal() {
        tracing::error!(path, error = %err, "request failed");
    } else {
        tracing::debug!(path, error = %err, "request rejected");
    }

    json_response(
        err.status(),
        &ErrorBody {
            error: err.public_message(),
        },
    )
}

fn raw_json(status: StatusCode, body: Bytes) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Cache-Control", CachePolicy::NoStore.header_value())
        .body(Full::new(body))
        .unwrap_or_else(|e| {
            tracing::error!(error = %e, "failed to build response");
            Response::new(Full::new(Bytes::from_static(b"Error")))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_json(response: Response<Full<Bytes>>) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_error_response_body() {
        let response = error_response("/v1/images/generations", &ApiError::MissingParameters);
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.headers()["Content-Type"], "application/json");
        assert_eq!(
            body_json(response).await,
            serde_json::json!({"error": "Missing required parameters"})
        );
    }

    #[tokio::test]
    async fn test_internal_error_hides_detail() {
        let err = ApiError::Storage(std::io::Error::other("/srv/static: read-only file system"));
        let response = error_response("/api/3d-surface", &err);
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Failed to store artifact");
    }
}
