//! Request routing dispatch module
//!
//! Entry point for HTTP request processing: method and body-size checks,
//! route matching, API dispatch and the access log.

use std::convert::Infallible;
use std::error::Error as StdError;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::{Body, Bytes};
use hyper::header::{HeaderValue, CONTENT_LENGTH, IF_NONE_MATCH, SERVER};
use hyper::{Method, Request, Response, StatusCode};

use crate::api;
use crate::config::AppState;
use crate::handler::static_files::{self, FileRequest};
use crate::http;
use crate::logger::{self, AccessLogEntry};

/// Main entry point for HTTP request handling
///
/// Generic over the body so tests can drive it without a socket.
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    peer_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible>
where
    B: Body<Data = Bytes> + Send,
    B::Error: Into<Box<dyn StdError + Send + Sync>>,
{
    let started = Instant::now();
    let entry = state.config.logging.access_log.then(|| {
        AccessLogEntry::from_request(peer_addr, req.method(), req.uri(), req.version(), req.headers())
    });

    let mut response = route_request(req, &state).await;

    if let Ok(server) = HeaderValue::from_str(&state.config.http.server_name) {
        response.headers_mut().insert(SERVER, server);
    }

    if let Some(entry) = entry {
        let body_bytes = response
            .body()
            .size_hint()
            .exact()
            .and_then(|n| usize::try_from(n).ok())
            .unwrap_or_default();
        let entry = entry.finish(response.status().as_u16(), body_bytes, started.elapsed());
        logger::log_access(&entry, &state.config.logging.access_log_format);
    }

    Ok(response)
}

/// Route request based on method and path
async fn route_request<B>(req: Request<B>, state: &AppState) -> Response<Full<Bytes>>
where
    B: Body<Data = Bytes> + Send,
    B::Error: Into<Box<dyn StdError + Send + Sync>>,
{
    let config = &state.config;
    let method = req.method().clone();

    // 1. Preflight
    if method == Method::OPTIONS {
        return http::build_options_response(config.http.enable_cors);
    }

    // 2. Declared body size
    if let Some(resp) = check_body_size(&req, config.http.max_body_size) {
        return resp;
    }

    let path = req.uri().path().to_owned();
    let is_read_path = is_health_path(&path, state) || is_static_path(&path, state);

    match method {
        Method::GET | Method::HEAD => {
            let is_head = method == Method::HEAD;
            if is_health_path(&path, state) {
                return http::build_health_response();
            }
            if is_static_path(&path, state) {
                let if_none_match = req
                    .headers()
                    .get(IF_NONE_MATCH)
                    .and_then(|v| v.to_str().ok())
                    .map(ToString::to_string);
                let file = FileRequest {
                    path: &path,
                    is_head,
                    if_none_match: if_none_match.as_deref(),
                };
                return static_files::serve_artifact(
                    &file,
                    state.store.root(),
                    &config.storage.route_prefix,
                )
                .await;
            }
            if path == "/" {
                let html =
                    static_files::index_page(&config.http.server_name, &config.storage.route_prefix);
                return http::build_html_response(html, is_head);
            }
            if api::is_api_path(&path) {
                return http::build_405_response(http::API_ALLOW);
            }
            http::build_404_response()
        }
        Method::POST if api::is_api_path(&path) => {
            let body = match collect_body(req, config.http.max_body_size).await {
                Ok(body) => body,
                Err(resp) => return resp,
            };
            match api::dispatch(&method, &path, body, state).await {
                Some(response) => response,
                None => http::build_404_response(),
            }
        }
        _ if api::is_api_path(&path) => http::build_405_response(http::API_ALLOW),
        _ if is_read_path => http::build_405_response(http::READ_ALLOW),
        _ => {
            tracing::debug!(%method, %path, "no route");
            http::build_404_response()
        }
    }
}

fn is_health_path(path: &str, state: &AppState) -> bool {
    let health = &state.config.routes.health;
    health.enabled && (path == health.liveness_path || path == health.readiness_path)
}

fn is_static_path(path: &str, state: &AppState) -> bool {
    let prefix = state.config.storage.route_prefix.trim_end_matches('/');
    path.strip_prefix(prefix)
        .is_some_and(|rest| rest.starts_with('/'))
}

/// Validate Content-Length header and return 413 if exceeded
fn check_body_size<B>(req: &Request<B>, max_body_size: u64) -> Option<Response<Full<Bytes>>> {
    let content_length = req.headers().get(CONTENT_LENGTH)?;
    match content_length.to_str().ok()?.parse::<u64>() {
        Ok(size) if size > max_body_size => {
            tracing::warn!(size, max_body_size, "request body too large");
            Some(http::build_413_response())
        }
        Ok(_) => None,
        Err(_) => {
            tracing::debug!("invalid Content-Length value, enforcing limit while reading");
            None
        }
    }
}

/// Read the whole body, enforcing `max_body_size` on chunked uploads too
async fn collect_body<B>(req: Request<B>, max_body_size: u64) -> Result<Bytes, Response<Full<Bytes>>>
where
    B: Body<Data = Bytes> + Send,
    B::Error: Into<Box<dyn StdError + Send + Sync>>,
{
    let limit = usize::try_from(max_body_size).unwrap_or(usize::MAX);
    match Limited::new(req.into_body(), limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            tracing::warn!(max_body_size, "request body exceeded limit while reading");
            Err(http::build_413_response())
        }
        Err(e) => {
            tracing::debug!(error = %e, "failed to read request body");
            Err(http::build_text_response(
                StatusCode::BAD_REQUEST,
                "400 Bad Request",
            ))
        }
    }
}
