//! Endpoint tests against mocked upstream services
//!
//! Most tests call `api::dispatch` directly; the last one drives the real
//! listener over TCP.

use std::sync::Arc;

use artifact_proxy::api;
use artifact_proxy::config::{AppState, Config};
use artifact_proxy::server;
use http_body_util::BodyExt;
use hyper::body::Bytes;
use hyper::{Method, StatusCode};
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::sync::Notify;

const V1_PATH: &str = "/accounts/acct-1/ai/run/@cf/stabilityai/stable-diffusion-xl-base-1.0";
const V2_PATH: &str = "/accounts/acct-1/ai/run/@cf/bytedance/stable-diffusion-xl-lightning";

fn test_config(dir: &TempDir, upstream_url: &str) -> Config {
    let mut config = Config::default();
    config.storage.static_dir = dir.path().to_string_lossy().into_owned();
    config.storage.public_base_url = "https://files.example.com/static".to_string();
    config.upstream.cloudflare_base_url = upstream_url.to_string();
    config.upstream.timeout_secs = 5;
    config.diagram.render_url = format!("{upstream_url}/render");
    config.diagram.result_url_template = "https://diagrams.example.com/{id}.svg".to_string();
    config.plot.default_resolution = 10;
    config.plot.image_width = 80;
    config.plot.image_height = 60;
    config.logging.access_log = false;
    config
}

async fn post(state: &AppState, path: &str, body: &Value) -> (StatusCode, Value) {
    let response = api::dispatch(&Method::POST, path, Bytes::from(body.to_string()), state)
        .await
        .expect("api route");
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn stored_file(dir: &TempDir, url: &str) -> std::path::PathBuf {
    let filename = url.rsplit('/').next().unwrap();
    dir.path().join(filename)
}

fn generation_body(prompt: &str) -> Value {
    json!({
        "CLOUDFLARE_ACCOUNT_ID": "acct-1",
        "cloudflare_api_token": "token-123",
        "prompt": prompt,
    })
}

#[tokio::test]
async fn missing_field_returns_400_with_error_body() {
    let dir = tempfile::tempdir().unwrap();
    let state = AppState::new(test_config(&dir, "http://127.0.0.1:1")).unwrap();

    for path in ["/v1/images/generations", "/v2/images/generations"] {
        let (status, body) = post(
            &state,
            path,
            &json!({"CLOUDFLARE_ACCOUNT_ID": "acct-1", "prompt": "a lighthouse"}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "Missing required parameters"}));
    }

    let (status, _) = post(&state, "/api/diagram", &json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn upstream_failure_status_is_relayed() {
    let mut upstream = mockito::Server::new_async().await;
    let _mock = upstream
        .mock("POST", V1_PATH)
        .with_status(429)
        .with_body(r#"{"errors":[{"message":"rate limited"}]}"#)
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let state = AppState::new(test_config(&dir, &upstream.url())).unwrap();

    let (status, body) = post(&state, "/v1/images/generations", &generation_body("a lighthouse")).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"], "Failed to generate image");
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn generated_image_is_stored_and_linked() {
    let image = b"\x89PNG\r\n\x1a\nfake image payload";
    let mut upstream = mockito::Server::new_async().await;
    let mock = upstream
        .mock("POST", V1_PATH)
        .match_header("authorization", "Bearer token-123")
        .match_body(mockito::Matcher::Json(json!({"prompt": "a lighthouse"})))
        .with_status(200)
        .with_header("content-type", "image/png")
        .with_body(image.as_slice())
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let state = AppState::new(test_config(&dir, &upstream.url())).unwrap();

    let (status, body) = post(&state, "/v1/images/generations", &generation_body("a lighthouse")).await;
    assert_eq!(status, StatusCode::OK);
    mock.assert_async().await;

    let created = body["created"].as_i64().unwrap();
    let url = body["data"][0]["url"].as_str().unwrap();
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(
        url,
        format!("https://files.example.com/static/image_{created}.png")
    );
    assert_eq!(std::fs::read(stored_file(&dir, url)).unwrap(), image);
}

#[tokio::test]
async fn v2_route_uses_its_own_model() {
    let mut upstream = mockito::Server::new_async().await;
    let mock = upstream
        .mock("POST", V2_PATH)
        .with_status(200)
        .with_body("v2 bytes")
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let state = AppState::new(test_config(&dir, &upstream.url())).unwrap();

    let (status, body) = post(&state, "/v2/images/generations", &generation_body("a fox")).await;
    assert_eq!(status, StatusCode::OK);
    mock.assert_async().await;
    let url = body["data"][0]["url"].as_str().unwrap();
    assert_eq!(std::fs::read(stored_file(&dir, url)).unwrap(), b"v2 bytes");
}

#[tokio::test]
async fn unmarked_diagram_prompt_is_forwarded_unchanged() {
    let prompt = "graph TD; Start-->Stop";
    let mut upstream = mockito::Server::new_async().await;
    let mock = upstream
        .mock("POST", "/render")
        .match_body(prompt)
        .with_status(200)
        .with_body("f00d\n")
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let state = AppState::new(test_config(&dir, &upstream.url())).unwrap();

    let (status, body) = post(&state, "/api/diagram", &json!({ "prompt": prompt })).await;
    assert_eq!(status, StatusCode::OK);
    mock.assert_async().await;
    assert_eq!(body["data"][0]["url"], "https://diagrams.example.com/f00d.svg");
}

#[tokio::test]
async fn marked_diagram_source_is_extracted() {
    let mut upstream = mockito::Server::new_async().await;
    let mock = upstream
        .mock("POST", "/render")
        .match_body("\ngraph LR; A-->B\n")
        .with_status(200)
        .with_body("abc")
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let state = AppState::new(test_config(&dir, &upstream.url())).unwrap();

    let prompt = "Here you go:\n```mermaid\ngraph LR; A-->B\n```\nEnjoy";
    let (status, _) = post(&state, "/api/diagram", &json!({ "prompt": prompt })).await;
    assert_eq!(status, StatusCode::OK);
    mock.assert_async().await;
}

#[tokio::test]
async fn diagram_failure_status_is_relayed() {
    let mut upstream = mockito::Server::new_async().await;
    let _mock = upstream
        .mock("POST", "/render")
        .with_status(500)
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let state = AppState::new(test_config(&dir, &upstream.url())).unwrap();

    let (status, body) = post(&state, "/api/diagram", &json!({"prompt": "graph TD; A"})).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Failed to render diagram");
}

fn assert_figure(dir: &TempDir, body: &Value, stem: &str) {
    let created = body["created"].as_i64().unwrap();
    let urls: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| entry["url"].as_str().unwrap())
        .collect();
    assert_eq!(urls.len(), 2);
    assert!(urls[0].ends_with(&format!("/{stem}_{created}.html")), "{}", urls[0]);
    assert!(urls[1].ends_with(&format!("/{stem}_{created}.png")), "{}", urls[1]);

    let html = std::fs::read_to_string(stored_file(dir, urls[0])).unwrap();
    assert!(html.contains("Plotly.newPlot"));
    let png = std::fs::read(stored_file(dir, urls[1])).unwrap();
    assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
}

#[tokio::test]
async fn surface_program_produces_html_and_png() {
    let dir = tempfile::tempdir().unwrap();
    let state = AppState::new(test_config(&dir, "http://127.0.0.1:1")).unwrap();

    let prompt = "Plot this saddle:\n```plot\ntitle = \"Saddle\"\nx = -2..2\ny = -2..2\nz = x^2 - y^2\n```";
    let (status, body) = post(&state, "/api/3d-surface", &json!({ "prompt": prompt })).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_figure(&dir, &body, "surface");
}

#[tokio::test]
async fn surface_program_in_plain_code_fence() {
    let dir = tempfile::tempdir().unwrap();
    let state = AppState::new(test_config(&dir, "http://127.0.0.1:1")).unwrap();

    let prompt = "```\nz = sin(x) * cos(y)\n```";
    let (status, body) = post(&state, "/api/3d-surface", &json!({ "prompt": prompt })).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_figure(&dir, &body, "surface");
}

#[tokio::test]
async fn sphere_program_in_code_fence() {
    let dir = tempfile::tempdir().unwrap();
    let state = AppState::new(test_config(&dir, "http://127.0.0.1:1")).unwrap();

    let prompt = "```\nr = 1 + 0.2 * sin(3 * phi) * sin(theta)\n```";
    let (status, body) = post(&state, "/api/3d-sphere", &json!({ "prompt": prompt })).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_figure(&dir, &body, "sphere");
}

#[tokio::test]
async fn program_without_figure_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let state = AppState::new(test_config(&dir, "http://127.0.0.1:1")).unwrap();

    let (status, body) = post(&state, "/api/3d-surface", &json!({"prompt": "w = x * y"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No figure was produced");

    let (status, body) = post(&state, "/api/3d-sphere", &json!({"prompt": "r = launch(1)"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("unknown function"));

    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn serves_over_tcp_and_shuts_down() {
    let listener = server::create_listener("127.0.0.1:0".parse().unwrap()).unwrap();
    let addr = listener.local_addr().unwrap();

    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(&dir, "http://127.0.0.1:1");
    config.storage.public_base_url = format!("http://{addr}/static");
    config.performance.shutdown_grace_secs = 2;
    let state = Arc::new(AppState::new(config).unwrap());

    let shutdown = Arc::new(Notify::new());
    let server_task = tokio::spawn(server::run(listener, Arc::clone(&state), Arc::clone(&shutdown)));

    let client = reqwest::Client::new();
    let base = format!("http://{addr}");

    let health = client.get(format!("{base}/healthz")).send().await.unwrap();
    assert_eq!(health.status(), StatusCode::OK);
    assert_eq!(health.text().await.unwrap(), "ok");

    let missing = client
        .post(format!("{base}/v1/images/generations"))
        .json(&json!({"prompt": "x"}))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::BAD_REQUEST);
    let body: Value = missing.json().await.unwrap();
    assert_eq!(body["error"], "Missing required parameters");

    // A stored artifact is reachable at the URL the API hands out
    let plot = client
        .post(format!("{base}/api/3d-surface"))
        .json(&json!({"prompt": "z = x * y"}))
        .send()
        .await
        .unwrap();
    assert_eq!(plot.status(), StatusCode::OK);
    let body: Value = plot.json().await.unwrap();
    let png_url = body["data"][1]["url"].as_str().unwrap().to_string();
    assert!(stored_file(&dir, &png_url).is_file());

    let png = client.get(&png_url).send().await.unwrap();
    assert_eq!(png.status(), StatusCode::OK);
    assert_eq!(png.headers()["content-type"], "image/png");
    assert!(png.headers().contains_key("etag"));
    assert_eq!(&png.bytes().await.unwrap()[..4], b"\x89PNG");

    let traversal = client
        .get(format!("{base}/static/../Cargo.toml"))
        .send()
        .await
        .unwrap();
    assert_eq!(traversal.status(), StatusCode::NOT_FOUND);

    drop(client);
    shutdown.notify_one();
    let remaining = tokio::time::timeout(std::time::Duration::from_secs(5), server_task)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(remaining, 0);
}
