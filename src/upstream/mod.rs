//! Outbound HTTP client
//!
//! Thin wrapper around `reqwest` for the two third-party services the proxy
//! talks to. A non-200 reply becomes [`ApiError::UpstreamStatus`] carrying the
//! upstream status; nothing is retried.

use std::time::Duration;

use hyper::body::Bytes;
use hyper::StatusCode;
use serde_json::json;

use crate::config::{DiagramConfig, UpstreamConfig};
use crate::error::ApiError;

const IMAGE_FAILURE: &str = "Failed to generate image";
const DIAGRAM_FAILURE: &str = "Failed to render diagram";

pub struct UpstreamClient {
    http: reqwest::Client,
    cloudflare_base_url: String,
    diagram_render_url: String,
}

impl UpstreamClient {
    pub fn new(upstream: &UpstreamConfig, diagram: &DiagramConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(upstream.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            cloudflare_base_url: upstream.cloudflare_base_url.trim_end_matches('/').to_string(),
            diagram_render_url: diagram.render_url.clone(),
        })
    }

    /// Workers AI text-to-image endpoint for an account and model
    pub fn image_url(&self, account_id: &str, model: &str) -> String {
        format!(
            "{}/accounts/{account_id}/ai/run/{model}",
            self.cloudflare_base_url
        )
    }

    /// Run a text-to-image model and return the raw image bytes
    pub async fn generate_image(
        &self,
        account_id: &str,
        api_token: &str,
        model: &str,
        prompt: &str,
    ) -> Result<Bytes, ApiError> {
        let url = self.image_url(account_id, model);

        let response = self
            .http
            .post(&url)
            .bearer_auth(api_token)
            .json(&json!({ "prompt": prompt }))
            .send()
            .await?;

        let status = response.status();
        tracing::debug!(%status, model, "image upstream responded");
        if status != StatusCode::OK {
            return Err(ApiError::UpstreamStatus {
                status,
                message: IMAGE_FAILURE,
            });
        }

        Ok(response.bytes().await?)
    }

    /// Submit a diagram source and return the identifier the service replies with
    pub async fn render_diagram(&self, source: &str) -> Result<String, ApiError> {
        let response = self
            .http
            .post(&self.diagram_render_url)
            .header(reqwest::header::CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(source.to_owned())
            .send()
            .await?;

        let status = response.status();
        tracing::debug!(%status, "diagram upstream responded");
        if status != StatusCode::OK {
            return Err(ApiError::UpstreamStatus {
                status,
                message: DIAGRAM_FAILURE,
            });
        }

        Ok(response.text().await?.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str, render_url: &str) -> UpstreamClient {
        let upstream = UpstreamConfig {
            cloudflare_base_url: base.to_string(),
            timeout_secs: 5,
            ..UpstreamConfig::default()
        };
        let diagram = DiagramConfig {
            render_url: render_url.to_string(),
            ..DiagramConfig::default()
        };
        UpstreamClient::new(&upstream, &diagram).unwrap()
    }

    #[test]
    fn test_image_url() {
        let client = client("https://api.cloudflare.com/client/v4/", "http://unused");
        assert_eq!(
            client.image_url("abc123", "@cf/stabilityai/stable-diffusion-xl-base-1.0"),
            "https://api.cloudflare.com/client/v4/accounts/abc123/ai/run/@cf/stabilityai/stable-diffusion-xl-base-1.0"
        );
    }

    #[tokio::test]
    async fn test_generate_image_sends_token_and_prompt() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/accounts/acct/ai/run/@cf/model")
            .match_header("authorization", "Bearer secret-token")
            .match_body(mockito::Matcher::Json(json!({ "prompt": "a red fox" })))
            .with_status(200)
            .with_header("content-type", "image/png")
            .with_body(b"\x89PNG fox".as_slice())
            .create_async()
            .await;

        let client = client(&server.url(), "http://unused");
        let bytes = client
            .generate_image("acct", "secret-token", "@cf/model", "a red fox")
            .await
            .unwrap();

        assert_eq!(bytes.as_ref(), b"\x89PNG fox");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_generate_image_relays_status() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", mockito::Matcher::Any)
            .with_status(403)
            .with_body(r#"{"success":false}"#)
            .create_async()
            .await;

        let client = client(&server.url(), "http://unused");
        let err = client
            .generate_image("acct", "bad", "@cf/model", "fox")
            .await
            .unwrap_err();

        assert_eq!(err.status(), StatusCode::FORBIDDEN);
        assert_eq!(err.public_message(), IMAGE_FAILURE);
    }

    #[tokio::test]
    async fn test_render_diagram_returns_trimmed_id() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/render")
            .match_body("graph TD; A-->B")
            .with_status(200)
            .with_body("d1a2b3\n")
            .create_async()
            .await;

        let client = client("http://unused", &format!("{}/render", server.url()));
        assert_eq!(client.render_diagram("graph TD; A-->B").await.unwrap(), "d1a2b3");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_bad_gateway() {
        let client = client("http://127.0.0.1:1", "http://127.0.0.1:1/render");
        let err = client.render_diagram("x").await.unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
    }
}
