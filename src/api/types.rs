// API type definitions module

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ApiError;

/// Body of `/v1/images/generations` and `/v2/images/generations`
#[derive(Deserialize, Default)]
pub struct GenerationRequest {
    #[serde(rename = "CLOUDFLARE_ACCOUNT_ID")]
    pub account_id: Option<String>,
    #[serde(rename = "cloudflare_api_token")]
    pub api_token: Option<String>,
    pub prompt: Option<String>,
}

/// A [`GenerationRequest`] with every field present
pub struct ValidatedGeneration<'a> {
    pub account_id: &'a str,
    pub api_token: &'a str,
    pub prompt: &'a str,
}

impl GenerationRequest {
    /// Require all three fields to be present and non-empty
    pub fn validate(&self) -> Result<ValidatedGeneration<'_>, ApiError> {
        let (Some(account_id), Some(api_token), Some(prompt)) = (
            non_empty(self.account_id.as_deref()),
            non_empty(self.api_token.as_deref()),
            non_empty(self.prompt.as_deref()),
        ) else {
            return Err(ApiError::MissingParameters);
        };

        // The account id becomes a URL path segment
        if !account_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(ApiError::InvalidParameter("CLOUDFLARE_ACCOUNT_ID"));
        }

        Ok(ValidatedGeneration {
            account_id,
            api_token,
            prompt,
        })
    }
}

impl fmt::Debug for GenerationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationRequest")
            .field("account_id", &self.account_id)
            .field("api_token", &self.api_token.as_deref().map(redact))
            .field("prompt", &self.prompt)
            .finish()
    }
}

/// Body of the diagram and plot endpoints
#[derive(Debug, Deserialize, Default)]
pub struct PromptRequest {
    pub prompt: Option<String>,
}

impl PromptRequest {
    pub fn validate(&self) -> Result<&str, ApiError> {
        non_empty(self.prompt.as_deref()).ok_or(ApiError::MissingParameters)
    }
}

/// One entry of the envelope's `data` list
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ArtifactUrl {
    pub url: String,
}

/// Success envelope shared by every endpoint
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ResponseEnvelope {
    pub created: i64,
    pub data: Vec<ArtifactUrl>,
}

impl ResponseEnvelope {
    pub fn new(created: i64, urls: impl IntoIterator<Item = String>) -> Self {
        Self {
            created,
            data: urls.into_iter().map(|url| ArtifactUrl { url }).collect(),
        }
    }
}

/// Error body
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Keep the first four characters of a secret
fn redact(secret: &str) -> String {
    let visible: String = secret.chars().take(4).collect();
    format!("{visible}*** ({} chars)", secret.chars().count())
}
