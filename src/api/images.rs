// Image generation handlers
// Forwards the prompt to Workers AI and stores the returned bytes

use hyper::StatusCode;

use super::types::{GenerationRequest, ResponseEnvelope};
use crate::config::AppState;
use crate::error::ApiError;
use crate::storage::ArtifactStore;

/// The two generation routes differ only in the model they run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageRoute {
    V1,
    V2,
}

impl ImageRoute {
    pub fn model(self, state: &AppState) -> &str {
        match self {
            Self::V1 => &state.config.upstream.v1_model,
            Self::V2 => &state.config.upstream.v2_model,
        }
    }
}

/// `POST /v{1,2}/images/generations`
pub async fn handle_generation(
    route: ImageRoute,
    body: &[u8],
    state: &AppState,
) -> Result<(StatusCode, ResponseEnvelope), ApiError> {
    let request: GenerationRequest = serde_json::from_slice(body)?;
    if state.config.logging.log_payloads {
        tracing::debug!(?request, ?route, "image generation payload");
    }
    let request = request.validate()?;

    let model = route.model(state);
    let image = state
        .upstream
        .generate_image(request.account_id, request.api_token, model, request.prompt)
        .await?;

    let created = ArtifactStore::timestamp();
    let artifact = state.store.save_at("image", "png", &image, created).await?;
    tracing::info!(file = %artifact.filename, bytes = image.len(), model, "image stored");

    Ok((
        StatusCode::OK,
        ResponseEnvelope::new(created, [artifact.url]),
    ))
}
