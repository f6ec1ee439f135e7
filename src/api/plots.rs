// 3D plot handlers
// Evaluate the embedded plot program off the async runtime, then store
// the HTML and PNG renderings under one timestamp

use hyper::StatusCode;

use super::extract::{between_markers, strip_code_fences};
use super::types::{PromptRequest, ResponseEnvelope};
use crate::config::AppState;
use crate::error::ApiError;
use crate::plot::{self, PlotKind};
use crate::storage::ArtifactStore;

/// `POST /api/3d-surface` and `POST /api/3d-sphere`
pub async fn handle_plot(
    kind: PlotKind,
    body: &[u8],
    state: &AppState,
) -> Result<(StatusCode, ResponseEnvelope), ApiError> {
    let request: PromptRequest = serde_json::from_slice(body)?;
    if state.config.logging.log_payloads {
        tracing::debug!(?request, ?kind, "plot payload");
    }
    let prompt = request.validate()?;

    let source = program_source(kind, prompt, state).to_string();
    let config = state.config.plot.clone();

    let figure = tokio::task::spawn_blocking(move || plot::render(kind, &source, &config))
        .await
        .map_err(|e| ApiError::Render(e.to_string()))??;

    let created = ArtifactStore::timestamp();
    let stem = kind.stem();
    let html = state
        .store
        .save_at(stem, "html", figure.html.as_bytes(), created)
        .await?;
    let png = state.store.save_at(stem, "png", &figure.png, created).await?;
    tracing::info!(html = %html.filename, png = %png.filename, "figure stored");

    Ok((
        StatusCode::OK,
        ResponseEnvelope::new(created, [html.url, png.url]),
    ))
}

/// Locate the program text inside the prompt
///
/// Surface prompts prefer the configured markers. Anything else, including
/// a plain fenced block, has its code fences stripped.
fn program_source<'a>(kind: PlotKind, prompt: &'a str, state: &AppState) -> &'a str {
    let plot = &state.config.plot;
    match kind {
        PlotKind::Surface => between_markers(prompt, &plot.start_marker, &plot.end_marker)
            .unwrap_or_else(|| strip_code_fences(prompt)),
        PlotKind::Sphere => strip_code_fences(prompt),
    }
}
