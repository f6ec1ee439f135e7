// Diagram handler
// Extracts the diagram source and hands it to the rendering service

use hyper::StatusCode;

use super::extract::between_markers_or_all;
use super::types::{PromptRequest, ResponseEnvelope};
use crate::config::AppState;
use crate::error::ApiError;
use crate::storage::ArtifactStore;

/// `POST /api/diagram`
pub async fn handle_diagram(
    body: &[u8],
    state: &AppState,
) -> Result<(StatusCode, ResponseEnvelope), ApiError> {
    let request: PromptRequest = serde_json::from_slice(body)?;
    if state.config.logging.log_payloads {
        tracing::debug!(?request, "diagram payload");
    }
    let prompt = request.validate()?;

    let diagram = &state.config.diagram;
    let source = between_markers_or_all(prompt, &diagram.start_marker, &diagram.end_marker);

    let id = state.upstream.render_diagram(source).await?;
    let url = result_url(&diagram.result_url_template, &id);
    tracing::info!(%id, "diagram rendered");

    Ok((
        StatusCode::OK,
        ResponseEnvelope::new(ArtifactStore::timestamp(), [url]),
    ))
}

/// Substitute the service's reply into the result URL template
pub fn result_url(template: &str, id: &str) -> String {
    template.replace("{id}", id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_url() {
        assert_eq!(
            result_url("https://diagrams.example.com/{id}.svg", "abc"),
            "https://diagrams.example.com/abc.svg"
        );
        assert_eq!(result_url("https://d.example.com/fixed", "abc"), "https://d.example.com/fixed");
    }
}
