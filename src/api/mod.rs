// API module entry
// JSON endpoints: image generation, diagrams and 3D plots

mod diagram;
mod extract;
mod images;
mod plots;
mod response;
mod types;

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Method, Response};

use crate::config::AppState;
use crate::plot::PlotKind;

pub use images::ImageRoute;
pub use types::{GenerationRequest, PromptRequest, ResponseEnvelope};

use response::{error_response, json_response};

/// An API endpoint, resolved from its path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Images(ImageRoute),
    Diagram,
    Plot(PlotKind),
}

impl Endpoint {
    pub fn from_path(path: &str) -> Option<Self> {
        match path {
            "/v1/images/generations" => Some(Self::Images(ImageRoute::V1)),
            "/v2/images/generations" => Some(Self::Images(ImageRoute::V2)),
            "/api/diagram" => Some(Self::Diagram),
            "/api/3d-surface" => Some(Self::Plot(PlotKind::Surface)),
            "/api/3d-sphere" => Some(Self::Plot(PlotKind::Sphere)),
            _ => None,
        }
    }
}

/// Paths listed on the index page
pub const ENDPOINT_PATHS: [&str; 5] = [
    "/v1/images/generations",
    "/v2/images/generations",
    "/api/diagram",
    "/api/3d-surface",
    "/api/3d-sphere",
];

/// Whether `path` names an API endpoint
pub fn is_api_path(path: &str) -> bool {
    Endpoint::from_path(path).is_some()
}

/// API route handler
///
/// Runs the endpoint for `path` with an already collected body. Returns
/// `None` when the method and path pair is not an API route.
pub async fn dispatch(
    method: &Method,
    path: &str,
    body: Bytes,
    state: &AppState,
) -> Option<Response<Full<Bytes>>> {
    if *method != Method::POST {
        return None;
    }
    let endpoint = Endpoint::from_path(path)?;

    let result = match endpoint {
        Endpoint::Images(route) => images::handle_generation(route, &body, state).await,
        Endpoint::Diagram => diagram::handle_diagram(&body, state).await,
        Endpoint::Plot(kind) => plots::handle_plot(kind, &body, state).await,
    };

    Some(match result {
        Ok((status, envelope)) => json_response(status, &envelope),
        Err(err) => error_response(path, &err),
    })
}
