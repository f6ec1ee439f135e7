//! API error type
//!
//! Every endpoint failure maps to one [`ApiError`]. The variant decides the
//! status code and the message the client sees; details stay in the logs.

use hyper::StatusCode;

use crate::plot::PlotError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("missing required parameters")]
    MissingParameters,

    #[error("invalid parameter: {0}")]
    InvalidParameter(&'static str),

    #[error("invalid JSON body: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// Upstream answered with a non-200 status; relayed as-is
    #[error("upstream returned {status}")]
    UpstreamStatus {
        status: StatusCode,
        message: &'static str,
    },

    #[error("upstream request failed: {0}")]
    UpstreamRequest(#[from] reqwest::Error),

    #[error(transparent)]
    Plot(#[from] PlotError),

    #[error("failed to store artifact: {0}")]
    Storage(#[from] std::io::Error),

    #[error("render task failed: {0}")]
    Render(String),
}

impl ApiError {
    /// HTTP status returned to the client
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Plot(PlotError::Encode(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::MissingParameters
            | Self::InvalidParameter(_)
            | Self::InvalidJson(_)
            | Self::Plot(_) => StatusCode::BAD_REQUEST,
            Self::UpstreamStatus { status, .. } => *status,
            Self::UpstreamRequest(_) => StatusCode::BAD_GATEWAY,
            Self::Storage(_) | Self::Render(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message placed in the `{"error": ...}` body
    pub fn public_message(&self) -> String {
        match self {
            Self::MissingParameters => "Missing required parameters".to_string(),
            Self::InvalidParameter(name) => format!("Invalid {name}"),
            Self::InvalidJson(_) => "Invalid JSON body".to_string(),
            Self::UpstreamStatus { message, .. } => (*message).to_string(),
            Self::UpstreamRequest(_) => "Upstream service unavailable".to_string(),
            Self::Plot(PlotError::NoFigure { .. }) => "No figure was produced".to_string(),
            Self::Plot(PlotError::Encode(_)) | Self::Render(_) => {
                "Failed to render figure".to_string()
            }
            Self::Plot(err) => err.to_string(),
            Self::Storage(_) => "Failed to store artifact".to_string(),
        }
    }

    /// Whether the failure is on our side and deserves an error log
    pub fn is_internal(&self) -> bool {
        self.status().is_server_error() && !matches!(self, Self::UpstreamStatus { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_status_is_relayed() {
        let err = ApiError::UpstreamStatus {
            status: StatusCode::TOO_MANY_REQUESTS,
            message: "Failed to generate image",
        };
        assert_eq!(err.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(err.public_message(), "Failed to generate image");
        assert!(!err.is_internal());
    }

    #[test]
    fn test_upstream_server_error_is_not_internal() {
        let err = ApiError::UpstreamStatus {
            status: StatusCode::SERVICE_UNAVAILABLE,
            message: "Failed to generate image",
        };
        assert!(!err.is_internal());
    }

    #[test]
    fn test_storage_errors_hide_details() {
        let err = ApiError::Storage(std::io::Error::other("disk full at /var/data"));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.public_message(), "Failed to store artifact");
        assert!(err.is_internal());
    }

    #[test]
    fn test_missing_figure_message() {
        let err = ApiError::from(PlotError::NoFigure { expected: "z" });
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.public_message(), "No figure was produced");
    }

    #[test]
    fn test_encode_failure_is_internal() {
        let err = ApiError::from(PlotError::Encode("png writer".to_string()));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.public_message(), "Failed to render figure");
        assert!(err.is_internal());
    }
}
