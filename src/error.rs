use axum::{
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Domain-specific error types for Streamgate
///
/// `InvalidLiveDescriptor` and `InvalidPlaybackDescriptor` are soft: the
/// resolver turns them into an absent descriptor and only reports them to
/// the diagnostic sink. The rest abort the request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GateError {
    #[error("Missing query string")]
    MissingInput,

    #[error("Missing required parameter: {0}")]
    MissingRequiredParameter(String),

    #[error("Invalid proxy address: {0}")]
    InvalidProxy(String),

    #[error("Invalid rtp descriptor: {0}")]
    InvalidLiveDescriptor(String),

    #[error("Invalid rtsp descriptor: {0}")]
    InvalidPlaybackDescriptor(String),

    #[error("No valid rtp or rtsp source in request")]
    NoValidSource,

    #[error("Failed to build target URL: {0}")]
    BuildFailure(String),
}

impl GateError {
    /// HTTP status for this error
    pub fn status(&self) -> StatusCode {
        match self {
            GateError::BuildFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    /// Short machine-readable name, used as a metrics label
    pub fn kind(&self) -> &'static str {
        match self {
            GateError::MissingInput => "missing_input",
            GateError::MissingRequiredParameter(_) => "missing_parameter",
            GateError::InvalidProxy(_) => "invalid_proxy",
            GateError::InvalidLiveDescriptor(_) => "invalid_rtp",
            GateError::InvalidPlaybackDescriptor(_) => "invalid_rtsp",
            GateError::NoValidSource => "no_valid_source",
            GateError::BuildFailure(_) => "build_failure",
        }
    }
}

/// Reason phrase for the status codes the gateway emits.
///
/// 404 is never produced by the rewrite path but routing can return it.
pub fn status_text(status: StatusCode) -> &'static str {
    match status.as_u16() {
        400 => "Bad Request",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Unknown Status",
    }
}

// Implement IntoResponse for GateError to handle HTTP responses
impl IntoResponse for GateError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("{} ({})", self, status_text(status));
        } else {
            tracing::warn!("{} ({})", self, status_text(status));
        }

        let body = self.to_string();
        (
            status,
            [
                (header::CONTENT_TYPE, "text/plain".to_string()),
                (header::CONTENT_LENGTH, body.len().to_string()),
            ],
            body,
        )
            .into_response()
    }
}

// Convenience type alias for Results
pub type Result<T> = std::result::Result<T, GateError>;
