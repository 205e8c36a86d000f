use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::io;
use std::time::Duration;

/// Error type shared by both services
#[derive(Debug, thiserror::Error)]
pub enum HookError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("Hook generation failed: {0}")]
    Upstream(String),

    #[error("No hooks produced")]
    NoHooks,

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Deployment script failed: {stderr}")]
    ScriptFailed {
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("Deployment script timed out.")]
    ScriptTimedOut { after: Duration },

    #[error("An unexpected error occurred: {0}")]
    ScriptLaunch(#[source] io::Error),

    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
}

impl HookError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            HookError::Unauthorized(_) => StatusCode::FORBIDDEN,
            HookError::InvalidPayload(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Errors leave the hook API as `{"detail": ...}` bodies.
impl IntoResponse for HookError {
    fn into_response(self) -> Response {
        (
            self.status_code(),
            Json(json!({ "detail": self.to_string() })),
        )
            .into_response()
    }
}

/// Helper type for Results that use HookError
pub type Result<T> = std::result::Result<T, HookError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_taxonomy_to_status_codes() {
        assert_eq!(
            HookError::Unauthorized("nope".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            HookError::InvalidPayload("bad json".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(HookError::NoHooks.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            HookError::ScriptTimedOut {
                after: Duration::from_secs(1)
            }
            .status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn script_errors_render_response_text() {
        let failed = HookError::ScriptFailed {
            exit_code: Some(2),
            stderr: "boom".into(),
        };
        assert_eq!(failed.to_string(), "Deployment script failed: boom");

        let timed_out = HookError::ScriptTimedOut {
            after: Duration::from_secs(120),
        };
        assert_eq!(timed_out.to_string(), "Deployment script timed out.");

        let launch = HookError::ScriptLaunch(io::Error::new(io::ErrorKind::NotFound, "missing"));
        assert_eq!(launch.to_string(), "An unexpected error occurred: missing");
    }
}
