//! Hook generation endpoint and its API key guard

use axum::{
    Json,
    extract::{Request, State as AxumState},
    middleware::Next,
    response::Response,
};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::SharedHookApiState;
use crate::error::HookError;
use crate::hooks::generate_hooks;

pub const API_KEY_HEADER: &str = "X-API-Key";

#[derive(Debug, Serialize, Deserialize)]
pub struct HookRequest {
    pub key_phrase: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct HookResponse {
    pub hooks: Vec<String>,
    pub key_phrase: String,
}

/// Rejects requests whose `X-API-Key` header is not the configured key.
/// Runs before the body is read, so rejected requests never reach the model.
pub async fn require_api_key(
    AxumState(state): AxumState<SharedHookApiState>,
    request: Request,
    next: Next,
) -> Result<Response, HookError> {
    let provided = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok());

    if provided != Some(state.config.api_key.expose_secret().as_str()) {
        warn!(
            "Rejected {} {}: missing or invalid {} header",
            request.method(),
            request.uri().path(),
            API_KEY_HEADER
        );
        return Err(HookError::Unauthorized(
            "Could not validate credentials".to_string(),
        ));
    }
    Ok(next.run(request).await)
}

/// POST /generate-hook
pub async fn generate_hook(
    AxumState(state): AxumState<SharedHookApiState>,
    Json(request): Json<HookRequest>,
) -> Result<Json<HookResponse>, HookError> {
    info!("Generating hooks for {:?}", request.key_phrase);
    let hooks = generate_hooks(
        state.provider.as_ref(),
        &state.config.system_prompt,
        &request.key_phrase,
    )
    .await?;

    Ok(Json(HookResponse {
        hooks,
        key_phrase: request.key_phrase,
    }))
}
