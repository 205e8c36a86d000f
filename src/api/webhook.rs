//! Webhook handler for GitHub deliveries

use axum::{
    body::Bytes,
    extract::State as AxumState,
    http::{HeaderMap, StatusCode},
};
use secrecy::ExposeSecret;
use tracing::{info, warn};

use crate::SharedReceiverState;
use crate::deploy::{DeploymentOutcome, run_deploy_script};
use crate::error::Result;
use crate::signature::verify_signature;
use crate::webhook::{Route, WebhookEvent, route};

/// Handles the GitHub webhook POST request.
///
/// The signature is checked before anything in the payload is looked at.
pub async fn handle_webhook(
    AxumState(state): AxumState<SharedReceiverState>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, String) {
    let event = WebhookEvent::from_request(&headers, body);

    let secret = state.config.webhook_secret.expose_secret();
    if !verify_signature(
        &event.body,
        Some(secret.as_str()),
        event.signature.as_deref(),
    ) {
        return (StatusCode::FORBIDDEN, "Invalid signature".to_string());
    }

    info!("Received event: {}", event.kind.as_str());

    let decision = match route(&event.kind, &event.body, &state.config.settings.main_ref) {
        Ok(decision) => decision,
        Err(e) => {
            warn!("Could not route {} event: {}", event.kind.as_str(), e);
            return (e.status_code(), e.to_string());
        }
    };

    match decision {
        Route::Pong => {
            info!("Received ping event.");
            (StatusCode::OK, "pong".to_string())
        }
        Route::IgnoreBranch { target_ref } => {
            info!("Ignoring push event for non-main branch: {}", target_ref);
            (
                StatusCode::OK,
                "Ignoring push event for non-main branch".to_string(),
            )
        }
        Route::Unhandled { event } => {
            warn!("Unhandled event type: {}", event);
            (StatusCode::BAD_REQUEST, "Unhandled event".to_string())
        }
        Route::Deploy { target_ref } => {
            info!(
                "Push event to {} detected. Running deployment script...",
                target_ref
            );
            deployment_response(run_deploy_script(&state.deploy).await)
        }
    }
}

fn deployment_response(result: Result<DeploymentOutcome>) -> (StatusCode, String) {
    match result.and_then(DeploymentOutcome::into_result) {
        Ok(outcome) => {
            info!("Deployment {} executed successfully.", outcome.id);
            (
                StatusCode::OK,
                "Deployment triggered successfully".to_string(),
            )
        }
        Err(e) => (e.status_code(), e.to_string()),
    }
}
