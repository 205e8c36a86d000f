//! HTTP surface of both services

pub mod cors;
pub mod health;
pub mod hooks;
pub mod webhook;

use axum::{
    Router, middleware,
    routing::{get, post},
};

use crate::{SharedHookApiState, SharedReceiverState};

pub use health::health;
pub use hooks::{generate_hook, require_api_key};
pub use webhook::handle_webhook;

/// Routes of the hook generation service.
pub fn hook_api_router(state: SharedHookApiState) -> Router {
    let cors = cors::cors_layer(state.config.cors_origins.clone());
    Router::new()
        .route("/generate-hook", post(generate_hook))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_api_key,
        ))
        .route("/health", get(health))
        .layer(cors)
        .with_state(state)
}

/// Routes of the webhook receiver.
pub fn receiver_router(state: SharedReceiverState) -> Router {
    Router::new()
        .route("/webhook", post(handle_webhook))
        .route("/health", get(health))
        .with_state(state)
}
