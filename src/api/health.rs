use axum::Json;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct HealthCheck {
    pub status: String,
}

/// GET /health
pub async fn health() -> Json<HealthCheck> {
    Json(HealthCheck {
        status: "OK".to_string(),
    })
}
