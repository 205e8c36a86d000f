use hook_services::api::receiver_router;
use hook_services::logging::{self, FileLogger};
use hook_services::{ReceiverConfig, ReceiverState};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

const DEFAULT_CONFIG_PATH: &str = "webhook_config.toml";

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    let file_logger = FileLogger::from_env("webhook_receiver");
    let _log_guard = match logging::init(file_logger.as_ref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Logging error: {}", e);
            std::process::exit(1);
        }
    };

    let config_path = PathBuf::from(
        std::env::var("WEBHOOK_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string()),
    );

    // Refuse to run without a webhook secret
    let config = match ReceiverConfig::from_env(&config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("FATAL: {}. Webhook receiver cannot start securely.", e);
            std::process::exit(1);
        }
    };

    let bind_address = config.settings.bind_address.clone();
    let state = Arc::new(ReceiverState::new(config));
    info!(
        "Deploying {:?} on pushes to {} (timeout {:?})",
        state.deploy.script, state.config.settings.main_ref, state.deploy.timeout
    );
    let app = receiver_router(state);

    info!("Listening on {}", bind_address);
    info!("Using config at {:?}", config_path);
    let listener = match tokio::net::TcpListener::bind(&bind_address).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind {}: {}", bind_address, e);
            std::process::exit(1);
        }
    };
    if let Err(e) = axum::serve(listener, app).await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }
}
