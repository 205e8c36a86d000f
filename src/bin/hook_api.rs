use hook_services::api::hook_api_router;
use hook_services::hooks::OpenAiClient;
use hook_services::logging::{self, FileLogger};
use hook_services::{HookApiConfig, HookApiState};
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    let file_logger = FileLogger::from_env("hook_api");
    let _log_guard = match logging::init(file_logger.as_ref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Logging error: {}", e);
            std::process::exit(1);
        }
    };

    let config = match HookApiConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    let provider = match OpenAiClient::new(
        &config.openai_base_url,
        config.openai_api_key.clone(),
        &config.model,
    ) {
        Ok(client) => client,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    let bind_address = config.bind_address.clone();
    let state = Arc::new(HookApiState {
        config,
        provider: Arc::new(provider),
    });
    let app = hook_api_router(state);

    info!("API key loaded, clients authenticate with the X-API-Key header");
    info!("Listening on {}", bind_address);
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
