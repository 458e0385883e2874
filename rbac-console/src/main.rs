use console_core::observability::init_tracing;
use dotenvy::dotenv;
use rbac_console::config::get_configuration;
use rbac_console::services::TokenService;
use rbac_console::startup::build_router;
use rbac_console::AppState;
use std::time::Duration;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let configuration = get_configuration().map_err(|e| {
        eprintln!("Failed to read configuration: {}", e);
        anyhow::anyhow!("Configuration error: {}", e)
    })?;

    init_tracing(
        "rbac-console",
        &configuration.logging.level,
        configuration.logging.otlp_endpoint.as_deref(),
    );

    rbac_console::services::metrics::init_metrics();

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(configuration.backend.timeout_seconds))
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {}", e))?;

    let state = AppState::new(
        http,
        configuration.backend.url.clone(),
        TokenService::from_settings(&configuration.token),
    );

    let app = build_router(state, &configuration.server);

    let address = format!(
        "{}:{}",
        configuration.server.host, configuration.server.port
    );
    let listener = tokio::net::TcpListener::bind(&address).await.map_err(|e| {
        tracing::error!("Failed to bind TCP listener to {}: {}", address, e);
        anyhow::anyhow!("Failed to bind to address {}: {}", address, e)
    })?;

    info!(backend = %configuration.backend.url, "Starting rbac-console on {}", address);
    axum::serve(listener, app).await.map_err(|e| {
        tracing::error!("Server error: {}", e);
        anyhow::anyhow!("Server error: {}", e)
    })?;

    Ok(())
}
